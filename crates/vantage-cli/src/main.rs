//! Vantage operator CLI.
//!
//! Provides the `vantage` binary, which works directly on a SQLite database
//! through the same `VantageService` the HTTP server uses:
//! - `drain`: apply every queued create request
//! - `queue`: list pending create requests
//! - `dry-run`: evaluate a version request file without persisting it
//! - `show`: print a component's versions, or one version
//!
//! Exit codes: 0 = success, 1 = rejected request or missing entity,
//! 3 = database or I/O error.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use vantage_core::{VersionId, VersionSpec};
use vantage_graph::{GraphError, VantageService};
use vantage_storage::SqliteStore;

/// Vantage dependency graph tools.
#[derive(Parser)]
#[command(name = "vantage", about = "Vantage dependency graph tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Apply every queued create request.
    Drain {
        /// Path to the database file.
        #[arg(short, long)]
        db: String,
    },

    /// List pending create requests, oldest first.
    Queue {
        #[arg(short, long)]
        db: String,
    },

    /// Evaluate a version request without persisting anything.
    DryRun {
        #[arg(short, long)]
        db: String,

        /// JSON file holding the version request.
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show a component's versions, or a single version.
    Show {
        #[arg(short, long)]
        db: String,

        component: String,

        version: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Drain { db } => with_service(&db, run_drain),
        Commands::Queue { db } => with_service(&db, run_queue),
        Commands::DryRun { db, file } => with_service(&db, |service| run_dry_run(service, &file)),
        Commands::Show { db, component, version } => {
            with_service(&db, |service| run_show(service, &component, version.as_deref()))
        }
    };
    process::exit(exit_code);
}

/// Opens the database and runs `command` against it.
fn with_service(db_path: &str, command: impl FnOnce(&VantageService) -> i32) -> i32 {
    match SqliteStore::new(db_path) {
        Ok(store) => command(&VantageService::new(Arc::new(store))),
        Err(e) => {
            eprintln!("Error: failed to open database '{}': {}", db_path, e);
            3
        }
    }
}

fn run_drain(service: &VantageService) -> i32 {
    match service.drain_queue() {
        Ok(processed) => {
            println!("processed {} request(s)", processed);
            0
        }
        Err(e) => report(&e),
    }
}

fn run_queue(service: &VantageService) -> i32 {
    match service.pending_requests() {
        Ok(pending) => {
            for request in pending {
                println!(
                    "{}\t{}\t{}",
                    request.id,
                    request.created,
                    request.version.id()
                );
            }
            0
        }
        Err(e) => report(&e),
    }
}

fn run_dry_run(service: &VantageService, file: &Path) -> i32 {
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error: failed to read '{}': {}", file.display(), e);
            return 3;
        }
    };
    let spec: VersionSpec = match serde_json::from_str(&text) {
        Ok(spec) => spec,
        Err(e) => {
            eprintln!("Error: '{}' is not a version request: {}", file.display(), e);
            return 1;
        }
    };
    match service.create_or_update_dry_run(&spec) {
        Ok(resolved) => print_json(&resolved),
        Err(e) => report(&e),
    }
}

fn run_show(service: &VantageService, component: &str, version: Option<&str>) -> i32 {
    let shown = match version {
        Some(version) => service
            .get_version(&VersionId::new(component, version))
            .map(serde_json::to_value),
        None => service.get_versions(component).map(serde_json::to_value),
    };
    match shown {
        Ok(Ok(value)) => print_json(&value),
        Ok(Err(e)) => {
            eprintln!("Error: {}", e);
            3
        }
        Err(e) => report(&e),
    }
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            3
        }
    }
}

/// Prints a service error and maps it to an exit code.
fn report(err: &GraphError) -> i32 {
    eprintln!("Error: {}", err);
    match err {
        GraphError::Core(_) | GraphError::NotFound { .. } | GraphError::InvalidRequest(_) => 1,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_show_takes_optional_version() {
        let cli = Cli::try_parse_from(["vantage", "show", "--db", "v.db", "app"]).unwrap();
        assert!(matches!(cli.command, Commands::Show { version: None, .. }));
        let cli = Cli::try_parse_from(["vantage", "show", "--db", "v.db", "app", "1.0"]).unwrap();
        assert!(matches!(cli.command, Commands::Show { version: Some(_), .. }));
    }

    #[test]
    fn test_dry_run_against_fresh_database() {
        let dir = tempfile::tempdir().unwrap();
        let request = dir.path().join("request.json");
        std::fs::write(
            &request,
            r#"{"component":"app","version":"1.0","resolvedDependencies":[]}"#,
        )
        .unwrap();
        let db = dir.path().join("vantage.db");
        let db = db.to_str().unwrap();

        assert_eq!(with_service(db, |service| run_dry_run(service, &request)), 0);
        assert_eq!(with_service(db, |service| run_show(service, "app", None)), 1);
        assert_eq!(with_service(db, run_drain), 0);
    }
}
