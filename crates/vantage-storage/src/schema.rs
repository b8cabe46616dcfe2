//! SQL schema migration setup for the SQLite backend.
//!
//! Uses `rusqlite_migration` to manage schema migrations via SQLite's
//! `user_version` pragma. Migrations are embedded at compile time via
//! `include_str!`.

use std::time::Duration;

use rusqlite::Connection;
use rusqlite_migration::{Migrations, M};

use crate::error::StorageError;

/// All schema migrations, applied in order via `user_version` tracking.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(include_str!("migrations/001_initial_schema.sql"))])
}

/// Opens (or creates) the database at `path` and brings its schema up to
/// date. Journal mode is persistent, so later connections inherit WAL.
pub fn open_database(path: &str, busy_timeout: Duration) -> Result<Connection, StorageError> {
    let mut conn = open_connection(path, busy_timeout)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    migrations()
        .to_latest(&mut conn)
        .map_err(|e| StorageError::Migration(e.to_string()))?;
    Ok(conn)
}

/// Opens a connection with per-connection pragmas applied.
pub fn open_connection(path: &str, busy_timeout: Duration) -> Result<Connection, StorageError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    // NORMAL synchronous is safe with WAL mode.
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    // Off by default in SQLite; needed for ON DELETE CASCADE on edges.
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}
