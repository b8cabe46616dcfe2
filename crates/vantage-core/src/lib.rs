//! Domain model for Vantage: components, versions, dependencies and issues.
//!
//! This crate is pure logic with no storage concerns:
//! - [`classify`]: the version classifier (real / latest / dynamic)
//! - [`maven`]: Maven-style version comparison and scheme detection
//! - [`ordering`]: the global version ordering shared by the graph writer
//!   and the precedence fixer
//! - [`version`], [`issue`]: request and response value types

pub mod classify;
pub mod error;
pub mod id;
pub mod issue;
pub mod maven;
pub mod ordering;
pub mod version;

// Re-export commonly used types
pub use classify::{is_latest, is_real, purify, require_real, VersionClass};
pub use error::CoreError;
pub use id::VersionId;
pub use issue::{Issue, IssueLevel, IssueRequest};
pub use maven::{is_maven_scheme, MavenVersion};
pub use ordering::{compare_version_ids, compare_versions};
pub use version::{
    Component, CreateVersionRequest, DependencySpec, DependencyView, ResolvedVersion,
    VersionSpec, VersionSummary,
};
