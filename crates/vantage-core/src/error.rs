//! Error types for domain-level validation.

use thiserror::Error;

/// Errors raised by pure domain logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A dynamic or reserved version was supplied where a concrete one is
    /// mandatory.
    #[error("invalid version {component}:{version}: {reason}")]
    InvalidVersion {
        component: String,
        version: String,
        reason: String,
    },
}
