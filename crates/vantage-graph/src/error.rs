//! Error taxonomy for graph operations.

use std::fmt;

use thiserror::Error;
use vantage_core::CoreError;
use vantage_storage::StorageError;

/// Errors from domain operations on the dependency graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Domain validation failed, e.g. a dynamic version where a real one is
    /// required.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A component, version or issue does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The request is malformed beyond version classification.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The graph is in a state that should be impossible.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    pub fn not_found(kind: &'static str, id: impl fmt::Display) -> Self {
        GraphError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        GraphError::InvariantViolation(message.into())
    }
}
