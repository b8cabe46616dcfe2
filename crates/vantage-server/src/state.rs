//! Shared application state.
//!
//! [`VantageService`] is cheap to clone and internally synchronized by the
//! graph store, so handlers share it without an outer lock. Its calls
//! block on store locks and SQLite I/O, so [`AppState::run`] moves them
//! onto tokio's blocking pool.

use std::sync::Arc;

use tokio::sync::Notify;
use vantage_graph::{GraphError, VantageService};
use vantage_storage::{GraphStore, InMemoryStore, SqliteStore};

use crate::config::ServerConfig;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub service: VantageService,
    /// Signalled after every enqueue so the consumer wakes up early.
    pub queue_notify: Arc<Notify>,
}

impl AppState {
    /// Opens the store named by `config`.
    pub fn new(config: &ServerConfig) -> Result<Self, ApiError> {
        let store: Arc<dyn GraphStore> = if config.in_memory() {
            Arc::new(InMemoryStore::with_lock_timeout(config.lock_timeout))
        } else {
            let store = SqliteStore::with_busy_timeout(&config.db_path, config.lock_timeout)
                .map_err(|err| ApiError::from(GraphError::from(err)))?;
            Arc::new(store)
        };
        Ok(Self::with_service(VantageService::new(store)))
    }

    /// State over a fresh in-memory store (for testing).
    pub fn in_memory() -> Self {
        Self::with_service(VantageService::new(Arc::new(InMemoryStore::new())))
    }

    pub fn with_service(service: VantageService) -> Self {
        AppState {
            service,
            queue_notify: Arc::new(Notify::new()),
        }
    }

    /// Runs a service call on the blocking pool.
    pub async fn run<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        F: FnOnce(&VantageService) -> Result<T, GraphError> + Send + 'static,
        T: Send + 'static,
    {
        let service = self.service.clone();
        Ok(tokio::task::spawn_blocking(move || call(&service)).await??)
    }
}
