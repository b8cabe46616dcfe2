//! Transactional property-graph storage for Vantage.
//!
//! Provides the [`GraphStore`] / [`GraphTxn`] contract that the domain layer
//! is written against, plus two backends:
//!
//! - [`InMemoryStore`]: petgraph-backed, snapshot isolation for readers and
//!   per-node write locks held until commit or rollback
//! - [`SqliteStore`]: durable, one connection per transaction, writers
//!   serialized by SQLite's database lock
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: node keys, labels, edge kinds and records
//! - [`traits`]: GraphStore / GraphTxn traits and the [`transaction`] helper
//! - [`locks`]: blocking per-node lock table used by the in-memory backend
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: SQL schema migration setup
//! - [`sqlite`]: SqliteStore implementation

pub mod error;
pub mod locks;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{transaction, GraphStore, GraphTxn};
pub use types::{EdgeKind, EdgeRecord, Label, MergeOutcome, NodeKey, NodeRecord, Properties, TxnMode};
