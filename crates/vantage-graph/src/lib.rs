//! Dependency graph domain logic for Vantage.
//!
//! Everything here runs inside a [`vantage_storage::GraphTxn`]; the
//! [`service::VantageService`] owns transaction boundaries.
//!
//! # Modules
//!
//! - [`error`]: GraphError taxonomy
//! - [`schema`]: node keys and property names used in the graph
//! - [`components`], [`versions`], [`issues`]: persistence of entities and edges
//! - [`precedence`]: per-component PRECEDES chain maintenance
//! - [`propagation`]: direct / transitive issue computation and the active flag
//! - [`writer`]: the deadlock-free version creation pipeline
//! - [`query`]: resolved version reads
//! - [`queue`]: the graph-embedded FIFO create queue
//! - [`service`]: transactional entry points

pub mod components;
pub mod error;
pub mod issues;
pub mod precedence;
pub mod propagation;
pub mod query;
pub mod queue;
pub mod schema;
pub mod service;
pub mod versions;
pub mod writer;

pub use error::GraphError;
pub use queue::QueuedRequest;
pub use service::VantageService;
