//! HTTP/JSON API for Vantage.
//!
//! A thin adapter over [`vantage_graph::VantageService`]: handlers parse
//! requests, run the blocking service call off the async runtime, and map
//! results and errors to JSON. A background task consumes the create queue.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod schema;
pub mod state;
pub mod worker;
