//! HTTP handler modules.
//!
//! Handlers parse path, query and body, hand the work to
//! [`vantage_graph::VantageService`] through [`crate::state::AppState::run`],
//! and return JSON. No business logic lives here.

pub mod components;
pub mod issues;
pub mod queue;
pub mod versions;
