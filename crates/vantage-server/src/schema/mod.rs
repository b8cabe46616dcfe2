//! API request/response types that are not domain types themselves.
//!
//! Domain values (`Component`, `ResolvedVersion`, `Issue`, ...) are
//! serialized directly from `vantage_core`; these modules hold the
//! wrappers and query parameters around them.

pub mod components;
pub mod issues;
pub mod queue;
pub mod versions;
