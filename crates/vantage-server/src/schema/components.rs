//! Component request/response types.

use serde::{Deserialize, Serialize};
use vantage_core::Component;

/// Body of `PUT /components/{component}`. The name comes from the path; a
/// `name` field in the body is accepted and ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentUpdate {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentListResponse {
    pub components: Vec<Component>,
}
