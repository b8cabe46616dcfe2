//! Version request/response types.

use serde::{Deserialize, Serialize};
use vantage_core::ResolvedVersion;

/// Query string of `PUT /components/{component}/versions/{version}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionQuery {
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionListResponse {
    /// Newest first.
    pub versions: Vec<ResolvedVersion>,
}
