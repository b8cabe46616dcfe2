//! Issue response types.

use serde::Serialize;
use vantage_core::Issue;

#[derive(Debug, Clone, Serialize)]
pub struct IssueListResponse {
    pub issues: Vec<Issue>,
}
