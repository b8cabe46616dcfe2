//! Create queue views.

use serde::Serialize;
use vantage_graph::QueuedRequest;

/// A queued create request as listed by `GET /queue` and returned from a
/// real `PUT` of a version.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedRequestView {
    pub id: String,
    pub component: String,
    pub version: String,
    /// Enqueue time, milliseconds since the epoch.
    pub created: i64,
}

impl From<QueuedRequest> for QueuedRequestView {
    fn from(request: QueuedRequest) -> Self {
        QueuedRequestView {
            id: request.id,
            component: request.version.component,
            version: request.version.version,
            created: request.created,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueResponse {
    /// Pending requests, oldest first.
    pub requests: Vec<QueuedRequestView>,
}
