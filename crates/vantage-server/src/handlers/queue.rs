//! Create queue inspection.

use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::schema::queue::{QueueResponse, QueuedRequestView};
use crate::state::AppState;

/// `GET /queue`
pub async fn pending(State(state): State<AppState>) -> Result<Json<QueueResponse>, ApiError> {
    let pending = state.run(|service| service.pending_requests()).await?;
    Ok(Json(QueueResponse {
        requests: pending.into_iter().map(QueuedRequestView::from).collect(),
    }))
}
