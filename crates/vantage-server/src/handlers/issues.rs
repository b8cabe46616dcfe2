//! Issue handlers.

use axum::extract::{Path, State};
use axum::Json;
use vantage_core::{Issue, IssueRequest};

use crate::error::ApiError;
use crate::schema::issues::IssueListResponse;
use crate::state::AppState;

/// `GET /issues`
pub async fn list_issues(State(state): State<AppState>) -> Result<Json<IssueListResponse>, ApiError> {
    let issues = state.run(|service| service.list_issues()).await?;
    Ok(Json(IssueListResponse { issues }))
}

/// `GET /issues/{id}`
pub async fn get_issue(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Issue>, ApiError> {
    let issue = state.run(move |service| service.get_issue(&id)).await?;
    Ok(Json(issue))
}

/// `PUT /issues/{id}`
pub async fn put_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<IssueRequest>,
) -> Result<Json<Issue>, ApiError> {
    let issue = state
        .run(move |service| service.create_or_update_issue(&id, &request))
        .await?;
    Ok(Json(issue))
}
