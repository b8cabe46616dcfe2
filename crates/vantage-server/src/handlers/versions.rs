//! Version handlers: listing, reads, and queued or dry-run creation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use vantage_core::{ResolvedVersion, VersionId, VersionSpec};

use crate::error::ApiError;
use crate::schema::queue::QueuedRequestView;
use crate::schema::versions::{VersionListResponse, VersionQuery};
use crate::state::AppState;

/// `GET /components/{component}/versions`
pub async fn list_versions(
    State(state): State<AppState>,
    Path(component): Path<String>,
) -> Result<Json<VersionListResponse>, ApiError> {
    let versions = state.run(move |service| service.get_versions(&component)).await?;
    Ok(Json(VersionListResponse { versions }))
}

/// `GET /components/{component}/versions/{version}`
pub async fn get_version(
    State(state): State<AppState>,
    Path((component, version)): Path<(String, String)>,
) -> Result<Json<ResolvedVersion>, ApiError> {
    let id = VersionId::new(component, version);
    let resolved = state.run(move |service| service.get_version(&id)).await?;
    Ok(Json(resolved))
}

/// Queues a create request (202 with the queued request), or with
/// `?dryRun=true` evaluates it without persisting (200 with the resolved
/// version).
///
/// `PUT /components/{component}/versions/{version}`
pub async fn put_version(
    State(state): State<AppState>,
    Path((component, version)): Path<(String, String)>,
    Query(query): Query<VersionQuery>,
    Json(spec): Json<VersionSpec>,
) -> Result<Response, ApiError> {
    if spec.component != component || spec.version != version {
        return Err(ApiError::BadRequest(format!(
            "body describes {}:{} but path names {component}:{version}",
            spec.component, spec.version
        )));
    }

    if query.dry_run {
        tracing::info!(component = %component, version = %version, "dry-run create");
        let resolved = state
            .run(move |service| service.create_or_update_dry_run(&spec))
            .await?;
        tracing::info!(
            component = %component,
            version = %version,
            issues = resolved.transitive_issues.len(),
            "dry-run found transitive issues"
        );
        return Ok((StatusCode::OK, Json(resolved)).into_response());
    }

    let queued = state
        .run(move |service| service.create_or_update_version(&spec))
        .await?;
    state.queue_notify.notify_one();
    Ok((StatusCode::ACCEPTED, Json(QueuedRequestView::from(queued))).into_response())
}
