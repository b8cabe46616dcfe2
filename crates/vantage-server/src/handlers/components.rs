//! Component handlers.

use axum::extract::{Path, State};
use axum::Json;
use vantage_core::Component;

use crate::error::ApiError;
use crate::schema::components::{ComponentListResponse, ComponentUpdate};
use crate::state::AppState;

/// `GET /components`
pub async fn list_components(State(state): State<AppState>) -> Result<Json<ComponentListResponse>, ApiError> {
    let components = state.run(|service| service.list_components()).await?;
    Ok(Json(ComponentListResponse { components }))
}

/// `GET /components/{component}`
pub async fn get_component(
    State(state): State<AppState>,
    Path(component): Path<String>,
) -> Result<Json<Component>, ApiError> {
    let component = state.run(move |service| service.get_component(&component)).await?;
    Ok(Json(component))
}

/// Creates the component or updates its description.
///
/// `PUT /components/{component}`
pub async fn put_component(
    State(state): State<AppState>,
    Path(component): Path<String>,
    Json(update): Json<ComponentUpdate>,
) -> Result<Json<Component>, ApiError> {
    let component = state
        .run(move |service| service.create_or_update_component(&component, update.description.as_deref()))
        .await?;
    Ok(Json(component))
}
