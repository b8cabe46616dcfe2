//! Router assembly for the Vantage HTTP API.

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the router with every route under `/api/v1`.
///
/// Routes use axum 0.8 `/{param}` path syntax. Version strings may contain
/// dots; a path segment matches them whole.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Components
        .route("/components", get(handlers::components::list_components))
        .route(
            "/components/{component}",
            get(handlers::components::get_component).put(handlers::components::put_component),
        )
        // Versions
        .route(
            "/components/{component}/versions",
            get(handlers::versions::list_versions),
        )
        .route(
            "/components/{component}/versions/{version}",
            get(handlers::versions::get_version).put(handlers::versions::put_version),
        )
        // Issues
        .route("/issues", get(handlers::issues::list_issues))
        .route(
            "/issues/{id}",
            get(handlers::issues::get_issue).put(handlers::issues::put_issue),
        )
        // Create queue
        .route("/queue", get(handlers::queue::pending));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
