//! API route definitions

use super::handlers;
use crate::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Manifests of large projects run to hundreds of megabytes
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // ====================================================================
        // Loading
        // ====================================================================
        .route(
            "/upload_dbt_to_kg",
            post(handlers::upload_dbt_to_kg).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // ====================================================================
        // Inspection
        // ====================================================================
        .route("/api/graph/stats", get(handlers::graph_stats))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
