//! API request handlers

use crate::graph::GraphStats;
use crate::loader::{LoadError, LoadSummary};
use crate::AppState;
use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use tracing::{debug, error, info};

/// Multipart field carrying `manifest.json`
pub const MANIFEST_FIELD: &str = "manifest_file";
/// Multipart field carrying `catalog.json`
pub const CATALOG_FIELD: &str = "catalog_file";

// ============================================================================
// Health
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
    pub store: String,
}

/// Health check handler. 200 when the graph store answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = match state.store.health_check().await {
        Ok(ok) => ok,
        Err(e) => {
            debug!("Health check failed: {:#}", e);
            false
        }
    };

    let (http_status, status, store) = if store_ok {
        (StatusCode::OK, "ok", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", "disconnected")
    };

    (
        http_status,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            backend: state.store.backend_name().to_string(),
            store: store.to_string(),
        }),
    )
}

// ============================================================================
// Upload
// ============================================================================

/// Rebuild the graph from an uploaded manifest and optional catalog
pub async fn upload_dbt_to_kg(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<LoadSummary>, AppError> {
    let mut manifest = None;
    let mut catalog = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_owned).unwrap_or_default();
        match name.as_str() {
            MANIFEST_FIELD => manifest = Some(read_field(field, MANIFEST_FIELD).await?),
            CATALOG_FIELD => catalog = Some(read_field(field, CATALOG_FIELD).await?),
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    let manifest = manifest.ok_or_else(|| {
        AppError::BadRequest(format!("Missing multipart field '{}'", MANIFEST_FIELD))
    })?;

    info!(
        "Received manifest ({} bytes), catalog: {}",
        manifest.len(),
        catalog
            .as_ref()
            .map(|c: &axum::body::Bytes| format!("{} bytes", c.len()))
            .unwrap_or_else(|| "none".to_string())
    );

    let summary = state.loader.load(&manifest, catalog.as_deref()).await?;
    Ok(Json(summary))
}

async fn read_field(field: Field<'_>, name: &str) -> Result<axum::body::Bytes, AppError> {
    field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read '{}': {}", name, e)))
}

// ============================================================================
// Stats
// ============================================================================

/// Node counts by label and relationship counts by type
pub async fn graph_stats(State(state): State<AppState>) -> Result<Json<GraphStats>, AppError> {
    Ok(Json(state.store.stats().await?))
}

// ============================================================================
// Error handling
// ============================================================================

/// API error type
#[derive(Debug)]
pub enum AppError {
    Internal(anyhow::Error),
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Internal(e) => {
                error!("Request failed: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        if err.is_input_error() {
            AppError::BadRequest(err.to_string())
        } else {
            AppError::Internal(err.into())
        }
    }
}
