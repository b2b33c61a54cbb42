//! Liveness probe.

use axum::Json;
use serde_json::{json, Value};

/// Health check endpoint.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Server is healthy")
    ),
    tag = "health"
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
