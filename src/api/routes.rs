//! Route definitions.

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};

/// Build the API router. State is attached by the caller.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(crate::api::handlers::health::health))
        .route(
            "/api/research/start",
            post(crate::api::handlers::research::start_research),
        )
        .route(
            "/api/research/abort",
            post(crate::api::handlers::research::abort_research),
        )
}
