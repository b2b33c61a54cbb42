//! HTTP API: the session control surface, built on Axum.
//!
//! # Endpoints
//!
//! - `POST /api/research/start` - start a session; responds with a
//!   Server-Sent-Events stream of `{status, progress, message,
//!   research_tree}` events ending in a terminal `complete` / `cancelled` /
//!   `error` event
//! - `POST /api/research/abort` - cancel a session and release its
//!   retrieval client
//! - `GET /api/health` - liveness probe
//!
//! Progress events always carry the current research-tree snapshot so a
//! client can render traversal live rather than a bare percentage.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use utoipa::OpenApi;

/// OpenAPI document for the control surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::research::start_research,
        handlers::research::abort_research,
    ),
    components(schemas(
        crate::types::StartResearchRequest,
        crate::types::AbortResearchRequest,
        crate::types::AbortResearchResponse,
        crate::types::ResearchReport,
        crate::types::MediaBundle,
        crate::types::ReportMetadata,
        crate::types::PageLink,
        crate::research::tree::TreeSnapshot,
    )),
    tags(
        (name = "research", description = "Research session control"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
