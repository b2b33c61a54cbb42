//! Core types shared across the crate: API payloads, retrieved-page records,
//! the final report object, and the error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= API Request/Response Types =============

/// Request body for `POST /api/research/start`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StartResearchRequest {
    /// The topic to research.
    pub topic: String,
    /// Maximum tree depth to explore. Defaults from server config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    /// Pages requested per search query. Defaults from server config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_sites_per_query: Option<usize>,
    /// Client-supplied session id; generated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Request body for `POST /api/research/abort`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AbortResearchRequest {
    /// Session to cancel.
    pub session_id: String,
}

/// Response body for `POST /api/research/abort`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AbortResearchResponse {
    /// Always `"aborted"` on success.
    pub status: String,
}

// ============= Retrieval Types =============

/// One scraped page as returned by the retrieval client.
///
/// Owned by the tree node whose query retrieved it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PageRecord {
    /// Source URL.
    pub url: String,
    /// Extracted readable text.
    pub text: String,
    /// Image URLs found on the page.
    pub images: Vec<String>,
    /// Video URLs found on the page.
    pub videos: Vec<String>,
    /// Outbound links with their anchor text.
    pub links: Vec<PageLink>,
}

/// An outbound link extracted from a page.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq, PartialOrd, Ord)]
pub struct PageLink {
    /// Link target.
    pub url: String,
    /// Anchor text.
    pub text: String,
}

// ============= Report Types =============

/// Deduplicated multimedia collected across the whole research tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MediaBundle {
    /// Unique image URLs, lexicographically ordered.
    pub images: Vec<String>,
    /// Unique video URLs, lexicographically ordered.
    pub videos: Vec<String>,
    /// Unique links (structural equality), ordered by (url, text).
    pub links: Vec<PageLink>,
}

/// Aggregate counters for a completed research run.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ReportMetadata {
    /// Non-root nodes created in the tree.
    pub total_queries: usize,
    /// Retrieved page records across all nodes.
    pub total_sources: usize,
    /// Deepest level reached by any leaf.
    pub max_depth_reached: usize,
    /// Generation tokens consumed over the whole session.
    pub total_tokens: u64,
}

/// The final research report; also the persisted audit artifact.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResearchReport {
    /// The researched topic.
    pub topic: String,
    /// Completion time (ISO-8601).
    pub timestamp: DateTime<Utc>,
    /// Rendered markdown document.
    pub content: String,
    /// Deduplicated media collected from every retrieved page.
    pub media: MediaBundle,
    /// Provenance tree snapshot.
    pub research_tree: crate::research::tree::TreeSnapshot,
    /// Run counters.
    pub metadata: ReportMetadata,
}

// ============= Error Types =============

/// Crate-wide error taxonomy.
///
/// Only `Generation` and `Cancelled` cross the session boundary as terminal
/// events; retrieval failures never appear here (they degrade to fewer
/// records inside the retrieval client).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Generation call failed fatally (retries exhausted or service error).
    #[error("Generation error: {0}")]
    Generation(String),

    /// Cooperative cancellation sentinel. Not a failure: the engine maps it
    /// to a cancelled outcome before it can reach the HTTP layer.
    #[error("Research cancelled")]
    Cancelled,

    /// A referenced entity (tree node, session) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request validation failure.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A broken internal invariant; indicates a programming error.
    #[error("Invariant violation: {0}")]
    Invariant(String),

    /// Everything else (filesystem, serialization).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Generation(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            AppError::Cancelled => (
                axum::http::StatusCode::CONFLICT,
                "research cancelled".to_string(),
            ),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::Invariant(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AppError>;
