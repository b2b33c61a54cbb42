//! # KNet - Knowledge Network Research Server
//!
//! An automated deep-research server built in Rust: given a topic, KNet
//! iteratively expands a tree of search queries, retrieves and summarizes
//! web content for each, decides whether to keep expanding a branch, and
//! synthesizes a structured report with deduplicated media and a provenance
//! tree — streaming progress to the client the whole way.
//!
//! ## Overview
//!
//! KNet can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `knet-server` binary
//! 2. **As a library** - Drive the research engine from your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use knet::llm::GeminiClient;
//! use knet::research::{ResearchEngine, ResearchParams, ProgressReporter};
//! use knet::scrape::WebScraper;
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let llm = Arc::new(GeminiClient::new(api_key, "gemini-2.0-flash".into()));
//!     let scraper = Arc::new(WebScraper::new());
//!     let cancel = CancellationToken::new();
//!
//!     let engine = ResearchEngine::new(
//!         llm,
//!         scraper,
//!         ResearchParams {
//!             topic: "post-quantum cryptography adoption".into(),
//!             max_depth: 2,
//!             num_sites_per_query: 3,
//!             breadth_limit: 3,
//!         },
//!         cancel.clone(),
//!     );
//!
//!     let (tx, mut rx) = mpsc::channel(32);
//!     let mut progress = ProgressReporter::new(tx, cancel);
//!     let outcome = engine.conduct_research(&mut progress).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`research`] - The orchestration engine: query tree, frontier
//!   traversal, progress, report assembly
//! - [`llm`] - Generation client trait, Gemini implementation, retry policy
//! - [`scrape`] - Retrieval client trait and the web search/scrape
//!   implementation
//! - [`session`] - Session registry and lifecycle
//! - [`api`] - REST/SSE control surface
//! - [`types`] - Common types and error handling
//!
//! ## Architecture
//!
//! One engine instance per session runs the research state machine
//! sequentially; sessions run concurrently and share nothing but the
//! session registry. Generation calls are wrapped in a bounded retry on
//! transient failures; retrieval failures degrade to fewer sources and
//! never abort a run. Cancellation is cooperative and checked before every
//! suspension point.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface for the server binary.
pub mod cli;
/// Generation service clients and retry policy.
pub mod llm;
/// Research orchestration engine.
pub mod research;
/// Web search and page retrieval.
pub mod scrape;
/// Session registry and lifecycle.
pub mod session;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use llm::{GeminiClient, GenerationClient, RetryPolicy};
pub use research::{ProgressReporter, ResearchEngine, ResearchOutcome, ResearchParams};
pub use scrape::{ContentRetriever, ScraperFactory, WebScraper, WebScraperFactory};
pub use session::SessionRegistry;
pub use types::{AppError, ResearchReport, Result};
pub use utils::Config;

use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<Config>,
    /// Shared generation client (stateless across sessions).
    pub llm: Arc<dyn GenerationClient>,
    /// Factory for per-session retrieval clients.
    pub scrapers: Arc<dyn ScraperFactory>,
    /// In-flight session registry.
    pub sessions: Arc<SessionRegistry>,
}
