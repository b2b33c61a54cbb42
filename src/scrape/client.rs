//! Retrieval client contract.
//!
//! The engine calls the retrieval side as a single suspend point per query
//! and never sees per-page failures: the client returns however many records
//! it managed to produce.

use crate::types::PageRecord;
use async_trait::async_trait;
use std::sync::Arc;

/// Search + page-extraction service used by the engine.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentRetriever: Send + Sync {
    /// Search the web for `query` and scrape up to `num_sites` result pages.
    ///
    /// Tolerates partial failure: failed searches or pages are omitted, so
    /// the result may hold fewer than `num_sites` records (possibly none).
    async fn search_and_scrape(&self, query: &str, num_sites: usize) -> Vec<PageRecord>;

    /// Release underlying resources (connection pools, browser contexts).
    ///
    /// Called on session teardown; the instance must not be used afterwards.
    async fn close(&self);
}

/// Per-session constructor for retrieval clients.
///
/// Each session exclusively owns one retrieval client, so the transport
/// layer needs a factory rather than a shared instance. Tests substitute a
/// stub factory.
pub trait ScraperFactory: Send + Sync {
    /// Build a fresh retrieval client for one session.
    fn create(&self) -> Arc<dyn ContentRetriever>;
}
