//! Mock implementations for testing.
//!
//! This module provides a scripted generation client and a stub retrieval
//! client that can be shared across test files without duplication. The
//! scripted client replays queued responses per operation; the stub
//! retriever fabricates deterministic pages.

use async_trait::async_trait;
use knet::llm::client::{Generated, GenerationClient, GenerationError, GenerationResult};
use knet::llm::ReportOutline;
use knet::scrape::{ContentRetriever, ScraperFactory};
use knet::types::{PageLink, PageRecord};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted generation client.
///
/// Queued responses are popped per call; when a queue runs dry the client
/// falls back to a deterministic default. Call counters let tests assert
/// which operations were (not) invoked.
pub struct ScriptedGenerationClient {
    /// Plan returned by `plan_steps`.
    pub plan: Vec<String>,
    /// Queued responses for `synthesize_queries`.
    pub queries: Mutex<VecDeque<Vec<String>>>,
    /// Queued responses for `continue_branch`; empty queue means `false`.
    pub decisions: Mutex<VecDeque<bool>>,
    /// Number of times `summarize` fails with a content block before
    /// succeeding.
    pub summarize_blocks: AtomicUsize,
    /// Calls observed on `continue_branch`.
    pub continue_calls: AtomicUsize,
    /// Calls observed on `synthesize_queries`.
    pub synthesize_calls: AtomicUsize,
}

impl ScriptedGenerationClient {
    /// Client with the given plan and empty scripts.
    pub fn new(plan: &[&str]) -> Self {
        Self {
            plan: plan.iter().map(|s| s.to_string()).collect(),
            queries: Mutex::new(VecDeque::new()),
            decisions: Mutex::new(VecDeque::new()),
            summarize_blocks: AtomicUsize::new(0),
            continue_calls: AtomicUsize::new(0),
            synthesize_calls: AtomicUsize::new(0),
        }
    }

    /// Queue one `synthesize_queries` response.
    pub fn push_queries(&self, queries: &[&str]) {
        self.queries
            .lock()
            .unwrap()
            .push_back(queries.iter().map(|s| s.to_string()).collect());
    }

    /// Queue one `continue_branch` decision.
    pub fn push_decision(&self, decision: bool) {
        self.decisions.lock().unwrap().push_back(decision);
    }

    /// Make the next `n` summarize calls fail with a content block.
    pub fn block_summaries(&self, n: usize) {
        self.summarize_blocks.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl GenerationClient for ScriptedGenerationClient {
    async fn plan_steps(&self, _topic: &str) -> GenerationResult<Vec<String>> {
        Ok(Generated::new(self.plan.clone(), 10))
    }

    async fn synthesize_queries(
        &self,
        vertical: &str,
        _topic: &str,
        _plan_done: &[String],
        _past_queries: &[String],
        _context: &str,
        n: usize,
    ) -> GenerationResult<Vec<String>> {
        let call = self.synthesize_calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.queries.lock().unwrap().pop_front();
        let queries =
            queued.unwrap_or_else(|| vec![format!("{} query {}", vertical, call)]);
        Ok(Generated::new(queries.into_iter().take(n).collect(), 4))
    }

    async fn continue_branch(
        &self,
        _plan_done: &[String],
        _query: &str,
        _past_queries: &[String],
        _context: &str,
    ) -> GenerationResult<bool> {
        self.continue_calls.fetch_add(1, Ordering::SeqCst);
        let decision = self.decisions.lock().unwrap().pop_front().unwrap_or(false);
        Ok(Generated::new(decision, 3))
    }

    async fn summarize(&self, query: &str, _findings: &str) -> GenerationResult<String> {
        let remaining = self.summarize_blocks.load(Ordering::SeqCst);
        if remaining > 0 {
            self.summarize_blocks.store(remaining - 1, Ordering::SeqCst);
            return Err(GenerationError::ContentBlocked("RECITATION".to_string()));
        }
        Ok(Generated::new(format!("verbatim findings for {}", query), 5))
    }

    async fn outline(&self, _topic: &str, _context: &str) -> GenerationResult<ReportOutline> {
        Ok(Generated::new(
            ReportOutline {
                title: "Research Report".to_string(),
                headings: vec!["Background".to_string(), "Findings".to_string()],
            },
            8,
        ))
    }

    async fn fill_heading(
        &self,
        _topic: &str,
        _context: &str,
        _outline_done: &[String],
        heading: &str,
    ) -> GenerationResult<String> {
        // Echo the heading the way real models tend to, so assembly has to
        // strip it.
        Ok(Generated::new(
            format!("## {}\n\nBody for {}.", heading, heading),
            6,
        ))
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }
}

/// Stub retrieval client producing deterministic pages.
pub struct StubRetriever {
    /// Pages fabricated per query (capped by the requested site count).
    pub pages_per_query: usize,
    /// Calls observed on `search_and_scrape`.
    pub calls: AtomicUsize,
    /// Set once `close` runs.
    pub closed: AtomicBool,
}

impl StubRetriever {
    /// Stub returning `pages_per_query` records per call.
    pub fn new(pages_per_query: usize) -> Self {
        Self {
            pages_per_query,
            calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ContentRetriever for StubRetriever {
    async fn search_and_scrape(&self, query: &str, num_sites: usize) -> Vec<PageRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let slug: String = query
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '-' })
            .collect();
        (0..self.pages_per_query.min(num_sites))
            .map(|i| PageRecord {
                url: format!("https://example.com/{}/{}", slug, i),
                text: format!("Content about {} part {}", query, i),
                // Shared across queries so report dedup has work to do.
                images: vec![format!("https://example.com/img{}.png", i % 2)],
                videos: vec!["https://example.com/clip.mp4".to_string()],
                links: vec![PageLink {
                    url: "https://example.com/shared".to_string(),
                    text: "shared link".to_string(),
                }],
            })
            .collect()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Factory handing out one shared stub retriever.
pub struct StubScraperFactory {
    retriever: Arc<StubRetriever>,
}

impl StubScraperFactory {
    /// Factory returning clones of `retriever`.
    pub fn new(retriever: Arc<StubRetriever>) -> Self {
        Self { retriever }
    }
}

impl ScraperFactory for StubScraperFactory {
    fn create(&self) -> Arc<dyn ContentRetriever> {
        self.retriever.clone()
    }
}
