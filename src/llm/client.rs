//! Generation client abstraction.
//!
//! The orchestration engine talks to the content-generation service through
//! [`GenerationClient`]: five structured operations plus long-form text
//! fill-in. Every call reports the tokens it consumed so the engine can
//! accumulate a per-session count for the report metadata.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A generated value plus the tokens the call consumed.
#[derive(Debug, Clone)]
pub struct Generated<T> {
    /// The parsed operation result.
    pub value: T,
    /// Total tokens billed for the call.
    pub tokens: u64,
}

impl<T> Generated<T> {
    /// Wrap a value with its token cost.
    pub fn new(value: T, tokens: u64) -> Self {
        Self { value, tokens }
    }
}

/// Failure signals from the generation service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    /// The service returned no usable output.
    #[error("generation service returned no response")]
    NoResponse,

    /// Output was suppressed by a safety or recitation filter.
    #[error("generation blocked: {0}")]
    ContentBlocked(String),

    /// Transport or API failure.
    #[error("generation service error: {0}")]
    Service(String),
}

impl GenerationError {
    /// Whether retrying the same call can reasonably succeed.
    ///
    /// Empty responses and content blocks are flaky per-sample outcomes;
    /// service errors are not retried at this layer.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GenerationError::NoResponse | GenerationError::ContentBlocked(_)
        )
    }
}

/// Result alias for generation calls.
pub type GenerationResult<T> = std::result::Result<Generated<T>, GenerationError>;

/// Report outline: a title plus h2-level headings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportOutline {
    /// Report title.
    pub title: String,
    /// Section headings, in render order.
    pub headings: Vec<String>,
}

/// Structured request/response contract with the generation service.
///
/// All operations return typed output; `summarize` and `fill_heading` return
/// long-form text. Implementations map provider failure modes onto
/// [`GenerationError`] so the retry policy can classify them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate the high-level research plan for a topic.
    async fn plan_steps(&self, topic: &str) -> GenerationResult<Vec<String>>;

    /// Synthesize up to `n` search queries for the current plan step.
    ///
    /// `plan_done` lists already-finished plan steps, `past_queries` the
    /// queries on the path from the root to the current node, `context` the
    /// distilled findings so far (callers pass an explicit `"None"` marker
    /// when empty).
    async fn synthesize_queries(
        &self,
        vertical: &str,
        topic: &str,
        plan_done: &[String],
        past_queries: &[String],
        context: &str,
        n: usize,
    ) -> GenerationResult<Vec<String>>;

    /// Decide whether to keep expanding the current branch.
    async fn continue_branch(
        &self,
        plan_done: &[String],
        query: &str,
        past_queries: &[String],
        context: &str,
    ) -> GenerationResult<bool>;

    /// Extract verbatim relevant findings from a batch of retrieved pages.
    async fn summarize(&self, query: &str, findings: &str) -> GenerationResult<String>;

    /// Generate the report outline from the accumulated context.
    async fn outline(&self, topic: &str, context: &str) -> GenerationResult<ReportOutline>;

    /// Fill in the content for one outline heading.
    ///
    /// Callers must strip a leading restatement of the heading if the model
    /// echoes it.
    async fn fill_heading(
        &self,
        topic: &str,
        context: &str,
        outline_done: &[String],
        heading: &str,
    ) -> GenerationResult<String>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(GenerationError::NoResponse.is_transient());
        assert!(GenerationError::ContentBlocked("safety".into()).is_transient());
        assert!(!GenerationError::Service("timeout".into()).is_transient());
    }

    #[test]
    fn generated_carries_tokens() {
        let g = Generated::new(vec!["a".to_string()], 42);
        assert_eq!(g.value.len(), 1);
        assert_eq!(g.tokens, 42);
    }
}
