//! Bounded retry for generation calls.
//!
//! Transient signals (empty response, safety/recitation block) get the same
//! call re-issued up to two more times; anything else, or exhaustion, is
//! fatal for the call site. Retrieval failures are never routed through this
//! layer — the retrieval client degrades by omitting failed pages.

use crate::llm::client::{Generated, GenerationError, GenerationResult};
use crate::types::{AppError, Result};
use std::future::Future;

/// Default number of attempts per call (1 initial + 2 retries).
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Retry wrapper for generation calls.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Policy with the given total attempt count (minimum 1).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run `call` until it succeeds or the policy is exhausted.
    ///
    /// `op` names the operation for logs and error messages. Non-transient
    /// errors fail immediately.
    pub async fn run<T, F, Fut>(&self, op: &str, call: F) -> Result<Generated<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = GenerationResult<T>>,
    {
        let mut last_err: Option<GenerationError> = None;
        for attempt in 1..=self.max_attempts {
            match call().await {
                Ok(generated) => return Ok(generated),
                Err(err) if err.is_transient() => {
                    tracing::warn!(
                        operation = op,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "transient generation failure"
                    );
                    last_err = Some(err);
                }
                Err(err) => {
                    return Err(AppError::Generation(format!("{}: {}", op, err)));
                }
            }
        }
        let err = last_err.unwrap_or(GenerationError::NoResponse);
        Err(AppError::Generation(format!(
            "{}: retries exhausted after {} attempts: {}",
            op, self.max_attempts, err
        )))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ATTEMPTS)
    }
}
