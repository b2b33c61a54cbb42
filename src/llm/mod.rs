//! Generation service clients and call policy.
//!
//! - [`client`] - the [`GenerationClient`](client::GenerationClient) trait
//!   the engine orchestrates against
//! - [`gemini`] - Gemini `generateContent` implementation
//! - [`retry`] - bounded retry on transient failure signals
//! - [`prompts`] - prompt templates for the six operations

/// Generation client trait and structured operation types.
pub mod client;
/// Gemini API implementation.
pub mod gemini;
/// Prompt templates.
pub mod prompts;
/// Bounded retry policy for generation calls.
pub mod retry;

pub use client::{Generated, GenerationClient, GenerationError, GenerationResult, ReportOutline};
pub use gemini::GeminiClient;
pub use retry::RetryPolicy;
