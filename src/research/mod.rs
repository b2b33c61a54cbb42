//! Research orchestration: the query tree, the frontier-traversal engine,
//! progress accounting and report assembly.
//!
//! One [`engine::ResearchEngine`] instance drives one session's research
//! run end to end: plan, explore, summarize, decide, report. Everything
//! here is single-writer per session; concurrency exists only across
//! sessions and inside the retrieval client.

/// The frontier-traversal state machine.
pub mod engine;
/// Progress accounting and status events.
pub mod progress;
/// Report assembly and artifact persistence.
pub mod report;
/// The append-only query tree.
pub mod tree;

pub use engine::{ResearchEngine, ResearchOutcome, ResearchParams};
pub use progress::{ProgressReporter, StatusEvent};
pub use tree::{NodeId, QueryTree, TreeSnapshot};
