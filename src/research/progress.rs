//! Progress accounting and status events.
//!
//! Progress is a session-local percentage: monotonically non-decreasing,
//! saturating at 100. Every emission carries the current tree snapshot so a
//! client can render progress against the live research tree, not just a
//! number.

use crate::research::tree::TreeSnapshot;
use crate::types::ResearchReport;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One event on the session status stream.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatusEvent {
    /// Work advanced; includes the live tree.
    Progress {
        /// Current percentage, 0..=100.
        progress: u8,
        /// Human-readable description of the current unit of work.
        message: String,
        /// Snapshot of the research tree at emission time.
        research_tree: TreeSnapshot,
    },
    /// Terminal: research finished and produced a report.
    Complete {
        /// The assembled report.
        report: Box<ResearchReport>,
    },
    /// Terminal: the session was cancelled before completion.
    Cancelled,
    /// Terminal: the session failed fatally.
    Error {
        /// Failure description.
        message: String,
    },
}

/// Monotonic, saturating progress counter bound to a session event channel.
pub struct ProgressReporter {
    value: u8,
    tx: mpsc::Sender<StatusEvent>,
    cancel: CancellationToken,
}

impl ProgressReporter {
    /// Create a reporter starting at 0.
    ///
    /// A failed emission (receiver dropped, i.e. the client went away)
    /// cancels `cancel` so the engine unwinds at its next suspension point.
    pub fn new(tx: mpsc::Sender<StatusEvent>, cancel: CancellationToken) -> Self {
        Self {
            value: 0,
            tx,
            cancel,
        }
    }

    /// Current progress value.
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Reset to 0 at the start of a research run.
    pub fn reset(&mut self) {
        self.value = 0;
    }

    /// Add `delta` to the running progress, clamped at 100, and emit.
    pub async fn update(&mut self, delta: u8, message: &str, tree: TreeSnapshot) {
        self.value = self.value.saturating_add(delta).min(100);
        self.emit(message, tree).await;
    }

    /// Clamp-set progress to `value` and emit. Never decreases the value.
    pub async fn set(&mut self, value: u8, message: &str, tree: TreeSnapshot) {
        self.value = self.value.max(value.min(100));
        self.emit(message, tree).await;
    }

    /// Push a terminal event onto the stream.
    pub async fn finish(&self, event: StatusEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("status receiver dropped before terminal event");
        }
    }

    async fn emit(&self, message: &str, tree: TreeSnapshot) {
        let event = StatusEvent::Progress {
            progress: self.value,
            message: message.to_string(),
            research_tree: tree,
        };
        if self.tx.send(event).await.is_err() {
            tracing::info!("status receiver dropped, cancelling session");
            self.cancel.cancel();
        }
    }
}
