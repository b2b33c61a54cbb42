//! Session lifecycle: one engine run + one exclusively-owned retrieval
//! client per session id.
//!
//! The registry is the only process-wide mutable state. The lock guards map
//! operations only and is never held across an await; closing a retrieval
//! client happens in the caller after the entry has been removed.

use crate::scrape::ContentRetriever;
use crate::types::{AppError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct SessionHandle {
    cancel: CancellationToken,
    retriever: Arc<dyn ContentRetriever>,
}

/// Process-wide map of in-flight research sessions.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. A session id maps to exactly one in-flight run;
    /// re-registering a live id is rejected.
    pub fn register(
        &self,
        id: &str,
        cancel: CancellationToken,
        retriever: Arc<dyn ContentRetriever>,
    ) -> Result<()> {
        let mut sessions = self.inner.lock();
        if sessions.contains_key(id) {
            return Err(AppError::InvalidInput(format!(
                "session {} already has research in flight",
                id
            )));
        }
        sessions.insert(
            id.to_string(),
            SessionHandle { cancel, retriever },
        );
        tracing::info!(session = id, active = sessions.len(), "session registered");
        Ok(())
    }

    /// Cancel a session and remove it, handing back its retrieval client so
    /// the caller can close it outside the lock.
    pub fn abort(&self, id: &str) -> Option<Arc<dyn ContentRetriever>> {
        let handle = self.inner.lock().remove(id)?;
        handle.cancel.cancel();
        tracing::info!(session = id, "session aborted");
        Some(handle.retriever)
    }

    /// Deregister a finished session, handing back its retrieval client for
    /// teardown.
    pub fn remove(&self, id: &str) -> Option<Arc<dyn ContentRetriever>> {
        let handle = self.inner.lock().remove(id)?;
        Some(handle.retriever)
    }

    /// Whether a session is currently registered.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.lock().contains_key(id)
    }

    /// Number of in-flight sessions.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when no sessions are in flight.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
