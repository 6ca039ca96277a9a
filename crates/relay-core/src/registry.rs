//! Session registry: [`SessionKey`] → last known agent session.
//!
//! Frontends consult the registry before launching a run to decide whether
//! to resume an existing agent session; the runner's `init` and `result`
//! events refresh it. Records are evicted by an age-based sweep so a
//! long-lived bridge does not accumulate dead conversations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::types::{AgentSessionId, SessionKey};

/// One registry entry: the last agent session seen for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// The conversation key this record belongs to.
    pub key: SessionKey,
    /// Agent session id reported by the external process.
    pub agent_session_id: AgentSessionId,
    /// Free-form label describing the conversation context (chat title,
    /// channel name, …). Informational only.
    pub context_label: String,
    /// Last time this record was written.
    pub last_used: DateTime<Utc>,
}

/// Maps session keys to the last known agent session.
///
/// Cloning shares the underlying state (`Arc`), so one registry can be
/// handed to the runner's event handler and to the frontend.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<SessionKey, SessionRecord>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the record for a key, if one exists.
    pub async fn get(&self, key: &SessionKey) -> Option<SessionRecord> {
        self.inner.read().await.get(key).cloned()
    }

    /// Get just the agent session id for a key, if one exists.
    pub async fn get_agent_session_id(&self, key: &SessionKey) -> Option<AgentSessionId> {
        self.inner
            .read()
            .await
            .get(key)
            .map(|r| r.agent_session_id.clone())
    }

    /// Upsert the record for a key, refreshing its `last_used` timestamp.
    ///
    /// Callers feed ids in stream order, so a `set` always carries the
    /// newest id for the key; the previous id is overwritten, never merged.
    pub async fn set(
        &self,
        key: SessionKey,
        agent_session_id: AgentSessionId,
        context_label: impl Into<String>,
    ) {
        let record = SessionRecord {
            key: key.clone(),
            agent_session_id,
            context_label: context_label.into(),
            last_used: Utc::now(),
        };
        self.inner.write().await.insert(key, record);
    }

    /// Remove the record for a key, returning it if present.
    pub async fn clear(&self, key: &SessionKey) -> Option<SessionRecord> {
        self.inner.write().await.remove(key)
    }

    /// Evict every record whose `last_used` is older than `max_age`.
    ///
    /// Returns the number of evicted records. Call periodically from a
    /// maintenance task.
    pub async fn evict_older_than(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(max_age).unwrap_or_else(|_| chrono::Duration::max_value());
        let mut guard = self.inner.write().await;
        let before = guard.len();
        guard.retain(|_, record| record.last_used >= cutoff);
        let evicted = before.saturating_sub(guard.len());
        if evicted > 0 {
            tracing::debug!(evicted, "evicted stale session records");
        }
        evicted
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the registry holds no records.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry").finish_non_exhaustive()
    }
}
