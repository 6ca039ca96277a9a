//! Approval engine — classification, pending state, and timeout defaults.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::channel::ApprovalChannel;
use crate::request::{ApprovalBehavior, ApprovalDecision, PendingApproval, RequestId};

/// Default window for a human to respond.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60);

/// Read-only tools approved without asking. Fixed; not operator-editable.
pub const SAFE_TOOLS: &[&str] = &[
    "Read",
    "Glob",
    "Grep",
    "LS",
    "NotebookRead",
    "WebFetch",
    "WebSearch",
    "TodoRead",
];

/// Whether a tool is in the fixed safe set.
#[must_use]
pub fn is_safe_tool(tool_name: &str) -> bool {
    SAFE_TOOLS.contains(&tool_name)
}

/// Approval configuration, injected by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalConfig {
    /// How long to wait for a human decision before applying the default.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    /// Behavior applied when the window expires.
    #[serde(default = "default_behavior")]
    pub default_behavior: ApprovalBehavior,
    /// Operator-configured tools approved without asking.
    #[serde(default)]
    pub auto_approve: HashSet<String>,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_behavior() -> ApprovalBehavior {
    ApprovalBehavior::Deny
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            default_behavior: ApprovalBehavior::Deny,
            auto_approve: HashSet::new(),
        }
    }
}

/// A stored pending request: its resolver and its timeout timer.
struct PendingEntry {
    request: PendingApproval,
    resolver: oneshot::Sender<ApprovalDecision>,
    timer: JoinHandle<()>,
}

/// The approval engine.
///
/// One instance per process lifetime; clone to share. The pending map is
/// the single resolve-once guard: whichever path (external response or
/// timer) removes an entry first owns its resolution, the loser finds
/// nothing and does nothing.
#[derive(Clone)]
pub struct ApprovalEngine {
    channel: Arc<dyn ApprovalChannel>,
    config: ApprovalConfig,
    pending: Arc<Mutex<HashMap<RequestId, PendingEntry>>>,
}

impl ApprovalEngine {
    /// Create an engine over the given channel.
    #[must_use]
    pub fn new(channel: Arc<dyn ApprovalChannel>, config: ApprovalConfig) -> Self {
        Self {
            channel,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Decide whether `tool_name` may run with `input`.
    ///
    /// Classification order (first match wins):
    ///
    /// 1. fixed safe set → allow, the channel is never involved;
    /// 2. operator auto-approve set → allow;
    /// 3. no `context` → the channel's no-context fallback, nothing stored;
    /// 4. otherwise pending: store, arm the timer, send the prompt.
    ///
    /// The engine never inspects `input`; on approval it is passed through
    /// unchanged as `updated_input`.
    pub async fn request_approval(
        &self,
        tool_name: &str,
        input: Value,
        context: Option<Value>,
    ) -> ApprovalDecision {
        if is_safe_tool(tool_name) {
            tracing::debug!(tool = tool_name, "safe tool, approved without prompt");
            return ApprovalDecision::allow(input);
        }
        if self.config.auto_approve.contains(tool_name) {
            tracing::debug!(tool = tool_name, "auto-approved by configuration");
            return ApprovalDecision::allow(input);
        }
        let Some(context) = context else {
            return self.channel.handle_no_context(tool_name, &input).await;
        };

        let request = PendingApproval::new(tool_name, input, context);
        let id = request.id.clone();
        let (resolver, decision_rx) = oneshot::channel();

        // Insert before sending; the timer task's first action is taking
        // this same lock, so it cannot fire against a missing entry even
        // with a zero timeout.
        {
            let mut pending = self.pending.lock().await;
            let timer = {
                let engine = self.clone();
                let id = id.clone();
                let timeout = self.config.timeout;
                tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    engine.resolve_with_default(&id).await;
                })
            };
            pending.insert(
                id.clone(),
                PendingEntry {
                    request: request.clone(),
                    resolver,
                    timer,
                },
            );
        }

        if let Err(err) = self.channel.send_approval_request(&request).await {
            tracing::warn!(%id, %err, "approval prompt delivery failed");
            match self.pending.lock().await.remove(&id) {
                Some(entry) => {
                    entry.timer.abort();
                    return self.channel.handle_send_failure(&request, &err).await;
                },
                // The timer beat the failing send: the request is already
                // resolved with the default and the decision sits in the
                // oneshot. That resolution wins.
                None => {
                    return match decision_rx.await {
                        Ok(decision) => decision,
                        Err(_) => self.default_decision(
                            request.input,
                            "approval request was dropped without a decision",
                        ),
                    };
                },
            }
        }

        match decision_rx.await {
            Ok(decision) => decision,
            // The sender can only vanish if the engine was dropped while
            // waiting; fall back to the configured default.
            Err(_) => self.default_decision(
                request.input,
                "approval request was dropped without a decision",
            ),
        }
    }

    /// Resolve a pending request with a human verdict.
    ///
    /// Approval passes the stored input through unchanged; denial carries
    /// a message. An unknown or already-resolved id is a silent no-op.
    pub async fn resolve(&self, id: &RequestId, approved: bool) {
        let Some(entry) = self.pending.lock().await.remove(id) else {
            tracing::debug!(%id, "resolution for unknown or already-resolved request");
            return;
        };
        entry.timer.abort();
        let decision = if approved {
            ApprovalDecision::allow(entry.request.input.clone())
        } else {
            ApprovalDecision::deny("denied by user")
        };
        let _ = entry.resolver.send(decision);
    }

    /// Timer path: apply the configured default to a still-pending request.
    async fn resolve_with_default(&self, id: &RequestId) {
        let Some(entry) = self.pending.lock().await.remove(id) else {
            return;
        };
        tracing::debug!(%id, default = %self.config.default_behavior, "approval timed out");
        let message = format!(
            "no response within {}s; default '{}' applied",
            self.config.timeout.as_secs(),
            self.config.default_behavior
        );
        let decision = self.default_decision(entry.request.input.clone(), message);
        let _ = entry.resolver.send(decision);
        self.channel.on_request_timeout(&entry.request).await;
    }

    /// Force-resolve every outstanding request with the configured default
    /// and stop all timers. Call at shutdown; nothing is left pending.
    pub async fn cleanup(&self) {
        let entries: Vec<PendingEntry> = {
            let mut pending = self.pending.lock().await;
            pending.drain().map(|(_, entry)| entry).collect()
        };
        for entry in entries {
            entry.timer.abort();
            let decision = self.default_decision(
                entry.request.input.clone(),
                "approval engine shut down before a decision arrived",
            );
            let _ = entry.resolver.send(decision);
        }
    }

    /// Number of requests currently awaiting a decision.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    fn default_decision(&self, input: Value, message: impl Into<String>) -> ApprovalDecision {
        match self.config.default_behavior {
            ApprovalBehavior::Allow => ApprovalDecision::allow(input).with_message(message),
            ApprovalBehavior::Deny => ApprovalDecision::deny(message),
        }
    }
}

impl std::fmt::Debug for ApprovalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
