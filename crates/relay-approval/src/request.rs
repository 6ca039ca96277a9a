//! Approval request and decision types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an approval request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// A tool invocation awaiting a human decision.
///
/// Exists only between request and resolution/timeout. The `input` and
/// `context` payloads are opaque to the engine: `input` is whatever the
/// agent proposed, `context` is whatever the frontend needs to route the
/// prompt (chat id, thread id, …) and to authorize the responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingApproval {
    /// Unique request identifier.
    pub id: RequestId,
    /// Name of the tool the agent wants to run.
    pub tool_name: String,
    /// Proposed tool input, passed through unchanged on approval.
    pub input: Value,
    /// Frontend routing/authorization context.
    pub context: Value,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
}

impl PendingApproval {
    /// Create a new pending approval with a fresh id.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, input: Value, context: Value) -> Self {
        Self {
            id: RequestId::new(),
            tool_name: tool_name.into(),
            input,
            context,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for PendingApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.tool_name)
    }
}

/// Whether a decision lets the tool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalBehavior {
    /// Let the tool run.
    Allow,
    /// Block the tool.
    Deny,
}

impl fmt::Display for ApprovalBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Deny => write!(f, "deny"),
        }
    }
}

/// The decision produced for one [`PendingApproval`], exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// Allow or deny.
    pub behavior: ApprovalBehavior,
    /// On allow: the input to run with (the original, passed through).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,
    /// On deny (and on timeout defaults): why.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApprovalDecision {
    /// An allow decision passing `input` through unchanged.
    #[must_use]
    pub fn allow(input: Value) -> Self {
        Self {
            behavior: ApprovalBehavior::Allow,
            updated_input: Some(input),
            message: None,
        }
    }

    /// A deny decision with a reason.
    #[must_use]
    pub fn deny(message: impl Into<String>) -> Self {
        Self {
            behavior: ApprovalBehavior::Deny,
            updated_input: None,
            message: Some(message.into()),
        }
    }

    /// Attach a message to the decision.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Whether the tool may run.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.behavior == ApprovalBehavior::Allow
    }
}

impl fmt::Display for ApprovalDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.behavior),
            None => write!(f, "{}", self.behavior),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_ids_are_unique() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2);
        assert!(id1.to_string().starts_with("req:"));
    }

    #[test]
    fn pending_approval_carries_opaque_payloads() {
        let pending = PendingApproval::new(
            "Bash",
            json!({"command": "rm -rf build/"}),
            json!({"chat_id": 42}),
        );
        assert_eq!(pending.tool_name, "Bash");
        assert_eq!(pending.input["command"], "rm -rf build/");
        assert_eq!(pending.context["chat_id"], 42);
    }

    #[test]
    fn allow_passes_input_through() {
        let input = json!({"file_path": "/etc/hosts"});
        let decision = ApprovalDecision::allow(input.clone());
        assert!(decision.is_allowed());
        assert_eq!(decision.updated_input, Some(input));
        assert!(decision.message.is_none());
    }

    #[test]
    fn deny_carries_message() {
        let decision = ApprovalDecision::deny("denied by user");
        assert!(!decision.is_allowed());
        assert!(decision.updated_input.is_none());
        assert_eq!(decision.message.as_deref(), Some("denied by user"));
    }

    #[test]
    fn decision_display() {
        assert_eq!(ApprovalDecision::deny("nope").to_string(), "deny: nope");
        assert_eq!(ApprovalDecision::allow(json!({})).to_string(), "allow");
    }

    #[test]
    fn behavior_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ApprovalBehavior::Allow).unwrap(),
            "\"allow\""
        );
        assert_eq!(
            serde_json::to_string(&ApprovalBehavior::Deny).unwrap(),
            "\"deny\""
        );
    }

    #[test]
    fn decision_roundtrips_through_json() {
        let decision = ApprovalDecision::allow(json!({"x": 1}));
        let json = serde_json::to_string(&decision).unwrap();
        let back: ApprovalDecision = serde_json::from_str(&json).unwrap();
        assert!(back.is_allowed());
        assert_eq!(back.updated_input, Some(json!({"x": 1})));
    }
}
