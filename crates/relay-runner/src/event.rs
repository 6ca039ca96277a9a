//! Typed view of the agent's streaming JSON protocol.
//!
//! The agent process emits one JSON object per line on stdout,
//! discriminated by a `type` field:
//!
//! ```json
//! {"type":"system","subtype":"init","session_id":"..."}
//! {"type":"assistant","session_id":"...","message":{"content":[...]}}
//! {"type":"user","session_id":"...","message":{"content":[...]}}
//! {"type":"result","subtype":"success","session_id":"...","num_turns":3}
//! ```
//!
//! Unknown `type` values deserialize to [`AgentEvent::Unknown`] and are
//! skipped by the runner; unknown fields inside known events are ignored.

use serde::Deserialize;
use serde_json::Value;

/// One parsed line of the agent stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Lifecycle events; only `subtype == "init"` is meaningful to Relay.
    System(SystemEvent),
    /// An assistant turn: text and/or tool-use requests.
    Assistant(AssistantEvent),
    /// A user-side message carrying tool results.
    User(UserEvent),
    /// Terminal event; exactly one per run on the success path.
    Result(ResultEvent),
    /// Any event type Relay does not understand.
    #[serde(other)]
    Unknown,
}

/// `{"type":"system",...}` event.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemEvent {
    /// Event subtype; `"init"` announces the agent session.
    pub subtype: String,
    /// Agent session id, present on `init`.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl SystemEvent {
    /// Whether this is the session-announcing `init` event.
    #[must_use]
    pub fn is_init(&self) -> bool {
        self.subtype == "init"
    }
}

/// `{"type":"assistant",...}` event.
#[derive(Debug, Clone, Deserialize)]
pub struct AssistantEvent {
    /// Agent session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// The assistant message body.
    pub message: MessageBody,
}

impl AssistantEvent {
    /// All text blocks of the message, concatenated.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.message.content {
            if let ContentBlock::Text { text } = block {
                out.push_str(text);
            }
        }
        out
    }

    /// All tool-use blocks of the message.
    pub fn tool_uses(&self) -> impl Iterator<Item = (&str, &str, &Value)> {
        self.message.content.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => {
                Some((id.as_str(), name.as_str(), input))
            },
            _ => None,
        })
    }
}

/// `{"type":"user",...}` event carrying tool results.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEvent {
    /// Agent session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// The user-side message body.
    pub message: MessageBody,
}

impl UserEvent {
    /// All tool-result blocks of the message.
    pub fn tool_results(&self) -> impl Iterator<Item = &ContentBlock> {
        self.message
            .content
            .iter()
            .filter(|block| matches!(block, ContentBlock::ToolResult { .. }))
    }
}

/// Message body shared by assistant and user events.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageBody {
    /// Ordered content blocks.
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// One content block inside a message.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text {
        /// The text itself.
        text: String,
    },
    /// A tool invocation requested by the assistant.
    ToolUse {
        /// Correlation id echoed back in the matching `tool_result`.
        id: String,
        /// Tool name (e.g. `Bash`, `Read`).
        name: String,
        /// Tool input, opaque to Relay.
        input: Value,
    },
    /// The result of a completed tool invocation.
    ToolResult {
        /// Id of the `tool_use` this result answers.
        tool_use_id: String,
        /// Result payload; a string in the common case.
        #[serde(default)]
        content: Option<Value>,
        /// Set when the tool failed.
        #[serde(default)]
        is_error: Option<bool>,
    },
    /// Any block type Relay does not understand.
    #[serde(other)]
    Unknown,
}

/// `{"type":"result",...}` terminal event.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultEvent {
    /// `"success"` or an `error_*` variant.
    pub subtype: String,
    /// Agent session id.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Number of assistant turns taken.
    #[serde(default)]
    pub num_turns: Option<u64>,
    /// Final result text on success.
    #[serde(default)]
    pub result: Option<String>,
    /// Total cost of the run in USD, when reported.
    #[serde(default)]
    pub total_cost_usd: Option<f64>,
}

impl ResultEvent {
    /// Whether the run completed successfully.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.subtype == "success"
    }
}
