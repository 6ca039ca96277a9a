//! Human-in-the-loop tool approval for Relay.
//!
//! The [`ApprovalEngine`] coordinates between:
//! - a fixed safe set of read-only tools (approved without asking),
//! - an operator-configured auto-approve set,
//! - the [`ApprovalChannel`] trait (messaging-surface implementations),
//! - a pending-request map with per-request timeout defaults.
//!
//! # Approval Flow
//!
//! 1. Safe-set tool → immediate allow, no channel involved
//! 2. Auto-approve tool → immediate allow
//! 3. No context → delegate to the channel's no-context fallback
//! 4. Otherwise store a [`PendingApproval`], start its timer, and send
//!    the request through the channel
//! 5. First of {external response, timeout} wins; the entry is removed
//!    either way

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

pub mod channel;
pub mod engine;
pub mod request;

/// Prelude re-exports for convenient use.
pub mod prelude {
    pub use crate::channel::{ApprovalChannel, ChannelError};
    pub use crate::engine::{is_safe_tool, ApprovalConfig, ApprovalEngine, SAFE_TOOLS};
    pub use crate::request::{ApprovalBehavior, ApprovalDecision, PendingApproval, RequestId};
}

// Re-export key types at crate root for convenience.
pub use channel::{ApprovalChannel, ChannelError};
pub use engine::{is_safe_tool, ApprovalConfig, ApprovalEngine, SAFE_TOOLS};
pub use request::{ApprovalBehavior, ApprovalDecision, PendingApproval, RequestId};
