//! The approval channel trait — one capability interface per messaging
//! surface.
//!
//! Each frontend (Telegram, Discord, …) supplies one implementation,
//! selected at startup. The channel renders the pending approval on its
//! medium and later calls [`crate::ApprovalEngine::resolve`] with the
//! request id and the human's verdict; it alone verifies that the
//! responder is authorized for the request's context.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::request::{ApprovalDecision, PendingApproval};

/// Failure to deliver an approval prompt to the messaging surface.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The prompt could not be delivered.
    #[error("approval prompt delivery failed: {0}")]
    Delivery(String),

    /// The surface is not connected.
    #[error("approval channel unavailable")]
    Unavailable,
}

/// Messaging-surface collaborator for the approval flow.
///
/// Only `send_approval_request` is required; the fallbacks have safe
/// denying defaults.
#[async_trait]
pub trait ApprovalChannel: Send + Sync {
    /// Present the pending approval on the channel's medium.
    ///
    /// Resolution arrives later via [`crate::ApprovalEngine::resolve`];
    /// this call only delivers the prompt.
    async fn send_approval_request(&self, pending: &PendingApproval) -> Result<(), ChannelError>;

    /// Decide a request that carries no routing context.
    ///
    /// With nowhere to send a prompt, the default is to deny.
    async fn handle_no_context(&self, tool_name: &str, input: &Value) -> ApprovalDecision {
        let _ = input;
        ApprovalDecision::deny(format!(
            "no approval context available for tool '{tool_name}'"
        ))
    }

    /// Decide a request whose prompt could not be delivered.
    async fn handle_send_failure(
        &self,
        pending: &PendingApproval,
        error: &ChannelError,
    ) -> ApprovalDecision {
        ApprovalDecision::deny(format!(
            "approval prompt for '{}' could not be delivered: {error}",
            pending.tool_name
        ))
    }

    /// The request timed out and was resolved with the configured default.
    ///
    /// Gives the frontend a chance to withdraw or annotate its now-stale
    /// prompt. Default: no-op.
    async fn on_request_timeout(&self, pending: &PendingApproval) {
        let _ = pending;
    }
}
