//! Core types shared across the Relay workspace.
//!
//! Relay bridges messaging frontends (Telegram, Discord, …) to a
//! long-running code-assistant subprocess. This crate holds the
//! platform-agnostic building blocks:
//!
//! - [`SessionKey`] / [`AgentSessionId`] — opaque identifiers
//! - [`SessionRegistry`] — session key → agent session mapping with
//!   age-based eviction

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

pub mod registry;
pub mod types;

/// Prelude re-exports for convenient use.
pub mod prelude {
    pub use crate::registry::{SessionRecord, SessionRegistry};
    pub use crate::types::{AgentSessionId, SessionKey};
}

// Re-export key types at crate root for convenience.
pub use registry::{SessionRecord, SessionRegistry};
pub use types::{AgentSessionId, SessionKey};
