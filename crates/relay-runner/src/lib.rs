//! Agent subprocess orchestration for Relay.
//!
//! This crate owns the lifecycle of the external code-assistant process:
//!
//! - [`AgentCommand`] — opaque, pre-built command specification
//! - [`TaskRunner`] — spawns the process and parses its newline-delimited
//!   JSON event stream into [`TaskEventHandler`] callbacks
//! - [`TaskHandle`] — idempotent kill handle for a running task
//! - [`TaskGuard`] — per-session-key single-flight enforcement with
//!   preemption
//!
//! The stream protocol and callback guarantees are documented on
//! [`TaskRunner::spawn`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

pub mod command;
pub mod error;
pub mod event;
pub mod guard;
pub mod handle;
pub mod parse;
pub mod runner;

/// Prelude re-exports for convenient use.
pub mod prelude {
    pub use crate::command::AgentCommand;
    pub use crate::error::{RunnerError, RunnerResult};
    pub use crate::event::{
        AgentEvent, AssistantEvent, ContentBlock, ResultEvent, SystemEvent, UserEvent,
    };
    pub use crate::guard::{Reservation, TaskGuard};
    pub use crate::handle::TaskHandle;
    pub use crate::runner::{RunnerConfig, TaskEventHandler, TaskRunner};
}

// Re-export key types at crate root for convenience.
pub use command::AgentCommand;
pub use error::RunnerError;
pub use guard::{Reservation, TaskGuard};
pub use handle::TaskHandle;
pub use runner::{RunnerConfig, TaskEventHandler, TaskRunner};
