//! Helpers shared by every Relay messaging frontend.
//!
//! Currently this is result truncation: each chat platform caps message
//! length, and agent output routinely blows past those caps. [`truncate`]
//! bounds the text to the platform's limit and persists the full output
//! to disk so nothing is lost.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]

pub mod truncate;

pub use truncate::{bound_and_persist, platform_limit, BoundedOutput, FULL_OUTPUT_FILE};
