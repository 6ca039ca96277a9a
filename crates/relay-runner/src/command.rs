//! Opaque agent command specification.
//!
//! Relay never builds the external command line itself — the host hands it
//! a ready-to-execute specification. The runner only turns it into a
//! `tokio::process::Command`.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A pre-built, ready-to-execute agent command.
///
/// When run, the program is expected to emit the newline-delimited JSON
/// event protocol on stdout (see [`crate::event`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCommand {
    /// Program to execute.
    pub program: String,
    /// Arguments, already in final form.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the child.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Working directory; inherits the parent's when `None`.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl AgentCommand {
    /// Create a command with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}
