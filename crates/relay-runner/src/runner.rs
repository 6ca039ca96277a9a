//! Agent process launcher and stream dispatcher.
//!
//! [`TaskRunner::spawn`] launches the external agent process and drives a
//! background task that reads stdout chunk by chunk, reassembles lines,
//! parses events, and dispatches them to a [`TaskEventHandler`] in stream
//! order. Stderr is forwarded verbatim. A per-task timeout escalates from
//! SIGTERM to a forced kill after a grace period.
//!
//! Callback guarantees:
//!
//! - within one task, events fire in line order, never reordered;
//! - `on_timeout` fires at most once, only on the timeout path;
//! - `on_close` fires exactly once when the process actually exits,
//!   whatever the cause;
//! - `on_error` fires on spawn failure, stream I/O failure, or a nonzero
//!   exit with no terminal `result` event.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::command::AgentCommand;
use crate::error::{RunnerError, RunnerResult};
use crate::event::{AgentEvent, ResultEvent, SystemEvent, UserEvent};
use crate::handle::TaskHandle;
use crate::parse::{parse_line, LineBuffer};

/// Default per-task timeout (5 minutes).
const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Default grace period between SIGTERM and the forced kill.
const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Runner configuration, injected by the host.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Overall timeout for one task; the timer starts at spawn and is
    /// cleared by a terminal `result` event or an explicit kill.
    #[serde(default = "default_task_timeout")]
    pub task_timeout: Duration,
    /// How long to wait after the graceful termination signal before
    /// force-killing the process.
    #[serde(default = "default_grace_period")]
    pub grace_period: Duration,
}

fn default_task_timeout() -> Duration {
    DEFAULT_TASK_TIMEOUT
}

fn default_grace_period() -> Duration {
    DEFAULT_GRACE_PERIOD
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            task_timeout: DEFAULT_TASK_TIMEOUT,
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// Receives the parsed event stream of one task.
///
/// All methods default to no-ops so handlers implement only what they
/// need. One handler instance observes exactly one task.
#[async_trait]
pub trait TaskEventHandler: Send + Sync {
    /// The agent announced its session (`system`/`init`).
    async fn on_init(&self, event: SystemEvent) {
        let _ = event;
    }

    /// An assistant turn arrived (text and/or tool-use requests).
    async fn on_assistant(&self, event: crate::event::AssistantEvent) {
        let _ = event;
    }

    /// A tool result arrived on the user side of the transcript.
    async fn on_tool_result(&self, event: UserEvent) {
        let _ = event;
    }

    /// The terminal `result` event arrived. Fires at most once.
    async fn on_result(&self, event: ResultEvent) {
        let _ = event;
    }

    /// A raw stderr line from the process. Informational only.
    async fn on_stderr(&self, line: String) {
        let _ = line;
    }

    /// The per-task timeout expired; termination is underway.
    async fn on_timeout(&self) {}

    /// The process exited. Fires exactly once per task.
    async fn on_close(&self, exit_code: i32) {
        let _ = exit_code;
    }

    /// Spawn failure, stream I/O failure, or abnormal exit.
    async fn on_error(&self, error: &RunnerError) {
        let _ = error;
    }
}

/// Launches agent processes and wires their streams to handlers.
#[derive(Debug, Clone, Default)]
pub struct TaskRunner {
    config: RunnerConfig,
}

impl TaskRunner {
    /// Create a runner with the given configuration.
    #[must_use]
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Spawn the agent process and start streaming events to `handler`.
    ///
    /// Returns immediately with a [`TaskHandle`]; all parsing happens on a
    /// background task. On spawn failure the error is reported to
    /// `handler.on_error` and returned.
    pub async fn spawn(
        &self,
        command: &AgentCommand,
        handler: Arc<dyn TaskEventHandler>,
    ) -> RunnerResult<TaskHandle> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.cwd {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                let err = RunnerError::Spawn(err);
                tracing::warn!(program = %command.program, %err, "agent spawn failed");
                handler.on_error(&err).await;
                return Err(err);
            },
        };
        let pid = child.id();
        tracing::debug!(program = %command.program, ?pid, "agent process spawned");

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let err = RunnerError::Spawn(std::io::Error::other("stdout not captured"));
                handler.on_error(&err).await;
                return Err(err);
            },
        };

        // Stderr is forwarded on its own task; it is informational and must
        // never block or stop the main stream.
        if let Some(stderr) = child.stderr.take() {
            let stderr_handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    stderr_handler.on_stderr(line).await;
                }
            });
        }

        let cancel = CancellationToken::new();
        let handle = TaskHandle::new(cancel.clone(), pid);
        let config = self.config.clone();
        tokio::spawn(run_loop(child, stdout, handler, config, cancel));

        Ok(handle)
    }
}

/// Reads stdout until EOF or termination, then reaps the process.
async fn run_loop(
    mut child: Child,
    mut stdout: tokio::process::ChildStdout,
    handler: Arc<dyn TaskEventHandler>,
    config: RunnerConfig,
    cancel: CancellationToken,
) {
    let mut line_buf = LineBuffer::new();
    let mut chunk = [0u8; 8192];
    let mut terminal_seen = false;
    let mut kill_initiated = false;

    let deadline = tokio::time::sleep(config.task_timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            read = stdout.read(&mut chunk) => match read {
                Ok(0) => break,
                Ok(n) => {
                    for line in line_buf.push(&chunk[..n]) {
                        let Some(event) = parse_line(&line) else {
                            continue;
                        };
                        if dispatch(handler.as_ref(), event).await {
                            terminal_seen = true;
                        }
                    }
                },
                Err(err) => {
                    handler.on_error(&RunnerError::Io(err)).await;
                    break;
                },
            },
            // The per-task timer is disarmed once a terminal event arrived.
            () = &mut deadline, if !terminal_seen && !kill_initiated => {
                kill_initiated = true;
                tracing::warn!(pid = ?child.id(), "task timeout expired, terminating agent");
                handler.on_timeout().await;
                terminate(&mut child, config.grace_period).await;
                break;
            },
            () = cancel.cancelled(), if !kill_initiated => {
                kill_initiated = true;
                tracing::debug!(pid = ?child.id(), "kill requested, terminating agent");
                terminate(&mut child, config.grace_period).await;
                break;
            },
        }
    }

    // Unterminated tail in `line_buf` is dropped here, by design of the
    // stream protocol: only newline-terminated lines are events.
    if line_buf.pending_len() > 0 {
        tracing::debug!(
            pending = line_buf.pending_len(),
            "dropping unterminated trailing line at stream end"
        );
    }

    // Stdout EOF does not mean the process exited: a child can close its
    // stdout and keep running. The timeout and kill stay armed until the
    // process is actually gone.
    let status = loop {
        if kill_initiated {
            break child.wait().await;
        }
        let timed_out = tokio::select! {
            status = child.wait() => break status,
            () = &mut deadline, if !terminal_seen => true,
            () = cancel.cancelled() => false,
        };
        kill_initiated = true;
        if timed_out {
            tracing::warn!(pid = ?child.id(), "task timeout expired, terminating agent");
            handler.on_timeout().await;
        } else {
            tracing::debug!(pid = ?child.id(), "kill requested, terminating agent");
        }
        terminate(&mut child, config.grace_period).await;
    };

    let exit_code = match status {
        Ok(status) => status.code().unwrap_or(-1),
        Err(err) => {
            handler.on_error(&RunnerError::Io(err)).await;
            -1
        },
    };

    if !terminal_seen && !kill_initiated && exit_code != 0 {
        handler.on_error(&RunnerError::AbnormalExit(exit_code)).await;
    }

    handler.on_close(exit_code).await;
}

/// Dispatch one event; returns `true` when it was the terminal event.
async fn dispatch(handler: &dyn TaskEventHandler, event: AgentEvent) -> bool {
    match event {
        AgentEvent::System(ev) if ev.is_init() => {
            handler.on_init(ev).await;
            false
        },
        // Non-init system events carry nothing Relay consumes.
        AgentEvent::System(_) | AgentEvent::Unknown => false,
        AgentEvent::Assistant(ev) => {
            handler.on_assistant(ev).await;
            false
        },
        AgentEvent::User(ev) => {
            handler.on_tool_result(ev).await;
            false
        },
        AgentEvent::Result(ev) => {
            handler.on_result(ev).await;
            true
        },
    }
}

/// Graceful-then-forceful termination: SIGTERM, wait the grace period,
/// then a hard kill.
async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Ok(raw) = i32::try_from(pid) {
            if let Err(err) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
                tracing::warn!(pid, %err, "SIGTERM failed");
            }
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(_)) => return,
                Ok(Err(err)) => {
                    tracing::warn!(pid, %err, "wait failed after SIGTERM");
                },
                Err(_) => {
                    tracing::warn!(pid, "agent did not exit within grace period, force killing");
                },
            }
        }
    }

    if let Err(err) = child.kill().await {
        tracing::debug!(%err, "force kill failed (process may have already exited)");
    }
}
