//! Runner error type.

use thiserror::Error;

/// Errors raised while launching or observing the agent process.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The process could not be spawned.
    #[error("failed to spawn agent process: {0}")]
    Spawn(#[source] std::io::Error),

    /// Reading the process's output streams failed.
    #[error("agent stream I/O error: {0}")]
    Io(#[source] std::io::Error),

    /// The process exited nonzero without emitting a terminal result event.
    #[error("agent exited with code {0} before reporting a result")]
    AbnormalExit(i32),
}

/// Convenience alias for results using [`RunnerError`].
pub type RunnerResult<T> = Result<T, RunnerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_abnormal_exit() {
        let err = RunnerError::AbnormalExit(7);
        assert_eq!(
            err.to_string(),
            "agent exited with code 7 before reporting a result"
        );
    }

    #[test]
    fn error_display_spawn() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = RunnerError::Spawn(io);
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RunnerError>();
    }
}
