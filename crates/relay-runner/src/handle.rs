//! Kill handle for a running agent task.

use tokio_util::sync::CancellationToken;

/// Handle to a spawned agent task.
///
/// Cloning shares the same underlying task. [`TaskHandle::kill`] only
/// requests termination — the process is gone once the handler's
/// `on_close` fires.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    cancel: CancellationToken,
    pid: Option<u32>,
}

impl TaskHandle {
    pub(crate) fn new(cancel: CancellationToken, pid: Option<u32>) -> Self {
        Self { cancel, pid }
    }

    /// Request termination of the task.
    ///
    /// Idempotent: repeated calls, or calls after the process already
    /// exited, are no-ops and never double-fire callbacks.
    pub fn kill(&self) {
        self.cancel.cancel();
    }

    /// Whether a kill has been requested.
    #[must_use]
    pub fn kill_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// OS process id, when the platform reported one at spawn.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_is_idempotent() {
        let handle = TaskHandle::new(CancellationToken::new(), Some(123));
        assert!(!handle.kill_requested());
        handle.kill();
        handle.kill();
        handle.kill();
        assert!(handle.kill_requested());
        assert_eq!(handle.pid(), Some(123));
    }

    #[test]
    fn clones_share_the_kill_state() {
        let handle = TaskHandle::new(CancellationToken::new(), None);
        let clone = handle.clone();
        clone.kill();
        assert!(handle.kill_requested());
    }
}
