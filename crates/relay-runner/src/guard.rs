//! Per-session single-flight guard with preemption.
//!
//! At most one agent task may be in flight per [`SessionKey`]. A new
//! reservation for a key preempts (kills) whatever was running there.
//! Because spawning is asynchronous, a reservation exists before the
//! [`TaskHandle`] does; `attach` fills it in later. Every slot carries a
//! generation so a stale `release` or `attach` racing a newer `reserve`
//! is a no-op.

use std::collections::HashMap;
use std::sync::Arc;

use relay_core::SessionKey;
use tokio::sync::Mutex;

use crate::handle::TaskHandle;

/// Proof of a reservation for one key at one generation.
///
/// Pass it back to [`TaskGuard::attach`] and [`TaskGuard::release`]; the
/// guard ignores both if a newer reservation has replaced this one.
#[derive(Debug, Clone)]
pub struct Reservation {
    key: SessionKey,
    generation: u64,
}

impl Reservation {
    /// The key this reservation covers.
    #[must_use]
    pub fn key(&self) -> &SessionKey {
        &self.key
    }
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    handle: Option<TaskHandle>,
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<SessionKey, Slot>,
    next_generation: u64,
}

/// Enforces at most one in-flight task per session key.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct TaskGuard {
    inner: Arc<Mutex<Inner>>,
}

impl TaskGuard {
    /// Create an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the slot for `key`, preempting any live task.
    ///
    /// If a handle is already attached for the key, its `kill()` is called
    /// before the slot is replaced — unconditionally, even when the racing
    /// caller did not intend an interrupt (documented current behavior).
    /// `is_active` reports `true` from this call on, closing the window
    /// between reserve and the eventual `attach`.
    pub async fn reserve(&self, key: SessionKey) -> Reservation {
        let mut inner = self.inner.lock().await;
        if let Some(slot) = inner.slots.get(&key) {
            if let Some(handle) = &slot.handle {
                tracing::debug!(key = %key, "preempting in-flight task");
                handle.kill();
            }
        }
        inner.next_generation = inner.next_generation.wrapping_add(1);
        let generation = inner.next_generation;
        inner.slots.insert(
            key.clone(),
            Slot {
                generation,
                handle: None,
            },
        );
        Reservation { key, generation }
    }

    /// Attach the spawned handle to its reservation.
    ///
    /// If a newer reservation has taken the slot, the late handle is
    /// killed instead of attached — its task was already preempted.
    pub async fn attach(&self, reservation: &Reservation, handle: TaskHandle) {
        let mut inner = self.inner.lock().await;
        match inner.slots.get_mut(&reservation.key) {
            Some(slot) if slot.generation == reservation.generation => {
                slot.handle = Some(handle);
            },
            _ => {
                tracing::debug!(key = %reservation.key, "stale attach, killing late handle");
                handle.kill();
            },
        }
    }

    /// Release the slot, but only if this reservation still owns it.
    ///
    /// Called from terminal callbacks (result/error/timeout/close). A
    /// release racing a newer `reserve` for the same key is a no-op.
    pub async fn release(&self, reservation: &Reservation) {
        let mut inner = self.inner.lock().await;
        if let Some(slot) = inner.slots.get(&reservation.key) {
            if slot.generation == reservation.generation {
                inner.slots.remove(&reservation.key);
            }
        }
    }

    /// Whether a task is reserved or running for `key`.
    pub async fn is_active(&self, key: &SessionKey) -> bool {
        self.inner.lock().await.slots.contains_key(key)
    }

    /// Number of reserved or running slots.
    pub async fn active_count(&self) -> usize {
        self.inner.lock().await.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn key(s: &str) -> SessionKey {
        SessionKey::new(s)
    }

    fn handle() -> TaskHandle {
        TaskHandle::new(CancellationToken::new(), None)
    }

    #[tokio::test]
    async fn reserve_marks_key_active_before_attach() {
        let guard = TaskGuard::new();
        assert!(!guard.is_active(&key("k1")).await);

        let reservation = guard.reserve(key("k1")).await;
        assert!(guard.is_active(&key("k1")).await);

        guard.attach(&reservation, handle()).await;
        assert!(guard.is_active(&key("k1")).await);
    }

    #[tokio::test]
    async fn release_clears_the_slot() {
        let guard = TaskGuard::new();
        let reservation = guard.reserve(key("k1")).await;
        guard.attach(&reservation, handle()).await;

        guard.release(&reservation).await;
        assert!(!guard.is_active(&key("k1")).await);
    }

    #[tokio::test]
    async fn second_reserve_kills_exactly_the_first_handle() {
        let guard = TaskGuard::new();

        let r1 = guard.reserve(key("k1")).await;
        let h1 = handle();
        guard.attach(&r1, h1.clone()).await;

        // Key stays continuously active across the preemption.
        assert!(guard.is_active(&key("k1")).await);
        let r2 = guard.reserve(key("k1")).await;
        assert!(guard.is_active(&key("k1")).await);

        let h2 = handle();
        guard.attach(&r2, h2.clone()).await;

        assert!(h1.kill_requested());
        assert!(!h2.kill_requested());
    }

    #[tokio::test]
    async fn reserve_without_attached_handle_does_not_panic() {
        let guard = TaskGuard::new();
        let _r1 = guard.reserve(key("k1")).await;
        // Preempt before the first spawn completed; no handle to kill.
        let r2 = guard.reserve(key("k1")).await;
        guard.attach(&r2, handle()).await;
        assert!(guard.is_active(&key("k1")).await);
    }

    #[tokio::test]
    async fn stale_release_is_a_noop() {
        let guard = TaskGuard::new();
        let r1 = guard.reserve(key("k1")).await;
        guard.attach(&r1, handle()).await;

        // Newer reservation takes over the key.
        let r2 = guard.reserve(key("k1")).await;
        let h2 = handle();
        guard.attach(&r2, h2.clone()).await;

        // The terminal callback of the preempted task arrives late.
        guard.release(&r1).await;
        assert!(guard.is_active(&key("k1")).await, "newer slot must survive");
        assert!(!h2.kill_requested());

        guard.release(&r2).await;
        assert!(!guard.is_active(&key("k1")).await);
    }

    #[tokio::test]
    async fn stale_attach_kills_the_late_handle() {
        let guard = TaskGuard::new();
        let r1 = guard.reserve(key("k1")).await;
        let _r2 = guard.reserve(key("k1")).await;

        let late = handle();
        guard.attach(&r1, late.clone()).await;
        assert!(late.kill_requested());
    }

    #[tokio::test]
    async fn attach_after_release_kills_the_handle() {
        let guard = TaskGuard::new();
        let r1 = guard.reserve(key("k1")).await;
        guard.release(&r1).await;

        let late = handle();
        guard.attach(&r1, late.clone()).await;
        assert!(late.kill_requested());
        assert!(!guard.is_active(&key("k1")).await);
    }

    #[tokio::test]
    async fn different_keys_are_independent() {
        let guard = TaskGuard::new();
        let r1 = guard.reserve(key("a")).await;
        let h1 = handle();
        guard.attach(&r1, h1.clone()).await;

        let r2 = guard.reserve(key("b")).await;
        guard.attach(&r2, handle()).await;

        assert!(!h1.kill_requested());
        assert_eq!(guard.active_count().await, 2);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let guard1 = TaskGuard::new();
        let guard2 = guard1.clone();
        let _r = guard1.reserve(key("k")).await;
        assert!(guard2.is_active(&key("k")).await);
    }

    #[tokio::test]
    async fn concurrent_reserves_leave_one_live_slot() {
        let guard = TaskGuard::new();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let g = guard.clone();
            handles.push(tokio::spawn(async move {
                let r = g.reserve(key("k")).await;
                g.attach(&r, TaskHandle::new(CancellationToken::new(), None))
                    .await;
                r
            }));
        }
        let reservations: Vec<Reservation> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        // Whatever the interleaving, exactly one slot remains.
        assert_eq!(guard.active_count().await, 1);

        // Releasing every reservation clears it; stale ones are no-ops.
        for r in &reservations {
            guard.release(r).await;
        }
        assert_eq!(guard.active_count().await, 0);
    }
}
