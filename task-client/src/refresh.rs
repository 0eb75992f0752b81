//! Single-flight coordination of access-token refreshes.
//!
//! When several requests are rejected with 401 at once, only the first one
//! (the leader) calls `/auth/refresh`. Everyone else parks on a oneshot
//! channel until the leader calls [`RefreshCoordinator::resolve_all`].

use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

/// Why a refresh produced no token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    /// The server or transport rejected the refresh.
    Rejected(String),
    /// The leader went away without resolving.
    Cancelled,
}

/// New access token, or the reason there is none.
pub type RefreshOutcome = Result<String, RefreshFailure>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    pending: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Owned refresh state: an in-progress flag plus the queue of waiters.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

/// What a rejected request should do next.
pub enum RefreshTicket<'a> {
    /// Perform the refresh, then resolve through the guard.
    Leader(RefreshGuard<'a>),
    /// Wait for the leader's outcome.
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        // State stays consistent even if a holder panicked; nothing awaits under the lock.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Become the leader if no refresh is running, otherwise join the queue.
    pub fn enqueue_or_trigger(&self) -> RefreshTicket<'_> {
        let mut state = self.lock();
        if state.refreshing {
            let (tx, rx) = oneshot::channel();
            state.pending.push(tx);
            RefreshTicket::Waiter(rx)
        } else {
            state.refreshing = true;
            RefreshTicket::Leader(RefreshGuard {
                coordinator: self,
                resolved: false,
            })
        }
    }

    /// Clear the flag and hand `outcome` to every queued waiter. Returns how
    /// many were released.
    pub fn resolve_all(&self, outcome: RefreshOutcome) -> usize {
        let pending = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.pending)
        };

        let released = pending.len();
        for waiter in pending {
            // A waiter whose request was dropped is not an error.
            let _ = waiter.send(outcome.clone());
        }
        released
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}

/// Leadership of the current refresh. Dropping it unresolved releases the
/// queue with [`RefreshFailure::Cancelled`].
pub struct RefreshGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    resolved: bool,
}

impl RefreshGuard<'_> {
    pub fn resolve(mut self, outcome: RefreshOutcome) -> usize {
        self.resolved = true;
        self.coordinator.resolve_all(outcome)
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            tracing::warn!("Refresh leader dropped before resolving; cancelling waiters");
            self.coordinator.resolve_all(Err(RefreshFailure::Cancelled));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_leader(ticket: RefreshTicket<'_>) -> RefreshGuard<'_> {
        match ticket {
            RefreshTicket::Leader(guard) => guard,
            RefreshTicket::Waiter(_) => panic!("expected leader"),
        }
    }

    fn expect_waiter(ticket: RefreshTicket<'_>) -> oneshot::Receiver<RefreshOutcome> {
        match ticket {
            RefreshTicket::Waiter(rx) => rx,
            RefreshTicket::Leader(_) => panic!("expected waiter"),
        }
    }

    #[tokio::test]
    async fn test_first_caller_leads_and_rest_wait() {
        let coordinator = RefreshCoordinator::new();

        let leader = expect_leader(coordinator.enqueue_or_trigger());
        let a = expect_waiter(coordinator.enqueue_or_trigger());
        let b = expect_waiter(coordinator.enqueue_or_trigger());
        assert!(coordinator.is_refreshing());
        assert_eq!(coordinator.pending_count(), 2);

        assert_eq!(leader.resolve(Ok("new-token".to_string())), 2);
        assert_eq!(a.await.unwrap(), Ok("new-token".to_string()));
        assert_eq!(b.await.unwrap(), Ok("new-token".to_string()));
        assert!(!coordinator.is_refreshing());
    }

    #[tokio::test]
    async fn test_failure_reaches_every_waiter() {
        let coordinator = RefreshCoordinator::new();
        let leader = expect_leader(coordinator.enqueue_or_trigger());
        let waiters: Vec<_> = (0..3)
            .map(|_| expect_waiter(coordinator.enqueue_or_trigger()))
            .collect();

        leader.resolve(Err(RefreshFailure::Rejected("expired".to_string())));

        for rx in waiters {
            assert_eq!(
                rx.await.unwrap(),
                Err(RefreshFailure::Rejected("expired".to_string()))
            );
        }
    }

    #[tokio::test]
    async fn test_dropped_leader_cancels_waiters() {
        let coordinator = RefreshCoordinator::new();
        let leader = expect_leader(coordinator.enqueue_or_trigger());
        let rx = expect_waiter(coordinator.enqueue_or_trigger());

        drop(leader);

        assert_eq!(rx.await.unwrap(), Err(RefreshFailure::Cancelled));
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_next_refresh_after_resolution_gets_new_leader() {
        let coordinator = RefreshCoordinator::new();
        expect_leader(coordinator.enqueue_or_trigger()).resolve(Ok("t1".to_string()));

        let second = expect_leader(coordinator.enqueue_or_trigger());
        assert_eq!(second.resolve(Ok("t2".to_string())), 0);
    }
}
