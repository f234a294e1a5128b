//! Published auth state and its single writer.
//!
//! Every component writes through `StatePublisher`. Writes are serialized by
//! one lock that also holds the settle flag, the newest applied ticket, and
//! the closed flag, so each write sees a consistent view of all three.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use fellowship_core::Identity;

/// Lifecycle phase of the published state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Startup resolution has not finished yet.
    Initializing,
    /// The state reflects a completed resolution (or the safety deadline).
    Resolved,
}

/// The authorization state consumed by the rest of the application.
///
/// `is_admin` is always `false` when there is no identity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthState {
    phase: Phase,
    identity: Option<Identity>,
    is_admin: bool,
}

impl AuthState {
    /// State before startup resolution completes.
    #[must_use]
    pub const fn initializing() -> Self {
        Self {
            phase: Phase::Initializing,
            identity: None,
            is_admin: false,
        }
    }

    /// Resolved, signed out.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            phase: Phase::Resolved,
            identity: None,
            is_admin: false,
        }
    }

    /// Resolved, signed in.
    #[must_use]
    pub const fn authenticated(identity: Identity, is_admin: bool) -> Self {
        Self {
            phase: Phase::Resolved,
            identity: Some(identity),
            is_admin,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Signed-in identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Whether the signed-in user holds admin privileges.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Whether startup resolution has finished.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.phase == Phase::Resolved
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    fn set_fields(&mut self, resolution: Resolution) {
        self.is_admin = resolution.identity.is_some() && resolution.is_admin;
        self.identity = resolution.identity;
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::initializing()
    }
}

/// Outcome of resolving an identity into an authorization level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// The resolved identity, `None` for signed out.
    pub identity: Option<Identity>,
    /// Admin flag for that identity.
    pub is_admin: bool,
}

impl Resolution {
    /// Signed-out resolution.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            identity: None,
            is_admin: false,
        }
    }

    /// Signed-in resolution.
    #[must_use]
    pub const fn authenticated(identity: Identity, is_admin: bool) -> Self {
        Self {
            identity: Some(identity),
            is_admin,
        }
    }
}

/// Sequence number of one resolution attempt.
///
/// Tickets are issued in arrival order; a result is applied only if its
/// ticket is newer than every ticket applied before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Ticket(u64);

#[derive(Debug, Default)]
struct WriteGuard {
    settled: bool,
    applied: u64,
    closed: bool,
}

/// Sole writer of the engine's `AuthState`.
pub(crate) struct StatePublisher {
    tx: watch::Sender<AuthState>,
    next_ticket: AtomicU64,
    guard: Mutex<WriteGuard>,
}

impl StatePublisher {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(AuthState::initializing());
        Self {
            tx,
            next_ticket: AtomicU64::new(0),
            guard: Mutex::new(WriteGuard::default()),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    pub(crate) fn snapshot(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    /// Issue the next resolution ticket.
    pub(crate) fn issue_ticket(&self) -> Ticket {
        Ticket(self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Apply a resolution without touching the phase.
    ///
    /// Returns `false` if the publisher is closed or the ticket is stale.
    pub(crate) fn apply(&self, ticket: Ticket, resolution: Resolution) -> bool {
        let mut guard = self.lock();
        if guard.closed {
            tracing::trace!(ticket = ticket.0, "Publisher closed, dropping resolution");
            return false;
        }
        if ticket.0 <= guard.applied {
            tracing::debug!(
                ticket = ticket.0,
                applied = guard.applied,
                "Dropping stale resolution"
            );
            return false;
        }

        guard.applied = ticket.0;
        self.tx.send_modify(|state| state.set_fields(resolution));
        true
    }

    /// Settle the initial phase with a startup resolution.
    ///
    /// Only the first settle (or forced settle) wins. If a newer ticket was
    /// applied meanwhile, the phase flips but the newer fields are kept.
    pub(crate) fn settle(&self, ticket: Ticket, resolution: Resolution) -> bool {
        let mut guard = self.lock();
        if guard.closed || guard.settled {
            tracing::debug!(
                closed = guard.closed,
                "Initial state already settled, ignoring startup result"
            );
            return false;
        }

        guard.settled = true;
        let fresh = ticket.0 > guard.applied;
        if fresh {
            guard.applied = ticket.0;
        }
        self.tx.send_modify(|state| {
            if fresh {
                state.set_fields(resolution);
            }
            state.phase = Phase::Resolved;
        });
        true
    }

    /// Settle the initial phase without a resolution (safety deadline).
    ///
    /// Fields stay as they are: anonymous unless a live event already
    /// published something newer.
    pub(crate) fn force_settle(&self) -> bool {
        let mut guard = self.lock();
        if guard.closed || guard.settled {
            return false;
        }

        guard.settled = true;
        self.tx.send_modify(|state| state.phase = Phase::Resolved);
        true
    }

    /// Stop accepting writes. Returns `true` on the first call only.
    pub(crate) fn close(&self) -> bool {
        let mut guard = self.lock();
        !std::mem::replace(&mut guard.closed, true)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    fn lock(&self) -> MutexGuard<'_, WriteGuard> {
        self.guard.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alice() -> Identity {
        Identity::new("alice", Some("alice@example.org".to_string()))
    }

    fn bob() -> Identity {
        Identity::new("bob", Some("bob@example.org".to_string()))
    }

    #[test]
    fn test_admin_flag_requires_identity() {
        let mut state = AuthState::initializing();
        state.set_fields(Resolution {
            identity: None,
            is_admin: true,
        });
        assert!(!state.is_admin());
        assert!(!state.is_authenticated());
    }

    #[test]
    fn test_settle_only_once() {
        let publisher = StatePublisher::new();
        let ticket = publisher.issue_ticket();

        assert!(publisher.settle(ticket, Resolution::authenticated(alice(), true)));
        assert!(!publisher.force_settle());
        assert!(!publisher.settle(publisher.issue_ticket(), Resolution::anonymous()));

        assert_eq!(publisher.snapshot(), AuthState::authenticated(alice(), true));
    }

    #[test]
    fn test_force_settle_blocks_late_startup_result() {
        let publisher = StatePublisher::new();
        let ticket = publisher.issue_ticket();

        assert!(publisher.force_settle());
        assert!(!publisher.settle(ticket, Resolution::authenticated(alice(), true)));
        assert_eq!(publisher.snapshot(), AuthState::anonymous());
    }

    #[test]
    fn test_stale_ticket_dropped() {
        let publisher = StatePublisher::new();
        let first = publisher.issue_ticket();
        let second = publisher.issue_ticket();
        assert!(first < second);

        assert!(publisher.apply(second, Resolution::authenticated(bob(), false)));
        assert!(!publisher.apply(first, Resolution::authenticated(alice(), true)));

        assert_eq!(publisher.snapshot().identity(), Some(&bob()));
    }

    #[test]
    fn test_apply_keeps_phase() {
        let publisher = StatePublisher::new();
        assert!(publisher.apply(
            publisher.issue_ticket(),
            Resolution::authenticated(alice(), false)
        ));

        let state = publisher.snapshot();
        assert_eq!(state.phase(), Phase::Initializing);
        assert_eq!(state.identity(), Some(&alice()));
    }

    #[test]
    fn test_stale_settle_flips_phase_but_keeps_newer_fields() {
        let publisher = StatePublisher::new();
        let startup = publisher.issue_ticket();
        let live = publisher.issue_ticket();

        assert!(publisher.apply(live, Resolution::authenticated(bob(), true)));
        assert!(publisher.settle(startup, Resolution::anonymous()));

        assert_eq!(publisher.snapshot(), AuthState::authenticated(bob(), true));
    }

    #[test]
    fn test_force_settle_keeps_live_result() {
        let publisher = StatePublisher::new();
        publisher.apply(
            publisher.issue_ticket(),
            Resolution::authenticated(alice(), false),
        );

        assert!(publisher.force_settle());
        assert_eq!(publisher.snapshot(), AuthState::authenticated(alice(), false));
    }

    #[test]
    fn test_closed_publisher_rejects_all_writes() {
        let publisher = StatePublisher::new();
        let mut rx = publisher.subscribe();
        let ticket = publisher.issue_ticket();

        assert!(publisher.close());
        assert!(!publisher.close());
        assert!(publisher.is_closed());

        assert!(!publisher.apply(ticket, Resolution::authenticated(alice(), true)));
        assert!(!publisher.settle(publisher.issue_ticket(), Resolution::anonymous()));
        assert!(!publisher.force_settle());

        assert!(!rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), AuthState::initializing());
    }

    #[test]
    fn test_state_serializes_for_consumers() {
        let json = serde_json::to_value(AuthState::anonymous()).unwrap();
        assert_eq!(json["phase"], "resolved");
        assert_eq!(json["identity"], serde_json::Value::Null);
        assert_eq!(json["is_admin"], false);
    }
}
