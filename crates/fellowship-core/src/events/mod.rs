//! Auth state transitions pushed by the backend.
//!
//! Gateway implementations publish `AuthEvent`s through an
//! `AuthEventBroadcaster`; consumers hold a `broadcast::Receiver` for as
//! long as they want to listen. Dropping the receiver unsubscribes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::Session;

/// Kind of auth transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    /// A user signed in (or signed up and was logged in).
    SignedIn,
    /// The session ended.
    SignedOut,
    /// The access token was refreshed; the user is unchanged.
    TokenRefreshed,
}

impl std::fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SignedIn => write!(f, "signed_in"),
            Self::SignedOut => write!(f, "signed_out"),
            Self::TokenRefreshed => write!(f, "token_refreshed"),
        }
    }
}

/// A single auth transition with its optional session payload.
#[derive(Debug, Clone)]
pub struct AuthEvent {
    /// What happened.
    pub kind: AuthEventKind,
    /// Session after the transition, if any.
    pub session: Option<Session>,
    /// When the backend client observed the transition.
    pub timestamp: DateTime<Utc>,
}

impl AuthEvent {
    /// Create a new event stamped with the current time.
    #[must_use]
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        Self {
            kind,
            session,
            timestamp: Utc::now(),
        }
    }

    /// A sign-in event carrying the new session.
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        Self::new(AuthEventKind::SignedIn, Some(session))
    }

    /// A sign-out event.
    #[must_use]
    pub fn signed_out() -> Self {
        Self::new(AuthEventKind::SignedOut, None)
    }

    /// A token refresh event carrying the refreshed session.
    #[must_use]
    pub fn token_refreshed(session: Session) -> Self {
        Self::new(AuthEventKind::TokenRefreshed, Some(session))
    }
}

/// Default channel capacity for auth event broadcasts.
const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Fan-out hub for auth events.
#[derive(Clone)]
pub struct AuthEventBroadcaster {
    sender: broadcast::Sender<AuthEvent>,
}

impl AuthEventBroadcaster {
    /// Create a new broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new broadcaster with custom capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Broadcast an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    pub fn broadcast(&self, event: AuthEvent) -> usize {
        tracing::debug!(kind = %event.kind, "Broadcasting auth event");
        // No subscribers is not an error
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to receive events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for AuthEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuthEventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEventBroadcaster")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
