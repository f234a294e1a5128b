//! Live auth event handling.
//!
//! Events are ticketed in arrival order. Sign-outs apply immediately;
//! sign-ins and refreshes resolve concurrently and only the newest ticket
//! lands.

use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinHandle, JoinSet};

use fellowship_core::{AuthEvent, AuthEventKind, Session};

use crate::engine::EngineShared;
use crate::state::{Resolution, Ticket};

/// Handle to the engine's event subscription.
///
/// Unsubscribing aborts the listener and every resolution it started.
pub(crate) struct Subscription {
    listener: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn spawn(shared: Arc<EngineShared>, events: broadcast::Receiver<AuthEvent>) -> Self {
        Self {
            listener: Some(tokio::spawn(listen(shared, events))),
        }
    }

    /// Stop listening. Consumes the handle so it can only happen once.
    pub(crate) fn unsubscribe(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            tracing::debug!("Unsubscribed from auth events");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn listen(shared: Arc<EngineShared>, mut events: broadcast::Receiver<AuthEvent>) {
    // Owned here so aborting the listener aborts in-flight resolutions too
    let mut inflight = JoinSet::new();

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => dispatch(&shared, &mut inflight, event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Auth event stream lagged, re-resolving current session");
                    let ticket = shared.publisher.issue_ticket();
                    inflight.spawn(resolve_and_apply(shared.clone(), ticket, None));
                }
                Err(RecvError::Closed) => {
                    tracing::info!("Auth event stream closed");
                    break;
                }
            },
            Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
        }
    }

    while inflight.join_next().await.is_some() {}
}

fn dispatch(shared: &Arc<EngineShared>, inflight: &mut JoinSet<()>, event: AuthEvent) {
    let ticket = shared.publisher.issue_ticket();
    tracing::debug!(kind = %event.kind, "Auth event received");

    match event.kind {
        AuthEventKind::SignedOut => {
            if shared.publisher.apply(ticket, Resolution::anonymous()) {
                tracing::info!("Signed out");
            }
        }
        AuthEventKind::SignedIn | AuthEventKind::TokenRefreshed => {
            inflight.spawn(resolve_and_apply(shared.clone(), ticket, event.session));
        }
    }
}

async fn resolve_and_apply(shared: Arc<EngineShared>, ticket: Ticket, session: Option<Session>) {
    let resolution = match session {
        Some(session) => shared.resolver.resolve_session(Some(session)).await,
        None => shared.resolve_current().await,
    };
    let user_id = resolution.identity.as_ref().map(|i| i.id.clone());
    let is_admin = resolution.is_admin;

    if shared.publisher.apply(ticket, resolution) {
        match user_id {
            Some(user_id) => tracing::info!(%user_id, is_admin, "Auth state updated"),
            None => tracing::info!("Auth state updated, no session"),
        }
    }
}
