//! One-time startup resolution.

use std::sync::Arc;

use crate::engine::EngineShared;
use crate::state::Ticket;
use crate::supervisor::Supervisor;

/// Fetch the current session, resolve it, and settle the initial state.
///
/// A failed fetch settles as signed out. The supervisor is disarmed once the
/// startup result has been offered, whether or not it won the settle.
pub(crate) async fn run(shared: Arc<EngineShared>, supervisor: Arc<Supervisor>, ticket: Ticket) {
    let resolution = shared.resolve_current().await;
    let signed_in = resolution.identity.is_some();
    let is_admin = resolution.is_admin;

    if shared.publisher.settle(ticket, resolution) {
        tracing::info!(signed_in, is_admin, "Startup auth state resolved");
    }

    supervisor.disarm();
}
