//! Optimistic sign-out.

use crate::AuthError;
use crate::engine::EngineShared;
use crate::state::Resolution;

/// Clear local state, then invalidate the remote session.
///
/// The local clear happens before the first await and is never reverted;
/// a remote failure is reported to the caller only.
pub(crate) async fn sign_out(shared: &EngineShared) -> Result<(), AuthError> {
    let ticket = shared.publisher.issue_ticket();
    shared.publisher.apply(ticket, Resolution::anonymous());
    tracing::info!("Local auth state cleared, invalidating remote session");

    shared.gateway.invalidate_session().await.map_err(|e| {
        tracing::warn!(error = %e, "Remote sign-out failed, local state stays cleared");
        AuthError::SignOut(e)
    })
}
