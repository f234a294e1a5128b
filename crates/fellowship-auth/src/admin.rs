//! Admin status resolution.
//!
//! Turns an identity into an admin flag. Always finishes within the
//! configured lookup timeout and defaults closed on any ambiguity.

use std::sync::Arc;
use std::time::Duration;

use fellowship_core::{
    AuthSettings, BackendGateway, GatewayError, Identity, Session, normalize_email,
};

use crate::state::Resolution;

/// How an admin decision was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminDecision {
    /// Identity matches the configured fallback admin; no lookup made.
    FastPath,
    /// Privilege record grants admin.
    Granted,
    /// Privilege record exists but does not grant admin.
    Denied,
    /// No privilege record for this user.
    NoRecord,
    /// Lookup failed for another reason.
    BackendError(GatewayError),
    /// Lookup did not finish in time.
    TimedOut,
}

impl AdminDecision {
    /// Whether this decision grants admin privileges.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::FastPath | Self::Granted)
    }
}

/// Resolves admin status with a hard timeout and a fast-path override.
pub struct AdminResolver {
    gateway: Arc<dyn BackendGateway>,
    fallback_email: Option<String>,
    timeout: Duration,
}

impl AdminResolver {
    /// Create a resolver from auth settings.
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>, settings: &AuthSettings) -> Self {
        Self {
            gateway,
            fallback_email: settings
                .fallback_admin_email
                .as_deref()
                .map(normalize_email)
                .filter(|email| !email.is_empty()),
            timeout: settings.admin_lookup_timeout(),
        }
    }

    /// Lookup timeout in effect.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Decide admin status, reporting how the decision was reached.
    pub async fn decide(&self, identity: &Identity) -> AdminDecision {
        if self.is_fallback_admin(identity) {
            tracing::debug!(user_id = %identity.id, "Fallback admin, skipping privilege lookup");
            return AdminDecision::FastPath;
        }

        // Dropping the lookup on timeout discards any late answer
        let lookup = self.gateway.lookup_privilege(&identity.id);
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(privilege)) if privilege.is_admin => AdminDecision::Granted,
            Ok(Ok(_)) => AdminDecision::Denied,
            Ok(Err(GatewayError::NotFound(_))) => {
                tracing::debug!(user_id = %identity.id, "No privilege record");
                AdminDecision::NoRecord
            }
            Ok(Err(e)) => {
                tracing::warn!(user_id = %identity.id, error = %e, "Privilege lookup failed");
                AdminDecision::BackendError(e)
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %identity.id,
                    timeout_ms = self.timeout.as_millis(),
                    "Privilege lookup timed out"
                );
                AdminDecision::TimedOut
            }
        }
    }

    /// Resolve admin status for an identity.
    pub async fn resolve(&self, identity: &Identity) -> bool {
        self.decide(identity).await.is_admin()
    }

    /// Resolve a session (or its absence) into a full resolution.
    pub(crate) async fn resolve_session(&self, session: Option<Session>) -> Resolution {
        match session {
            Some(session) => {
                let is_admin = self.resolve(&session.user).await;
                Resolution::authenticated(session.user, is_admin)
            }
            None => Resolution::anonymous(),
        }
    }

    fn is_fallback_admin(&self, identity: &Identity) -> bool {
        match (&self.fallback_email, &identity.email) {
            (Some(fallback), Some(email)) => normalize_email(email) == *fallback,
            _ => false,
        }
    }
}
