//! Backend gateway contract.
//!
//! The auth engine never talks to the network directly; it consumes this
//! trait so the hosted backend can be swapped for a test double.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::events::AuthEvent;
use crate::types::{Privilege, Session, UserId};

/// Backend gateway errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend unreachable or the request failed in transit.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Email/password rejected.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Backend answered with an error status.
    #[error("Backend rejected request: {status} - {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Error message (secrets scrubbed).
        message: String,
    },

    /// Gateway is misconfigured.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Whether this is the "record not found" condition.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Contract of the hosted auth/data backend.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Current session, if the client holds one.
    async fn get_current_session(&self) -> Result<Option<Session>, GatewayError>;

    /// Subscribe to auth transitions. Dropping the receiver unsubscribes.
    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent>;

    /// Look up the privilege record for a user.
    ///
    /// Returns `GatewayError::NotFound` when the user has no record.
    async fn lookup_privilege(&self, user_id: &UserId) -> Result<Privilege, GatewayError>;

    /// Sign in with email and password.
    async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, GatewayError>;

    /// Create an account with email and password.
    async fn sign_up_with_credentials(
        &self,
        email: &str,
        password: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Session, GatewayError>;

    /// Invalidate the current session on the backend.
    async fn invalidate_session(&self) -> Result<(), GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_distinguishable() {
        assert!(GatewayError::NotFound("admins/u1".to_string()).is_not_found());
        assert!(!GatewayError::Transport("connection reset".to_string()).is_not_found());
        assert!(
            !GatewayError::Rejected {
                status: 500,
                message: "boom".to_string()
            }
            .is_not_found()
        );
    }

    #[test]
    fn test_error_display() {
        let err = GatewayError::Rejected {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "Backend rejected request: 503 - maintenance");
    }
}
