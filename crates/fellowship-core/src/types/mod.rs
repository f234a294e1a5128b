//! Identity and session types shared across Fellowship.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::secrets::SecretToken;

/// Seconds before expiry at which a session should be refreshed.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Opaque user identifier issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Create a new user ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The authenticated user as returned by the backend.
///
/// The engine only reads and forwards identities; it never edits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Backend user ID.
    pub id: UserId,

    /// Email address, if the account has one.
    #[serde(default)]
    pub email: Option<String>,

    /// Arbitrary profile metadata (display name and the like).
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Identity {
    /// Create an identity with no metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: UserId::new(id),
            email,
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Human-readable name from profile metadata, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        ["display_name", "full_name", "name"]
            .iter()
            .find_map(|key| self.metadata.get(*key).and_then(serde_json::Value::as_str))
            .or(self.email.as_deref())
    }
}

/// An authenticated backend session.
///
/// Not serializable: credential persistence belongs to the backend client.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Bearer token for backend calls.
    pub access_token: SecretToken,

    /// Token used to obtain a new access token.
    pub refresh_token: Option<SecretToken>,

    /// When the access token expires.
    pub expires_at: Option<DateTime<Utc>>,

    /// The user this session belongs to.
    pub user: Identity,
}

impl Session {
    /// Create a session without expiry information.
    #[must_use]
    pub fn new(access_token: SecretToken, user: Identity) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at: None,
            user,
        }
    }

    /// Check if the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp < Utc::now())
    }

    /// Check if the access token should be refreshed (expires within a minute).
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| exp < Utc::now() + chrono::Duration::seconds(REFRESH_MARGIN_SECS))
    }
}

/// Result of a privilege lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Privilege {
    /// Whether the user holds elevated privileges.
    #[serde(default)]
    pub is_admin: bool,
}
