//! Wire formats for the auth and data APIs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use fellowship_core::secrets::COMMON_SECRET_PATTERNS;
use fellowship_core::{GatewayError, Identity, SecretToken, Session, scrub_secrets};

/// PostgREST code for "singular response requested, zero rows returned".
const PGRST_NO_ROWS: &str = "PGRST116";

/// Longest error message passed through from a response body.
const MAX_ERROR_MESSAGE: usize = 200;

#[derive(Debug, Serialize)]
pub(crate) struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub data: &'a HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshGrant<'a> {
    pub refresh_token: &'a str,
}

/// Token endpoint response. Sign-up returns the same shape when the account
/// is usable immediately, or only the user when confirmation is pending.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub expires_at: Option<i64>,
    pub user: Option<WireUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
    pub id: String,
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: HashMap<String, serde_json::Value>,
}

impl From<WireUser> for Identity {
    fn from(user: WireUser) -> Self {
        let mut identity = Self::new(user.id, user.email.filter(|e| !e.is_empty()));
        identity.metadata = user.user_metadata;
        identity
    }
}

impl TokenResponse {
    /// Build a session, or `None` if the response carries no usable token.
    pub(crate) fn into_session(self, now: DateTime<Utc>) -> Option<Session> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        let user = self.user?;

        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));

        Some(Session {
            access_token: SecretToken::new(access_token),
            refresh_token: self
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretToken::new),
            expires_at,
            user: user.into(),
        })
    }
}

/// Row of the admin table.
#[derive(Debug, Deserialize)]
pub(crate) struct AdminRow {
    #[serde(default)]
    pub is_admin: bool,
}

/// Error body. GoTrue and PostgREST use different field names.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn code(&self) -> Option<&str> {
        self.code.as_ref().and_then(serde_json::Value::as_str)
    }

    fn message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

/// Which kind of endpoint produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    /// Sign-in, sign-up, and refresh.
    Credentials,
    /// Admin table lookup.
    Privilege,
    /// Logout.
    Logout,
}

/// Map an unsuccessful response to a gateway error.
pub(crate) fn classify(endpoint: Endpoint, status: u16, body: &str) -> GatewayError {
    let parsed = ErrorBody::parse(body);

    match (endpoint, status) {
        (Endpoint::Privilege, 404) => GatewayError::NotFound("admin table row".to_string()),
        (Endpoint::Privilege, 406) if parsed.code() == Some(PGRST_NO_ROWS) => {
            GatewayError::NotFound("admin table row".to_string())
        }
        (Endpoint::Credentials, 400 | 401 | 422) => GatewayError::InvalidCredentials,
        _ => {
            let message = parsed
                .message()
                .unwrap_or_else(|| body.trim().to_string());
            GatewayError::Rejected {
                status,
                message: sanitize_message(&message),
            }
        }
    }
}

/// Scrub secrets and bound the length of a message bound for logs.
pub(crate) fn sanitize_message(message: &str) -> String {
    let scrubbed = scrub_secrets(message, COMMON_SECRET_PATTERNS);
    if scrubbed.chars().count() <= MAX_ERROR_MESSAGE {
        return scrubbed;
    }
    let mut truncated: String = scrubbed.chars().take(MAX_ERROR_MESSAGE).collect();
    truncated.push_str("...");
    truncated
}
