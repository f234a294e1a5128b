//! REST gateway over the hosted auth and data APIs.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};

use fellowship_core::{
    AuthEvent, AuthEventBroadcaster, BackendGateway, Config, GatewayError, Privilege,
    SecretToken, Session, UserId,
};

use crate::wire::{
    AdminRow, Endpoint, PasswordGrant, RefreshGrant, SignUpRequest, TokenResponse, classify,
    sanitize_message,
};

const PGRST_SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Backend gateway speaking to GoTrue-style auth and PostgREST-style data
/// endpoints.
///
/// The session is held in memory only.
pub struct RestGateway {
    client: Client,
    base_url: String,
    anon_key: SecretToken,
    admin_table: String,
    session: RwLock<Option<Session>>,
    events: AuthEventBroadcaster,
}

impl RestGateway {
    /// Create a gateway from the `backend` section of the config.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if the URL or anon key is missing or
    /// the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, GatewayError> {
        let backend = &config.backend;
        let base_url = backend
            .require_url()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        let anon_key = backend
            .require_anon_key()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        let client = Client::builder()
            .timeout(backend.timeout())
            .build()
            .map_err(|e| GatewayError::Config(format!("HTTP client: {e}")))?;

        Ok(Self::with_client(
            client,
            base_url,
            SecretToken::new(anon_key.to_string()),
            &backend.admin_table,
        ))
    }

    /// Create a gateway with an existing HTTP client.
    #[must_use]
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        anon_key: SecretToken,
        admin_table: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key,
            admin_table: admin_table.into(),
            session: RwLock::new(None),
            events: AuthEventBroadcaster::new(),
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn admin_table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.admin_table)
    }

    /// Attach the anon key and a bearer token (the session's if present).
    fn authorize(&self, request: RequestBuilder, session: Option<&Session>) -> RequestBuilder {
        let bearer = session.map_or(&self.anon_key, |s| &s.access_token);
        request
            .header("apikey", self.anon_key.expose())
            .bearer_auth(bearer.expose())
    }

    async fn post_token<B: Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<Session, GatewayError> {
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .json(body);
        let response = self.authorize(request, None).send().await.map_err(transport)?;
        let response = check(response, Endpoint::Credentials).await?;

        let token: TokenResponse = response.json().await.map_err(transport)?;
        token
            .into_session(Utc::now())
            .ok_or_else(|| GatewayError::Transport("token response without a session".to_string()))
    }

    /// Replace the held session, announcing the change.
    async fn store(&self, session: Session, event: AuthEvent) {
        *self.session.write().await = Some(session);
        self.events.broadcast(event);
    }

    async fn refresh(&self, refresh_token: &SecretToken) -> Result<Session, GatewayError> {
        tracing::debug!("Refreshing access token");
        self.post_token(
            "refresh_token",
            &RefreshGrant {
                refresh_token: refresh_token.expose(),
            },
        )
        .await
    }
}

#[async_trait]
impl BackendGateway for RestGateway {
    async fn get_current_session(&self) -> Result<Option<Session>, GatewayError> {
        // Held across the refresh so concurrent callers refresh once
        let mut slot = self.session.write().await;
        let Some(current) = slot.as_ref() else {
            return Ok(None);
        };
        if !current.needs_refresh() {
            return Ok(Some(current.clone()));
        }

        let outcome = match &current.refresh_token {
            Some(token) => self.refresh(token).await,
            None if current.is_expired() => Err(GatewayError::InvalidCredentials),
            None => return Ok(Some(current.clone())),
        };

        match outcome {
            Ok(session) => {
                *slot = Some(session.clone());
                drop(slot);
                self.events.broadcast(AuthEvent::token_refreshed(session.clone()));
                tracing::info!(user_id = %session.user.id, "Access token refreshed");
                Ok(Some(session))
            }
            Err(e @ GatewayError::Transport(_)) => Err(e),
            Err(e) => {
                *slot = None;
                drop(slot);
                tracing::warn!(error = %e, "Session could not be refreshed, signing out");
                self.events.broadcast(AuthEvent::signed_out());
                Ok(None)
            }
        }
    }

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn lookup_privilege(&self, user_id: &UserId) -> Result<Privilege, GatewayError> {
        let session = self.session.read().await.clone();
        let filter = format!("eq.{user_id}");

        let request = self
            .client
            .get(self.admin_table_url())
            .query(&[("user_id", filter.as_str()), ("select", "is_admin")])
            .header(reqwest::header::ACCEPT, PGRST_SINGLE_OBJECT);
        let response = self
            .authorize(request, session.as_ref())
            .send()
            .await
            .map_err(transport)?;
        let response = check(response, Endpoint::Privilege).await?;

        let row: AdminRow = response.json().await.map_err(transport)?;
        tracing::debug!(%user_id, is_admin = row.is_admin, "Privilege record found");
        Ok(Privilege {
            is_admin: row.is_admin,
        })
    }

    async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, GatewayError> {
        let session = self
            .post_token("password", &PasswordGrant { email, password })
            .await?;
        self.store(session.clone(), AuthEvent::signed_in(session.clone()))
            .await;
        Ok(session)
    }

    async fn sign_up_with_credentials(
        &self,
        email: &str,
        password: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Session, GatewayError> {
        let request = self
            .client
            .post(self.auth_url("signup"))
            .json(&SignUpRequest {
                email,
                password,
                data: &metadata,
            });
        let response = self.authorize(request, None).send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let response = check(response, Endpoint::Credentials).await?;

        let token: TokenResponse = response.json().await.map_err(transport)?;
        let session = token
            .into_session(Utc::now())
            .ok_or_else(|| GatewayError::Rejected {
                status,
                message: "account created, email confirmation required".to_string(),
            })?;

        self.store(session.clone(), AuthEvent::signed_in(session.clone()))
            .await;
        Ok(session)
    }

    async fn invalidate_session(&self) -> Result<(), GatewayError> {
        let session = self.session.write().await.take();
        self.events.broadcast(AuthEvent::signed_out());

        let Some(session) = session else {
            return Ok(());
        };

        let request = self.client.post(self.auth_url("logout"));
        let response = self
            .authorize(request, Some(&session))
            .send()
            .await
            .map_err(transport)?;
        check(response, Endpoint::Logout).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestGateway")
            .field("base_url", &self.base_url)
            .field("admin_table", &self.admin_table)
            .finish_non_exhaustive()
    }
}

fn transport(e: reqwest::Error) -> GatewayError {
    // Strip the URL, which can carry query parameters
    GatewayError::Transport(sanitize_message(&e.without_url().to_string()))
}

async fn check(response: Response, endpoint: Endpoint) -> Result<Response, GatewayError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let error = classify(endpoint, status, &body);
    tracing::debug!(status, ?endpoint, error = %error, "Backend request failed");
    Err(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use fellowship_core::{AuthEventKind, Identity};
    use pretty_assertions::assert_eq;

    fn gateway() -> RestGateway {
        RestGateway::with_client(
            Client::new(),
            "https://fellowship.example/",
            SecretToken::new("anon-key".to_string()),
            "admins",
        )
    }

    fn session_expiring_in(secs: i64) -> Session {
        let mut session = Session::new(
            SecretToken::new("at".to_string()),
            Identity::new("u1", Some("frodo@shire.example".to_string())),
        );
        session.expires_at = Some(Utc::now() + Duration::seconds(secs));
        session
    }

    #[test]
    fn test_urls() {
        let gateway = gateway();
        assert_eq!(gateway.base_url(), "https://fellowship.example");
        assert_eq!(
            gateway.auth_url("token"),
            "https://fellowship.example/auth/v1/token"
        );
        assert_eq!(
            gateway.admin_table_url(),
            "https://fellowship.example/rest/v1/admins"
        );
    }

    #[test]
    fn test_from_config_requires_backend() {
        let config = Config::default();
        assert!(matches!(
            RestGateway::from_config(&config),
            Err(GatewayError::Config(_))
        ));

        let mut config = Config::default();
        config.backend.url = Some("https://fellowship.example".to_string());
        config.backend.anon_key = Some("anon".to_string());
        config.backend.admin_table = "site_admins".to_string();
        let gateway = RestGateway::from_config(&config).unwrap();
        assert_eq!(
            gateway.admin_table_url(),
            "https://fellowship.example/rest/v1/site_admins"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let output = format!("{:?}", gateway());
        assert!(!output.contains("anon-key"));
    }

    #[tokio::test]
    async fn test_no_session() {
        assert_eq!(gateway().get_current_session().await, Ok(None));
    }

    #[tokio::test]
    async fn test_fresh_session_returned_without_refresh() {
        let gateway = gateway();
        let session = session_expiring_in(3600);
        *gateway.session.write().await = Some(session.clone());

        assert_eq!(gateway.get_current_session().await, Ok(Some(session)));
    }

    #[tokio::test]
    async fn test_expired_session_without_refresh_token_signs_out() {
        let gateway = gateway();
        let mut events = gateway.subscribe_auth_events();
        *gateway.session.write().await = Some(session_expiring_in(-10));

        assert_eq!(gateway.get_current_session().await, Ok(None));
        assert_eq!(events.recv().await.unwrap().kind, AuthEventKind::SignedOut);
        assert!(gateway.session.read().await.is_none());
    }

    #[tokio::test]
    async fn test_expiring_session_without_refresh_token_is_kept() {
        let gateway = gateway();
        let session = session_expiring_in(30);
        *gateway.session.write().await = Some(session.clone());

        assert_eq!(gateway.get_current_session().await, Ok(Some(session)));
    }

    #[tokio::test]
    async fn test_invalidate_without_session_is_local() {
        let gateway = gateway();
        let mut events = gateway.subscribe_auth_events();

        assert_eq!(gateway.invalidate_session().await, Ok(()));
        assert_eq!(events.recv().await.unwrap().kind, AuthEventKind::SignedOut);
    }

    #[tokio::test]
    async fn test_invalidate_clears_session_even_if_remote_fails() {
        // Nothing listens on the discard port
        let gateway = RestGateway::with_client(
            Client::new(),
            "http://127.0.0.1:9",
            SecretToken::new("anon-key".to_string()),
            "admins",
        );
        let mut events = gateway.subscribe_auth_events();
        *gateway.session.write().await = Some(session_expiring_in(3600));

        let result = gateway.invalidate_session().await;

        assert!(matches!(result, Err(GatewayError::Transport(_))));
        assert!(gateway.session.read().await.is_none());
        assert_eq!(events.recv().await.unwrap().kind, AuthEventKind::SignedOut);
    }
}
