//! Engine facade tying the resolution components together.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use fellowship_core::{
    AuthSettings, BackendGateway, Identity, validate_email, validate_password,
};

use crate::AuthError;
use crate::admin::AdminResolver;
use crate::bootstrap;
use crate::signout;
use crate::state::{AuthState, Resolution, StatePublisher};
use crate::subscriber::Subscription;
use crate::supervisor::Supervisor;

/// State shared by the engine's background tasks.
pub(crate) struct EngineShared {
    pub(crate) publisher: StatePublisher,
    pub(crate) resolver: AdminResolver,
    pub(crate) gateway: Arc<dyn BackendGateway>,
}

impl EngineShared {
    pub(crate) fn new(gateway: Arc<dyn BackendGateway>, settings: &AuthSettings) -> Self {
        Self {
            publisher: StatePublisher::new(),
            resolver: AdminResolver::new(gateway.clone(), settings),
            gateway,
        }
    }

    /// Fetch the current session and resolve it. Fetch failures resolve
    /// as signed out.
    pub(crate) async fn resolve_current(&self) -> Resolution {
        match self.gateway.get_current_session().await {
            Ok(session) => self.resolver.resolve_session(session).await,
            Err(e) => {
                tracing::warn!(error = %e, "Session fetch failed, treating as signed out");
                Resolution::anonymous()
            }
        }
    }
}

/// Client-side identity and authorization engine.
///
/// Created when the consuming context mounts. Startup resolution, the safety
/// deadline, and the live event subscription all run in the background and
/// publish into one `AuthState`. Dropping the engine tears everything down;
/// no write lands after that.
pub struct AuthEngine {
    shared: Arc<EngineShared>,
    supervisor: Arc<Supervisor>,
    subscription: Option<Subscription>,
    bootstrap: Option<JoinHandle<()>>,
}

impl AuthEngine {
    /// Start the engine. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn start(gateway: Arc<dyn BackendGateway>, settings: &AuthSettings) -> Self {
        let shared = Arc::new(EngineShared::new(gateway, settings));

        // Subscribe before fetching so no transition slips between the two
        let events = shared.gateway.subscribe_auth_events();
        let startup_ticket = shared.publisher.issue_ticket();

        let supervisor = Arc::new(Supervisor::arm(shared.clone(), settings.safety_deadline()));
        let subscription = Subscription::spawn(shared.clone(), events);
        let bootstrap = tokio::spawn(bootstrap::run(
            shared.clone(),
            supervisor.clone(),
            startup_ticket,
        ));

        tracing::debug!(
            lookup_timeout_ms = settings.admin_lookup_timeout_ms,
            safety_deadline_ms = settings.safety_deadline_ms,
            "Auth engine started"
        );

        Self {
            shared,
            supervisor,
            subscription: Some(subscription),
            bootstrap: Some(bootstrap),
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.shared.publisher.snapshot()
    }

    /// Receiver that observes every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.shared.publisher.subscribe()
    }

    /// Wait until the state satisfies `predicate`, returning that state.
    pub async fn wait_until(&self, mut predicate: impl FnMut(&AuthState) -> bool) -> AuthState {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail here
        match rx.wait_for(|state| predicate(state)).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }

    /// Wait for startup resolution (bounded by the safety deadline).
    pub async fn wait_resolved(&self) -> AuthState {
        self.wait_until(AuthState::is_resolved).await
    }

    /// Sign in with email and password.
    ///
    /// The published state follows through the backend's event stream.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for malformed input and
    /// `AuthError::SignIn` when the backend refuses.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = validate_email(email)?;
        validate_password(password)?;

        let session = self
            .shared
            .gateway
            .sign_in_with_credentials(&email, password)
            .await
            .map_err(AuthError::SignIn)?;

        tracing::info!(user_id = %session.user.id, "Signed in");
        Ok(session.user)
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for malformed input and
    /// `AuthError::SignUp` when the backend refuses.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let email = validate_email(email)?;
        validate_password(password)?;

        let mut metadata = HashMap::new();
        if let Some(name) = display_name.map(str::trim).filter(|n| !n.is_empty()) {
            metadata.insert("display_name".to_string(), serde_json::Value::from(name));
        }

        let session = self
            .shared
            .gateway
            .sign_up_with_credentials(&email, password, metadata)
            .await
            .map_err(AuthError::SignUp)?;

        tracing::info!(user_id = %session.user.id, "Account created");
        Ok(session.user)
    }

    /// Sign out: clear local state immediately, then invalidate remotely.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SignOut` if the backend call fails. The local
    /// state is cleared regardless.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        signout::sign_out(&self.shared).await
    }

    /// Whether the engine has been torn down.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shared.publisher.is_closed()
    }

    /// Tear the engine down.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        // Close first so nothing still in flight can write
        let was_open = self.shared.publisher.close();

        self.supervisor.disarm();
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        if let Some(bootstrap) = self.bootstrap.take() {
            bootstrap.abort();
        }

        if was_open {
            tracing::debug!("Auth engine shut down");
        }
    }
}

impl Drop for AuthEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for AuthEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthEngine")
            .field("state", &self.state())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
