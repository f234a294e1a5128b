//! Scripted backend gateway for engine tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

use fellowship_core::{
    AuthEvent, AuthEventBroadcaster, BackendGateway, GatewayError, Identity, Privilege,
    SecretToken, Session, UserId,
};

/// One scripted reply: wait, then answer (or never answer).
#[derive(Debug, Clone)]
pub(crate) enum Step<T> {
    After(Duration, Result<T, GatewayError>),
    Hang,
}

impl<T> Step<T> {
    pub(crate) const fn now(result: Result<T, GatewayError>) -> Self {
        Self::After(Duration::ZERO, result)
    }

    pub(crate) const fn after_ms(ms: u64, result: Result<T, GatewayError>) -> Self {
        Self::After(Duration::from_millis(ms), result)
    }

    async fn play(self) -> Result<T, GatewayError> {
        match self {
            Self::After(delay, result) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                result
            }
            Self::Hang => std::future::pending().await,
        }
    }
}

pub(crate) fn identity(id: &str) -> Identity {
    Identity::new(id, Some(format!("{id}@example.org")))
}

pub(crate) fn session(id: &str) -> Session {
    Session::new(SecretToken::new(format!("token-{id}")), identity(id))
}

pub(crate) fn transport_error() -> GatewayError {
    GatewayError::Transport("connection refused".to_string())
}

pub(crate) struct ScriptedGateway {
    events: AuthEventBroadcaster,
    current: Mutex<Step<Option<Session>>>,
    privileges: Mutex<HashMap<String, Step<Privilege>>>,
    invalidate: Mutex<Step<()>>,
    pub(crate) session_calls: AtomicUsize,
    pub(crate) lookup_calls: AtomicUsize,
    pub(crate) invalidate_calls: AtomicUsize,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self::with_event_capacity(16)
    }

    pub(crate) fn with_event_capacity(capacity: usize) -> Self {
        Self {
            events: AuthEventBroadcaster::with_capacity(capacity),
            current: Mutex::new(Step::now(Ok(None))),
            privileges: Mutex::new(HashMap::new()),
            invalidate: Mutex::new(Step::now(Ok(()))),
            session_calls: AtomicUsize::new(0),
            lookup_calls: AtomicUsize::new(0),
            invalidate_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn current_session(self, step: Step<Option<Session>>) -> Self {
        *self.current.lock().unwrap() = step;
        self
    }

    pub(crate) fn privilege(self, user_id: &str, step: Step<Privilege>) -> Self {
        self.set_privilege(user_id, step);
        self
    }

    pub(crate) fn set_privilege(&self, user_id: &str, step: Step<Privilege>) {
        self.privileges
            .lock()
            .unwrap()
            .insert(user_id.to_string(), step);
    }

    pub(crate) fn admin(self, user_id: &str) -> Self {
        self.privilege(user_id, Step::now(Ok(Privilege { is_admin: true })))
    }

    pub(crate) fn invalidate(self, step: Step<()>) -> Self {
        *self.invalidate.lock().unwrap() = step;
        self
    }

    pub(crate) fn set_current_session(&self, step: Step<Option<Session>>) {
        *self.current.lock().unwrap() = step;
    }

    pub(crate) fn emit(&self, event: AuthEvent) {
        self.events.broadcast(event);
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn session_fetches(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendGateway for ScriptedGateway {
    async fn get_current_session(&self) -> Result<Option<Session>, GatewayError> {
        self.session_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.current.lock().unwrap().clone();
        step.play().await
    }

    fn subscribe_auth_events(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn lookup_privilege(&self, user_id: &UserId) -> Result<Privilege, GatewayError> {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .privileges
            .lock()
            .unwrap()
            .get(user_id.as_ref())
            .cloned()
            .unwrap_or_else(|| Step::now(Err(GatewayError::NotFound(user_id.to_string()))));
        step.play().await
    }

    async fn sign_in_with_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, GatewayError> {
        if password != "correct-horse" {
            return Err(GatewayError::InvalidCredentials);
        }
        let id = email.split('@').next().unwrap_or(email);
        let session = session(id);
        self.set_current_session(Step::now(Ok(Some(session.clone()))));
        self.emit(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up_with_credentials(
        &self,
        email: &str,
        _password: &str,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Session, GatewayError> {
        let id = email.split('@').next().unwrap_or(email);
        let mut session = session(id);
        session.user.metadata = metadata;
        self.emit(AuthEvent::signed_in(session.clone()));
        Ok(session)
    }

    async fn invalidate_session(&self) -> Result<(), GatewayError> {
        self.invalidate_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.invalidate.lock().unwrap().clone();
        step.play().await
    }
}
