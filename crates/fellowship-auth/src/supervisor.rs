//! Safety deadline for the initializing phase.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::engine::EngineShared;

/// Watchdog that forces the engine out of `Initializing`.
///
/// Armed at engine start. Disarming aborts the timer task, so a disarmed
/// supervisor can never write.
pub(crate) struct Supervisor {
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    pub(crate) fn arm(shared: Arc<EngineShared>, deadline: Duration) -> Self {
        let timer = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            if shared.publisher.force_settle() {
                tracing::warn!(
                    deadline_ms = deadline.as_millis(),
                    "Safety deadline elapsed before startup resolution, continuing signed out"
                );
            }
        });

        Self {
            timer: Mutex::new(Some(timer)),
        }
    }

    /// Cancel the timer. Safe to call more than once.
    pub(crate) fn disarm(&self) {
        let timer = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.abort();
            tracing::debug!("Safety deadline disarmed");
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AuthState, Phase};
    use crate::testing::ScriptedGateway;
    use fellowship_core::AuthSettings;

    fn shared() -> Arc<EngineShared> {
        Arc::new(EngineShared::new(
            Arc::new(ScriptedGateway::new()),
            &AuthSettings::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_at_deadline() {
        let shared = shared();
        let supervisor = Supervisor::arm(shared.clone(), Duration::from_secs(8));

        tokio::time::sleep(Duration::from_millis(7999)).await;
        assert_eq!(shared.publisher.snapshot().phase(), Phase::Initializing);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(shared.publisher.snapshot(), AuthState::anonymous());
        assert!(supervisor.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_timer_never_fires() {
        let shared = shared();
        let supervisor = Supervisor::arm(shared.clone(), Duration::from_secs(8));

        supervisor.disarm();
        supervisor.disarm();
        assert!(!supervisor.is_armed());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(shared.publisher.snapshot(), AuthState::initializing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_supervisor_disarms() {
        let shared = shared();
        drop(Supervisor::arm(shared.clone(), Duration::from_secs(1)));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(shared.publisher.snapshot().phase(), Phase::Initializing);
    }
}
