use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Duration;

use crate::app_state::{apply_event, AppEvent, AppState, TransitionError};
use crate::logging::{info, obj, v_num, v_str, warn, Domain};
use crate::tasks::TaskSet;

/// Owns the single `AppState` and drives the timed vault transition.
pub struct VaultController {
    state: Arc<watch::Sender<AppState>>,
    delay: Duration,
    tasks: TaskSet,
}

impl VaultController {
    pub fn new(delay: Duration) -> Self {
        let (tx, _rx) = watch::channel(AppState::Landing);
        Self {
            state: Arc::new(tx),
            delay,
            tasks: TaskSet::new("vault"),
        }
    }

    pub fn state(&self) -> AppState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.state.subscribe()
    }

    /// Landing -> Transition now, Transition -> MissionControl after the delay.
    /// Any call outside `Landing` is rejected and schedules nothing.
    pub fn initialize(&self) -> Result<(), TransitionError> {
        if !self.tasks.is_alive() {
            return Err(TransitionError::ShutDown(self.state()));
        }
        let mut outcome = Ok(());
        self.state.send_if_modified(|s| match apply_event(s, AppEvent::Initialize) {
            Ok(()) => true,
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        if let Err(e) = outcome {
            warn(
                Domain::Vault,
                "initialize.rejected",
                obj(&[("state", v_str(self.state().as_str())), ("msg", v_str(&e.to_string()))]),
            );
            return Err(e);
        }

        info(
            Domain::Vault,
            "transition.start",
            obj(&[("delay_ms", v_num(self.delay.as_millis() as f64))]),
        );

        let tx = self.state.clone();
        self.tasks.after(self.delay, async move {
            let applied = tx.send_if_modified(|s| apply_event(s, AppEvent::TransitionElapsed).is_ok());
            if applied {
                info(
                    Domain::Vault,
                    "transition.complete",
                    obj(&[("state", v_str(AppState::MissionControl.as_str()))]),
                );
            }
        });
        Ok(())
    }

    /// Cancels a pending transition. The state stays where it is.
    pub fn shutdown(&self) {
        self.tasks.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_transition_completes_after_delay() {
        let vault = VaultController::new(Duration::from_millis(2500));
        let mut rx = vault.subscribe();
        assert_eq!(vault.state(), AppState::Landing);

        let start = Instant::now();
        vault.initialize().unwrap();
        assert_eq!(*rx.borrow_and_update(), AppState::Transition);

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), AppState::MissionControl);
        assert_eq!(start.elapsed(), Duration::from_millis(2500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_still_transitioning_just_before_delay() {
        let vault = VaultController::new(Duration::from_millis(2500));
        vault.initialize().unwrap();
        sleep(Duration::from_millis(2499)).await;
        assert_eq!(vault.state(), AppState::Transition);
        sleep(Duration::from_millis(2)).await;
        assert_eq!(vault.state(), AppState::MissionControl);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_initialize_rejected() {
        let vault = VaultController::new(Duration::from_millis(2500));
        vault.initialize().unwrap();
        let err = vault.initialize().unwrap_err();
        assert_eq!(err, TransitionError::AlreadyInitialized(AppState::Transition));

        sleep(Duration::from_secs(3)).await;
        assert_eq!(vault.state(), AppState::MissionControl);
        assert!(vault.initialize().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_abandons_transition() {
        let vault = VaultController::new(Duration::from_millis(2500));
        let mut rx = vault.subscribe();
        vault.initialize().unwrap();
        rx.borrow_and_update();

        sleep(Duration::from_millis(1000)).await;
        vault.shutdown();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(vault.state(), AppState::Transition);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_after_shutdown_reports_shutdown() {
        let vault = VaultController::new(Duration::from_millis(2500));
        vault.shutdown();
        let err = vault.initialize().unwrap_err();
        assert_eq!(err, TransitionError::ShutDown(AppState::Landing));
        sleep(Duration::from_secs(5)).await;
        assert_eq!(vault.state(), AppState::Landing);
    }
}
