use std::sync::Arc;

use rand::rngs::StdRng;
use tokio::sync::watch;

use crate::app_state::{AppState, TransitionError};
use crate::config::Config;
use crate::intel::Upstream;
use crate::logging::{info, obj, v_str, Domain};
use crate::mission_control::MissionControl;
use crate::receipt::ReceiptIssuer;
use crate::tasks::TaskSet;
use crate::vault::VaultController;

/// Top of the object graph. Owns the vault state and mounts the dashboard
/// once the transition lands on `MissionControl`.
pub struct AppController {
    vault: VaultController,
    mission: Arc<watch::Sender<Option<Arc<MissionControl>>>>,
    tasks: TaskSet,
}

impl AppController {
    pub fn new(cfg: Config, upstream: Arc<dyn Upstream>, issuer: Arc<ReceiptIssuer>, rng: StdRng) -> Self {
        let vault = VaultController::new(cfg.transition_delay());
        let (tx, _rx) = watch::channel(None);
        let mission = Arc::new(tx);
        let tasks = TaskSet::new("controller");

        let mut state_rx = vault.subscribe();
        let slot = mission.clone();
        let mut pending = Some((cfg, upstream, issuer, rng));
        tasks.spawn(async move {
            loop {
                if *state_rx.borrow_and_update() == AppState::MissionControl {
                    if let Some((cfg, upstream, issuer, rng)) = pending.take() {
                        let mc = MissionControl::mount(&cfg, upstream, issuer, rng);
                        slot.send_replace(Some(Arc::new(mc)));
                    }
                    break;
                }
                if state_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        Self { vault, mission, tasks }
    }

    pub fn state(&self) -> AppState {
        self.vault.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.vault.subscribe()
    }

    pub fn initialize(&self) -> Result<(), TransitionError> {
        self.vault.initialize()
    }

    pub fn mission_control(&self) -> Option<Arc<MissionControl>> {
        self.mission.borrow().clone()
    }

    /// Resolves once the dashboard is mounted, or `None` after shutdown.
    pub async fn wait_for_mission_control(&self) -> Option<Arc<MissionControl>> {
        let mut rx = self.mission.subscribe();
        loop {
            if let Some(mc) = rx.borrow_and_update().clone() {
                return Some(mc);
            }
            if !self.tasks.is_alive() {
                return None;
            }
            if rx.changed().await.is_err() {
                return None;
            }
        }
    }

    pub fn shutdown(&self) {
        self.vault.shutdown();
        self.tasks.shutdown();
        let mounted = self.mission.send_replace(None);
        if let Some(mc) = mounted {
            mc.unmount();
        }
        info(Domain::App, "app.shutdown", obj(&[("state", v_str(self.state().as_str()))]));
    }
}
