use serde::Serialize;
use thiserror::Error;

/// Top-level view selector. One-directional: Landing -> Transition -> MissionControl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppState {
    Landing,
    Transition,
    MissionControl,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Landing => "LANDING",
            AppState::Transition => "TRANSITION",
            AppState::MissionControl => "MISSION_CONTROL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// User pressed "initialize" on the landing view.
    Initialize,
    /// Vault transition delay has elapsed.
    TransitionElapsed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("initialize rejected: already in {0:?}")]
    AlreadyInitialized(AppState),
    #[error("transition elapsed while in {0:?}")]
    NotTransitioning(AppState),
    #[error("controller shut down in {0:?}")]
    ShutDown(AppState),
}

pub fn apply_event(state: &mut AppState, event: AppEvent) -> Result<(), TransitionError> {
    match (*state, event) {
        (AppState::Landing, AppEvent::Initialize) => {
            *state = AppState::Transition;
            Ok(())
        }
        (AppState::Transition, AppEvent::TransitionElapsed) => {
            *state = AppState::MissionControl;
            Ok(())
        }
        (current, AppEvent::Initialize) => Err(TransitionError::AlreadyInitialized(current)),
        (current, AppEvent::TransitionElapsed) => Err(TransitionError::NotTransitioning(current)),
    }
}
