//! Applies classified commands against session and player state.

use std::sync::Arc;

use shared::protocol::{
    DiagnosticEvent, SemanticCommand, SpaceLifecycleEvent, SpaceOpenOutcome, SpaceTransitionState,
};
use tracing::{info, warn};

use crate::{session::SessionContext, Player};

/// Work the dispatcher cannot finish synchronously and hands back to the
/// driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    OpenSpace,
}

pub struct Dispatcher {
    session: Arc<SessionContext>,
    player: Arc<dyn Player>,
    /// At most one `open()` is outstanding, whatever the session state says.
    open_in_flight: bool,
    /// The controller reported `Opened` but has not sent the notification yet.
    opened_unconfirmed: bool,
    lifecycle_live: bool,
}

impl Dispatcher {
    pub fn new(session: Arc<SessionContext>, player: Arc<dyn Player>) -> Self {
        Self {
            session,
            player,
            open_in_flight: false,
            opened_unconfirmed: false,
            lifecycle_live: true,
        }
    }

    pub fn open_in_flight(&self) -> bool {
        self.open_in_flight
    }

    pub fn dispatch(&mut self, command: &SemanticCommand) -> Option<Effect> {
        match command {
            SemanticCommand::ToggleImmersiveSpace => self.toggle_immersive_space(),
            SemanticCommand::SkipNext => {
                info!("skipping to next track");
                self.forward("skip_next", self.player.skip_next());
                None
            }
            SemanticCommand::SkipPrevious => {
                info!("skipping to previous track");
                self.forward("skip_previous", self.player.skip_previous());
                None
            }
            SemanticCommand::TogglePlayPause => {
                self.toggle_play_pause();
                None
            }
            SemanticCommand::Unknown(identity) => {
                warn!(identity = %identity, "unclassified gesture; no command bound");
                self.session.emit(DiagnosticEvent::Unclassified {
                    identity: identity.clone(),
                });
                None
            }
        }
    }

    /// Folds the result of the outstanding open attempt back into the session.
    ///
    /// A successful open is confirmed by the controller's lifecycle
    /// notification, unless that channel is already closed.
    pub fn apply_open_outcome(&mut self, outcome: &SpaceOpenOutcome) {
        self.open_in_flight = false;
        match outcome {
            SpaceOpenOutcome::Opened => {
                let state = self.session.space_state();
                info!(space_state = %state, "immersive space open completed");
                if state == SpaceTransitionState::InTransition {
                    if self.lifecycle_live {
                        self.opened_unconfirmed = true;
                    } else {
                        self.session.set_space_state(SpaceTransitionState::Open);
                    }
                }
            }
            SpaceOpenOutcome::UserCancelled | SpaceOpenOutcome::Error(_) => {
                warn!(?outcome, "immersive space did not open");
                if self.session.space_state() == SpaceTransitionState::InTransition {
                    self.session.set_space_state(SpaceTransitionState::Closed);
                }
                self.session.emit(DiagnosticEvent::SpaceOpenFailed {
                    outcome: outcome.clone(),
                });
            }
        }
    }

    pub fn apply_lifecycle(&mut self, event: SpaceLifecycleEvent) {
        self.opened_unconfirmed = false;
        let next = match event {
            SpaceLifecycleEvent::Opened => SpaceTransitionState::Open,
            SpaceLifecycleEvent::Dismissed => SpaceTransitionState::Closed,
        };
        let previous = self.session.set_space_state(next);
        info!(?event, from = %previous, to = %next, "immersive space lifecycle");
    }

    /// The controller will send no more notifications. An open it already
    /// reported as successful is taken at its word.
    pub fn lifecycle_closed(&mut self) {
        self.lifecycle_live = false;
        if std::mem::take(&mut self.opened_unconfirmed)
            && self.session.space_state() == SpaceTransitionState::InTransition
        {
            self.session.set_space_state(SpaceTransitionState::Open);
        }
    }

    fn toggle_immersive_space(&mut self) -> Option<Effect> {
        let state = match self.session.space_state() {
            // A dismissal can land before the previous attempt resolves.
            SpaceTransitionState::Closed if self.open_in_flight => {
                SpaceTransitionState::InTransition
            }
            state => state,
        };
        match state {
            SpaceTransitionState::Closed => {
                info!("opening immersive space");
                self.session.set_space_state(SpaceTransitionState::InTransition);
                self.open_in_flight = true;
                self.opened_unconfirmed = false;
                Some(Effect::OpenSpace)
            }
            // Closing via gesture is not supported; an open space stays open.
            state @ (SpaceTransitionState::Open | SpaceTransitionState::InTransition) => {
                info!(space_state = %state, "ignoring space toggle");
                self.session.emit(DiagnosticEvent::GuardRejected {
                    command: SemanticCommand::ToggleImmersiveSpace.name().to_string(),
                    space_state: state,
                });
                None
            }
        }
    }

    fn toggle_play_pause(&self) {
        let state = self.player.playback_state();
        info!(
            is_playing = state.is_playing,
            track = state.track.as_ref().map(|t| t.title.as_str()).unwrap_or("none"),
            "toggling playback"
        );

        if state.is_playing {
            self.forward("pause", self.player.pause());
            return;
        }

        match state.track {
            Some(track) => self.forward("resume", self.player.resume(&track)),
            None => {
                info!("nothing to resume");
                self.session.emit(DiagnosticEvent::NothingToResume);
            }
        }
    }

    fn forward(&self, operation: &str, result: anyhow::Result<()>) {
        if let Err(err) = result {
            warn!(operation, error = %err, "player request failed");
            self.session.emit(DiagnosticEvent::CollaboratorFailed {
                operation: operation.to_string(),
                message: err.to_string(),
            });
        }
    }
}

#[cfg(test)]
#[path = "tests/dispatcher_tests.rs"]
mod tests;
