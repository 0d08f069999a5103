//! Per-session state shared between the driver and whoever renders it.
//!
//! Only the driver task writes. Readers observe through `watch` and
//! `broadcast` receivers.

use std::sync::Arc;

use shared::protocol::{DiagnosticEvent, DiagnosticRecord, SpaceTransitionState};
use tokio::sync::{broadcast, watch};
use tracing::debug;

const DIAGNOSTIC_CAPACITY: usize = 256;

pub struct SessionContext {
    space_state: watch::Sender<SpaceTransitionState>,
    last_detected: watch::Sender<Option<String>>,
    diagnostics: broadcast::Sender<DiagnosticRecord>,
}

impl SessionContext {
    pub fn new() -> Arc<Self> {
        Self::with_space_state(SpaceTransitionState::Closed)
    }

    pub fn with_space_state(initial: SpaceTransitionState) -> Arc<Self> {
        let (space_state, _) = watch::channel(initial);
        let (last_detected, _) = watch::channel(None);
        let (diagnostics, _) = broadcast::channel(DIAGNOSTIC_CAPACITY);
        Arc::new(Self {
            space_state,
            last_detected,
            diagnostics,
        })
    }

    pub fn space_state(&self) -> SpaceTransitionState {
        *self.space_state.borrow()
    }

    pub fn watch_space_state(&self) -> watch::Receiver<SpaceTransitionState> {
        self.space_state.subscribe()
    }

    pub fn last_detected_identity(&self) -> Option<String> {
        self.last_detected.borrow().clone()
    }

    pub fn watch_last_detected(&self) -> watch::Receiver<Option<String>> {
        self.last_detected.subscribe()
    }

    pub fn subscribe_diagnostics(&self) -> broadcast::Receiver<DiagnosticRecord> {
        self.diagnostics.subscribe()
    }

    /// Returns the previous state.
    pub(crate) fn set_space_state(&self, next: SpaceTransitionState) -> SpaceTransitionState {
        let previous = self.space_state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "space state changed");
        }
        previous
    }

    pub(crate) fn record_detected(&self, identity: &str) {
        self.last_detected.send_replace(Some(identity.to_string()));
    }

    pub(crate) fn emit(&self, event: DiagnosticEvent) {
        // No subscribers is fine; diagnostics are best effort.
        let _ = self.diagnostics.send(DiagnosticRecord::now(event));
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
