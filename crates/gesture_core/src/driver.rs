//! The single consumer task that walks a gesture stream.
//!
//! Every state mutation happens inside this task: gesture dispatch, space
//! open outcomes and space lifecycle notifications are all funnelled through
//! one `select!` loop, so `SpaceTransitionState` never needs a lock.

use std::sync::Arc;

use futures::{
    future::BoxFuture,
    stream::{FuturesUnordered, Stream},
    FutureExt, StreamExt,
};
use shared::{
    error::GestureSourceError,
    protocol::{DiagnosticEvent, DriverState, RawGestureEvent, SpaceLifecycleEvent, SpaceOpenOutcome},
};
use thiserror::Error;
use tokio::{
    sync::{
        broadcast::{self, error::RecvError, error::TryRecvError},
        watch,
    },
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

use crate::{
    classifier::Classifier,
    dispatcher::{Dispatcher, Effect},
    identity::resolve_identity,
    session::SessionContext,
    Player, SpaceController,
};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("gesture source failed: {0}")]
    Source(#[from] GestureSourceError),
    #[error("gesture driver task did not complete: {0}")]
    Join(#[from] tokio::task::JoinError),
}

type PendingOpens = FuturesUnordered<BoxFuture<'static, SpaceOpenOutcome>>;

pub struct Driver {
    session: Arc<SessionContext>,
    classifier: Classifier,
    dispatcher: Dispatcher,
    space: Arc<dyn SpaceController>,
}

impl Driver {
    pub fn new(
        session: Arc<SessionContext>,
        classifier: Classifier,
        player: Arc<dyn Player>,
        space: Arc<dyn SpaceController>,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&session), player),
            session,
            classifier,
            space,
        }
    }

    /// Spawns the consumer task on the current runtime.
    pub fn run<S>(self, stream: S) -> DriverHandle
    where
        S: Stream<Item = Result<RawGestureEvent, GestureSourceError>> + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(DriverState::Idle);
        // Subscribe before spawning so no lifecycle notification slips past.
        let lifecycle = self.space.subscribe_lifecycle();
        let task = tokio::spawn(self.run_loop(stream, lifecycle, cancel_rx, state_tx));
        DriverHandle {
            cancel: cancel_tx,
            state: state_rx,
            task,
        }
    }

    async fn run_loop<S>(
        mut self,
        stream: S,
        mut lifecycle: broadcast::Receiver<SpaceLifecycleEvent>,
        mut cancel: watch::Receiver<bool>,
        state: watch::Sender<DriverState>,
    ) -> Result<DriverState, DriverError>
    where
        S: Stream<Item = Result<RawGestureEvent, GestureSourceError>> + Send + 'static,
    {
        state.send_replace(DriverState::Running);
        info!(
            table_entries = self.classifier.table().len(),
            target_identity = self.classifier.target_identity().unwrap_or("*"),
            "gesture driver running"
        );

        let mut stream = Box::pin(stream);
        let mut pending_opens = PendingOpens::new();
        let mut lifecycle_live = true;
        let mut cancel_live = true;

        let exit = loop {
            tokio::select! {
                biased;
                changed = cancel.changed(), if cancel_live => {
                    if changed.is_err() {
                        // Handle dropped: keep running detached.
                        cancel_live = false;
                    } else if *cancel.borrow_and_update() {
                        break Ok(DriverState::Cancelled);
                    }
                }
                Some(outcome) = pending_opens.next(), if !pending_opens.is_empty() => {
                    self.dispatcher.apply_open_outcome(&outcome);
                }
                received = lifecycle.recv(), if lifecycle_live => {
                    lifecycle_live = self.on_lifecycle(received);
                }
                next = stream.next() => match next {
                    Some(Ok(event)) => {
                        if let Some(effect) = self.handle_event(event) {
                            self.start_effect(effect, &mut pending_opens);
                        }
                    }
                    Some(Err(err)) => break Err(DriverError::Source(err)),
                    None => break Ok(DriverState::Stopped),
                },
            }
        };

        self.settle(&mut pending_opens, &mut lifecycle, lifecycle_live)
            .await;

        match exit {
            Ok(final_state) => {
                info!(state = ?final_state, "gesture driver finished");
                state.send_replace(final_state);
                Ok(final_state)
            }
            Err(err) => {
                error!(error = %err, "gesture driver failed");
                state.send_replace(DriverState::Failed);
                Err(err)
            }
        }
    }

    fn handle_event(&mut self, event: RawGestureEvent) -> Option<Effect> {
        let identity = resolve_identity(&event);
        match &event {
            RawGestureEvent::Partial { stage, .. } => {
                debug!(identity = %identity, stage = *stage, "partial gesture match ignored");
                return None;
            }
            RawGestureEvent::Reset { .. } => {
                debug!(identity = %identity, "gesture match reset");
                return None;
            }
            RawGestureEvent::Full {
                package_ref, name, ..
            } => {
                info!(identity = %identity, name = %name, package = %package_ref, "gesture detected");
            }
        }

        self.session.record_detected(&identity);

        if !self.classifier.accepts(&identity) {
            let target = self.classifier.target_identity().unwrap_or_default();
            debug!(identity = %identity, target_identity = target, "gesture outside target filter");
            self.session.emit(DiagnosticEvent::FilteredOut {
                identity,
                target: target.to_string(),
            });
            return None;
        }

        let command = self.classifier.classify(&identity);
        debug!(identity = %identity, command = command.name(), "gesture classified");
        self.dispatcher.dispatch(&command)
    }

    fn start_effect(&self, effect: Effect, pending_opens: &mut PendingOpens) {
        match effect {
            Effect::OpenSpace => {
                let space = Arc::clone(&self.space);
                pending_opens.push(async move { space.open().await }.boxed());
            }
        }
    }

    /// Returns whether the lifecycle channel is still worth polling.
    fn on_lifecycle(&mut self, received: Result<SpaceLifecycleEvent, RecvError>) -> bool {
        match received {
            Ok(event) => {
                self.dispatcher.apply_lifecycle(event);
                true
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "missed space lifecycle notifications");
                true
            }
            Err(RecvError::Closed) => {
                debug!("space lifecycle channel closed");
                self.dispatcher.lifecycle_closed();
                false
            }
        }
    }

    /// Lets an in-flight open attempt resolve and applies any lifecycle
    /// notifications already queued before the driver exits.
    async fn settle(
        &mut self,
        pending_opens: &mut PendingOpens,
        lifecycle: &mut broadcast::Receiver<SpaceLifecycleEvent>,
        mut lifecycle_live: bool,
    ) {
        while !pending_opens.is_empty() {
            tokio::select! {
                biased;
                received = lifecycle.recv(), if lifecycle_live => {
                    lifecycle_live = self.on_lifecycle(received);
                }
                Some(outcome) = pending_opens.next() => {
                    self.dispatcher.apply_open_outcome(&outcome);
                }
            }
        }

        while lifecycle_live {
            match lifecycle.try_recv() {
                Ok(event) => self.dispatcher.apply_lifecycle(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "missed space lifecycle notifications");
                }
                Err(TryRecvError::Closed) => {
                    self.dispatcher.lifecycle_closed();
                    break;
                }
                Err(TryRecvError::Empty) => break,
            }
        }
    }
}

/// Owner-side handle for a running driver. Dropping it detaches the task.
pub struct DriverHandle {
    cancel: watch::Sender<bool>,
    state: watch::Receiver<DriverState>,
    task: JoinHandle<Result<DriverState, DriverError>>,
}

impl DriverHandle {
    /// Requests a stop. The event being processed, if any, completes first.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn state(&self) -> DriverState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<DriverState> {
        self.state.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) -> Result<DriverState, DriverError> {
        self.task.await?
    }
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
