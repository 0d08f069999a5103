//! Gesture interpretation core: turns a stream of raw gesture matches into
//! playback and immersive-space requests.
//!
//! The pipeline is `GestureSource -> Driver -> Classifier -> Dispatcher ->
//! {Player, SpaceController}`. Everything that touches the outside world sits
//! behind the collaborator traits defined here.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{PlaybackState, Track},
    protocol::{SpaceLifecycleEvent, SpaceOpenOutcome},
};
use tokio::sync::broadcast;

pub mod classifier;
pub mod dispatcher;
pub mod driver;
pub mod identity;
pub mod session;
pub mod source;
pub mod table;

pub use classifier::Classifier;
pub use dispatcher::{Dispatcher, Effect};
pub use driver::{Driver, DriverError, DriverHandle};
pub use identity::resolve_identity;
pub use session::SessionContext;
pub use source::{channel_source, replay_source, GestureEventStream, GestureSource};
pub use table::{GestureTable, TablePreset};

/// Playback surface the dispatcher drives. Requests are fire-and-forget: the
/// implementation queues the work and returns.
pub trait Player: Send + Sync {
    fn play(&self, track: &Track) -> Result<()>;
    fn pause(&self) -> Result<()>;
    fn resume(&self, track: &Track) -> Result<()>;
    fn stop(&self) -> Result<()>;
    fn skip_next(&self) -> Result<()>;
    fn skip_previous(&self) -> Result<()>;
    fn is_playing(&self) -> bool;
    fn current_track(&self) -> Option<Track>;

    fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            track: self.current_track(),
            is_playing: self.is_playing(),
        }
    }
}

/// Owner of the immersive space lifecycle.
#[async_trait]
pub trait SpaceController: Send + Sync {
    /// Attempts to open the space. Timeouts and cancellation are the
    /// controller's business and surface only through the outcome.
    async fn open(&self) -> SpaceOpenOutcome;

    /// Notifications for the space appearing or being dismissed. An `Opened`
    /// outcome must be followed by an `Opened` notification while this
    /// channel is open; the session stays in transition until it arrives.
    fn subscribe_lifecycle(&self) -> broadcast::Receiver<SpaceLifecycleEvent>;
}

#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn tracks_by_artist(&self, artist: &str) -> Result<Vec<Track>>;
}

pub struct MissingPlayer;

impl Player for MissingPlayer {
    fn play(&self, track: &Track) -> Result<()> {
        Err(anyhow!("player unavailable; cannot play '{}'", track.title))
    }

    fn pause(&self) -> Result<()> {
        Err(anyhow!("player unavailable"))
    }

    fn resume(&self, track: &Track) -> Result<()> {
        Err(anyhow!("player unavailable; cannot resume '{}'", track.title))
    }

    fn stop(&self) -> Result<()> {
        Err(anyhow!("player unavailable"))
    }

    fn skip_next(&self) -> Result<()> {
        Err(anyhow!("player unavailable"))
    }

    fn skip_previous(&self) -> Result<()> {
        Err(anyhow!("player unavailable"))
    }

    fn is_playing(&self) -> bool {
        false
    }

    fn current_track(&self) -> Option<Track> {
        None
    }
}

pub struct MissingSpaceController;

#[async_trait]
impl SpaceController for MissingSpaceController {
    async fn open(&self) -> SpaceOpenOutcome {
        SpaceOpenOutcome::Error("space controller is unavailable".into())
    }

    fn subscribe_lifecycle(&self) -> broadcast::Receiver<SpaceLifecycleEvent> {
        // Sender is dropped right away, so the receiver reports closed.
        broadcast::channel(1).1
    }
}

pub struct MissingCatalogService;

#[async_trait]
impl CatalogService for MissingCatalogService {
    async fn tracks_by_artist(&self, artist: &str) -> Result<Vec<Track>> {
        Err(anyhow!("catalog service unavailable; cannot search '{artist}'"))
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
