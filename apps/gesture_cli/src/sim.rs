//! In-process stand-ins for the playback, immersive-space and catalog
//! collaborators.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use gesture_core::{CatalogService, Player, SpaceController};
use shared::{
    domain::Track,
    protocol::{SpaceLifecycleEvent, SpaceOpenOutcome},
};
use tokio::sync::broadcast;
use tracing::info;

#[derive(Debug, Default)]
struct QueueState {
    queue: Vec<Track>,
    index: Option<usize>,
    playing: bool,
}

#[derive(Debug, Default)]
pub struct SimulatedPlayer {
    state: Mutex<QueueState>,
}

impl SimulatedPlayer {
    pub fn enqueue(&self, tracks: Vec<Track>) -> Result<()> {
        let mut state = self.lock()?;
        state.queue.extend(tracks);
        Ok(())
    }

    pub fn first_track(&self) -> Option<Track> {
        self.lock().ok()?.queue.first().cloned()
    }

    fn lock(&self) -> Result<MutexGuard<'_, QueueState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("simulated player state poisoned"))
    }

    fn select(&self, track: &Track) -> Result<()> {
        let mut state = self.lock()?;
        let index = match state.queue.iter().position(|t| t.id == track.id) {
            Some(index) => index,
            None => {
                state.queue.push(track.clone());
                state.queue.len() - 1
            }
        };
        state.index = Some(index);
        state.playing = true;
        Ok(())
    }

    fn step(&self, forward: bool) -> Result<()> {
        let mut state = self.lock()?;
        let len = state.queue.len();
        let next = match (state.index, forward) {
            (None, _) if len > 0 => 0,
            (None, _) => {
                info!("queue empty; nothing to skip to");
                return Ok(());
            }
            (Some(i), true) if i + 1 < len => i + 1,
            (Some(i), false) => i.saturating_sub(1),
            (Some(i), true) => {
                info!("end of queue reached");
                i
            }
        };
        state.index = Some(next);
        state.playing = true;
        info!(track = %state.queue[next].title, "now playing");
        Ok(())
    }
}

impl Player for SimulatedPlayer {
    fn play(&self, track: &Track) -> Result<()> {
        info!(track = %track.title, artist = %track.artist, "play");
        self.select(track)
    }

    fn pause(&self) -> Result<()> {
        info!("pause");
        self.lock()?.playing = false;
        Ok(())
    }

    fn resume(&self, track: &Track) -> Result<()> {
        info!(track = %track.title, "resume");
        self.select(track)
    }

    fn stop(&self) -> Result<()> {
        info!("stop");
        let mut state = self.lock()?;
        state.playing = false;
        state.index = None;
        Ok(())
    }

    fn skip_next(&self) -> Result<()> {
        self.step(true)
    }

    fn skip_previous(&self) -> Result<()> {
        self.step(false)
    }

    fn is_playing(&self) -> bool {
        self.lock().map(|state| state.playing).unwrap_or(false)
    }

    fn current_track(&self) -> Option<Track> {
        let state = self.lock().ok()?;
        state.index.and_then(|i| state.queue.get(i).cloned())
    }
}

pub struct SimulatedSpace {
    open_delay: Duration,
    outcome: SpaceOpenOutcome,
    lifecycle: broadcast::Sender<SpaceLifecycleEvent>,
}

impl SimulatedSpace {
    pub fn new(open_delay: Duration, outcome: SpaceOpenOutcome) -> Self {
        let (lifecycle, _) = broadcast::channel(16);
        Self {
            open_delay,
            outcome,
            lifecycle,
        }
    }

    /// The user closed the space from outside the gesture pipeline.
    pub fn dismiss(&self) {
        info!("immersive space dismissed");
        let _ = self.lifecycle.send(SpaceLifecycleEvent::Dismissed);
    }
}

#[async_trait]
impl SpaceController for SimulatedSpace {
    async fn open(&self) -> SpaceOpenOutcome {
        tokio::time::sleep(self.open_delay).await;
        if self.outcome == SpaceOpenOutcome::Opened {
            let _ = self.lifecycle.send(SpaceLifecycleEvent::Opened);
        }
        self.outcome.clone()
    }

    fn subscribe_lifecycle(&self) -> broadcast::Receiver<SpaceLifecycleEvent> {
        self.lifecycle.subscribe()
    }
}

/// A fixed catalog keyed by lowercase artist name.
pub struct FixtureCatalog {
    by_artist: HashMap<String, Vec<Track>>,
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        let tracks = [
            ("1538003843", "Levitating", "Dua Lipa"),
            ("1538003844", "Don't Start Now", "Dua Lipa"),
            ("1538003845", "Physical", "Dua Lipa"),
            ("697194953", "Get Lucky", "Daft Punk"),
            ("697195462", "Instant Crush", "Daft Punk"),
            ("1499378108", "Blinding Lights", "The Weeknd"),
        ];
        let mut by_artist: HashMap<String, Vec<Track>> = HashMap::new();
        for (id, title, artist) in tracks {
            by_artist
                .entry(artist.to_lowercase())
                .or_default()
                .push(Track::new(id, title, artist));
        }
        Self { by_artist }
    }
}

#[async_trait]
impl CatalogService for FixtureCatalog {
    async fn tracks_by_artist(&self, artist: &str) -> Result<Vec<Track>> {
        self.by_artist
            .get(&artist.trim().to_lowercase())
            .cloned()
            .ok_or_else(|| anyhow!("no catalog tracks for artist '{artist}'"))
    }
}

#[cfg(test)]
#[path = "tests/sim_tests.rs"]
mod tests;
