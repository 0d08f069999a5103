use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use gesture_core::{
    CatalogService, Classifier, Driver, GestureSource, Player, SessionContext, SpaceController,
    TablePreset,
};
use shared::protocol::DiagnosticRecord;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod script;
mod sim;

use config::{load_gesture_table, load_settings};
use script::ScriptGestureSource;
use sim::{FixtureCatalog, SimulatedPlayer, SimulatedSpace};

/// Replays a gesture script against simulated playback and immersive-space
/// collaborators.
#[derive(Parser, Debug)]
struct Args {
    /// Settings file; missing files fall back to defaults.
    #[arg(long, default_value = "gesture.toml")]
    config: PathBuf,
    /// JSON-lines gesture script. Reads stdin when omitted.
    #[arg(long)]
    script: Option<PathBuf>,
    #[arg(long)]
    preset: Option<TablePreset>,
    /// Gesture table file, overrides the preset.
    #[arg(long)]
    table: Option<PathBuf>,
    /// Only dispatch gestures with this identity.
    #[arg(long)]
    target: Option<String>,
    #[arg(long)]
    artist: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = load_settings(&args.config)?;
    if let Some(preset) = args.preset {
        settings.table_preset = preset;
    }
    if let Some(table) = args.table {
        settings.table_path = Some(table);
    }
    if let Some(target) = args.target {
        settings.target_identity = Some(target);
    }
    if let Some(artist) = args.artist {
        settings.artist = artist;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let table = Arc::new(load_gesture_table(&settings)?);
    info!(
        preset = %settings.table_preset,
        entries = table.len(),
        from_file = settings.table_path.is_some(),
        "gesture table loaded"
    );
    for (identity, command) in table.iter() {
        debug!(identity, command = command.as_str(), "gesture binding");
    }

    let session = SessionContext::new();
    let player = Arc::new(SimulatedPlayer::default());
    let space = Arc::new(SimulatedSpace::new(
        settings.space_open_delay,
        settings.space_open_result.outcome(),
    ));

    let catalog = FixtureCatalog::default();
    match catalog.tracks_by_artist(&settings.artist).await {
        Ok(tracks) => {
            info!(artist = %settings.artist, tracks = tracks.len(), "catalog loaded");
            player.enqueue(tracks)?;
            if let Some(first) = player.first_track() {
                player.play(&first)?;
            }
        }
        Err(err) => warn!(error = %err, "starting with an empty queue"),
    }

    let diagnostics_task = tokio::spawn(log_diagnostics(session.subscribe_diagnostics()));

    let classifier = Classifier::new(table).with_target_identity(settings.target_identity.clone());
    let source = ScriptGestureSource::new(args.script, Arc::clone(&space));
    let handle = Driver::new(
        Arc::clone(&session),
        classifier,
        Arc::clone(&player) as Arc<dyn Player>,
        Arc::clone(&space) as Arc<dyn SpaceController>,
    )
    .run(source.events());

    let mut driver_state = handle.watch_state();
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received; stopping gesture driver");
            handle.cancel();
        }
        _ = driver_state.wait_for(|state| state.is_terminal()) => {}
    }

    let final_state = handle.join().await.context("gesture driver failed")?;

    let now_playing = player
        .current_track()
        .map(|t| format!("{} - {}", t.artist, t.title))
        .unwrap_or_else(|| "nothing".into());
    println!("driver: {final_state:?}");
    println!("immersive space: {}", session.space_state());
    println!(
        "last gesture: {}",
        session
            .last_detected_identity()
            .unwrap_or_else(|| "none".into())
    );
    println!(
        "playback: {} ({})",
        now_playing,
        if player.is_playing() { "playing" } else { "paused" }
    );

    // Last sender goes with the session; the logger drains what is queued and exits.
    drop(session);
    let logged = diagnostics_task.await.context("diagnostics logger failed")?;
    debug!(logged, "diagnostics drained");

    player.stop()?;
    Ok(())
}

/// Logs diagnostic records until every sender is gone. Returns how many
/// records were logged.
async fn log_diagnostics(mut diagnostics: broadcast::Receiver<DiagnosticRecord>) -> usize {
    let mut logged = 0;
    loop {
        match diagnostics.recv().await {
            Ok(record) => {
                info!(at = %record.recorded_at, event = ?record.event, "diagnostic");
                logged += 1;
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "diagnostics lagged"),
            Err(RecvError::Closed) => return logged,
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
