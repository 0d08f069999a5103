use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use gesture_core::{
    channel_source, replay_source, Classifier, Driver, Player, SessionContext, SpaceController,
};
use shared::{
    domain::Track,
    protocol::{
        DiagnosticEvent, DriverState, RawGestureEvent, SpaceLifecycleEvent, SpaceOpenOutcome,
        SpaceTransitionState,
    },
};
use tokio::sync::{broadcast, oneshot, Mutex as AsyncMutex};

const WAIT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Play,
    Pause,
    Resume,
    Stop,
    SkipNext,
    SkipPrevious,
}

struct FakePlayer {
    playing: bool,
    track: Option<Track>,
    calls: Mutex<Vec<Call>>,
}

impl FakePlayer {
    fn new(playing: bool, track: Option<Track>) -> Arc<Self> {
        Arc::new(Self {
            playing,
            track,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls").clone()
    }

    fn push(&self, call: Call) -> Result<()> {
        self.calls.lock().expect("calls").push(call);
        Ok(())
    }
}

impl Player for FakePlayer {
    fn play(&self, _track: &Track) -> Result<()> {
        self.push(Call::Play)
    }

    fn pause(&self) -> Result<()> {
        self.push(Call::Pause)
    }

    fn resume(&self, _track: &Track) -> Result<()> {
        self.push(Call::Resume)
    }

    fn stop(&self) -> Result<()> {
        self.push(Call::Stop)
    }

    fn skip_next(&self) -> Result<()> {
        self.push(Call::SkipNext)
    }

    fn skip_previous(&self) -> Result<()> {
        self.push(Call::SkipPrevious)
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn current_track(&self) -> Option<Track> {
        self.track.clone()
    }
}

/// Open attempts block until the test releases them.
struct GatedSpace {
    opens: AtomicUsize,
    gate: AsyncMutex<Option<oneshot::Receiver<SpaceOpenOutcome>>>,
    lifecycle: broadcast::Sender<SpaceLifecycleEvent>,
}

impl GatedSpace {
    fn new() -> (Arc<Self>, oneshot::Sender<SpaceOpenOutcome>) {
        let (tx, rx) = oneshot::channel();
        let (lifecycle, _) = broadcast::channel(4);
        (
            Arc::new(Self {
                opens: AtomicUsize::new(0),
                gate: AsyncMutex::new(Some(rx)),
                lifecycle,
            }),
            tx,
        )
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpaceController for GatedSpace {
    async fn open(&self) -> SpaceOpenOutcome {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().await.take();
        match gate {
            Some(rx) => rx.await.unwrap_or(SpaceOpenOutcome::UserCancelled),
            None => SpaceOpenOutcome::Error("gate already used".into()),
        }
    }

    fn subscribe_lifecycle(&self) -> broadcast::Receiver<SpaceLifecycleEvent> {
        self.lifecycle.subscribe()
    }
}

fn build(
    session: &Arc<SessionContext>,
    player: &Arc<FakePlayer>,
    space: &Arc<GatedSpace>,
) -> Driver {
    Driver::new(
        Arc::clone(session),
        Classifier::default(),
        Arc::clone(player) as Arc<dyn Player>,
        Arc::clone(space) as Arc<dyn SpaceController>,
    )
}

fn song() -> Track {
    Track::new("1488408568", "Levitating", "Dua Lipa")
}

#[tokio::test]
async fn dashboard_gesture_opens_space_from_closed() {
    let session = SessionContext::new();
    let player = FakePlayer::new(false, None);
    let (space, release) = GatedSpace::new();
    let (tx, stream) = channel_source(4);
    let mut space_state = session.watch_space_state();

    let handle = build(&session, &player, &space).run(stream);
    tx.send(RawGestureEvent::full("Opening the dashboard"))
        .await
        .expect("send");

    tokio::time::timeout(
        WAIT,
        space_state.wait_for(|s| *s == SpaceTransitionState::InTransition),
    )
    .await
    .expect("transition timeout")
    .expect("watch");
    tokio::time::timeout(WAIT, async {
        while space.opens() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("open timeout");

    assert_eq!(space.opens(), 1);
    assert_eq!(session.space_state(), SpaceTransitionState::InTransition);
    assert!(player.calls().is_empty());

    space
        .lifecycle
        .send(SpaceLifecycleEvent::Opened)
        .expect("lifecycle");
    release.send(SpaceOpenOutcome::Opened).expect("release");
    drop(tx);

    assert_eq!(handle.join().await.expect("driver"), DriverState::Stopped);
    assert_eq!(session.space_state(), SpaceTransitionState::Open);
    assert_eq!(space.opens(), 1);
}

#[tokio::test]
async fn dashboard_gesture_is_ignored_when_space_is_open() {
    let session = SessionContext::with_space_state(SpaceTransitionState::Open);
    let player = FakePlayer::new(false, None);
    let (space, _release) = GatedSpace::new();

    let handle = build(&session, &player, &space).run(replay_source(vec![
        RawGestureEvent::full("Opening the dashboard"),
    ]));

    assert_eq!(handle.join().await.expect("driver"), DriverState::Stopped);
    assert_eq!(session.space_state(), SpaceTransitionState::Open);
    assert_eq!(space.opens(), 0);
}

#[tokio::test]
async fn left_middle_click_skips_to_previous_once() {
    let session = SessionContext::new();
    let player = FakePlayer::new(true, Some(song()));
    let (space, _release) = GatedSpace::new();

    build(&session, &player, &space)
        .run(replay_source(vec![RawGestureEvent::full(
            "Use your left thumb tip to click your left middle finger tip",
        )]))
        .join()
        .await
        .expect("driver");

    assert_eq!(player.calls(), vec![Call::SkipPrevious]);
}

#[tokio::test]
async fn partial_peace_sign_is_ignored_and_full_one_pauses() {
    let session = SessionContext::new();
    let player = FakePlayer::new(true, Some(song()));
    let (space, _release) = GatedSpace::new();
    let (tx, stream) = channel_source(4);

    let handle = build(&session, &player, &space).run(stream);

    tx.send(RawGestureEvent::partial("Peace Sign", 1))
        .await
        .expect("send partial");
    tx.send(RawGestureEvent::full("Peace Sign"))
        .await
        .expect("send full");
    drop(tx);
    handle.join().await.expect("driver");

    assert_eq!(player.calls(), vec![Call::Pause]);
    assert_eq!(session.last_detected_identity().as_deref(), Some("Peace Sign"));
}

#[tokio::test]
async fn play_pause_with_no_track_makes_no_player_calls() {
    let session = SessionContext::new();
    let player = FakePlayer::new(false, None);
    let (space, _release) = GatedSpace::new();

    build(&session, &player, &space)
        .run(replay_source(vec![RawGestureEvent::full("Peace Sign")]))
        .join()
        .await
        .expect("driver");

    assert!(player.calls().is_empty());
}

#[tokio::test]
async fn paused_track_is_resumed() {
    let session = SessionContext::new();
    let player = FakePlayer::new(false, Some(song()));
    let (space, _release) = GatedSpace::new();

    build(&session, &player, &space)
        .run(replay_source(vec![RawGestureEvent::full("Peace Sign")]))
        .join()
        .await
        .expect("driver");

    assert_eq!(player.calls(), vec![Call::Resume]);
}

#[tokio::test]
async fn unrecognized_gesture_only_produces_one_diagnostic() {
    let session = SessionContext::new();
    let player = FakePlayer::new(true, Some(song()));
    let (space, _release) = GatedSpace::new();
    let mut diagnostics = session.subscribe_diagnostics();

    build(&session, &player, &space)
        .run(replay_source(vec![RawGestureEvent::full(
            "some unrecognized string",
        )]))
        .join()
        .await
        .expect("driver");

    assert!(player.calls().is_empty());
    assert_eq!(space.opens(), 0);

    let mut records = Vec::new();
    while let Ok(record) = diagnostics.try_recv() {
        records.push(record.event);
    }
    assert_eq!(
        records,
        vec![DiagnosticEvent::Unclassified {
            identity: "some unrecognized string".into()
        }]
    );
    assert_eq!(
        session.last_detected_identity().as_deref(),
        Some("some unrecognized string")
    );
}
