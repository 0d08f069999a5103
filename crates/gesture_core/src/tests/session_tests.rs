use super::*;

#[test]
fn starts_closed_with_nothing_detected() {
    let session = SessionContext::new();
    assert_eq!(session.space_state(), SpaceTransitionState::Closed);
    assert_eq!(session.last_detected_identity(), None);
}

#[test]
fn space_state_changes_are_visible_to_watchers() {
    let session = SessionContext::new();
    let watcher = session.watch_space_state();

    let previous = session.set_space_state(SpaceTransitionState::InTransition);

    assert_eq!(previous, SpaceTransitionState::Closed);
    assert_eq!(*watcher.borrow(), SpaceTransitionState::InTransition);
    assert_eq!(session.space_state(), SpaceTransitionState::InTransition);
}

#[test]
fn records_last_detected_identity() {
    let session = SessionContext::with_space_state(SpaceTransitionState::Open);
    let mut watcher = session.watch_last_detected();
    session.record_detected("Peace Sign");
    session.record_detected("Ring thumb tip touch");
    assert_eq!(
        session.last_detected_identity().as_deref(),
        Some("Ring thumb tip touch")
    );
    assert!(watcher.has_changed().expect("sender alive"));
    assert_eq!(
        watcher.borrow_and_update().as_deref(),
        Some("Ring thumb tip touch")
    );
    assert_eq!(session.space_state(), SpaceTransitionState::Open);
}

#[test]
fn emitted_diagnostics_reach_subscribers() {
    let session = SessionContext::new();
    let mut diagnostics = session.subscribe_diagnostics();

    session.emit(DiagnosticEvent::NothingToResume);

    let record = diagnostics.try_recv().expect("diagnostic record");
    assert_eq!(record.event, DiagnosticEvent::NothingToResume);
}

#[test]
fn emitting_without_subscribers_is_harmless() {
    let session = SessionContext::new();
    session.emit(DiagnosticEvent::Unclassified {
        identity: "nobody listening".into(),
    });
}
