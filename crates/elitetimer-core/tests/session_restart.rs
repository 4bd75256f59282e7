//! Restart tests: a session written to an on-disk database by one engine
//! is picked up by a fresh engine, the way the app does after being killed.

use elitetimer_core::timer::{inspect_saved_session, workout_matches};
use elitetimer_core::{
    CircleColor, Collaborators, Database, EngineConfig, Event, ManualClock, SessionMetadata,
    SessionStore, TimerEngine, TimerStatus,
};
use std::path::Path;

const T0: i64 = 1_700_000_000_000;

// ============================================================================
// Test Helpers
// ============================================================================

fn config() -> EngineConfig {
    EngineConfig {
        session_duration_secs: 20 * 60,
        default_interval_secs: 30,
        ..EngineConfig::default()
    }
}

fn engine_at(path: &Path, clock: &ManualClock) -> TimerEngine {
    let db = Database::open_at(path).unwrap();
    let collaborators = Collaborators::system(db).with_clock(clock.clone());
    TimerEngine::new(config(), collaborators).unwrap()
}

fn start_running(engine: &mut TimerEngine) {
    engine.start();
    let token = engine.countdown_token().unwrap();
    assert!(matches!(
        engine.finish_countdown(token),
        Some(Event::SessionStarted { .. })
    ));
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn paused_session_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elitetimer.db");
    let clock = ManualClock::new(T0);

    {
        let mut engine = engine_at(&path, &clock);
        engine.set_metadata(SessionMetadata {
            workout_id: Some("hiit-1".into()),
            ..SessionMetadata::default()
        });
        start_running(&mut engine);
        clock.advance_ms(75_000);
        engine.tick();
        engine.pause();
    }

    // Hours later, in a new process.
    clock.advance_ms(3 * 60 * 60 * 1000);
    let mut engine = engine_at(&path, &clock);
    let saved = engine.load_saved_session();
    let candidate = inspect_saved_session(saved, 20, 30).unwrap();
    assert!(candidate.timing_matches);
    assert!(workout_matches(Some(&candidate), Some("hiit-1")));
    assert!(!workout_matches(Some(&candidate), None));

    assert!(engine.resume_session(&candidate.snapshot));
    let view = engine.view();
    assert_eq!(view.status, TimerStatus::Paused);
    assert_eq!(view.elapsed_seconds, 75);
    assert_eq!(view.interval_count, 3);
    assert_eq!(view.circle_color, CircleColor::Teal);
    assert_eq!(view.interval_remaining, 15);
    assert_eq!(engine.metadata().workout_id.as_deref(), Some("hiit-1"));
}

#[test]
fn running_session_resumes_from_last_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elitetimer.db");
    let clock = ManualClock::new(T0);

    {
        let mut engine = engine_at(&path, &clock);
        start_running(&mut engine);
        for _ in 0..45 {
            clock.advance_ms(1_000);
            engine.tick();
        }
        // Dropping the engine flushes a final snapshot.
    }

    let mut engine = engine_at(&path, &clock);
    let saved = engine.load_saved_session().unwrap();
    assert_eq!(saved.elapsed_ms, Some(45_000));
    assert!(engine.resume_session(&saved));
    assert_eq!(engine.view().elapsed_seconds, 45);
    assert_eq!(engine.view().interval_remaining, 15);

    clock.advance_ms(15_000);
    assert!(matches!(
        engine.tick(),
        Some(Event::IntervalCompleted { interval_count: 3, .. })
    ));
}

#[test]
fn finished_session_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elitetimer.db");
    let clock = ManualClock::new(T0);

    let mut engine = engine_at(&path, &clock);
    start_running(&mut engine);
    clock.advance_ms(20 * 60 * 1000);
    assert!(matches!(engine.tick(), Some(Event::SessionCompleted { .. })));
    drop(engine);

    let db = Database::open_at(&path).unwrap();
    assert!(db.load().unwrap().is_none());
}

#[test]
fn reset_discards_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elitetimer.db");
    let clock = ManualClock::new(T0);

    let mut engine = engine_at(&path, &clock);
    start_running(&mut engine);
    clock.advance_ms(5_000);
    engine.pause();
    assert!(engine.load_saved_session().is_some());
    engine.reset();
    assert!(engine.load_saved_session().is_none());
}

#[test]
fn timing_mismatch_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("elitetimer.db");
    let clock = ManualClock::new(T0);

    {
        let mut engine = engine_at(&path, &clock);
        start_running(&mut engine);
        engine.pause();
    }

    let db = Database::open_at(&path).unwrap();
    let candidate = inspect_saved_session(db.load().unwrap(), 60, 30).unwrap();
    assert!(!candidate.timing_matches);
    assert!(workout_matches(Some(&candidate), None));
    assert!(!workout_matches(None, None));
}
