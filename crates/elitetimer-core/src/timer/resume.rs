//! Resume reconciliation.
//!
//! Rebuilds in-progress interval state from a persisted snapshot and the
//! current wall time. The process may have been suspended for longer than
//! many intervals, so every interval boundary that passed in the meantime is
//! replayed here in closed form.

use crate::snapshot::{SessionSnapshot, SessionStatus};

use super::interval::{floor_secs, remaining_secs, CircleColor};

/// State reconstructed from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumedState {
    pub elapsed_ms: u64,
    pub interval_count: u64,
    pub circle_color: CircleColor,
    pub interval_remaining_secs: u64,
    pub current_interval_duration_secs: u64,
    pub is_quick_add: bool,
    /// Time already spent inside the current interval.
    pub time_into_interval_ms: u64,
    pub status: SessionStatus,
}

impl ResumedState {
    pub fn elapsed_secs(&self) -> u64 {
        floor_secs(self.elapsed_ms)
    }
}

/// Outcome of [`reconcile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    Resumed(ResumedState),
    /// The snapshot does not describe an active session.
    Inactive,
    /// The session ran out while the process was away.
    Expired { elapsed_secs: u64 },
}

/// Milliseconds since `start_ms`, minus paused time, or the recorded value.
fn elapsed_since(recorded: Option<u64>, start_ms: Option<i64>, paused_ms: u64, now_ms: i64) -> u64 {
    if let Some(ms) = recorded {
        return ms;
    }
    let start = start_ms.unwrap_or(now_ms);
    let derived = now_ms
        .saturating_sub(start)
        .saturating_sub(i64::try_from(paused_ms).unwrap_or(i64::MAX));
    derived.max(0) as u64
}

/// Reconstruct a session from `snapshot` as seen at wall time `now_ms`.
pub fn reconcile(snapshot: &SessionSnapshot, now_ms: i64) -> ResumeOutcome {
    if !snapshot.session_active {
        return ResumeOutcome::Inactive;
    }

    let elapsed_ms = elapsed_since(
        snapshot.elapsed_ms,
        snapshot.session_start_time,
        snapshot.total_paused_ms,
        now_ms,
    );
    if floor_secs(elapsed_ms) >= snapshot.session_duration {
        return ResumeOutcome::Expired {
            elapsed_secs: floor_secs(elapsed_ms),
        };
    }

    let interval_elapsed_ms = elapsed_since(
        snapshot.interval_elapsed_ms,
        snapshot.current_interval_start_time,
        snapshot.interval_paused_ms,
        now_ms,
    );

    let default_secs = snapshot.interval_duration;
    let default_ms = default_secs.saturating_mul(1000);
    let saved_secs = snapshot.current_interval_duration;
    let saved_ms = saved_secs.saturating_mul(1000);

    let mut intervals_passed = 0;
    let mut time_into_interval_ms = 0;
    let mut current_secs = saved_secs;
    let mut is_quick_add = snapshot.is_quick_add;

    if is_quick_add {
        if interval_elapsed_ms < saved_ms {
            time_into_interval_ms = interval_elapsed_ms;
        } else {
            let after_quick_add = interval_elapsed_ms - saved_ms;
            intervals_passed = 1;
            is_quick_add = false;
            if default_ms > 0 {
                intervals_passed += after_quick_add / default_ms;
                time_into_interval_ms = after_quick_add % default_ms;
                current_secs = default_secs;
            } else {
                current_secs = 0;
            }
        }
    } else if default_ms > 0 {
        intervals_passed = interval_elapsed_ms / default_ms;
        time_into_interval_ms = interval_elapsed_ms % default_ms;
        current_secs = default_secs;
    }

    let interval_remaining_secs = if current_secs > 0 {
        remaining_secs(current_secs.saturating_mul(1000), time_into_interval_ms)
    } else {
        0
    };

    ResumeOutcome::Resumed(ResumedState {
        elapsed_ms,
        interval_count: snapshot.interval_count.saturating_add(intervals_passed),
        circle_color: snapshot.interval_state.advanced_by(intervals_passed),
        interval_remaining_secs,
        current_interval_duration_secs: current_secs,
        is_quick_add,
        time_into_interval_ms,
        status: snapshot.status,
    })
}

/// A persisted session worth offering to the user at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSessionCandidate {
    pub snapshot: SessionSnapshot,
    /// The snapshot was recorded with the currently configured durations.
    pub timing_matches: bool,
}

/// Decide whether a loaded snapshot should be offered for resumption.
pub fn inspect_saved_session(
    snapshot: Option<SessionSnapshot>,
    session_minutes: u64,
    interval_seconds: u64,
) -> Option<SavedSessionCandidate> {
    let snapshot = snapshot.filter(|s| s.session_active)?;
    let timing_matches = snapshot.session_duration == session_minutes.saturating_mul(60)
        && snapshot.interval_duration == interval_seconds;
    Some(SavedSessionCandidate {
        snapshot,
        timing_matches,
    })
}

/// Whether the saved session belongs to `workout_id`.
///
/// A plain timer session (no workout) matches only another plain timer.
pub fn workout_matches(candidate: Option<&SavedSessionCandidate>, workout_id: Option<&str>) -> bool {
    let Some(candidate) = candidate else {
        return false;
    };
    candidate.snapshot.metadata.workout_id.as_deref() == workout_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SessionMetadata;

    const NOW: i64 = 1_000_000;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            session_active: true,
            session_start_time: Some(NOW - 50_000),
            session_duration: 3600,
            interval_duration: 30,
            current_interval_start_time: Some(NOW - 20_000),
            current_interval_duration: 30,
            interval_count: 3,
            interval_state: CircleColor::Teal,
            elapsed_ms: None,
            interval_elapsed_ms: None,
            total_paused_ms: 0,
            interval_paused_ms: 0,
            is_quick_add: false,
            status: SessionStatus::Running,
            metadata: SessionMetadata::default(),
            saved_at: None,
        }
    }

    fn resumed(outcome: ResumeOutcome) -> ResumedState {
        match outcome {
            ResumeOutcome::Resumed(state) => state,
            other => panic!("expected resumed state, got {other:?}"),
        }
    }

    #[test]
    fn resumes_normal_interval_progression() {
        let state = resumed(reconcile(&snapshot(), NOW));
        assert_eq!(state.elapsed_secs(), 50);
        assert_eq!(state.interval_count, 3);
        assert_eq!(state.circle_color, CircleColor::Teal);
        assert_eq!(state.current_interval_duration_secs, 30);
        assert_eq!(state.interval_remaining_secs, 10);
        assert!(!state.is_quick_add);
    }

    #[test]
    fn keeps_unexpired_quick_add() {
        let mut snap = snapshot();
        snap.session_start_time = Some(NOW - 40_000);
        snap.interval_duration = 90;
        snap.current_interval_duration = 30;
        snap.current_interval_start_time = Some(NOW - 10_000);
        snap.interval_count = 4;
        snap.interval_state = CircleColor::Black;
        snap.is_quick_add = true;

        let state = resumed(reconcile(&snap, NOW));
        assert_eq!(state.interval_count, 4);
        assert_eq!(state.circle_color, CircleColor::Black);
        assert_eq!(state.current_interval_duration_secs, 30);
        assert_eq!(state.interval_remaining_secs, 20);
        assert!(state.is_quick_add);
    }

    #[test]
    fn exits_quick_add_and_replays_default_intervals() {
        let mut snap = snapshot();
        snap.session_start_time = Some(NOW - 200_000);
        snap.interval_duration = 90;
        snap.current_interval_duration = 30;
        snap.current_interval_start_time = Some(NOW - 140_000);
        snap.interval_count = 2;
        snap.interval_state = CircleColor::Black;
        snap.is_quick_add = true;

        let state = resumed(reconcile(&snap, NOW));
        assert_eq!(state.interval_count, 4);
        assert_eq!(state.circle_color, CircleColor::Black);
        assert_eq!(state.current_interval_duration_secs, 90);
        assert_eq!(state.interval_remaining_secs, 70);
        assert!(!state.is_quick_add);
    }

    #[test]
    fn rest_phase_hands_back_to_default_alternation() {
        let mut snap = snapshot();
        snap.interval_state = CircleColor::Rest;
        snap.is_quick_add = true;
        snap.current_interval_duration = 10;
        snap.interval_elapsed_ms = Some(15_000);

        let state = resumed(reconcile(&snap, NOW));
        assert_eq!(state.circle_color, CircleColor::Black);
        assert_eq!(state.interval_count, 4);
        assert_eq!(state.interval_remaining_secs, 25);
    }

    #[test]
    fn recorded_counters_win_over_wall_clock() {
        let mut snap = snapshot();
        snap.elapsed_ms = Some(12_345);
        snap.interval_elapsed_ms = Some(2_000);
        let state = resumed(reconcile(&snap, NOW + 999_999));
        assert_eq!(state.elapsed_ms, 12_345);
        assert_eq!(state.interval_remaining_secs, 28);
    }

    #[test]
    fn paused_totals_are_subtracted_when_deriving() {
        let mut snap = snapshot();
        snap.total_paused_ms = 20_000;
        snap.interval_paused_ms = 5_000;
        let state = resumed(reconcile(&snap, NOW));
        assert_eq!(state.elapsed_secs(), 30);
        assert_eq!(state.interval_remaining_secs, 15);
    }

    #[test]
    fn expired_session_is_rejected() {
        let mut snap = snapshot();
        snap.session_duration = 50;
        assert_eq!(reconcile(&snap, NOW), ResumeOutcome::Expired { elapsed_secs: 50 });
    }

    #[test]
    fn inactive_session_is_rejected() {
        let mut snap = snapshot();
        snap.session_active = false;
        assert_eq!(reconcile(&snap, NOW), ResumeOutcome::Inactive);
    }

    #[test]
    fn keeps_paused_status() {
        let mut snap = snapshot();
        snap.status = SessionStatus::Paused;
        assert_eq!(resumed(reconcile(&snap, NOW)).status, SessionStatus::Paused);
    }

    #[test]
    fn candidate_flags_timing_mismatch() {
        let candidate = inspect_saved_session(Some(snapshot()), 60, 30).unwrap();
        assert!(candidate.timing_matches);
        let candidate = inspect_saved_session(Some(snapshot()), 50, 45).unwrap();
        assert!(!candidate.timing_matches);

        let mut inactive = snapshot();
        inactive.session_active = false;
        assert!(inspect_saved_session(Some(inactive), 60, 30).is_none());
        assert!(inspect_saved_session(None, 60, 30).is_none());
    }

    #[test]
    fn workout_match_uses_timer_only_semantics() {
        let mut snap = snapshot();
        snap.metadata.workout_id = Some("w1".into());
        let candidate = inspect_saved_session(Some(snap), 60, 30);
        assert!(workout_matches(candidate.as_ref(), Some("w1")));
        assert!(!workout_matches(candidate.as_ref(), Some("w2")));

        let plain = inspect_saved_session(Some(snapshot()), 60, 30);
        assert!(workout_matches(plain.as_ref(), None));
        assert!(!workout_matches(None, Some("w1")));
    }

    #[test]
    fn oversized_quick_add_does_not_overflow() {
        let mut snap = snapshot();
        snap.is_quick_add = true;
        snap.interval_state = CircleColor::Rest;
        snap.current_interval_duration = u64::MAX / 10;
        let state = resumed(reconcile(&snap, NOW));
        assert!(state.is_quick_add);
        assert_eq!(state.interval_count, 3);
        assert_eq!(state.interval_remaining_secs, u64::MAX.div_ceil(1000) - 20);
    }

    #[test]
    fn interval_count_saturates_on_catch_up() {
        let mut snap = snapshot();
        snap.interval_count = u64::MAX;
        snap.interval_elapsed_ms = Some(61_000);
        let state = resumed(reconcile(&snap, NOW));
        assert_eq!(state.interval_count, u64::MAX);
        assert_eq!(state.circle_color, CircleColor::Teal);
        assert_eq!(state.interval_remaining_secs, 29);
    }

    #[test]
    fn legacy_second_timestamps_resume_correctly() {
        let snap = SessionSnapshot::from_json(
            r#"{"sessionActive": true, "sessionStartTime": 1700000000, "sessionDuration": 3600,
                "intervalDuration": 30, "currentIntervalStartTime": 1700000040,
                "currentIntervalDuration": 30, "intervalCount": 2, "intervalState": "teal",
                "isQuickAdd": false, "status": "running"}"#,
        )
        .unwrap();
        assert_eq!(snap.elapsed_ms, None);
        assert_eq!(snap.session_start_time, Some(1_700_000_000_000));

        let state = resumed(reconcile(&snap, 1_700_000_050_000));
        assert_eq!(state.elapsed_ms, 50_000);
        assert_eq!(state.elapsed_secs(), 50);
        assert_eq!(state.interval_count, 2);
        assert_eq!(state.circle_color, CircleColor::Teal);
        assert_eq!(state.interval_remaining_secs, 20);
    }
}
