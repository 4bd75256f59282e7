//! Interval arithmetic.
//!
//! Pure functions that turn elapsed milliseconds into interval counts,
//! remaining seconds and phase colors. The session runtime calls
//! [`advance_interval_state`] on every tick; resume reconciliation uses
//! [`CircleColor::advanced_by`] to replay long gaps in one step.

use serde::{Deserialize, Serialize};

/// Default bound on interval completions resolved by a single tick.
pub const MAX_COMPLETIONS_PER_TICK: u32 = 2048;

/// Phase indicator of the current interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircleColor {
    Black,
    Teal,
    /// Quick-add rest window.
    Rest,
}

impl CircleColor {
    /// Color after one natural interval completion.
    ///
    /// Black and teal alternate. A rest window hands back to black.
    pub fn next(self) -> Self {
        match self {
            CircleColor::Black => CircleColor::Teal,
            CircleColor::Teal => CircleColor::Black,
            CircleColor::Rest => CircleColor::Black,
        }
    }

    /// Color after `completions` natural completions, in constant time.
    pub fn advanced_by(self, completions: u64) -> Self {
        if completions == 0 {
            return self;
        }
        let first = self.next();
        if (completions - 1) % 2 == 0 {
            first
        } else {
            first.next()
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CircleColor::Black => "black",
            CircleColor::Teal => "teal",
            CircleColor::Rest => "rest",
        }
    }
}

/// Interval counters before and after a tick's catch-up pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalState {
    /// Time spent inside the current interval.
    pub interval_elapsed_ms: u64,
    /// Length of the current interval, at least 1ms.
    pub active_duration_ms: u64,
    pub interval_count: u64,
    pub circle_color: CircleColor,
    /// Length of the current interval as shown to the caller.
    pub current_interval_duration_secs: u64,
}

/// Result of [`advance_interval_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalAdvance {
    pub state: IntervalState,
    /// Interval boundaries crossed in this pass.
    pub completions: u32,
}

impl IntervalAdvance {
    /// Whether overflow was left for the next tick because the cap was hit.
    pub fn is_saturated(&self) -> bool {
        self.state.interval_elapsed_ms >= self.state.active_duration_ms
    }
}

/// Active duration for an interval length given in seconds.
///
/// Clamped to 1ms so a corrupted zero duration cannot stall the loop.
pub fn active_duration_ms(duration_secs: u64) -> u64 {
    duration_secs.saturating_mul(1000).max(1)
}

/// Resolve every interval boundary crossed since the last tick.
///
/// The quick-add override is one-shot: after the first completion every
/// following interval uses `default_interval_secs`. At most
/// `max_completions` boundaries are resolved; any remainder stays in
/// `interval_elapsed_ms` for the next call.
pub fn advance_interval_state(
    mut state: IntervalState,
    default_interval_secs: u64,
    max_completions: u32,
) -> IntervalAdvance {
    let mut completions = 0;
    while state.interval_elapsed_ms >= state.active_duration_ms && completions < max_completions {
        state.interval_elapsed_ms -= state.active_duration_ms;
        completions += 1;
        state.interval_count = state.interval_count.saturating_add(1);
        state.circle_color = state.circle_color.next();
        state.current_interval_duration_secs = default_interval_secs;
        state.active_duration_ms = active_duration_ms(default_interval_secs);
    }
    IntervalAdvance { state, completions }
}

/// Whole seconds elapsed, rounded down.
pub fn floor_secs(ms: u64) -> u64 {
    ms / 1000
}

/// Whole seconds left of `duration_ms`, rounded up and never negative.
pub fn remaining_secs(duration_ms: u64, elapsed_ms: u64) -> u64 {
    duration_ms.saturating_sub(elapsed_ms).div_ceil(1000)
}

/// Number of intervals a session spans, counting a partial last one.
pub fn total_intervals(session_secs: u64, interval_secs: u64) -> u64 {
    if interval_secs == 0 {
        return 0;
    }
    session_secs.div_ceil(interval_secs)
}

/// 0.0 .. 1.0 progress within the current interval.
pub fn interval_progress(remaining_secs: u64, duration_secs: u64) -> f64 {
    if duration_secs == 0 {
        return 0.0;
    }
    1.0 - (remaining_secs as f64 / duration_secs as f64)
}

/// `MM:SS` clock face. Minutes keep counting past 59.
pub fn format_clock(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn running(elapsed_ms: u64, duration_secs: u64, color: CircleColor) -> IntervalState {
        IntervalState {
            interval_elapsed_ms: elapsed_ms,
            active_duration_ms: active_duration_ms(duration_secs),
            interval_count: 1,
            circle_color: color,
            current_interval_duration_secs: duration_secs,
        }
    }

    #[test]
    fn colors_alternate_and_rest_exits_to_black() {
        assert_eq!(CircleColor::Black.next(), CircleColor::Teal);
        assert_eq!(CircleColor::Teal.next(), CircleColor::Black);
        assert_eq!(CircleColor::Rest.next(), CircleColor::Black);
    }

    #[test]
    fn interval_count_saturates() {
        let mut state = running(31_000, 30, CircleColor::Teal);
        state.interval_count = u64::MAX;
        let out = advance_interval_state(state, 30, 2048);
        assert_eq!(out.completions, 1);
        assert_eq!(out.state.interval_count, u64::MAX);
        assert_eq!(out.state.interval_elapsed_ms, 1_000);
    }

    #[test]
    fn no_completion_before_boundary() {
        let out = advance_interval_state(running(29_999, 30, CircleColor::Teal), 30, 2048);
        assert_eq!(out.completions, 0);
        assert_eq!(out.state.interval_count, 1);
        assert_eq!(out.state.circle_color, CircleColor::Teal);
    }

    #[test]
    fn catches_up_several_intervals_and_keeps_overflow() {
        let out = advance_interval_state(running(95_500, 30, CircleColor::Teal), 30, 2048);
        assert_eq!(out.completions, 3);
        assert_eq!(out.state.interval_count, 4);
        assert_eq!(out.state.circle_color, CircleColor::Black);
        assert_eq!(out.state.interval_elapsed_ms, 5_500);
    }

    #[test]
    fn quick_add_override_is_one_shot() {
        let out = advance_interval_state(running(40_000, 10, CircleColor::Rest), 90, 2048);
        assert_eq!(out.completions, 1);
        assert_eq!(out.state.circle_color, CircleColor::Black);
        assert_eq!(out.state.current_interval_duration_secs, 90);
        assert_eq!(out.state.active_duration_ms, 90_000);
        assert_eq!(out.state.interval_elapsed_ms, 30_000);
    }

    #[test]
    fn zero_default_duration_is_bounded_by_cap() {
        let out = advance_interval_state(running(10_000, 0, CircleColor::Black), 0, 2048);
        assert_eq!(out.completions, 2048);
        assert!(out.is_saturated());
        assert_eq!(out.state.interval_elapsed_ms, 10_000 - 2048);
    }

    #[test]
    fn rounding_rules() {
        assert_eq!(floor_secs(59_999), 59);
        assert_eq!(remaining_secs(30_000, 20_001), 10);
        assert_eq!(remaining_secs(30_000, 29_999), 1);
        assert_eq!(remaining_secs(30_000, 30_000), 0);
        assert_eq!(remaining_secs(30_000, 45_000), 0);
    }

    #[test]
    fn totals_and_progress() {
        assert_eq!(total_intervals(3600, 30), 120);
        assert_eq!(total_intervals(100, 30), 4);
        assert_eq!(total_intervals(100, 0), 0);
        assert_eq!(interval_progress(10, 30), 1.0 - 10.0 / 30.0);
        assert_eq!(interval_progress(10, 0), 0.0);
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(754), "12:34");
        assert_eq!(format_clock(6000), "100:00");
    }

    proptest! {
        #[test]
        fn advanced_by_matches_repeated_next(start in 0usize..3, n in 0u64..500) {
            let color = [CircleColor::Black, CircleColor::Teal, CircleColor::Rest][start];
            let mut expected = color;
            for _ in 0..n {
                expected = expected.next();
            }
            prop_assert_eq!(color.advanced_by(n), expected);
        }

        #[test]
        fn natural_completions_alternate(elapsed in 0u64..600_000, secs in 1u64..120) {
            let before = running(elapsed, secs, CircleColor::Teal);
            let out = advance_interval_state(before, secs, 2048);
            prop_assert_ne!(out.state.circle_color, CircleColor::Rest);
            let expected = if out.completions % 2 == 0 { CircleColor::Teal } else { CircleColor::Black };
            prop_assert_eq!(out.state.circle_color, expected);
            prop_assert_eq!(out.state.interval_count, 1 + out.completions as u64);
            prop_assert!(out.state.interval_elapsed_ms < out.state.active_duration_ms);
        }
    }
}
