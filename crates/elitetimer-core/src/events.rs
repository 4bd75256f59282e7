use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::host::CountdownToken;
use crate::timer::{CircleColor, TimerStatus};

/// Every state change of the engine produces an Event.
/// Hosts forward them to the UI; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CountdownStarted {
        token: CountdownToken,
        at: DateTime<Utc>,
    },
    /// Displayed countdown number changed. `None` once the cue is over.
    CountdownTick {
        number: Option<u8>,
        at: DateTime<Utc>,
    },
    SessionStarted {
        session_duration_secs: u64,
        interval_duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// One or more interval boundaries were crossed in a single tick.
    IntervalCompleted {
        interval_count: u64,
        circle_color: CircleColor,
        completions: u32,
        at: DateTime<Utc>,
    },
    QuickAdded {
        seconds: u64,
        interval_count: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        elapsed_secs: u64,
        interval_remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        elapsed_secs: u64,
        interval_remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A persisted session was adopted after a restart.
    SessionRestored {
        status: TimerStatus,
        elapsed_secs: u64,
        interval_count: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        elapsed_secs: u64,
        interval_count: u64,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
}

/// Timestamp for an event raised at wall time `ms`.
pub(crate) fn event_time(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::IntervalCompleted {
            interval_count: 4,
            circle_color: CircleColor::Black,
            completions: 2,
            at: event_time(1_700_000_000_000),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "IntervalCompleted");
        assert_eq!(json["circle_color"], "black");
        assert_eq!(json["at"], "2023-11-14T22:13:20Z");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
