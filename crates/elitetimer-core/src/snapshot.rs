//! Persisted session snapshot.
//!
//! The snapshot is the only state that survives a restart. It is written as
//! camelCase JSON and read back leniently: older payloads may lack the
//! elapsed counters, carry paused totals, or store timestamps in seconds.
//! All of that is resolved here, once, so the resume arithmetic only ever
//! sees validated millisecond values.

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::timer::CircleColor;

/// Lower bound (exclusive) of the legacy "epoch seconds" range.
const LEGACY_SECONDS_MIN: f64 = 1_000_000_000.0;
/// Upper bound (exclusive) of the legacy "epoch seconds" range.
const LEGACY_SECONDS_MAX: f64 = 100_000_000_000.0;
/// Largest duration, count or paused total accepted from storage.
/// Anything bigger is corruption, not a workout.
const MAX_STORED_QUANTITY: f64 = 1_000_000_000_000.0;

/// Status recorded in a snapshot. Idle and countdown are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Paused,
}

/// Workout context carried alongside the timer state. Opaque to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    #[serde(default)]
    pub workout_id: Option<String>,
    #[serde(default)]
    pub workout_name: Option<String>,
    #[serde(default)]
    pub exercise_progress: serde_json::Value,
}

/// Validated snapshot of an active session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawSnapshot")]
pub struct SessionSnapshot {
    pub session_active: bool,
    /// Wall-clock session start, epoch ms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_start_time: Option<i64>,
    /// Seconds.
    pub session_duration: u64,
    /// Configured default interval, seconds.
    pub interval_duration: u64,
    /// Wall-clock start of the current interval, epoch ms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_interval_start_time: Option<i64>,
    /// Seconds; differs from `interval_duration` during a quick-add.
    pub current_interval_duration: u64,
    pub interval_count: u64,
    pub interval_state: CircleColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_elapsed_ms: Option<u64>,
    #[serde(rename = "totalPaused", skip_serializing_if = "is_zero")]
    pub total_paused_ms: u64,
    #[serde(rename = "intervalPaused", skip_serializing_if = "is_zero")]
    pub interval_paused_ms: u64,
    pub is_quick_add: bool,
    pub status: SessionStatus,
    #[serde(default)]
    pub metadata: SessionMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<i64>,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl SessionSnapshot {
    /// Parse and validate a stored payload.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let raw: RawSnapshot = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_paused(&self) -> bool {
        self.status == SessionStatus::Paused
    }
}

/// Interpret a stored epoch timestamp as milliseconds.
///
/// Non-positive or non-finite values mean "not recorded". Values in the
/// `(1e9, 1e11)` range are epoch seconds written by old builds and are
/// scaled up; real millisecond timestamps in that range would predate 1973.
pub fn normalize_epoch_ms(value: f64) -> Option<i64> {
    if !value.is_finite() || value <= 0.0 {
        return None;
    }
    if value > LEGACY_SECONDS_MIN && value < LEGACY_SECONDS_MAX {
        return Some((value * 1000.0) as i64);
    }
    Some(value as i64)
}

/// Wire shape accepted on read. Every field is optional and loosely typed.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawSnapshot {
    session_active: Option<bool>,
    session_start_time: Option<f64>,
    session_duration: Option<f64>,
    interval_duration: Option<f64>,
    current_interval_start_time: Option<f64>,
    current_interval_duration: Option<f64>,
    interval_count: Option<f64>,
    interval_state: Option<String>,
    elapsed_ms: Option<f64>,
    interval_elapsed_ms: Option<f64>,
    total_paused: Option<f64>,
    interval_paused: Option<f64>,
    is_quick_add: Option<bool>,
    status: Option<String>,
    metadata: Option<SessionMetadata>,
    saved_at: Option<f64>,
}

fn checked(field: &'static str, value: Option<f64>) -> Result<Option<f64>, SnapshotError> {
    match value {
        Some(v) if !v.is_finite() || !(0.0..=MAX_STORED_QUANTITY).contains(&v) => {
            Err(SnapshotError::InvalidField { field, value: v })
        }
        other => Ok(other),
    }
}

/// Elapsed counters are allowed to be negative: that marks them as unset.
fn recorded_ms(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}

impl TryFrom<RawSnapshot> for SessionSnapshot {
    type Error = SnapshotError;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        let session_duration = checked("sessionDuration", raw.session_duration)?.unwrap_or(0.0);
        let interval_duration = checked("intervalDuration", raw.interval_duration)?.unwrap_or(0.0);
        let current_interval_duration =
            checked("currentIntervalDuration", raw.current_interval_duration)?
                .unwrap_or(interval_duration);
        let interval_count = checked("intervalCount", raw.interval_count)?.unwrap_or(0.0);
        let total_paused = checked("totalPaused", raw.total_paused)?.unwrap_or(0.0);
        let interval_paused = checked("intervalPaused", raw.interval_paused)?.unwrap_or(0.0);

        let interval_state = match raw.interval_state.as_deref() {
            Some("teal") => CircleColor::Teal,
            Some("rest") => CircleColor::Rest,
            _ => CircleColor::Black,
        };
        let status = match raw.status.as_deref() {
            Some("paused") => SessionStatus::Paused,
            _ => SessionStatus::Running,
        };

        Ok(Self {
            session_active: raw.session_active.unwrap_or(false),
            session_start_time: raw.session_start_time.and_then(normalize_epoch_ms),
            session_duration: session_duration as u64,
            interval_duration: interval_duration as u64,
            current_interval_start_time: raw.current_interval_start_time.and_then(normalize_epoch_ms),
            current_interval_duration: current_interval_duration as u64,
            interval_count: interval_count.floor() as u64,
            interval_state,
            elapsed_ms: recorded_ms(raw.elapsed_ms),
            interval_elapsed_ms: recorded_ms(raw.interval_elapsed_ms),
            total_paused_ms: total_paused as u64,
            interval_paused_ms: interval_paused as u64,
            is_quick_add: raw.is_quick_add.unwrap_or(false),
            status,
            metadata: raw.metadata.unwrap_or_default(),
            saved_at: raw.saved_at.and_then(normalize_epoch_ms),
        })
    }
}
