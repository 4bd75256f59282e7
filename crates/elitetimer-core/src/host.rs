//! Side-effect collaborators supplied by the host: audio cues and the
//! display wake-hold.
//!
//! Both are best effort. The engine never depends on them for correctness;
//! a dropped countdown callback is covered by the wall-clock fallback and a
//! failed wake-hold only changes how the device screen behaves.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generation number identifying one countdown.
///
/// Handed to [`AudioCues::play_countdown`] and quoted back by the host when
/// the cue finishes. A token from an earlier countdown (one that was reset or
/// replaced by a new `start`) no longer matches and is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CountdownToken(pub u64);

impl fmt::Display for CountdownToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "countdown#{}", self.0)
    }
}

/// Audio cue player.
pub trait AudioCues: Send {
    /// Prepare the output device. Called before every countdown and resume.
    fn init(&mut self) {}

    /// Interval boundary bell. Fired once per tick batch.
    fn play_bell(&mut self);

    /// Session finished.
    fn play_completion_tone(&mut self) {
        self.play_bell();
    }

    /// Start the ~3.4s countdown sequence (three low tones, one high).
    ///
    /// When the sequence ends the host should call
    /// [`TimerEngine::finish_countdown`](crate::timer::TimerEngine::finish_countdown)
    /// with this token.
    fn play_countdown(&mut self, token: CountdownToken);
}

/// Failure to acquire a wake-hold. Logged, never acted upon.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("wake-hold unavailable: {0}")]
pub struct WakeHoldError(pub String);

/// Keeps the host display awake while a session runs.
pub trait WakeHold: Send {
    fn acquire(&mut self) -> Result<(), WakeHoldError>;
    fn release(&mut self);
}

/// Audio sink that plays nothing.
///
/// The countdown then always finalizes through the wall-clock fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudio;

impl AudioCues for SilentAudio {
    fn play_bell(&mut self) {}

    fn play_countdown(&mut self, _token: CountdownToken) {}
}

/// Wake-hold for hosts without a display to keep awake.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWakeHold;

impl WakeHold for NoWakeHold {
    fn acquire(&mut self) -> Result<(), WakeHoldError> {
        Err(WakeHoldError("not supported on this host".into()))
    }

    fn release(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_hold_error_reads_as_unavailable() {
        let err = NoWakeHold.acquire().unwrap_err();
        assert_eq!(err.to_string(), "wake-hold unavailable: not supported on this host");
        let source: &dyn std::error::Error = &err;
        assert!(source.source().is_none());
    }
}
