//! Clock capabilities injected into the engine.
//!
//! Live deltas are always measured on a [`MonotonicClock`]; the
//! [`WallClock`] only seeds persisted timestamps and the countdown fallback,
//! so system clock adjustments never skew a running session.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

/// Monotonic time since an arbitrary, fixed origin.
pub trait MonotonicClock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Calendar time as Unix epoch milliseconds.
pub trait WallClock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Process clock: `Instant` for monotonic time, chrono `Utc` for wall time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl WallClock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for tests and replays.
///
/// Clones share the same time, so a test can keep one handle while the
/// engine owns another. [`advance`](Self::advance) moves both the monotonic
/// and the wall reading; [`jump_wall`](Self::jump_wall) moves only the wall
/// reading, which is what a system clock adjustment looks like.
#[derive(Debug, Clone)]
pub struct ManualClock {
    mono_ms: Arc<AtomicU64>,
    wall_ms: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(wall_ms: i64) -> Self {
        Self {
            mono_ms: Arc::new(AtomicU64::new(0)),
            wall_ms: Arc::new(AtomicI64::new(wall_ms)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let ms = by.as_millis() as u64;
        self.mono_ms.fetch_add(ms, Ordering::SeqCst);
        self.wall_ms.fetch_add(ms as i64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    pub fn jump_wall(&self, delta_ms: i64) {
        self.wall_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.mono_ms.load(Ordering::SeqCst))
    }
}

impl WallClock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.wall_ms.load(Ordering::SeqCst)
    }
}
