//! Session runtime.
//!
//! The engine is a clock-driven state machine. It does not use internal
//! threads - the caller is responsible for calling `tick()` periodically
//! while [`TimerEngine::needs_ticking`] is true (see [`TimerDriver`] for a
//! tokio host that does this).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Countdown -> Running <-> Paused -> Idle
//!                         \-> Idle (session ran out)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(config, Collaborators::system(store))?;
//! engine.start();
//! // In a loop:
//! engine.tick(); // Returns Some(Event) on countdown steps and interval boundaries
//! ```
//!
//! [`TimerDriver`]: super::TimerDriver

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::cadence::{should_persist_running, DEFAULT_PERSIST_MIN_INTERVAL_MS};
use super::interval::{
    active_duration_ms, advance_interval_state, floor_secs, interval_progress, remaining_secs,
    total_intervals, CircleColor, IntervalState, MAX_COMPLETIONS_PER_TICK,
};
use super::resume::{reconcile, ResumeOutcome};
use super::stopwatch::Stopwatch;
use crate::clock::{MonotonicClock, SystemClock, WallClock};
use crate::error::TimerError;
use crate::events::{event_time, Event};
use crate::host::{AudioCues, CountdownToken, NoWakeHold, SilentAudio, WakeHold};
use crate::snapshot::{SessionMetadata, SessionSnapshot, SessionStatus};
use crate::storage::SessionStore;

/// Wall-clock time after which a countdown finalizes even if the audio cue
/// never reported back.
pub const COUNTDOWN_FALLBACK_MS: i64 = 3400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Countdown,
    Running,
    Paused,
}

impl TimerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerStatus::Idle => "idle",
            TimerStatus::Countdown => "countdown",
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session shape and runtime tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub session_duration_secs: u64,
    pub default_interval_secs: u64,
    /// Minimum spacing of snapshot writes during steady running.
    pub persist_min_interval_ms: i64,
    pub countdown_fallback_ms: i64,
    pub max_completions_per_tick: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_duration_secs: 60 * 60,
            default_interval_secs: 30,
            persist_min_interval_ms: DEFAULT_PERSIST_MIN_INTERVAL_MS,
            countdown_fallback_ms: COUNTDOWN_FALLBACK_MS,
            max_completions_per_tick: MAX_COMPLETIONS_PER_TICK,
        }
    }
}

impl EngineConfig {
    /// Check that the session can actually run.
    ///
    /// # Errors
    /// Returns [`TimerError::InvalidDuration`] for a zero session or interval.
    pub fn validate(&self) -> Result<(), TimerError> {
        if self.session_duration_secs == 0 {
            return Err(TimerError::InvalidDuration("session"));
        }
        if self.default_interval_secs == 0 {
            return Err(TimerError::InvalidDuration("interval"));
        }
        Ok(())
    }
}

/// Host-provided capabilities the engine drives.
pub struct Collaborators {
    pub store: Box<dyn SessionStore>,
    pub audio: Box<dyn AudioCues>,
    pub wake: Box<dyn WakeHold>,
    pub mono: Arc<dyn MonotonicClock>,
    pub wall: Arc<dyn WallClock>,
}

impl Collaborators {
    /// System clock, no audio, no wake-hold.
    pub fn system(store: impl SessionStore + 'static) -> Self {
        let clock = Arc::new(SystemClock::new());
        Self {
            store: Box::new(store),
            audio: Box::new(SilentAudio),
            wake: Box::new(NoWakeHold),
            mono: clock.clone(),
            wall: clock,
        }
    }

    pub fn with_audio(mut self, audio: impl AudioCues + 'static) -> Self {
        self.audio = Box::new(audio);
        self
    }

    pub fn with_wake_hold(mut self, wake: impl WakeHold + 'static) -> Self {
        self.wake = Box::new(wake);
        self
    }

    /// Use one clock for both monotonic and wall readings.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: MonotonicClock + WallClock + 'static,
    {
        let clock = Arc::new(clock);
        let mono: Arc<dyn MonotonicClock> = clock.clone();
        self.mono = mono;
        self.wall = clock;
        self
    }
}

/// Read-only projection for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub status: TimerStatus,
    pub elapsed_seconds: u64,
    pub interval_remaining: u64,
    pub interval_count: u64,
    pub total_intervals: u64,
    pub circle_color: CircleColor,
    pub countdown_number: Option<u8>,
    pub current_interval_duration: u64,
    pub is_quick_add: bool,
    /// Final elapsed seconds of the last naturally completed session.
    pub completed_elapsed_seconds: u64,
    /// 0.0 .. 1.0 progress within the current interval.
    pub interval_progress: f64,
}

#[derive(Debug, Clone, Copy)]
struct Countdown {
    token: CountdownToken,
    started_mono: Duration,
    started_wall_ms: i64,
}

/// Core interval engine.
///
/// Owns every piece of session state; all mutation goes through `&mut self`.
pub struct TimerEngine {
    config: EngineConfig,
    metadata: SessionMetadata,

    store: Box<dyn SessionStore>,
    audio: Box<dyn AudioCues>,
    wake: Box<dyn WakeHold>,
    mono: Arc<dyn MonotonicClock>,
    wall: Arc<dyn WallClock>,

    status: TimerStatus,
    session: Stopwatch,
    interval: Stopwatch,
    interval_count: u64,
    circle_color: CircleColor,
    current_interval_secs: u64,
    is_quick_add: bool,
    elapsed_secs: u64,
    interval_remaining_secs: u64,
    completed_elapsed_secs: u64,

    countdown_generation: u64,
    countdown: Option<Countdown>,
    countdown_number: Option<u8>,

    /// Wall-clock anchors, derived from the stopwatches, for snapshots only.
    session_start_wall_ms: Option<i64>,
    interval_start_wall_ms: Option<i64>,

    last_persist_at_ms: i64,
    wake_held: bool,
    shut_down: bool,
}

impl TimerEngine {
    /// Create an idle engine.
    ///
    /// # Errors
    /// Returns an error if `config` describes a zero-length session or interval.
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Result<Self, TimerError> {
        config.validate()?;
        let Collaborators {
            store,
            audio,
            wake,
            mono,
            wall,
        } = collaborators;
        Ok(Self {
            config,
            metadata: SessionMetadata::default(),
            store,
            audio,
            wake,
            mono,
            wall,
            status: TimerStatus::Idle,
            session: Stopwatch::default(),
            interval: Stopwatch::default(),
            interval_count: 0,
            circle_color: CircleColor::Black,
            current_interval_secs: config.default_interval_secs,
            is_quick_add: false,
            elapsed_secs: 0,
            interval_remaining_secs: config.default_interval_secs,
            completed_elapsed_secs: 0,
            countdown_generation: 0,
            countdown: None,
            countdown_number: None,
            session_start_wall_ms: None,
            interval_start_wall_ms: None,
            last_persist_at_ms: 0,
            wake_held: false,
            shut_down: false,
        })
    }

    /// Attach workout context that is written into every snapshot.
    pub fn with_metadata(mut self, metadata: SessionMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn set_metadata(&mut self, metadata: SessionMetadata) {
        self.metadata = metadata;
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    /// Whether the host should keep calling [`tick`](Self::tick).
    pub fn needs_ticking(&self) -> bool {
        matches!(self.status, TimerStatus::Countdown | TimerStatus::Running)
    }

    /// Token of the countdown in progress, if any.
    pub fn countdown_token(&self) -> Option<CountdownToken> {
        self.countdown.map(|c| c.token)
    }

    pub fn view(&self) -> TimerView {
        TimerView {
            status: self.status,
            elapsed_seconds: self.elapsed_secs,
            interval_remaining: self.interval_remaining_secs,
            interval_count: self.interval_count,
            total_intervals: total_intervals(
                self.config.session_duration_secs,
                self.config.default_interval_secs,
            ),
            circle_color: self.circle_color,
            countdown_number: self.countdown_number,
            current_interval_duration: self.current_interval_secs,
            is_quick_add: self.is_quick_add,
            completed_elapsed_seconds: self.completed_elapsed_secs,
            interval_progress: interval_progress(
                self.interval_remaining_secs,
                self.current_interval_secs,
            ),
        }
    }

    /// The persisted snapshot, if one exists and is usable.
    pub fn load_saved_session(&self) -> Option<SessionSnapshot> {
        match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(target: "elitetimer::store", "Failed to load session snapshot: {}", err);
                None
            }
        }
    }

    /// Drop the persisted snapshot without touching the live session.
    pub fn discard_saved_session(&mut self) {
        self.clear_snapshot();
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin the pre-session countdown. No-op unless idle.
    pub fn start(&mut self) -> Option<Event> {
        if self.status != TimerStatus::Idle {
            return None;
        }
        self.audio.init();

        self.countdown_generation += 1;
        let token = CountdownToken(self.countdown_generation);
        let now_wall = self.wall.now_ms();
        self.countdown = Some(Countdown {
            token,
            started_mono: self.mono.now(),
            started_wall_ms: now_wall,
        });
        self.countdown_number = Some(3);
        self.clear_progress();
        self.status = TimerStatus::Countdown;

        self.audio.play_countdown(token);
        tracing::debug!(target: "elitetimer::engine", "Countdown started ({})", token);
        Some(Event::CountdownStarted {
            token,
            at: event_time(now_wall),
        })
    }

    /// Audio cue for `token` finished. Stale tokens are ignored.
    pub fn finish_countdown(&mut self, token: CountdownToken) -> Option<Event> {
        match self.countdown {
            Some(countdown) if countdown.token == token && self.status == TimerStatus::Countdown => {
                Some(self.begin_session())
            }
            _ => {
                tracing::debug!(target: "elitetimer::engine", "Ignoring stale {}", token);
                None
            }
        }
    }

    /// One scheduler step. Errors are logged and swallowed.
    pub fn tick(&mut self) -> Option<Event> {
        match self.try_tick() {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(target: "elitetimer::engine", "Tick failed: {}", err);
                None
            }
        }
    }

    /// Like [`tick`](Self::tick), but reports failures to the caller.
    pub fn try_tick(&mut self) -> Result<Option<Event>, TimerError> {
        match self.status {
            TimerStatus::Countdown => Ok(self.tick_countdown()),
            TimerStatus::Running => self.tick_running(),
            TimerStatus::Idle | TimerStatus::Paused => Ok(None),
        }
    }

    /// Host returned to the foreground.
    ///
    /// Catches up immediately instead of waiting for the next scheduled tick
    /// and asks for the wake-hold again, since hosts drop it in background.
    pub fn foreground(&mut self) -> Option<Event> {
        match self.status {
            TimerStatus::Running => {
                self.acquire_wake();
                self.tick()
            }
            TimerStatus::Countdown => self.tick(),
            TimerStatus::Idle | TimerStatus::Paused => None,
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.status != TimerStatus::Running {
            return None;
        }
        let now = self.mono.now();
        self.session.freeze(now);
        self.interval.freeze(now);
        self.status = TimerStatus::Paused;
        self.refresh_display(now);
        self.persist(true);

        tracing::info!(target: "elitetimer::engine", "Paused at {}s", self.elapsed_secs);
        Some(Event::SessionPaused {
            elapsed_secs: self.elapsed_secs,
            interval_remaining_secs: self.interval_remaining_secs,
            at: event_time(self.wall.now_ms()),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if self.status != TimerStatus::Paused {
            return None;
        }
        self.audio.init();
        let now = self.mono.now();
        let now_wall = self.wall.now_ms();
        self.session.run(now);
        self.interval.run(now);
        self.status = TimerStatus::Running;
        self.reanchor_wall(now, now_wall);
        self.refresh_display(now);
        self.acquire_wake();
        self.persist(true);

        tracing::info!(target: "elitetimer::engine", "Resumed at {}s", self.elapsed_secs);
        Some(Event::SessionResumed {
            elapsed_secs: self.elapsed_secs,
            interval_remaining_secs: self.interval_remaining_secs,
            at: event_time(now_wall),
        })
    }

    /// Abandon whatever is in progress and return to idle.
    pub fn reset(&mut self) -> Option<Event> {
        self.cancel_countdown();
        self.release_wake();
        self.clear_snapshot();
        self.clear_progress();
        self.completed_elapsed_secs = 0;
        self.status = TimerStatus::Idle;

        tracing::info!(target: "elitetimer::engine", "Session reset");
        Some(Event::SessionReset {
            at: event_time(self.wall.now_ms()),
        })
    }

    /// Replace the current interval with a `seconds`-long rest window.
    ///
    /// Time already spent in the interval is discarded. After the window
    /// ends the default interval length applies again.
    pub fn quick_add(&mut self, seconds: u64) -> Option<Event> {
        if self.status != TimerStatus::Running || seconds == 0 {
            return None;
        }
        let now = self.mono.now();
        let now_wall = self.wall.now_ms();
        self.interval.restart(now, Duration::ZERO);
        self.current_interval_secs = seconds;
        self.is_quick_add = true;
        self.circle_color = CircleColor::Rest;
        self.reanchor_wall(now, now_wall);
        self.refresh_display(now);
        self.persist(true);

        tracing::info!(target: "elitetimer::engine", "Quick-add rest of {}s", seconds);
        Some(Event::QuickAdded {
            seconds,
            interval_count: self.interval_count,
            at: event_time(now_wall),
        })
    }

    /// Adopt a persisted session. Returns whether it was resumed.
    pub fn resume_session(&mut self, snapshot: &SessionSnapshot) -> bool {
        self.restore(snapshot).is_some()
    }

    /// Adopt a persisted session, reporting the resulting event.
    ///
    /// Only accepted while idle. An expired session is cleared from the
    /// store and rejected; it is not replayed as a completion.
    pub fn restore(&mut self, snapshot: &SessionSnapshot) -> Option<Event> {
        if self.status != TimerStatus::Idle {
            tracing::warn!(
                target: "elitetimer::engine",
                "Refusing to restore a session while {}",
                self.status
            );
            return None;
        }

        let now_wall = self.wall.now_ms();
        let state = match reconcile(snapshot, now_wall) {
            ResumeOutcome::Resumed(state) => state,
            ResumeOutcome::Inactive => {
                tracing::debug!(target: "elitetimer::engine", "Saved session is not active");
                return None;
            }
            ResumeOutcome::Expired { elapsed_secs } => {
                tracing::info!(
                    target: "elitetimer::engine",
                    "Saved session already ran out after {}s; discarding",
                    elapsed_secs
                );
                self.clear_snapshot();
                return None;
            }
        };

        let config = EngineConfig {
            session_duration_secs: snapshot.session_duration,
            default_interval_secs: snapshot.interval_duration,
            ..self.config
        };
        if let Err(err) = config.validate() {
            tracing::warn!(target: "elitetimer::engine", "Saved session is unusable: {}", err);
            return None;
        }
        self.config = config;
        self.metadata = snapshot.metadata.clone();

        let now = self.mono.now();
        self.cancel_countdown();
        self.session = Stopwatch::frozen_at(Duration::from_millis(state.elapsed_ms));
        self.interval = Stopwatch::frozen_at(Duration::from_millis(state.time_into_interval_ms));
        self.interval_count = state.interval_count;
        self.circle_color = state.circle_color;
        self.current_interval_secs = state.current_interval_duration_secs;
        self.is_quick_add = state.is_quick_add;
        self.completed_elapsed_secs = 0;

        match state.status {
            SessionStatus::Running => {
                self.session.run(now);
                self.interval.run(now);
                self.status = TimerStatus::Running;
                self.audio.init();
                self.acquire_wake();
            }
            SessionStatus::Paused => {
                self.status = TimerStatus::Paused;
                self.release_wake();
            }
        }
        self.reanchor_wall(now, now_wall);
        self.elapsed_secs = state.elapsed_secs();
        self.interval_remaining_secs = state.interval_remaining_secs;
        self.last_persist_at_ms = 0;
        self.persist(true);

        tracing::info!(
            target: "elitetimer::engine",
            "Restored {} session at {}s, interval {}",
            self.status,
            self.elapsed_secs,
            self.interval_count
        );
        Some(Event::SessionRestored {
            status: self.status,
            elapsed_secs: self.elapsed_secs,
            interval_count: self.interval_count,
            at: event_time(now_wall),
        })
    }

    /// Deterministic teardown. Safe to call more than once.
    ///
    /// An active session gets a final snapshot so nothing throttled is lost.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        if matches!(self.status, TimerStatus::Running | TimerStatus::Paused) {
            self.persist(true);
        }
        if self.status == TimerStatus::Countdown {
            self.status = TimerStatus::Idle;
            self.countdown_number = None;
        }
        self.cancel_countdown();
        self.release_wake();
        tracing::debug!(target: "elitetimer::engine", "Engine shut down");
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn tick_countdown(&mut self) -> Option<Event> {
        let countdown = self.countdown?;
        let waited_mono = self.mono.now().saturating_sub(countdown.started_mono).as_millis() as i64;
        let waited_wall = self.wall.now_ms() - countdown.started_wall_ms;
        let waited_ms = waited_mono.max(waited_wall).max(0);

        if waited_ms >= self.config.countdown_fallback_ms {
            tracing::debug!(
                target: "elitetimer::engine",
                "{} cue did not report back after {}ms; finalizing",
                countdown.token,
                waited_ms
            );
            return Some(self.begin_session());
        }

        let number = countdown_number(waited_ms);
        if number == self.countdown_number {
            return None;
        }
        self.countdown_number = number;
        Some(Event::CountdownTick {
            number,
            at: event_time(self.wall.now_ms()),
        })
    }

    fn tick_running(&mut self) -> Result<Option<Event>, TimerError> {
        if self.session_start_wall_ms.is_none() || self.interval_start_wall_ms.is_none() {
            return Err(TimerError::MissingAnchor);
        }
        let now = self.mono.now();
        let now_wall = self.wall.now_ms();

        let elapsed_ms = self.session.elapsed_ms(now);
        if floor_secs(elapsed_ms) >= self.config.session_duration_secs {
            return Ok(Some(self.complete(elapsed_ms, now_wall)));
        }

        let advance = advance_interval_state(
            IntervalState {
                interval_elapsed_ms: self.interval.elapsed_ms(now),
                active_duration_ms: active_duration_ms(self.current_interval_secs),
                interval_count: self.interval_count,
                circle_color: self.circle_color,
                current_interval_duration_secs: self.current_interval_secs,
            },
            self.config.default_interval_secs,
            self.config.max_completions_per_tick.max(1),
        );

        if advance.completions == 0 {
            self.refresh_display(now);
            self.persist(false);
            return Ok(None);
        }

        let next = advance.state;
        self.interval
            .restart(now, Duration::from_millis(next.interval_elapsed_ms));
        self.interval_count = next.interval_count;
        self.circle_color = next.circle_color;
        self.current_interval_secs = next.current_interval_duration_secs;
        self.is_quick_add = false;
        self.reanchor_wall(now, now_wall);
        self.refresh_display(now);

        self.audio.play_bell();
        if advance.is_saturated() {
            tracing::warn!(
                target: "elitetimer::engine",
                "Resolved {} intervals in one tick; deferring the rest",
                advance.completions
            );
        }
        self.persist(true);

        Ok(Some(Event::IntervalCompleted {
            interval_count: self.interval_count,
            circle_color: self.circle_color,
            completions: advance.completions,
            at: event_time(now_wall),
        }))
    }

    /// Countdown is over: enter the first interval.
    fn begin_session(&mut self) -> Event {
        let now = self.mono.now();
        let now_wall = self.wall.now_ms();
        self.countdown = None;
        self.countdown_number = None;

        self.session = Stopwatch::default();
        self.session.run(now);
        self.interval = Stopwatch::default();
        self.interval.run(now);
        self.interval_count = 1;
        self.circle_color = CircleColor::Teal;
        self.current_interval_secs = self.config.default_interval_secs;
        self.is_quick_add = false;
        self.completed_elapsed_secs = 0;
        self.status = TimerStatus::Running;
        self.reanchor_wall(now, now_wall);
        self.refresh_display(now);
        self.acquire_wake();
        self.persist(true);

        tracing::info!(
            target: "elitetimer::engine",
            "Session started: {}s in {}s intervals",
            self.config.session_duration_secs,
            self.config.default_interval_secs
        );
        Event::SessionStarted {
            session_duration_secs: self.config.session_duration_secs,
            interval_duration_secs: self.config.default_interval_secs,
            at: event_time(now_wall),
        }
    }

    /// Session ran its full length.
    fn complete(&mut self, elapsed_ms: u64, now_wall: i64) -> Event {
        self.audio.play_completion_tone();
        let elapsed_secs = floor_secs(elapsed_ms);

        self.session = Stopwatch::frozen_at(Duration::from_millis(elapsed_ms));
        self.interval = Stopwatch::default();
        self.current_interval_secs = self.config.default_interval_secs;
        self.is_quick_add = false;
        self.elapsed_secs = elapsed_secs;
        self.interval_remaining_secs = self.config.default_interval_secs;
        self.completed_elapsed_secs = elapsed_secs;
        self.session_start_wall_ms = None;
        self.interval_start_wall_ms = None;
        self.status = TimerStatus::Idle;

        self.release_wake();
        self.cancel_countdown();
        self.clear_snapshot();

        tracing::info!(
            target: "elitetimer::engine",
            "Session completed after {}s and {} intervals",
            elapsed_secs,
            self.interval_count
        );
        Event::SessionCompleted {
            elapsed_secs,
            interval_count: self.interval_count,
            at: event_time(now_wall),
        }
    }

    /// Zero every counter of the previous session.
    fn clear_progress(&mut self) {
        self.session = Stopwatch::default();
        self.interval = Stopwatch::default();
        self.interval_count = 0;
        self.circle_color = CircleColor::Black;
        self.current_interval_secs = self.config.default_interval_secs;
        self.is_quick_add = false;
        self.elapsed_secs = 0;
        self.interval_remaining_secs = self.config.default_interval_secs;
        self.session_start_wall_ms = None;
        self.interval_start_wall_ms = None;
        self.last_persist_at_ms = 0;
    }

    /// Invalidate any outstanding countdown token.
    fn cancel_countdown(&mut self) {
        self.countdown_generation += 1;
        self.countdown = None;
        self.countdown_number = None;
    }

    fn refresh_display(&mut self, now: Duration) {
        self.elapsed_secs = floor_secs(self.session.elapsed_ms(now));
        self.interval_remaining_secs = remaining_secs(
            active_duration_ms(self.current_interval_secs),
            self.interval.elapsed_ms(now),
        );
    }

    fn reanchor_wall(&mut self, now: Duration, now_wall: i64) {
        self.session_start_wall_ms = Some(now_wall - self.session.elapsed_ms(now) as i64);
        self.interval_start_wall_ms = Some(now_wall - self.interval.elapsed_ms(now) as i64);
    }

    fn snapshot(&self, now_wall: i64) -> Result<SessionSnapshot, TimerError> {
        let (Some(session_start), Some(interval_start)) =
            (self.session_start_wall_ms, self.interval_start_wall_ms)
        else {
            return Err(TimerError::MissingAnchor);
        };
        let now = self.mono.now();
        Ok(SessionSnapshot {
            session_active: true,
            session_start_time: Some(session_start),
            session_duration: self.config.session_duration_secs,
            interval_duration: self.config.default_interval_secs,
            current_interval_start_time: Some(interval_start),
            current_interval_duration: self.current_interval_secs,
            interval_count: self.interval_count,
            interval_state: self.circle_color,
            elapsed_ms: Some(self.session.elapsed_ms(now)),
            interval_elapsed_ms: Some(self.interval.elapsed_ms(now)),
            total_paused_ms: 0,
            interval_paused_ms: 0,
            is_quick_add: self.is_quick_add,
            status: if self.status == TimerStatus::Paused {
                SessionStatus::Paused
            } else {
                SessionStatus::Running
            },
            metadata: self.metadata.clone(),
            saved_at: Some(now_wall),
        })
    }

    /// Write a snapshot. Unforced writes go through the cadence gate.
    fn persist(&mut self, force: bool) {
        let now_wall = self.wall.now_ms();
        if !force
            && !should_persist_running(
                self.last_persist_at_ms,
                now_wall,
                self.config.persist_min_interval_ms,
            )
        {
            return;
        }
        // A failed write still counts, so a broken store is not retried every frame.
        self.last_persist_at_ms = now_wall;

        let snapshot = match self.snapshot(now_wall) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(target: "elitetimer::store", "Cannot build snapshot: {}", err);
                return;
            }
        };
        match self.store.save(&snapshot) {
            Ok(()) => tracing::trace!(target: "elitetimer::store", "Snapshot saved"),
            Err(err) => {
                tracing::warn!(target: "elitetimer::store", "Failed to save snapshot: {}", err)
            }
        }
    }

    fn clear_snapshot(&mut self) {
        if let Err(err) = self.store.clear() {
            tracing::warn!(target: "elitetimer::store", "Failed to clear snapshot: {}", err);
        }
    }

    fn acquire_wake(&mut self) {
        match self.wake.acquire() {
            Ok(()) => self.wake_held = true,
            Err(err) => {
                self.wake_held = false;
                tracing::debug!(target: "elitetimer::engine", "Wake-hold unavailable: {}", err);
            }
        }
    }

    fn release_wake(&mut self) {
        if self.wake_held {
            self.wake.release();
            self.wake_held = false;
        }
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("config", &self.config)
            .field("status", &self.status)
            .field("interval_count", &self.interval_count)
            .field("circle_color", &self.circle_color)
            .field("countdown_generation", &self.countdown_generation)
            .finish_non_exhaustive()
    }
}

/// Number shown `waited_ms` into the countdown.
fn countdown_number(waited_ms: i64) -> Option<u8> {
    match waited_ms {
        i64::MIN..=999 => Some(3),
        1000..=1999 => Some(2),
        2000..=2999 => Some(1),
        _ => None,
    }
}
