mod cadence;
mod driver;
mod engine;
mod interval;
mod resume;
mod stopwatch;

pub use cadence::{should_persist_running, DEFAULT_PERSIST_MIN_INTERVAL_MS};
pub use driver::{
    command_channel, normalize_tick_interval, Command, CommandReceiver, DriverHandle,
    TimerDriver, TimerHandle, WeakTimerHandle, FRAME_TICK, MIN_TICK,
};
pub use engine::{
    Collaborators, EngineConfig, TimerEngine, TimerStatus, TimerView, COUNTDOWN_FALLBACK_MS,
};
pub use interval::{
    active_duration_ms, advance_interval_state, floor_secs, format_clock, interval_progress,
    remaining_secs, total_intervals, CircleColor, IntervalAdvance, IntervalState,
    MAX_COMPLETIONS_PER_TICK,
};
pub use resume::{
    inspect_saved_session, reconcile, workout_matches, ResumeOutcome, ResumedState,
    SavedSessionCandidate,
};
