//! # Elite Timer Core Library
//!
//! This library provides the interval engine behind the Elite Timer workout
//! timer. Every operation is available through the standalone CLI binary;
//! any other host is a thin layer over the same engine.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A clock-driven state machine that requires the caller
//!   to periodically invoke `tick()`, or a tokio [`TimerDriver`] that does it
//! - **Interval Arithmetic**: Pure catch-up, remaining-time and phase math
//! - **Resume Reconciliation**: Rebuilds a session from its persisted snapshot
//!   after a restart or a long suspension
//! - **Storage**: SQLite snapshot slot and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core interval state machine
//! - [`SessionSnapshot`]: The persisted form of an active session
//! - [`Database`]: Snapshot persistence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod error;
pub mod events;
pub mod host;
pub mod snapshot;
pub mod storage;
pub mod timer;

pub use clock::{ManualClock, MonotonicClock, SystemClock, WallClock};
pub use error::{ConfigError, CoreError, SnapshotError, StorageError, TimerError};
pub use events::Event;
pub use host::{AudioCues, CountdownToken, NoWakeHold, SilentAudio, WakeHold, WakeHoldError};
pub use snapshot::{SessionMetadata, SessionSnapshot, SessionStatus};
pub use storage::{Config, Database, MemorySessionStore, SessionStore};
pub use timer::{
    CircleColor, Collaborators, EngineConfig, TimerDriver, TimerEngine, TimerHandle, TimerStatus,
    TimerView,
};
