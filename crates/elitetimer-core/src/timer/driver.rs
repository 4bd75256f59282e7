//! Tokio host for [`TimerEngine`].
//!
//! A spawned task owns the engine outright. Every mutation arrives as a
//! [`Command`] over one channel and is applied in order, so callbacks from
//! audio, UI and the tick schedule can never interleave inside the engine.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::engine::{TimerEngine, TimerView};
use crate::events::Event;
use crate::host::CountdownToken;
use crate::snapshot::SessionSnapshot;

/// Tick period when no fixed interval is configured (one display frame).
pub const FRAME_TICK: Duration = Duration::from_millis(16);
/// Shortest configurable tick period.
pub const MIN_TICK: Duration = Duration::from_millis(100);

/// Operations the driver applies to its engine.
#[derive(Debug)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Reset,
    QuickAdd(u64),
    CountdownCueFinished(CountdownToken),
    Foreground,
    /// Adopt a persisted session; the reply says whether it was resumed.
    ResumeSession(Box<SessionSnapshot>, oneshot::Sender<bool>),
    Shutdown,
}

/// Cloneable sender side of the command channel.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

/// Sender that does not keep the driver alive.
///
/// Meant for collaborators owned by the engine itself, such as an audio
/// player that reports countdown completion.
#[derive(Debug, Clone)]
pub struct WeakTimerHandle {
    tx: mpsc::WeakUnboundedSender<Command>,
}

/// Receiver side of the command channel, consumed by [`TimerDriver::spawn`].
#[derive(Debug)]
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<Command>,
}

/// Create the command channel before the engine, so collaborators can
/// hold a sender.
pub fn command_channel() -> (TimerHandle, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TimerHandle { tx }, CommandReceiver { rx })
}

impl TimerHandle {
    /// Queue a command. Returns `false` once the driver has stopped.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn start(&self) -> bool {
        self.send(Command::Start)
    }

    pub fn pause(&self) -> bool {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> bool {
        self.send(Command::Resume)
    }

    pub fn reset(&self) -> bool {
        self.send(Command::Reset)
    }

    pub fn quick_add(&self, seconds: u64) -> bool {
        self.send(Command::QuickAdd(seconds))
    }

    pub fn finish_countdown(&self, token: CountdownToken) -> bool {
        self.send(Command::CountdownCueFinished(token))
    }

    pub fn foreground(&self) -> bool {
        self.send(Command::Foreground)
    }

    pub fn shutdown(&self) -> bool {
        self.send(Command::Shutdown)
    }

    /// Ask the driver to adopt `snapshot` and wait for the verdict.
    pub async fn resume_session(&self, snapshot: SessionSnapshot) -> bool {
        let (reply, verdict) = oneshot::channel();
        if !self.send(Command::ResumeSession(Box::new(snapshot), reply)) {
            return false;
        }
        verdict.await.unwrap_or(false)
    }

    pub fn downgrade(&self) -> WeakTimerHandle {
        WeakTimerHandle {
            tx: self.tx.downgrade(),
        }
    }
}

impl WeakTimerHandle {
    /// Report a finished countdown cue. Returns `false` if the driver is gone.
    pub fn finish_countdown(&self, token: CountdownToken) -> bool {
        match self.tx.upgrade() {
            Some(tx) => tx.send(Command::CountdownCueFinished(token)).is_ok(),
            None => false,
        }
    }
}

/// Everything a host needs to talk to a running driver.
#[derive(Debug)]
pub struct DriverHandle {
    /// Latest projection, updated after every step that changed it.
    pub view: watch::Receiver<TimerView>,
    pub events: mpsc::UnboundedReceiver<Event>,
    pub task: JoinHandle<()>,
}

/// Tick period for a configured `tick_interval_ms`.
///
/// Zero selects frame cadence; anything else is clamped to [`MIN_TICK`].
pub fn normalize_tick_interval(tick_interval_ms: u64) -> Duration {
    if tick_interval_ms == 0 {
        FRAME_TICK
    } else {
        Duration::from_millis(tick_interval_ms).max(MIN_TICK)
    }
}

/// Single owner of a [`TimerEngine`] inside a tokio runtime.
pub struct TimerDriver {
    engine: TimerEngine,
    tick_period: Duration,
    commands: mpsc::UnboundedReceiver<Command>,
    view_tx: watch::Sender<TimerView>,
    events_tx: mpsc::UnboundedSender<Event>,
}

impl TimerDriver {
    /// Move `engine` into a new task and start serving `commands`.
    ///
    /// The task ends on [`Command::Shutdown`] or when every strong
    /// [`TimerHandle`] has been dropped; either way the engine is shut down.
    pub fn spawn(engine: TimerEngine, commands: CommandReceiver, tick_interval_ms: u64) -> DriverHandle {
        let (view_tx, view) = watch::channel(engine.view());
        let (events_tx, events) = mpsc::unbounded_channel();
        let driver = Self {
            engine,
            tick_period: normalize_tick_interval(tick_interval_ms),
            commands: commands.rx,
            view_tx,
            events_tx,
        };
        let task = tokio::spawn(driver.run());
        DriverHandle { view, events, task }
    }

    async fn run(mut self) {
        tracing::debug!(target: "elitetimer::driver", "Driver started, tick period {:?}", self.tick_period);
        let mut ticker = tokio::time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut was_ticking = false;
        loop {
            let ticking = self.engine.needs_ticking();
            if ticking && !was_ticking {
                ticker.reset();
            }
            was_ticking = ticking;
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.apply(command),
                },
                _ = ticker.tick(), if ticking => {
                    let event = self.engine.tick();
                    self.publish(event);
                }
            }
        }
        self.engine.shutdown();
        self.publish(None);
        tracing::debug!(target: "elitetimer::driver", "Driver stopped");
    }

    fn apply(&mut self, command: Command) {
        tracing::trace!(target: "elitetimer::driver", "Applying {:?}", command);
        let event = match command {
            Command::Start => self.engine.start(),
            Command::Pause => self.engine.pause(),
            Command::Resume => self.engine.resume(),
            Command::Reset => self.engine.reset(),
            Command::QuickAdd(seconds) => self.engine.quick_add(seconds),
            Command::CountdownCueFinished(token) => self.engine.finish_countdown(token),
            Command::Foreground => self.engine.foreground(),
            Command::ResumeSession(snapshot, reply) => {
                let event = self.engine.restore(&snapshot);
                let _ = reply.send(event.is_some());
                event
            }
            // Handled by the run loop.
            Command::Shutdown => None,
        };
        self.publish(event);
    }

    fn publish(&mut self, event: Option<Event>) {
        let view = self.engine.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
        if let Some(event) = event {
            // The host may have stopped listening; the engine keeps going.
            let _ = self.events_tx.send(event);
        }
    }
}
