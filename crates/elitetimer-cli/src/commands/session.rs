use std::io::Write;
use std::time::Duration;

use chrono::Utc;
use clap::Args;
use elitetimer_core::timer::{
    command_channel, format_clock, inspect_saved_session, reconcile, workout_matches,
    CommandReceiver, DriverHandle, ResumeOutcome, WeakTimerHandle,
};
use elitetimer_core::{
    AudioCues, Collaborators, Config, CountdownToken, Database, EngineConfig, Event,
    SessionMetadata, SessionStore, TimerDriver, TimerEngine, TimerHandle, TimerStatus, TimerView,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Args)]
pub struct RunArgs {
    /// Session length in minutes (default: timer.session_minutes)
    #[arg(long)]
    minutes: Option<u64>,
    /// Interval length in seconds (default: timer.interval_seconds)
    #[arg(long)]
    interval: Option<u64>,
    /// Workout this session belongs to
    #[arg(long)]
    workout_id: Option<String>,
    /// Workout display name
    #[arg(long)]
    workout_name: Option<String>,
    /// Print events as JSON lines instead of a clock face
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct ResumeArgs {
    /// Workout the session is expected to belong to
    #[arg(long)]
    workout_id: Option<String>,
    /// Resume even if timing or workout differ from what is expected
    #[arg(long)]
    force: bool,
    /// Print events as JSON lines instead of a clock face
    #[arg(long)]
    json: bool,
}

/// Keyboard input while a session runs.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Pause,
    Resume,
    QuickAdd(u64),
    Reset,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    match line.trim() {
        "p" => Some(Input::Pause),
        "r" => Some(Input::Resume),
        "x" => Some(Input::Reset),
        "q" => Some(Input::Quit),
        other => other
            .strip_prefix('+')
            .and_then(|secs| secs.trim().parse().ok())
            .map(Input::QuickAdd),
    }
}

/// Terminal bell cues.
///
/// The countdown cue runs on its own task and reports back through the
/// driver when it ends, the way a real audio callback would.
struct TerminalAudio {
    driver: WeakTimerHandle,
}

impl AudioCues for TerminalAudio {
    fn play_bell(&mut self) {
        ring();
    }

    fn play_completion_tone(&mut self) {
        ring();
        ring();
    }

    fn play_countdown(&mut self, token: CountdownToken) {
        let driver = self.driver.clone();
        tokio::spawn(async move {
            for _ in 0..3 {
                ring();
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            ring();
            tokio::time::sleep(Duration::from_millis(300)).await;
            driver.finish_countdown(token);
        });
    }
}

fn ring() {
    eprint!("\x07");
}

fn build_engine(
    config: EngineConfig,
    handle: &TimerHandle,
) -> Result<TimerEngine, Box<dyn std::error::Error>> {
    tracing::debug!(
        target: "elitetimer::cli",
        "Session of {}s in {}s intervals",
        config.session_duration_secs,
        config.default_interval_secs
    );
    let db = Database::open()?;
    let collaborators = Collaborators::system(db).with_audio(TerminalAudio {
        driver: handle.downgrade(),
    });
    Ok(TimerEngine::new(config, collaborators)?)
}

fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut engine_config = config.engine_config();
    if let Some(minutes) = args.minutes {
        engine_config.session_duration_secs = minutes.saturating_mul(60);
    }
    if let Some(seconds) = args.interval {
        engine_config.default_interval_secs = seconds;
    }

    let (handle, commands) = command_channel();
    let mut engine = build_engine(engine_config, &handle)?;
    if engine.load_saved_session().is_some() {
        eprintln!("note: the saved session will be replaced once the countdown ends");
    }
    engine.set_metadata(SessionMetadata {
        workout_id: args.workout_id,
        workout_name: args.workout_name,
        ..SessionMetadata::default()
    });

    runtime()?.block_on(run_session(
        engine,
        commands,
        handle,
        config.runtime.tick_interval_ms,
        args.json,
    ))
}

async fn run_session(
    engine: TimerEngine,
    commands: CommandReceiver,
    handle: TimerHandle,
    tick_interval_ms: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let driver = TimerDriver::spawn(engine, commands, tick_interval_ms);
    handle.start();
    interact(driver, handle, json).await
}

pub fn resume(args: ResumeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let (handle, commands) = command_channel();
    let engine = build_engine(config.engine_config(), &handle)?;

    let candidate = inspect_saved_session(
        engine.load_saved_session(),
        config.timer.session_minutes,
        config.timer.interval_seconds,
    )
    .ok_or("session could not be resumed")?;
    if !args.force {
        if !candidate.timing_matches {
            return Err("saved session uses different timing than the config (pass --force to resume it anyway)".into());
        }
        if !workout_matches(Some(&candidate), args.workout_id.as_deref()) {
            return Err("saved session belongs to a different workout (pass --force to resume it anyway)".into());
        }
    }

    runtime()?.block_on(resume_session(
        engine,
        commands,
        handle,
        candidate.snapshot,
        config.runtime.tick_interval_ms,
        args.json,
    ))
}

async fn resume_session(
    engine: TimerEngine,
    commands: CommandReceiver,
    handle: TimerHandle,
    snapshot: elitetimer_core::SessionSnapshot,
    tick_interval_ms: u64,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let driver = TimerDriver::spawn(engine, commands, tick_interval_ms);
    if !handle.resume_session(snapshot).await {
        handle.shutdown();
        driver.task.await?;
        return Err("session could not be resumed".into());
    }
    interact(driver, handle, json).await
}

/// Feed keyboard commands to the driver and render until the session ends
/// or the user quits.
async fn interact(
    mut driver: DriverHandle,
    handle: TimerHandle,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !json {
        eprintln!("keys: p pause, r resume, +N rest N seconds, x reset, q quit and keep the session");
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut frame = tokio::time::interval(Duration::from_millis(250));

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match parse_input(&line) {
                    Some(Input::Pause) => { handle.pause(); }
                    Some(Input::Resume) => { handle.resume(); }
                    Some(Input::QuickAdd(seconds)) => { handle.quick_add(seconds); }
                    Some(Input::Reset) => { handle.reset(); }
                    Some(Input::Quit) => break,
                    None if line.trim().is_empty() => {}
                    None => eprintln!("unrecognized input: {}", line.trim()),
                },
                None => stdin_open = false,
            },
            event = driver.events.recv() => {
                let Some(event) = event else { break };
                report(&event, json)?;
                if matches!(event, Event::SessionCompleted { .. } | Event::SessionReset { .. }) {
                    break;
                }
            }
            _ = frame.tick(), if !json => draw(&driver.view.borrow()),
        }
    }

    let kept = matches!(
        driver.view.borrow().status,
        TimerStatus::Running | TimerStatus::Paused
    );
    handle.shutdown();
    driver.task.await?;
    if kept && !json {
        println!();
        println!("session saved; run `elitetimer-cli resume` to continue");
    }
    Ok(())
}

fn report(event: &Event, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(event)?);
        return Ok(());
    }
    let message = match event {
        Event::CountdownStarted { .. } | Event::CountdownTick { .. } => return Ok(()),
        Event::SessionStarted {
            session_duration_secs,
            interval_duration_secs,
            ..
        } => format!(
            "go: {} in {}s intervals",
            format_clock(*session_duration_secs),
            interval_duration_secs
        ),
        Event::IntervalCompleted {
            interval_count,
            circle_color,
            ..
        } => format!("interval {} ({})", interval_count, circle_color.as_str()),
        Event::QuickAdded { seconds, .. } => format!("resting for {seconds}s"),
        Event::SessionPaused { .. } => "paused".to_string(),
        Event::SessionResumed { .. } => "resumed".to_string(),
        Event::SessionRestored {
            status,
            elapsed_secs,
            ..
        } => format!("restored {} session at {}", status, format_clock(*elapsed_secs)),
        Event::SessionCompleted {
            elapsed_secs,
            interval_count,
            ..
        } => format!(
            "done: {} over {} intervals",
            format_clock(*elapsed_secs),
            interval_count
        ),
        Event::SessionReset { .. } => "session reset".to_string(),
    };
    println!("\r{message:<72}");
    Ok(())
}

fn draw(view: &TimerView) {
    let line = match view.status {
        TimerStatus::Idle => return,
        TimerStatus::Countdown => match view.countdown_number {
            Some(n) => format!("get ready  {n}"),
            None => "get ready  go".to_string(),
        },
        TimerStatus::Running | TimerStatus::Paused => format!(
            "{}  interval {}/{}  {} left  [{}]{}",
            format_clock(view.elapsed_seconds),
            view.interval_count,
            view.total_intervals,
            format_clock(view.interval_remaining),
            view.circle_color.as_str(),
            if view.status == TimerStatus::Paused {
                "  paused"
            } else {
                ""
            }
        ),
    };
    print!("\r{line:<72}");
    let _ = std::io::stdout().flush();
}

pub fn status() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let Some(candidate) = inspect_saved_session(
        db.load()?,
        config.timer.session_minutes,
        config.timer.interval_seconds,
    ) else {
        println!("no saved session");
        return Ok(());
    };

    let snapshot = &candidate.snapshot;
    let preview = match reconcile(snapshot, Utc::now().timestamp_millis()) {
        ResumeOutcome::Resumed(state) => serde_json::json!({
            "status": state.status,
            "elapsedSeconds": state.elapsed_secs(),
            "intervalCount": state.interval_count,
            "intervalRemaining": state.interval_remaining_secs,
            "circleColor": state.circle_color,
            "isQuickAdd": state.is_quick_add,
        }),
        ResumeOutcome::Expired { elapsed_secs } => serde_json::json!({
            "expired": true,
            "elapsedSeconds": elapsed_secs,
        }),
        ResumeOutcome::Inactive => serde_json::Value::Null,
    };
    let report = serde_json::json!({
        "timingMatches": candidate.timing_matches,
        "sessionDuration": snapshot.session_duration,
        "intervalDuration": snapshot.interval_duration,
        "workoutId": snapshot.metadata.workout_id,
        "workoutName": snapshot.metadata.workout_name,
        "savedAt": snapshot.saved_at,
        "resume": preview,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn discard() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;
    db.clear()?;
    println!("saved session discarded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keyboard_input() {
        assert_eq!(parse_input("p"), Some(Input::Pause));
        assert_eq!(parse_input(" r \n"), Some(Input::Resume));
        assert_eq!(parse_input("+45"), Some(Input::QuickAdd(45)));
        assert_eq!(parse_input("+ 10"), Some(Input::QuickAdd(10)));
        assert_eq!(parse_input("x"), Some(Input::Reset));
        assert_eq!(parse_input("q"), Some(Input::Quit));
        assert_eq!(parse_input("+soon"), None);
        assert_eq!(parse_input("pause"), None);
    }
}
