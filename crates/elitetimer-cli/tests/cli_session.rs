//! CLI E2E tests for session and config commands.

mod common;

use common::*;
use std::time::Duration;

#[test]
fn status_without_saved_session() {
    let home = tempfile::tempdir().unwrap();
    let stdout = run_cli_success(home.path(), &["status"]);
    assert!(stdout.contains("no saved session"));
}

#[test]
fn resume_without_saved_session_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, _) = run_cli_failure(home.path(), &["resume"]);
    assert!(stderr.contains("session could not be resumed"));
}

#[test]
fn config_get_and_set() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(run_cli_success(home.path(), &["config", "get", "timer.interval_seconds"]).trim(), "30");
    assert_eq!(run_cli_success(home.path(), &["config", "set", "timer.interval_seconds", "45"]).trim(), "ok");
    assert_eq!(run_cli_success(home.path(), &["config", "get", "timer.interval_seconds"]).trim(), "45");

    let shown = run_cli_success(home.path(), &["config", "show"]);
    assert!(shown.contains("interval_seconds = 45"));

    run_cli_failure(home.path(), &["config", "set", "timer.interval_seconds", "0"]);
    run_cli_failure(home.path(), &["config", "get", "timer.nope"]);
}

#[test]
fn quitting_during_countdown_saves_nothing() {
    let home = tempfile::tempdir().unwrap();
    let (_, code) = run_cli_interactive(
        home.path(),
        &["run", "--json"],
        &[(Duration::from_millis(200), "q")],
    );
    assert_eq!(code, 0);
    assert!(run_cli_success(home.path(), &["status"]).contains("no saved session"));
}

#[test]
fn paused_session_is_kept_resumed_and_discarded() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, code) = run_cli_interactive(
        home.path(),
        &["run", "--json", "--workout-id", "legs"],
        &[(Duration::from_millis(4_500), "p"), (Duration::from_millis(300), "q")],
    );
    assert_eq!(code, 0);
    let types: Vec<String> = stdout
        .lines()
        .map(|line| parse_json::<serde_json::Value>(line)["type"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(types.first().map(String::as_str), Some("CountdownStarted"));
    assert!(types.iter().any(|t| t == "SessionStarted"));
    assert_eq!(types.last().map(String::as_str), Some("SessionPaused"));

    let status: serde_json::Value = parse_json(&run_cli_success(home.path(), &["status"]));
    assert_eq!(status["timingMatches"], true);
    assert_eq!(status["workoutId"], "legs");
    assert_eq!(status["resume"]["status"], "paused");
    assert_eq!(status["resume"]["intervalCount"], 1);

    // Wrong workout is refused unless forced.
    run_cli_failure(home.path(), &["resume"]);
    let (stdout, code) = run_cli_interactive(
        home.path(),
        &["resume", "--json", "--workout-id", "legs"],
        &[(Duration::from_millis(300), "q")],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("\"SessionRestored\""));

    assert!(run_cli_success(home.path(), &["discard"]).contains("discarded"));
    assert!(run_cli_success(home.path(), &["status"]).contains("no saved session"));
}
