//! Common utilities for CLI E2E tests.
//!
//! Every invocation runs against its own HOME so the user's real data
//! directory is never touched.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

fn cli(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_elitetimer-cli"));
    cmd.env("HOME", home)
        .env("ELITETIMER_ENV", "dev")
        .env_remove("ELITETIMER_LOG");
    cmd
}

/// Invoke a CLI command and return the output.
pub fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = cli(home)
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Invoke a CLI command and expect success.
pub fn run_cli_success(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    if code != 0 && !stderr.is_empty() {
        eprintln!("CLI error output: {}", stderr);
    }
    assert_eq!(code, 0, "CLI command failed with code {}: {:?}", code, args);
    stdout
}

/// Invoke a CLI command and expect failure.
pub fn run_cli_failure(home: &Path, args: &[&str]) -> (String, String, i32) {
    let (stdout, stderr, code) = run_cli(home, args);
    assert!(code != 0, "CLI command unexpectedly succeeded: {:?}", args);
    (stdout, stderr, code)
}

/// Run an interactive command, typing each line after its delay.
pub fn run_cli_interactive(home: &Path, args: &[&str], input: &[(Duration, &str)]) -> (String, i32) {
    let mut child = cli(home)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn CLI command");

    let mut stdin = child.stdin.take().expect("stdin is piped");
    for (delay, line) in input {
        thread::sleep(*delay);
        writeln!(stdin, "{line}").expect("Failed to write to CLI stdin");
    }
    drop(stdin);

    let output = child.wait_with_output().expect("Failed to wait for CLI command");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    (stdout, output.status.code().unwrap_or(-1))
}

/// Parse JSON output from CLI.
pub fn parse_json<T: for<'de> serde::Deserialize<'de>>(json: &str) -> T {
    serde_json::from_str(json).expect("Failed to parse JSON output")
}
