//! Write-frequency policy for running-session snapshots.
//!
//! Steady-state ticks may run at frame rate; snapshots only need to land
//! often enough that a restart loses at most about a second. State
//! transitions never consult this policy and always write.

/// Minimum gap between two throttled snapshot writes.
pub const DEFAULT_PERSIST_MIN_INTERVAL_MS: i64 = 1000;

/// Whether a running tick may write a snapshot now.
///
/// A `last_persist_at_ms` of zero means nothing has been written yet, so
/// the write proceeds. Negative inputs are clamped to zero.
pub fn should_persist_running(last_persist_at_ms: i64, now_ms: i64, min_interval_ms: i64) -> bool {
    let last = last_persist_at_ms.max(0);
    let now = now_ms.max(0);
    let min_interval = min_interval_ms.max(0);

    if last == 0 {
        return true;
    }
    now - last >= min_interval
}
