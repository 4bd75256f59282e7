use std::time::Duration;

/// Pausable accumulator on top of a monotonic clock.
///
/// `elapsed = before_run + (now - run_start)` while running, `before_run`
/// otherwise. All arithmetic saturates, so the result is never negative and
/// never decreases while running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Stopwatch {
    before_run: Duration,
    run_start: Option<Duration>,
}

impl Stopwatch {
    pub fn elapsed(&self, now: Duration) -> Duration {
        match self.run_start {
            Some(start) => self.before_run + now.saturating_sub(start),
            None => self.before_run,
        }
    }

    pub fn elapsed_ms(&self, now: Duration) -> u64 {
        self.elapsed(now).as_millis() as u64
    }

    #[cfg(test)]
    pub fn is_running(&self) -> bool {
        self.run_start.is_some()
    }

    /// Begin a running stretch. No-op when already running.
    pub fn run(&mut self, now: Duration) {
        if self.run_start.is_none() {
            self.run_start = Some(now);
        }
    }

    /// Fold the running stretch into the accumulator.
    pub fn freeze(&mut self, now: Duration) {
        self.before_run = self.elapsed(now);
        self.run_start = None;
    }

    /// Start over from `carried` elapsed time, running from `now`.
    pub fn restart(&mut self, now: Duration, carried: Duration) {
        self.before_run = carried;
        self.run_start = Some(now);
    }

    /// Frozen at `elapsed`, not running.
    pub fn frozen_at(elapsed: Duration) -> Self {
        Self {
            before_run: elapsed,
            run_start: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn accumulates_across_pause() {
        let mut watch = Stopwatch::default();
        watch.run(ms(1_000));
        assert_eq!(watch.elapsed(ms(3_500)), ms(2_500));
        watch.freeze(ms(4_000));
        assert_eq!(watch.elapsed(ms(60_000)), ms(3_000));
        watch.run(ms(60_000));
        assert_eq!(watch.elapsed(ms(61_000)), ms(4_000));
    }

    #[test]
    fn run_twice_keeps_first_anchor() {
        let mut watch = Stopwatch::default();
        watch.run(ms(100));
        watch.run(ms(900));
        assert_eq!(watch.elapsed(ms(1_100)), ms(1_000));
    }

    #[test]
    fn earlier_now_never_goes_negative() {
        let mut watch = Stopwatch::frozen_at(ms(500));
        watch.run(ms(10_000));
        assert_eq!(watch.elapsed(ms(9_000)), ms(500));
        assert!(watch.is_running());
    }

    #[test]
    fn restart_carries_overflow() {
        let mut watch = Stopwatch::default();
        watch.run(ms(0));
        watch.restart(ms(31_000), ms(1_000));
        assert_eq!(watch.elapsed_ms(ms(32_000)), 2_000);
    }
}
