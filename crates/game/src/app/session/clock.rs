use std::time::{Duration, Instant};

/// Elapsed-time reference for one attempt.
///
/// Holds the time banked before the current run plus the instant the current
/// run began. Resuming after a freeze is therefore the same as moving the
/// start reference to `now - banked`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stopwatch {
    banked: Duration,
    running_since: Option<Instant>,
}

impl Stopwatch {
    pub fn start(&mut self, now: Instant) {
        self.banked = Duration::ZERO;
        self.running_since = Some(now);
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        let running = self
            .running_since
            .map_or(Duration::ZERO, |since| now.saturating_duration_since(since));
        self.banked.saturating_add(running)
    }

    /// Stops the run and returns the value it froze at.
    pub fn freeze(&mut self, now: Instant) -> Duration {
        self.banked = self.elapsed(now);
        self.running_since = None;
        self.banked
    }

    pub fn resume(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// `MM:SS.cc` below one hour, `H:MM:SS` from one hour on.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1_000;
    if hours > 0 {
        return format!("{hours}:{minutes:02}:{seconds:02}");
    }
    let centis = (total_ms % 1_000) / 10;
    format!("{minutes:02}:{seconds:02}.{centis:02}")
}

/// Leaderboard style: whole minutes and seconds, e.g. `3m 7s`.
pub fn format_minutes_seconds(duration_ms: u64) -> String {
    let minutes = duration_ms / 60_000;
    let seconds = (duration_ms % 60_000) / 1_000;
    format!("{minutes}m {seconds}s")
}
