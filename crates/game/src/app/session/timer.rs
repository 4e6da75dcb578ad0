use std::time::{Duration, Instant};

/// One-shot deadline. Cancelling is dropping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Timer {
    deadline: Instant,
}

impl Timer {
    pub(crate) fn after(now: Instant, delay: Duration) -> Self {
        Self {
            deadline: now + delay,
        }
    }

    pub(crate) fn deadline(&self) -> Instant {
        self.deadline
    }

    pub(crate) fn is_due(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CountdownTick {
    Remaining(u32),
    Expired,
}

/// Fixed-period repeating deadline counting down to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Countdown {
    remaining: u32,
    period: Duration,
    next_tick: Instant,
}

impl Countdown {
    pub(crate) fn start(anchor: Instant, remaining: u32, period: Duration) -> Self {
        Self {
            remaining,
            period,
            next_tick: anchor + period,
        }
    }

    pub(crate) fn remaining(&self) -> u32 {
        self.remaining
    }

    pub(crate) fn next_tick(&self) -> Instant {
        self.next_tick
    }

    /// Consumes one due tick and returns its scheduled instant. A tick taken
    /// with one (or zero) remaining is the expiry; ticks are never coalesced,
    /// so a late caller drains them one at a time.
    pub(crate) fn tick(&mut self, now: Instant) -> Option<(Instant, CountdownTick)> {
        if now < self.next_tick {
            return None;
        }
        let at = self.next_tick;
        if self.remaining <= 1 {
            self.remaining = 0;
            return Some((at, CountdownTick::Expired));
        }
        self.remaining -= 1;
        self.next_tick = at + self.period;
        Some((at, CountdownTick::Remaining(self.remaining)))
    }
}
