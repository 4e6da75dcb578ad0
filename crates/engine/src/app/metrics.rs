use std::time::{Duration, Instant};

/// Loop activity over one reporting window.
///
/// The loop sleeps between deadlines, so `wakeups_per_second` is the number
/// worth watching: it stays near the scene's deadline rate while idle and
/// climbs to the frame rate only while continuous frames are requested.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub wakeups_per_second: f32,
    pub input_events_per_second: f32,
    pub frame_time_ms: f32,
    pub worst_frame_time_ms: f32,
}

#[derive(Debug, Default)]
struct Window {
    frames: u32,
    wakeups: u32,
    input_events: u32,
    frame_time_total: Duration,
    frame_time_worst: Duration,
}

impl Window {
    fn is_idle(&self) -> bool {
        self.frames == 0 && self.input_events == 0
    }

    fn summarize(&self, span: Duration) -> LoopMetricsSnapshot {
        let seconds = span.as_secs_f32().max(f32::EPSILON);
        let per_second = |count: u32| count as f32 / seconds;
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_time_total.as_secs_f32() * 1000.0 / frames as f32,
        };
        LoopMetricsSnapshot {
            fps: per_second(self.frames),
            wakeups_per_second: per_second(self.wakeups),
            input_events_per_second: per_second(self.input_events),
            frame_time_ms,
            worst_frame_time_ms: self.frame_time_worst.as_secs_f32() * 1000.0,
        }
    }
}

/// Counts loop activity and turns it into one snapshot per interval.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval: Duration,
    window_start: Instant,
    window: Window,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            window_start: now,
            window: Window::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        let window = &mut self.window;
        window.frames = window.frames.saturating_add(1);
        window.frame_time_total = window.frame_time_total.saturating_add(frame_dt);
        window.frame_time_worst = window.frame_time_worst.max(frame_dt);
    }

    pub(crate) fn record_wakeup(&mut self) {
        self.window.wakeups = self.window.wakeups.saturating_add(1);
    }

    pub(crate) fn record_input_event(&mut self) {
        self.window.input_events = self.window.input_events.saturating_add(1);
    }

    /// Closes the window once `interval` has passed. A window with neither
    /// frames nor input produces nothing, so a sleeping loop stays quiet.
    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let span = now.saturating_duration_since(self.window_start);
        if span < self.interval {
            return None;
        }

        let window = std::mem::take(&mut self.window);
        self.window_start = now;
        (!window.is_idle()).then(|| window.summarize(span))
    }
}
