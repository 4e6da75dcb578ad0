use engine::{InputEvent, PointerPosition};
use tracing::debug;

use super::DisqualificationReason;

pub const DEFAULT_MOVEMENT_THRESHOLD_PX: f32 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    pub movement_threshold_px: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            movement_threshold_px: DEFAULT_MOVEMENT_THRESHOLD_PX,
        }
    }
}

/// What the monitor makes of one input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Verdict {
    Ignore,
    Acknowledge,
    Violation(DisqualificationReason),
}

/// Per-attempt detector state. Exists only while armed.
#[derive(Debug, Default)]
struct ArmedInputs {
    last_pointer: Option<PointerPosition>,
}

#[derive(Debug)]
pub(crate) struct InputMonitor {
    config: MonitorConfig,
    armed: Option<ArmedInputs>,
}

impl InputMonitor {
    pub(crate) fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            armed: None,
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Returns false when already armed; the existing pointer reference is kept.
    pub(crate) fn arm(&mut self) -> bool {
        if self.armed.is_some() {
            return false;
        }
        self.armed = Some(ArmedInputs::default());
        debug!(
            threshold_px = self.config.movement_threshold_px,
            "input_monitor_armed"
        );
        true
    }

    pub(crate) fn disarm(&mut self) -> bool {
        if self.armed.take().is_none() {
            return false;
        }
        debug!("input_monitor_disarmed");
        true
    }

    pub(crate) fn observe(&mut self, event: &InputEvent) -> Verdict {
        let Some(armed) = self.armed.as_mut() else {
            return Verdict::Ignore;
        };

        match *event {
            InputEvent::PointerMoved(position) => {
                if let Some(last) = armed.last_pointer {
                    let (dx, dy) = position.abs_delta(last);
                    let threshold = self.config.movement_threshold_px;
                    if dx >= threshold || dy >= threshold {
                        return Verdict::Violation(DisqualificationReason::PointerMoved);
                    }
                }
                armed.last_pointer = Some(position);
                Verdict::Ignore
            }
            // Re-entry is compared against the last sample inside the window.
            InputEvent::PointerLeft => Verdict::Ignore,
            InputEvent::PointerPressed => Verdict::Acknowledge,
            InputEvent::KeyPressed(key) if key.is_space() => Verdict::Acknowledge,
            InputEvent::KeyPressed(_) => Verdict::Violation(DisqualificationReason::KeyPressed),
            InputEvent::Scrolled => Verdict::Violation(DisqualificationReason::Scrolled),
            InputEvent::VisibilityChanged { hidden: true } => {
                Verdict::Violation(DisqualificationReason::TabHidden)
            }
            InputEvent::FocusChanged { focused: false } => {
                Verdict::Violation(DisqualificationReason::WindowBlurred)
            }
            InputEvent::VisibilityChanged { hidden: false }
            | InputEvent::FocusChanged { focused: true } => Verdict::Ignore,
        }
    }
}
