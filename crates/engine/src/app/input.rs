/// Pointer position in physical window pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl PointerPosition {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Absolute per-axis distance to `other`.
    pub fn abs_delta(self, other: PointerPosition) -> (f32, f32) {
        ((self.x - other.x).abs(), (self.y - other.y).abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Space,
    Enter,
    Backspace,
    Escape,
    Tab,
    Character(char),
    Other,
}

impl Key {
    pub fn is_space(self) -> bool {
        matches!(self, Key::Space | Key::Character(' '))
    }
}

/// Window-level input, already stripped of backend types.
///
/// The loop runner produces exactly one event per relevant window message and
/// hands it to the active scene in arrival order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerMoved(PointerPosition),
    PointerLeft,
    PointerPressed,
    KeyPressed(Key),
    Scrolled,
    VisibilityChanged { hidden: bool },
    FocusChanged { focused: bool },
}

impl InputEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            InputEvent::PointerMoved(_) => "pointer_moved",
            InputEvent::PointerLeft => "pointer_left",
            InputEvent::PointerPressed => "pointer_pressed",
            InputEvent::KeyPressed(_) => "key_pressed",
            InputEvent::Scrolled => "scrolled",
            InputEvent::VisibilityChanged { .. } => "visibility_changed",
            InputEvent::FocusChanged { .. } => "focus_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_delta_is_per_axis_and_unsigned() {
        let a = PointerPosition::new(100.0, 40.0);
        let b = PointerPosition::new(90.0, 55.0);
        assert_eq!(a.abs_delta(b), (10.0, 15.0));
        assert_eq!(b.abs_delta(a), (10.0, 15.0));
    }

    #[test]
    fn space_character_counts_as_space() {
        assert!(Key::Space.is_space());
        assert!(Key::Character(' ').is_space());
        assert!(!Key::Character('a').is_space());
    }
}
