// Xtap Event Model
// Key and button press/release events as delivered by the record stream

use std::fmt;

use crate::Keycode;

/// Kind of an observed input event.
///
/// The discriminants are the X core protocol event codes, which is what the
/// record stream carries in the first byte of each event:
///   2 == KeyPress
///   3 == KeyRelease
///   4 == ButtonPress
///   5 == ButtonRelease
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    KeyPress = 2,
    KeyRelease = 3,
    ButtonPress = 4,
    ButtonRelease = 5,
}

impl EventKind {
    /// Create an EventKind from a raw core protocol event code
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            2 => Some(EventKind::KeyPress),
            3 => Some(EventKind::KeyRelease),
            4 => Some(EventKind::ButtonPress),
            5 => Some(EventKind::ButtonRelease),
            _ => None,
        }
    }

    /// Returns true for keyboard events (press or release)
    pub fn is_key(self) -> bool {
        matches!(self, EventKind::KeyPress | EventKind::KeyRelease)
    }

    /// Returns true for pointer button events (press or release)
    pub fn is_button(self) -> bool {
        matches!(self, EventKind::ButtonPress | EventKind::ButtonRelease)
    }

    /// Returns true if something went down, key or button
    pub fn is_press(self) -> bool {
        matches!(self, EventKind::KeyPress | EventKind::ButtonPress)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::KeyPress => "KeyPress",
            EventKind::KeyRelease => "KeyRelease",
            EventKind::ButtonPress => "ButtonPress",
            EventKind::ButtonRelease => "ButtonRelease",
        };
        write!(f, "{}", name)
    }
}

/// One observed input event: what happened, and to which code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: EventKind,
    pub code: Keycode,
}

impl InputEvent {
    /// Create a new input event
    pub fn new(kind: EventKind, code: Keycode) -> Self {
        Self { kind, code }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_round_trip() {
        assert_eq!(EventKind::from_raw(2), Some(EventKind::KeyPress));
        assert_eq!(EventKind::from_raw(3), Some(EventKind::KeyRelease));
        assert_eq!(EventKind::from_raw(4), Some(EventKind::ButtonPress));
        assert_eq!(EventKind::from_raw(5), Some(EventKind::ButtonRelease));
        assert_eq!(EventKind::from_raw(0), None);
        assert_eq!(EventKind::from_raw(6), None);
    }

    #[test]
    fn test_kind_predicates() {
        assert!(EventKind::KeyPress.is_key());
        assert!(EventKind::KeyRelease.is_key());
        assert!(!EventKind::ButtonPress.is_key());
        assert!(EventKind::ButtonPress.is_button());
        assert!(EventKind::KeyPress.is_press());
        assert!(EventKind::ButtonPress.is_press());
        assert!(!EventKind::KeyRelease.is_press());
        assert!(!EventKind::ButtonRelease.is_press());
    }

    #[test]
    fn test_event_display() {
        let event = InputEvent::new(EventKind::KeyPress, Keycode::from(37));
        assert_eq!(event.to_string(), "KeyPress(37)");
    }
}
