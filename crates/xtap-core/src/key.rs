// Xtap Key Types
// X11 key codes and key symbols as they appear on the wire

use std::fmt;

/// Largest legal X11 key code (codes occupy a single byte).
pub const MAX_KEYCODE: u32 = 255;

/// A single X11 key (or pointer button) code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keycode(u8);

impl Keycode {
    /// Create a key code from its raw byte value
    pub fn new(code: u8) -> Self {
        Keycode(code)
    }

    /// Get the raw byte value
    pub fn value(self) -> u8 {
        self.0
    }
}

impl From<u8> for Keycode {
    fn from(code: u8) -> Self {
        Keycode(code)
    }
}

impl fmt::Display for Keycode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An X11 key symbol identifier.
///
/// The zero value is the NoSymbol sentinel; resolver implementations report
/// it as `None` instead of handing it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keysym(u32);

impl Keysym {
    /// The NoSymbol sentinel
    pub const NONE: Keysym = Keysym(0);

    /// Create a keysym from its raw value
    pub fn new(raw: u32) -> Self {
        Keysym(raw)
    }

    /// Get the raw value
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Check whether this is the NoSymbol sentinel
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Keysym {
    fn from(raw: u32) -> Self {
        Keysym(raw)
    }
}

impl fmt::Display for Keysym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keycode_equality() {
        assert_eq!(Keycode::from(37), Keycode::new(37));
        assert_ne!(Keycode::from(37), Keycode::from(38));
    }

    #[test]
    fn test_keycode_display() {
        assert_eq!(Keycode::from(65).to_string(), "65");
    }

    #[test]
    fn test_keysym_none() {
        assert!(Keysym::NONE.is_none());
        assert!(!Keysym::new(0xff1b).is_none());
    }

    #[test]
    fn test_keysym_display_is_hex() {
        assert_eq!(Keysym::new(0xff1b).to_string(), "0xff1b");
    }

    #[test]
    fn test_keycode_hash() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(Keycode::from(9), "escape");
        assert_eq!(map.get(&Keycode::from(9)), Some(&"escape"));
    }
}
