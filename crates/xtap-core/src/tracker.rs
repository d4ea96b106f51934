// Xtap Synthetic Event Tracker
// Remembers injected key codes until their echo comes back on the record
// stream, so the engine never classifies its own output

use crate::Keycode;

/// Ordered multiset of key codes the engine has injected and not yet seen
/// echoed back. Append-only on injection; one matching entry is removed per
/// observed echo. Owned exclusively by the engine.
#[derive(Debug, Default)]
pub struct PendingSynthetic {
    injected: Vec<Keycode>,
}

impl PendingSynthetic {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one injected key code
    pub fn record(&mut self, code: Keycode) {
        self.injected.push(code);
    }

    /// Remove one entry equal to `code` if present, reporting whether one
    /// was found. Duplicate codes are interchangeable, so the first match is
    /// swap-removed without preserving order.
    pub fn consume(&mut self, code: Keycode) -> bool {
        match self.injected.iter().position(|&c| c == code) {
            Some(index) => {
                self.injected.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of injections still awaiting their echo
    pub fn len(&self) -> usize {
        self.injected.len()
    }

    /// True when no injections are outstanding
    pub fn is_empty(&self) -> bool {
        self.injected.is_empty()
    }
}
