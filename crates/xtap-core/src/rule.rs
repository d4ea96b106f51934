// Xtap Key Rules
// One configured remap: a trigger specifier, its output sequence, and the
// runtime tap/hold state mutated by the engine

use std::time::Instant;

use smallvec::SmallVec;

use crate::backend::KeysymResolver;
use crate::{Keycode, Keysym};

/// How a rule identifies its trigger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Match by symbol, re-resolved against the current layout for every
    /// event. The matched code can change if the layout changes at runtime;
    /// this trades code stability for name stability.
    Sym(Keysym),
    /// Match by fixed raw key code, unaffected by layout changes.
    Code(Keycode),
}

impl Trigger {
    /// Does this trigger match the given key code under the current layout?
    pub fn matches(&self, code: Keycode, resolver: &dyn KeysymResolver) -> bool {
        match *self {
            Trigger::Sym(sym) => resolver.keycode_to_keysym(code) == Some(sym),
            Trigger::Code(trigger_code) => code == trigger_code,
        }
    }
}

/// Output key codes of a rule; nearly always one or two entries.
pub type OutputKeys = SmallVec<[Keycode; 2]>;

/// One configured remap.
///
/// Rules are created by the mapping parser at startup and never added or
/// removed afterwards; only the runtime fields (`pressed`, `used`,
/// `down_at`) mutate, and only inside the engine. `used` is meaningful only
/// while `pressed` is true and is cleared on every release.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRule {
    trigger: Trigger,
    output: OutputKeys,
    /// Trigger key currently held down
    pub(crate) pressed: bool,
    /// Another key or button went down while this trigger was held
    pub(crate) used: bool,
    /// When the current hold began
    pub(crate) down_at: Option<Instant>,
}

impl KeyRule {
    /// Create a new rule. The output sequence must be non-empty; the parser
    /// guarantees this for rules it hands out.
    pub fn new(trigger: Trigger, output: OutputKeys) -> Self {
        debug_assert!(!output.is_empty());
        Self {
            trigger,
            output,
            pressed: false,
            used: false,
            down_at: None,
        }
    }

    /// The trigger specifier
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// The output key codes, in emission order
    pub fn output(&self) -> &[Keycode] {
        &self.output
    }

    /// Does this rule's trigger match the given code under the current layout?
    pub fn matches(&self, code: Keycode, resolver: &dyn KeysymResolver) -> bool {
        self.trigger.matches(code, resolver)
    }

    /// Is the trigger key currently held down?
    pub fn is_held(&self) -> bool {
        self.pressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    struct TableResolver {
        // (code, keysym) pairs standing in for the live layout
        bindings: Vec<(u8, u32)>,
    }

    impl KeysymResolver for TableResolver {
        fn keysym_from_name(&self, _name: &str) -> Option<Keysym> {
            None
        }

        fn keysym_name(&self, _keysym: Keysym) -> Option<String> {
            None
        }

        fn keycode_to_keysym(&self, code: Keycode) -> Option<Keysym> {
            self.bindings
                .iter()
                .find(|(c, _)| *c == code.value())
                .map(|(_, s)| Keysym::new(*s))
        }

        fn keysym_to_keycode(&self, keysym: Keysym) -> Option<Keycode> {
            self.bindings
                .iter()
                .find(|(_, s)| *s == keysym.raw())
                .map(|(c, _)| Keycode::new(*c))
        }
    }

    #[test]
    fn test_sym_trigger_follows_layout() {
        let trigger = Trigger::Sym(Keysym::new(0xffe3)); // Control_L
        let resolver = TableResolver {
            bindings: vec![(37, 0xffe3)],
        };
        assert!(trigger.matches(Keycode::from(37), &resolver));
        assert!(!trigger.matches(Keycode::from(38), &resolver));

        // Same trigger, different layout: the matched code moves with it.
        let remapped = TableResolver {
            bindings: vec![(105, 0xffe3)],
        };
        assert!(trigger.matches(Keycode::from(105), &remapped));
        assert!(!trigger.matches(Keycode::from(37), &remapped));
    }

    #[test]
    fn test_code_trigger_ignores_layout() {
        let trigger = Trigger::Code(Keycode::from(37));
        let resolver = TableResolver { bindings: vec![] };
        assert!(trigger.matches(Keycode::from(37), &resolver));
        assert!(!trigger.matches(Keycode::from(38), &resolver));
    }

    #[test]
    fn test_new_rule_starts_idle() {
        let rule = KeyRule::new(
            Trigger::Code(Keycode::from(37)),
            smallvec![Keycode::from(9)],
        );
        assert!(!rule.is_held());
        assert!(!rule.used);
        assert!(rule.down_at.is_none());
        assert_eq!(rule.output(), &[Keycode::from(9)]);
    }
}
