// Xtap Mapping Parser
// Turns the `FROM=TO(;FROM=TO)*` mapping expression into key rules

use log::{debug, warn};

use crate::backend::KeysymResolver;
use crate::key::MAX_KEYCODE;
use crate::rule::{KeyRule, OutputKeys, Trigger};
use crate::{Keycode, Keysym};

/// Mapping applied when the command line supplies none
pub const DEFAULT_MAPPING: &str = "Control_L=Escape";

/// Reasons a single mapping token is rejected.
///
/// A rejected token only drops that one rule; parsing continues with the
/// remaining tokens.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("mapping without '=' has no effect: '{0}'")]
    MissingSeparator(String),

    #[error("invalid key code: '{0}'")]
    InvalidKeycode(String),

    #[error("invalid key: '{0}'")]
    UnknownKeysym(String),

    #[error("no key code for keysym {keysym} ('{name}') in mapping '{token}'")]
    UnmappedKeysym {
        keysym: Keysym,
        name: String,
        token: String,
    },
}

/// Parse a whole mapping expression into the rule table.
///
/// Tokens are `;`-separated. Each malformed token is reported with a warning
/// and skipped; a single bad token never aborts the rest of the mapping. An
/// empty expression yields an empty table, in which case the engine
/// classifies nothing and all events pass through.
pub fn parse_mapping(mapping: &str, resolver: &dyn KeysymResolver) -> Vec<KeyRule> {
    let mut rules = Vec::new();
    if mapping.is_empty() {
        return rules;
    }
    for token in mapping.split(';') {
        match parse_token(token, resolver) {
            Ok(rule) => rules.push(rule),
            Err(err) => warn!("skipping mapping token: {}", err),
        }
    }
    rules
}

/// Parse one `FROM=TO` token.
///
/// `FROM` and each `|`-separated `TO` entry is either a `#`-prefixed raw key
/// code (decimal, `0` octal or `0x` hex) or a symbolic keysym name. A raw
/// `FROM` fixes the rule to that code; a symbolic `FROM` is re-resolved
/// against the live layout at match time. A broken `TO` entry rejects the
/// whole token, since a partially built output sequence is not acceptable.
pub fn parse_token(token: &str, resolver: &dyn KeysymResolver) -> Result<KeyRule, ParseError> {
    let Some((from, to)) = token.split_once('=') else {
        return Err(ParseError::MissingSeparator(token.to_string()));
    };

    let trigger = if let Some(literal) = from.strip_prefix('#') {
        let code = resolve_raw_code(literal, resolver)?;
        log_trigger_assignment(code, resolver);
        Trigger::Code(code)
    } else {
        let sym = resolver
            .keysym_from_name(from)
            .ok_or_else(|| ParseError::UnknownKeysym(from.to_string()))?;
        debug!("assigned mapping from \"{}\" (keysym {})", from, sym);
        Trigger::Sym(sym)
    };

    let mut output = OutputKeys::new();
    for key in to.split('|') {
        let code = if let Some(literal) = key.strip_prefix('#') {
            resolve_raw_code(literal, resolver)?
        } else {
            let sym = resolver
                .keysym_from_name(key)
                .ok_or_else(|| ParseError::UnknownKeysym(key.to_string()))?;
            resolver
                .keysym_to_keycode(sym)
                .ok_or_else(|| ParseError::UnmappedKeysym {
                    keysym: sym,
                    name: key.to_string(),
                    token: token.to_string(),
                })?
        };
        debug!("to \"{}\" (key code {})", key, code);
        output.push(code);
    }

    Ok(KeyRule::new(trigger, output))
}

/// Resolve a `#`-stripped raw code literal. The code must fit the legal
/// range and be bound to a symbol under the current layout.
fn resolve_raw_code(literal: &str, resolver: &dyn KeysymResolver) -> Result<Keycode, ParseError> {
    let value = parse_code_literal(literal)
        .filter(|&v| v <= MAX_KEYCODE)
        .ok_or_else(|| ParseError::InvalidKeycode(literal.to_string()))?;
    let code = Keycode::new(value as u8);
    if resolver.keycode_to_keysym(code).is_none() {
        return Err(ParseError::InvalidKeycode(literal.to_string()));
    }
    Ok(code)
}

/// Conventional three-base integer literal: `0x` prefix for hexadecimal, a
/// leading `0` for octal, decimal otherwise.
fn parse_code_literal(text: &str) -> Option<u32> {
    let (digits, radix) = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        (hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        (&text[1..], 8)
    } else {
        (text, 10)
    };
    u32::from_str_radix(digits, radix).ok()
}

fn log_trigger_assignment(code: Keycode, resolver: &dyn KeysymResolver) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    if let Some(sym) = resolver.keycode_to_keysym(code) {
        let name = resolver.keysym_name(sym).unwrap_or_default();
        debug!(
            "assigned mapping from \"{}\" (keysym {}, key code {})",
            name, sym, code
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted layout: (name, keysym, keycode) triples. A keycode of zero
    /// marks a symbol with no live code under the current layout.
    struct FakeResolver {
        entries: Vec<(&'static str, u32, u8)>,
    }

    impl FakeResolver {
        fn us_like() -> Self {
            Self {
                entries: vec![
                    ("Control_L", 0xffe3, 37),
                    ("Escape", 0xff1b, 9),
                    ("Shift_L", 0xffe1, 50),
                    ("parenleft", 0x028, 0), // no live code
                    ("a", 0x061, 38),
                    ("b", 0x062, 56),
                    ("c", 0x063, 54),
                    ("A", 0x041, 65), // keycode 65 = 0x41, for raw-code tests
                ],
            }
        }
    }

    impl KeysymResolver for FakeResolver {
        fn keysym_from_name(&self, name: &str) -> Option<Keysym> {
            self.entries
                .iter()
                .find(|(n, _, _)| *n == name)
                .map(|(_, s, _)| Keysym::new(*s))
        }

        fn keysym_name(&self, keysym: Keysym) -> Option<String> {
            self.entries
                .iter()
                .find(|(_, s, _)| *s == keysym.raw())
                .map(|(n, _, _)| n.to_string())
        }

        fn keycode_to_keysym(&self, code: Keycode) -> Option<Keysym> {
            self.entries
                .iter()
                .find(|(_, _, c)| *c == code.value() && *c != 0)
                .map(|(_, s, _)| Keysym::new(*s))
        }

        fn keysym_to_keycode(&self, keysym: Keysym) -> Option<Keycode> {
            self.entries
                .iter()
                .find(|(_, s, c)| *s == keysym.raw() && *c != 0)
                .map(|(_, _, c)| Keycode::new(*c))
        }
    }

    #[test]
    fn test_single_symbolic_rule() {
        let resolver = FakeResolver::us_like();
        let rules = parse_mapping("Control_L=Escape", &resolver);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].trigger(), Trigger::Sym(Keysym::new(0xffe3)));
        assert_eq!(rules[0].output(), &[Keycode::from(9)]);
    }

    #[test]
    fn test_output_sequence_order() {
        let resolver = FakeResolver::us_like();
        let rules = parse_mapping("a=b|c", &resolver);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].output(), &[Keycode::from(56), Keycode::from(54)]);
    }

    #[test]
    fn test_token_without_separator_is_skipped() {
        let resolver = FakeResolver::us_like();
        assert!(parse_mapping("foo", &resolver).is_empty());
        assert_eq!(
            parse_token("foo", &resolver),
            Err(ParseError::MissingSeparator("foo".to_string()))
        );
    }

    #[test]
    fn test_bad_token_does_not_abort_remaining() {
        let resolver = FakeResolver::us_like();
        let rules = parse_mapping("a=b;foo;Control_L=Escape", &resolver);
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].output(), &[Keycode::from(56)]);
        assert_eq!(rules[1].output(), &[Keycode::from(9)]);
    }

    #[test]
    fn test_empty_mapping_yields_empty_table() {
        let resolver = FakeResolver::us_like();
        assert!(parse_mapping("", &resolver).is_empty());
    }

    #[test]
    fn test_raw_code_trigger_matches_by_code() {
        let resolver = FakeResolver::us_like();
        let rules = parse_mapping("#0x41=Escape", &resolver);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].trigger(), Trigger::Code(Keycode::from(65)));
    }

    #[test]
    fn test_raw_code_bases() {
        let resolver = FakeResolver::us_like();
        // 65 decimal, 0101 octal and 0x41 hex name the same key code.
        for token in ["#65=Escape", "#0101=Escape", "#0x41=Escape"] {
            let rule = parse_token(token, &resolver).unwrap();
            assert_eq!(rule.trigger(), Trigger::Code(Keycode::from(65)));
        }
    }

    #[test]
    fn test_raw_code_out_of_range_rejected() {
        let resolver = FakeResolver::us_like();
        assert_eq!(
            parse_token("#256=Escape", &resolver),
            Err(ParseError::InvalidKeycode("256".to_string()))
        );
        assert!(parse_token("#0x1ff=Escape", &resolver).is_err());
    }

    #[test]
    fn test_raw_code_without_live_symbol_rejected() {
        let resolver = FakeResolver::us_like();
        // keycode 200 is not bound in the fake layout
        assert!(parse_token("#200=Escape", &resolver).is_err());
    }

    #[test]
    fn test_raw_code_garbage_rejected() {
        let resolver = FakeResolver::us_like();
        assert!(parse_token("#x=Escape", &resolver).is_err());
        assert!(parse_token("#=Escape", &resolver).is_err());
        assert!(parse_token("#0x=Escape", &resolver).is_err());
    }

    #[test]
    fn test_unknown_trigger_name_drops_rule() {
        let resolver = FakeResolver::us_like();
        assert_eq!(
            parse_token("NoSuchKey=Escape", &resolver),
            Err(ParseError::UnknownKeysym("NoSuchKey".to_string()))
        );
    }

    #[test]
    fn test_broken_output_entry_drops_whole_rule() {
        let resolver = FakeResolver::us_like();
        // second output entry is unknown: the entire rule goes away
        assert!(parse_token("Control_L=Escape|NoSuchKey", &resolver).is_err());
        assert!(parse_mapping("Control_L=Escape|NoSuchKey", &resolver).is_empty());
    }

    #[test]
    fn test_output_symbol_without_live_code_drops_rule() {
        let resolver = FakeResolver::us_like();
        let err = parse_token("Shift_L=parenleft", &resolver).unwrap_err();
        assert!(matches!(err, ParseError::UnmappedKeysym { .. }));
    }

    #[test]
    fn test_empty_output_side_drops_rule() {
        let resolver = FakeResolver::us_like();
        assert!(parse_token("Control_L=", &resolver).is_err());
    }

    #[test]
    fn test_duplicate_triggers_are_kept() {
        let resolver = FakeResolver::us_like();
        let rules = parse_mapping("Control_L=Escape;Control_L=a", &resolver);
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_raw_output_entry() {
        let resolver = FakeResolver::us_like();
        let rule = parse_token("Control_L=#9", &resolver).unwrap();
        assert_eq!(rule.output(), &[Keycode::from(9)]);
    }

    #[test]
    fn test_code_literal_bases() {
        assert_eq!(parse_code_literal("12"), Some(12));
        assert_eq!(parse_code_literal("014"), Some(12));
        assert_eq!(parse_code_literal("0x0C"), Some(12));
        assert_eq!(parse_code_literal("0X0c"), Some(12));
        assert_eq!(parse_code_literal("0"), Some(0));
        assert_eq!(parse_code_literal(""), None);
        assert_eq!(parse_code_literal("0x"), None);
        assert_eq!(parse_code_literal("08"), None); // 8 is not an octal digit
    }
}
