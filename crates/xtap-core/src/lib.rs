// Xtap Core Library
// Tap/hold key remapping engine: a tap of a configured trigger key sends a
// synthetic key sequence, a held trigger passes through as a modifier

pub mod backend;
pub mod config;
pub mod engine;
pub mod event;
pub mod key;
pub mod parse;
pub mod rule;
pub mod stabilizer;
pub mod tracker;

// X11 collaborator implementations (control connection + record tap)
#[cfg(feature = "x11-backend")]
pub mod x11;

pub use backend::{
    Backend, BackendError, BackendResult, InputInjector, KeysymResolver, LayoutControl,
};
pub use config::{ConfigError, EngineConfig, DEFAULT_TAP_TIMEOUT};
pub use engine::Engine;
pub use event::{EventKind, InputEvent};
pub use key::{Keycode, Keysym, MAX_KEYCODE};
pub use parse::{parse_mapping, parse_token, ParseError, DEFAULT_MAPPING};
pub use rule::{KeyRule, OutputKeys, Trigger};
pub use stabilizer::GroupStabilizer;
pub use tracker::PendingSynthetic;

#[cfg(feature = "x11-backend")]
pub use x11::{EventTap, X11Backend};
