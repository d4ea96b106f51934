// Collaborator Interfaces
//
// This module defines the trait seams between the classification engine and
// the windowing system: keysym resolution against the live layout, synthetic
// input injection, and layout group query/control. The engine only ever
// talks to these traits; the real implementations live behind the
// `x11-backend` feature and the tests supply scripted fakes.

use crate::{Keycode, Keysym};

/// Result type for collaborator operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors reported by the windowing-system collaborators
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("required extension missing: {0}")]
    MissingExtension(&'static str),

    #[error("request failed: {0}")]
    RequestFailed(String),
}

/// Name and code lookups against the live keyboard layout.
///
/// Implementations return `None` rather than a NoSymbol keysym or a zero
/// key code, so callers never see the protocol sentinels.
pub trait KeysymResolver {
    /// Resolve a symbolic name (e.g. "Control_L") to its keysym
    fn keysym_from_name(&self, name: &str) -> Option<Keysym>;

    /// Name of a keysym, for diagnostics
    fn keysym_name(&self, keysym: Keysym) -> Option<String>;

    /// First keysym bound to a key code under the current layout
    fn keycode_to_keysym(&self, code: Keycode) -> Option<Keysym>;

    /// A key code producing the keysym under the current layout, if any
    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<Keycode>;
}

/// Synthetic input sink. Fire-and-forget: no acknowledgment is expected,
/// `flush` pushes buffered injections out to the server.
pub trait InputInjector {
    /// Inject a key press (true) or release (false) for a code
    fn inject_key(&mut self, code: Keycode, press: bool) -> BackendResult<()>;

    /// Flush pending injections to the server
    fn flush(&mut self) -> BackendResult<()>;
}

/// Keyboard layout group query and control.
pub trait LayoutControl {
    /// The layout group currently active on the core keyboard
    fn current_group(&mut self) -> BackendResult<u8>;

    /// Lock the given layout group as active
    fn lock_group(&mut self, group: u8) -> BackendResult<()>;
}

/// Umbrella trait for call sites that need all three capabilities at once,
/// which is what classifying a single event requires.
pub trait Backend: KeysymResolver + InputInjector + LayoutControl {}

impl<T: KeysymResolver + InputInjector + LayoutControl + ?Sized> Backend for T {}
