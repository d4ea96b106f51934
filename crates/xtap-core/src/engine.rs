// Xtap Classification Engine
// Per-event tap/hold state machine driving synthetic output
//
// The engine is invoked synchronously, once per recorded event, from inside
// the blocking delivery call. Nothing here may block: rule evaluation,
// injection and layout re-assertion all complete immediately, and injection
// failures are logged but never abort the delivery loop.

use std::time::{Duration, Instant};

use log::debug;

use crate::backend::Backend;
use crate::config::EngineConfig;
use crate::event::{EventKind, InputEvent};
use crate::rule::KeyRule;
use crate::stabilizer::GroupStabilizer;
use crate::tracker::PendingSynthetic;
use crate::Keycode;

/// The event classifier.
///
/// Per-rule state machine: Idle -> Held (unused) -> Held (used) -> Idle, or
/// Held (unused) -> Idle firing the output sequence iff the release came
/// within the tap timeout. Rules cycle for the life of the process.
pub struct Engine {
    rules: Vec<KeyRule>,
    pending: PendingSynthetic,
    stabilizer: GroupStabilizer,
    /// Any pointer button currently held; shared across all rules
    mouse_held: bool,
    tap_timeout: Duration,
}

impl Engine {
    /// Create an engine from the parsed rule table, the startup
    /// configuration and the layout group observed at startup.
    pub fn new(rules: Vec<KeyRule>, config: &EngineConfig, initial_group: u8) -> Self {
        Self {
            rules,
            pending: PendingSynthetic::new(),
            stabilizer: GroupStabilizer::new(initial_group),
            mouse_held: false,
            tap_timeout: config.tap_timeout,
        }
    }

    /// The rule table (runtime state included)
    pub fn rules(&self) -> &[KeyRule] {
        &self.rules
    }

    /// Classify one observed event and emit whatever it calls for.
    ///
    /// An echo of our own injected output is consumed and discarded before
    /// anything else happens: no rule evaluation, no layout observation.
    pub fn handle_event<B: Backend>(&mut self, event: InputEvent, backend: &mut B) {
        if self.pending.consume(event.code) {
            debug!("ignoring generated event for key code {}", event.code);
            return;
        }

        debug!("intercepted {}", event);

        match event.kind {
            EventKind::ButtonPress => self.mouse_held = true,
            EventKind::ButtonRelease => self.mouse_held = false,
            _ => {}
        }

        let now = Instant::now();
        for rule in self.rules.iter_mut() {
            if event.kind.is_key() && rule.matches(event.code, backend) {
                handle_trigger(
                    rule,
                    event.kind,
                    now,
                    self.mouse_held,
                    self.tap_timeout,
                    &mut self.pending,
                    backend,
                );
            } else if rule.is_held() && event.kind.is_press() {
                // Any other key or button going down while the trigger is
                // held turns the hold into a chord; the tap is off.
                rule.used = true;
            }
        }

        if let Err(err) = self.stabilizer.observe(backend) {
            debug!("layout group re-assert failed: {}", err);
        }
    }
}

/// Advance one rule's state machine for a key event on its trigger.
fn handle_trigger<B: Backend>(
    rule: &mut KeyRule,
    kind: EventKind,
    now: Instant,
    mouse_held: bool,
    tap_timeout: Duration,
    pending: &mut PendingSynthetic,
    backend: &mut B,
) {
    match kind {
        EventKind::KeyPress => {
            debug!("trigger pressed");
            rule.pressed = true;
            rule.down_at = Some(now);
            if mouse_held {
                // Pressed while a button was already down: never a tap.
                rule.used = true;
            }
        }
        EventKind::KeyRelease => {
            debug!("trigger released");
            if !rule.used {
                let tapped = rule
                    .down_at
                    .is_some_and(|at| now.duration_since(at) < tap_timeout);
                if tapped {
                    fire_sequence(rule.output(), pending, backend);
                }
            }
            rule.used = false;
            rule.pressed = false;
            rule.down_at = None;
        }
        _ => {}
    }
}

/// Inject the output sequence: a press for every code in order, then a
/// release for every code in the same order. Each successfully sent code is
/// recorded so its echo can be recognized and discarded.
fn fire_sequence<B: Backend>(
    output: &[Keycode],
    pending: &mut PendingSynthetic,
    backend: &mut B,
) {
    for press in [true, false] {
        for &code in output {
            if press && log::log_enabled!(log::Level::Debug) {
                let name = backend
                    .keycode_to_keysym(code)
                    .and_then(|sym| backend.keysym_name(sym))
                    .unwrap_or_else(|| code.to_string());
                debug!("generating {}", name);
            }
            match backend.inject_key(code, press) {
                Ok(()) => pending.record(code),
                Err(err) => debug!("injection failed for key code {}: {}", code, err),
            }
        }
    }
    if let Err(err) = backend.flush() {
        debug!("flush after injection failed: {}", err);
    }
}
