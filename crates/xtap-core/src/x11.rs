// Xtap X11 Backend
// x11rb implementations of the collaborator traits, split over two
// connections: a control connection for queries, injection and layout
// locking, and a separate data connection that carries the record stream.
// Keeping them apart lets the control connection issue synchronous requests
// while the data connection sits inside the blocking delivery call.

use log::debug;
use x11rb::connection::{Connection, RequestConnection as _};
use x11rb::protocol::record::{self, ConnectionExt as _};
use x11rb::protocol::xkb::{self, ConnectionExt as _};
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::xtest::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;
use xkbcommon::xkb as xkbc;

use crate::backend::{
    BackendError, BackendResult, InputInjector, KeysymResolver, LayoutControl,
};
use crate::event::{EventKind, InputEvent};
use crate::{Keycode, Keysym};

/// XKB device spec for the core keyboard (XkbUseCoreKbd)
const USE_CORE_KBD: xkb::DeviceSpec = 0x100;

/// Size of one core protocol event in the record reply payload
const CORE_EVENT_SIZE: usize = 32;

// Record reply categories (the record protocol does not expose these as an
// x11rb enum): intercepted client data vs. stream bookkeeping.
const CATEGORY_FROM_SERVER: u8 = 0;
const CATEGORY_END_OF_DATA: u8 = 5;

fn connection_failed(err: impl std::fmt::Display) -> BackendError {
    BackendError::ConnectionFailed(err.to_string())
}

fn request_failed(err: impl std::fmt::Display) -> BackendError {
    BackendError::RequestFailed(err.to_string())
}

/// The control connection and the keysym tables fetched from it.
///
/// The keycode<->keysym tables are read once at startup from the server's
/// keyboard mapping; lookups resolve against the layout that was active
/// when the process started.
pub struct X11Backend {
    conn: RustConnection,
    min_keycode: u8,
    keysyms_per_keycode: usize,
    keysyms: Vec<u32>,
}

impl X11Backend {
    /// Open the control connection and verify the required extensions.
    /// Missing extensions are fatal: the engine cannot run without them.
    pub fn connect() -> BackendResult<Self> {
        let (conn, _screen) = x11rb::connect(None).map_err(connection_failed)?;

        if conn
            .extension_information(record::X11_EXTENSION_NAME)
            .map_err(request_failed)?
            .is_none()
        {
            return Err(BackendError::MissingExtension("RECORD"));
        }
        if conn
            .extension_information(xtest::X11_EXTENSION_NAME)
            .map_err(request_failed)?
            .is_none()
        {
            return Err(BackendError::MissingExtension("XTEST"));
        }
        if conn
            .extension_information(xkb::X11_EXTENSION_NAME)
            .map_err(request_failed)?
            .is_none()
        {
            return Err(BackendError::MissingExtension("XKEYBOARD"));
        }

        conn.record_query_version(1, 13)
            .map_err(request_failed)?
            .reply()
            .map_err(request_failed)?;
        let xkb_reply = conn
            .xkb_use_extension(1, 0)
            .map_err(request_failed)?
            .reply()
            .map_err(request_failed)?;
        if !xkb_reply.supported {
            return Err(BackendError::MissingExtension("XKEYBOARD"));
        }

        let (min_keycode, max_keycode) = {
            let setup = conn.setup();
            (setup.min_keycode, setup.max_keycode)
        };
        let mapping = conn
            .get_keyboard_mapping(min_keycode, max_keycode - min_keycode + 1)
            .map_err(request_failed)?
            .reply()
            .map_err(request_failed)?;

        Ok(Self {
            conn,
            min_keycode,
            keysyms_per_keycode: (mapping.keysyms_per_keycode as usize).max(1),
            keysyms: mapping.keysyms,
        })
    }

    /// Register a record context for key and button events from all clients.
    /// The context is created on the control connection; delivery is enabled
    /// later on the data connection.
    fn create_record_context(&self) -> BackendResult<record::Context> {
        let context = self.conn.generate_id().map_err(request_failed)?;
        let range = record::Range {
            device_events: record::Range8 {
                first: xproto::KEY_PRESS_EVENT,
                last: xproto::BUTTON_RELEASE_EVENT,
            },
            ..record::Range::default()
        };
        self.conn
            .record_create_context(context, 0, &[record::CS::ALL_CLIENTS.into()], &[range])
            .map_err(request_failed)?
            .check()
            .map_err(request_failed)?;
        Ok(context)
    }

    /// Ask the server to stop delivering recorded events, which unblocks
    /// `EventTap::run` on the other thread. Callers serialize this with
    /// event processing via the shared control lock.
    pub fn stop_tap(&self, context: record::Context) -> BackendResult<()> {
        self.conn
            .record_disable_context(context)
            .map_err(request_failed)?;
        self.conn.sync().map_err(request_failed)?;
        Ok(())
    }

    /// Release the record context once delivery has stopped
    pub fn free_tap(&self, context: record::Context) -> BackendResult<()> {
        self.conn
            .record_free_context(context)
            .map_err(request_failed)?;
        self.conn.flush().map_err(request_failed)?;
        Ok(())
    }

    /// First keysym bound to a code, None for unbound codes
    fn first_keysym(&self, code: Keycode) -> Option<u32> {
        let offset = code.value().checked_sub(self.min_keycode)? as usize;
        self.keysyms
            .get(offset * self.keysyms_per_keycode)
            .copied()
            .filter(|&sym| sym != 0)
    }
}

impl KeysymResolver for X11Backend {
    fn keysym_from_name(&self, name: &str) -> Option<Keysym> {
        let sym = xkbc::keysym_from_name(name, xkbc::KEYSYM_NO_FLAGS);
        let raw = sym.raw();
        (raw != 0).then(|| Keysym::new(raw))
    }

    fn keysym_name(&self, keysym: Keysym) -> Option<String> {
        let name = xkbc::keysym_get_name(xkbc::Keysym::new(keysym.raw()));
        (!name.is_empty()).then_some(name)
    }

    fn keycode_to_keysym(&self, code: Keycode) -> Option<Keysym> {
        self.first_keysym(code).map(Keysym::new)
    }

    fn keysym_to_keycode(&self, keysym: Keysym) -> Option<Keycode> {
        let target = keysym.raw();
        self.keysyms
            .chunks(self.keysyms_per_keycode)
            .position(|bound| bound.contains(&target))
            .map(|offset| Keycode::new(self.min_keycode + offset as u8))
    }
}

impl InputInjector for X11Backend {
    fn inject_key(&mut self, code: Keycode, press: bool) -> BackendResult<()> {
        let kind = if press {
            xproto::KEY_PRESS_EVENT
        } else {
            xproto::KEY_RELEASE_EVENT
        };
        self.conn
            .xtest_fake_input(
                kind,
                code.value(),
                x11rb::CURRENT_TIME,
                x11rb::NONE,
                0,
                0,
                0,
            )
            .map_err(request_failed)?;
        Ok(())
    }

    fn flush(&mut self) -> BackendResult<()> {
        self.conn.flush().map_err(request_failed)
    }
}

impl LayoutControl for X11Backend {
    fn current_group(&mut self) -> BackendResult<u8> {
        let state = self
            .conn
            .xkb_get_state(USE_CORE_KBD)
            .map_err(request_failed)?
            .reply()
            .map_err(request_failed)?;
        Ok(u8::from(state.group))
    }

    fn lock_group(&mut self, group: u8) -> BackendResult<()> {
        self.conn
            .xkb_latch_lock_state(
                USE_CORE_KBD,
                xproto::ModMask::from(0u16),
                xproto::ModMask::from(0u16),
                true,
                xkb::Group::from(group),
                xproto::ModMask::from(0u16),
                false,
                0,
            )
            .map_err(request_failed)?;
        Ok(())
    }
}

/// Blocking event-delivery side of the record extension.
pub struct EventTap {
    conn: RustConnection,
    context: record::Context,
}

impl EventTap {
    /// Open the data connection and register the record context through the
    /// control connection.
    pub fn open(control: &X11Backend) -> BackendResult<Self> {
        let (conn, _screen) = x11rb::connect(None).map_err(connection_failed)?;
        let context = control.create_record_context()?;
        // The context must be visible server-side before the data connection
        // enables it.
        control.conn.sync().map_err(request_failed)?;
        Ok(Self { conn, context })
    }

    /// The context id, needed to disable delivery from another thread
    pub fn context(&self) -> record::Context {
        self.context
    }

    /// Enable delivery and invoke the callback once per recorded key or
    /// button event. Blocks until the context is disabled.
    pub fn run<F: FnMut(InputEvent)>(&self, mut on_event: F) -> BackendResult<()> {
        let replies = self
            .conn
            .record_enable_context(self.context)
            .map_err(request_failed)?;
        for reply in replies {
            let reply = reply.map_err(request_failed)?;
            match reply.category {
                CATEGORY_FROM_SERVER => {
                    for raw in reply.data.chunks_exact(CORE_EVENT_SIZE) {
                        // byte 0: core event code (send_event bit masked off),
                        // byte 1: key or button code
                        if let Some(kind) = EventKind::from_raw(raw[0] & 0x7f) {
                            on_event(InputEvent::new(kind, Keycode::new(raw[1])));
                        }
                    }
                }
                CATEGORY_END_OF_DATA => {
                    debug!("record stream ended");
                    break;
                }
                // start-of-data and client bookkeeping replies
                _ => {}
            }
        }
        Ok(())
    }
}
