// Xtap CLI
// X11 tap/hold key remapper: taps on configured modifier keys send a
// synthetic key sequence, held uses pass through untouched

#[cfg(feature = "x11-backend")]
use std::sync::Arc;
#[cfg(feature = "x11-backend")]
use std::time::Duration;

#[cfg(feature = "x11-backend")]
use anyhow::{bail, Context};
#[cfg(feature = "x11-backend")]
use clap::Parser;
#[cfg(feature = "x11-backend")]
use log::{debug, info, warn};
#[cfg(feature = "x11-backend")]
use parking_lot::Mutex;

#[cfg(feature = "x11-backend")]
use xtap_core::x11::{EventTap, X11Backend};
use xtap_core::EngineConfig;
#[cfg(feature = "x11-backend")]
use xtap_core::{parse_mapping, Engine, LayoutControl, DEFAULT_MAPPING};

/// X11 tap/hold key remapper
#[derive(Parser, Debug)]
#[command(name = "xtap")]
#[command(version)]
#[command(about = "Makes a tap on a modifier key send another key", long_about = None)]
struct Args {
    /// Verbose per-event tracing (implies --foreground)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Stay attached to the terminal instead of daemonizing
    #[arg(short = 'f', long)]
    foreground: bool,

    /// Mapping expression, e.g. "Control_L=Escape;Shift_L=Shift_L|parenleft"
    #[arg(short = 'e', long = "expression", value_name = "MAPPING")]
    expression: Option<String>,

    /// Tap timeout in milliseconds (default 500)
    #[arg(short = 't', long = "timeout", value_name = "MS", value_parser = parse_timeout)]
    timeout: Option<Duration>,
}

fn parse_timeout(text: &str) -> Result<std::time::Duration, String> {
    EngineConfig::timeout_from_millis_arg(text).map_err(|err| err.to_string())
}

#[cfg(feature = "x11-backend")]
fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = EngineConfig {
        tap_timeout: args.timeout.unwrap_or(xtap_core::DEFAULT_TAP_TIMEOUT),
        debug: args.debug,
        // -d implies -f
        foreground: args.foreground || args.debug,
    };

    env_logger::Builder::from_default_env()
        .filter_level(if config.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let mut backend = X11Backend::connect()
        .context("unable to connect to the X11 display (is $DISPLAY set?)")?;
    let initial_group = backend
        .current_group()
        .context("failed to query the keyboard layout state")?;

    let mapping = args.expression.as_deref().unwrap_or(DEFAULT_MAPPING);
    let rules = parse_mapping(mapping, &backend);
    if rules.is_empty() {
        warn!(
            "mapping '{}' produced no rules; all events will pass through untouched",
            mapping
        );
    }

    if !config.foreground {
        // SAFETY: still single-threaded here; the signal-wait thread is
        // spawned after the fork.
        let rc = unsafe { libc::daemon(0, 0) };
        if rc != 0 {
            bail!("failed to daemonize: {}", std::io::Error::last_os_error());
        }
    }

    let mut engine = Engine::new(rules, &config, initial_group);

    let tap = EventTap::open(&backend).context("failed to create the record context")?;
    let context = tap.context();

    // The control connection is shared between the event-delivery thread
    // (classify, inject, re-lock layout) and the signal-wait thread (stop
    // delivery); every use happens under this one lock.
    let control = Arc::new(Mutex::new(backend));

    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
    ])
    .context("failed to install signal handlers")?;
    let signal_handle = signals.handle();

    let signal_control = Arc::clone(&control);
    let sigwait_thread = std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!("caught signal {}, stopping event delivery", signal);
            let control = signal_control.lock();
            if let Err(err) = control.stop_tap(context) {
                warn!("failed to disable the record context: {}", err);
            }
        }
    });

    info!("xtap running with {} rule(s)", engine.rules().len());

    tap.run(|event| {
        let mut control = control.lock();
        engine.handle_event(event, &mut *control);
    })
    .context("event delivery failed")?;

    signal_handle.close();
    sigwait_thread
        .join()
        .map_err(|_| anyhow::anyhow!("signal-wait thread panicked"))?;

    if let Err(err) = control.lock().free_tap(context) {
        warn!("failed to free the record context: {}", err);
    }

    debug!("main exiting");
    Ok(())
}

// Stub for when the x11-backend feature is not enabled
#[cfg(not(feature = "x11-backend"))]
fn main() {
    eprintln!("Error: the xtap binary requires the 'x11-backend' feature.");
    eprintln!("Please build with: cargo build --release --features x11-backend");
    std::process::exit(1);
}
