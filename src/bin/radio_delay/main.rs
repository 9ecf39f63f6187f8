//! Radio Delay entrypoint: plays live audio back a few seconds late.
//!
//! # Architecture
//!
//! - Audio engine thread: owns the device and the delay ring
//! - Display worker thread: polls the buttons, renders the delay
//! - Keyboard thread: reads raw stdin bytes
//! - Main thread: control hub, the only writer of the delay

mod cli_utils;
mod input;
mod terminal;

use anyhow::{bail, Result};
use crossbeam_channel::unbounded;
use radio_delay::config::AppConfig;
use radio_delay::control::{ShutdownCause, StatusLine};
use radio_delay::telemetry::tracing_log_path;
use radio_delay::terminal_restore::TerminalRestoreGuard;
use radio_delay::{init_tracing, Runtime};
use tracing::{info, warn};

use crate::cli_utils::print_devices;
use crate::input::spawn_input_thread;
use crate::terminal::{install_termination_handler, termination_requested};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    if config.list_devices {
        print_devices()?;
        return Ok(());
    }

    init_tracing(&config);
    info!(
        delay = config.delay,
        sample_rate = config.sample_rate,
        chunk = config.chunk,
        width = config.width,
        channels = config.channels,
        bffsz = config.bffsz,
        log = %tracing_log_path().display(),
        "=== Radio Delay starting ==="
    );
    install_termination_handler()?;

    let runtime = Runtime::start(&config)?;

    let terminal_guard = TerminalRestoreGuard::new();
    if let Err(err) = terminal_guard.enable_raw_mode() {
        warn!(error = %err, "raw mode unavailable; keys take effect after Enter");
    }
    let (key_tx, key_rx) = unbounded();
    spawn_input_thread(key_tx)?;

    let report = runtime.run(key_rx, StatusLine::stdout(), termination_requested);
    terminal_guard.restore();

    info!(
        cause = ?report.cause,
        final_delay = report.final_delay,
        cycles = report.engine.map(|stats| stats.cycles),
        underflows = report.engine.map(|stats| stats.underflows),
        "=== Radio Delay stopped ==="
    );
    if let ShutdownCause::AudioFailure(reason) = report.cause {
        bail!("audio device lost: {reason}");
    }
    Ok(())
}
