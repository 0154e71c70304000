//! Session runner: wires the serial device, stdin/stdout and signals to the
//! duplex transport.

use std::io::{self, Write};
use std::sync::Arc;

use tokio::sync::watch;

use espterm_core::prelude::*;
use espterm_device::{DeviceConfig, InputModeGuard, SerialDevice};

use crate::session::CaptureOptions;
use crate::signals::spawn_signal_handler;
use crate::transport::{self, Endpoints, RunSummary};

/// Printed once the device is released
pub const COMPLETION_NOTICE: &str = "Serial port closed. Program terminated.";

/// Everything needed to start a bridge session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub device: DeviceConfig,
    pub capture: CaptureOptions,
}

/// Run one foreground session against a real serial port.
///
/// Setup failures (port, terminal mode) are returned before anything runs.
/// After setup, the terminal mode is restored and the completion notice is
/// printed whether the session ends by signal, device loss or error.
pub async fn run_monitor(config: MonitorConfig) -> Result<RunSummary> {
    let device = SerialDevice::open(&config.device).context("Opening serial device")?;
    let port_name = device.name().to_string();
    let (device_rx, device_tx) = device.split().context("Splitting serial device")?;

    let input_mode = InputModeGuard::enable().context("Switching stdin input mode")?;
    if input_mode.is_active() {
        debug!("stdin switched to byte-at-a-time input");
    }

    let (shutdown, _) = watch::channel(false);
    let shutdown = Arc::new(shutdown);
    spawn_signal_handler(Arc::clone(&shutdown));

    if config.capture.enabled {
        info!(
            "Dump capture enabled, writing to {}",
            config.capture.dump_file.display()
        );
    }
    info!("Bridging {} at {} baud", port_name, config.device.baud_rate);

    let endpoints = Endpoints {
        device_rx,
        device_tx,
        input: io::stdin(),
        terminal: io::stdout(),
    };
    let result = transport::run(endpoints, config.capture, shutdown).await;

    drop(input_mode);

    match &result {
        Ok(summary) => info!(
            "Session finished: {:?}, {} marker(s), {} capture(s)",
            summary.inbound, summary.matches_seen, summary.captures_started
        ),
        Err(e) if e.is_fatal() => error!("Session failed: {}", e),
        Err(e) => warn!("Session ended with error: {}", e),
    }

    let mut stdout = io::stdout();
    let _ = writeln!(stdout, "\n{}", COMPLETION_NOTICE);
    let _ = stdout.flush();

    result
}
