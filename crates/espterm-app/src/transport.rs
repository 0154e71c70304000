//! Duplex transport between the serial device and the terminal
//!
//! Two execution contexts run for the lifetime of a session:
//! - the inbound loop ([`pump_device`]) reads the device, feeds the
//!   [`Session`] and writes the terminal (and dump log),
//! - the input relay ([`relay_input`]) copies stdin to the device verbatim.
//!
//! They share nothing but a cancellation channel; each owns its own handle
//! to the device, one for reading and one for writing.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};

use espterm_core::prelude::*;
use espterm_core::scanner::ScanResult;

use crate::session::{CaptureOptions, Session};

/// Largest chunk read from either source in one call
pub const CHUNK_SIZE: usize = 256;

/// How long teardown waits for the input relay to report after the inbound
/// loop has stopped. An interactive stdin read cannot be interrupted, so the
/// relay thread is left behind when it does not report in time.
pub const RELAY_GRACE: Duration = Duration::from_millis(200);

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Why the inbound loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundExit {
    /// Cancellation was requested
    Cancelled,
    /// The device returned end-of-stream
    DeviceClosed,
}

/// Why the input relay stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundExit {
    Cancelled,
    /// stdin reached end-of-file
    InputClosed,
}

/// The four byte endpoints of a bridge session
pub struct Endpoints<DR, DW, I, T> {
    /// Read half of the device
    pub device_rx: DR,
    /// Write half of the device
    pub device_tx: DW,
    /// Source of user input (stdin)
    pub input: I,
    /// Terminal output (stdout)
    pub terminal: T,
}

/// Outcome of a completed [`run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub inbound: InboundExit,
    /// `None` when the relay was still blocked on input at teardown
    pub outbound: Option<OutboundExit>,
    pub matches_seen: u64,
    pub captures_started: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// Route one device chunk through the session.
///
/// Without a completed marker the chunk is logged (when capturing) and
/// echoed raw. When a marker completes, the bytes before it are handled the
/// same way under the old state, the marker itself is replaced by the state
/// banner, and the remainder after it is logged under the new state and
/// echoed with `[XX]` escapes. The remainder is not scanned again.
pub fn dispatch_chunk<W: Write>(session: &mut Session<W>, chunk: &[u8]) -> Result<()> {
    match session.scan(chunk) {
        ScanResult::NoMatch => session.forward(chunk)?,
        ScanResult::Matched { offset } => {
            let marker_start = offset.saturating_sub(session.marker_len());
            if marker_start > 0 {
                session.forward(&chunk[..marker_start])?;
            }
            session.toggle()?;
            if offset < chunk.len() {
                session.forward_remainder(&chunk[offset..])?;
            }
        }
    }
    session.flush_terminal()
}

// ─────────────────────────────────────────────────────────────────────────────
// Loops
// ─────────────────────────────────────────────────────────────────────────────

/// Read timeouts and interrupted reads just mean "no data yet"
fn is_idle_read(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// Inbound loop: device → session, until cancellation, end-of-stream or an
/// I/O failure.
pub fn pump_device<R: Read, W: Write>(
    mut device: R,
    session: &mut Session<W>,
    shutdown: &watch::Receiver<bool>,
) -> Result<InboundExit> {
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        if *shutdown.borrow() {
            debug!("Inbound loop cancelled");
            return Ok(InboundExit::Cancelled);
        }

        let n = match device.read(&mut buf) {
            Ok(0) => {
                info!("Device reached end of stream");
                return Ok(InboundExit::DeviceClosed);
            }
            Ok(n) => n,
            Err(e) if is_idle_read(&e) => continue,
            Err(e) => {
                return Err(Error::transport(format!("Error reading from device: {}", e)));
            }
        };

        trace!("device: {} bytes", n);
        dispatch_chunk(session, &buf[..n])?;
    }
}

/// Input relay: every byte from `input` goes to `device` unchanged.
pub fn relay_input<R: Read, W: Write>(
    mut input: R,
    mut device: W,
    shutdown: &watch::Receiver<bool>,
) -> Result<OutboundExit> {
    let mut buf = [0u8; CHUNK_SIZE];

    loop {
        if *shutdown.borrow() {
            debug!("Input relay cancelled");
            return Ok(OutboundExit::Cancelled);
        }

        let n = match input.read(&mut buf) {
            Ok(0) => {
                info!("Input reached end of file");
                return Ok(OutboundExit::InputClosed);
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(Error::transport(format!("Error reading from stdin: {}", e)));
            }
        };

        device
            .write_all(&buf[..n])
            .and_then(|()| device.flush())
            .map_err(|e| Error::transport(format!("Error writing to serial port: {}", e)))?;
        trace!("input: {} bytes", n);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Orchestration
// ─────────────────────────────────────────────────────────────────────────────

/// Run both directions until the inbound loop stops.
///
/// The inbound loop runs on the blocking pool and owns the [`Session`]; the
/// input relay runs on a dedicated thread. Setting `shutdown` to `true`
/// stops both. A relay failure also stops the inbound loop; an inbound stop
/// (for any reason) cancels the relay. Any open capture is closed before
/// this returns.
pub async fn run<DR, DW, I, T>(
    endpoints: Endpoints<DR, DW, I, T>,
    options: CaptureOptions,
    shutdown: Arc<watch::Sender<bool>>,
) -> Result<RunSummary>
where
    DR: Read + Send + 'static,
    DW: Write + Send + 'static,
    I: Read + Send + 'static,
    T: Write + Send + 'static,
{
    let Endpoints {
        device_rx,
        device_tx,
        input,
        terminal,
    } = endpoints;

    let (relay_tx, mut relay_rx) = oneshot::channel::<Result<OutboundExit>>();
    let relay_shutdown = shutdown.subscribe();
    std::thread::Builder::new()
        .name("espterm-input".to_string())
        .spawn(move || {
            let result = relay_input(input, device_tx, &relay_shutdown);
            let _ = relay_tx.send(result);
        })
        .map_err(|e| Error::transport(format!("Failed to spawn input relay: {}", e)))?;

    let inbound_shutdown = shutdown.subscribe();
    let mut inbound = tokio::task::spawn_blocking(move || {
        let mut session = Session::new(options, terminal);
        let result = pump_device(device_rx, &mut session, &inbound_shutdown);
        if let Err(e) = session.finish() {
            warn!("Failed to finish session cleanly: {}", e);
        }
        result.map(|exit| (exit, session.matches_seen(), session.captures_started()))
    });

    let mut relay_pending = true;
    let mut outbound = None;
    let mut relay_error = None;

    let joined = loop {
        tokio::select! {
            joined = &mut inbound => break joined,
            relay = &mut relay_rx, if relay_pending => {
                relay_pending = false;
                match relay {
                    Ok(Ok(exit)) => {
                        info!("Input relay stopped: {:?}", exit);
                        outbound = Some(exit);
                    }
                    Ok(Err(e)) => {
                        error!("Input relay failed: {}", e);
                        relay_error = Some(e);
                        shutdown.send_replace(true);
                    }
                    Err(_) => warn!("Input relay ended without reporting"),
                }
            }
        }
    };

    // The device side is done; stop the relay at its next wake-up
    shutdown.send_replace(true);

    if relay_pending {
        match tokio::time::timeout(RELAY_GRACE, &mut relay_rx).await {
            Ok(Ok(Ok(exit))) => outbound = Some(exit),
            Ok(Ok(Err(e))) => warn!("Input relay failed during teardown: {}", e),
            Ok(Err(_)) => warn!("Input relay ended without reporting"),
            Err(_) => debug!("Input relay still blocked on input, leaving it behind"),
        }
    }

    let (inbound, matches_seen, captures_started) = joined
        .map_err(|e| Error::transport(format!("Device reader task failed: {}", e)))??;

    if let Some(e) = relay_error {
        return Err(e);
    }

    Ok(RunSummary {
        inbound,
        outbound,
        matches_seen,
        captures_started,
    })
}
