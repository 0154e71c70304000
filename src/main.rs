//! espterm - serial terminal bridge with ESP exception dump capture
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::eyre;
use espterm::app::{load_settings, Overrides};
use espterm::device::{list_ports, DeviceConfig};
use espterm::{run_monitor, MonitorConfig};

/// espterm - serial terminal with exception dump capture
#[derive(Parser, Debug)]
#[command(name = "espterm")]
#[command(
    about = "Bridge stdin/stdout to a serial port and capture ESP exception dumps",
    long_about = None
)]
struct Args {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    #[arg(value_name = "PORT", required_unless_present = "list")]
    port: Option<String>,

    /// Write detected dumps into the dump file (earlier dumps are kept as dump.log.1, dump.log.2, ...)
    #[arg(short = 'd', long = "dump")]
    dump: bool,

    /// Baud rate: 1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200 or 230400 [default: 115200]
    #[arg(short = 'b', long = "baud", value_name = "RATE")]
    baud: Option<u32>,

    /// Dump file path [default: dump.log]
    #[arg(long, value_name = "PATH")]
    dump_file: Option<PathBuf>,

    /// List available serial ports and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    // Diagnostics go to a file; a broken log directory must not stop the bridge
    if let Err(e) = espterm::common::logging::init() {
        eprintln!("warning: file logging unavailable: {}", e);
    }

    if args.list {
        let ports = list_ports()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        }
        for port in ports {
            println!("{}\t{}", port.port_name, port.description);
        }
        return Ok(());
    }

    let port = args.port.ok_or_else(|| eyre!("a serial port is required"))?;

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let settings = load_settings(&cwd).merge(&Overrides {
        baud_rate: args.baud,
        dump_enabled: args.dump,
        dump_file: args.dump_file,
    });
    let baud_rate = settings.baud_rate()?;
    tracing::info!(
        "Starting on {} at {} baud, dump capture {}",
        port,
        baud_rate,
        if settings.dump.enabled { "on" } else { "off" }
    );

    let config = MonitorConfig {
        device: DeviceConfig::new(port, baud_rate),
        capture: settings.capture_options(),
    };
    run_monitor(config).await?;
    Ok(())
}
