//! # espterm-device - Serial Device and Terminal Handling
//!
//! Opens and configures the serial port, validates the data rate, and puts
//! stdin into byte-at-a-time mode for the bridge.
//!
//! Depends on [`espterm_core`] for error handling.
//!
//! ## Public API
//!
//! - [`BaudRate`] - Supported data rates, parsed from a plain number
//! - [`DeviceConfig`], [`SerialDevice`] - Open an 8N1 port and split it into
//!   independent read and write handles
//! - [`list_ports()`] - Enumerate available serial ports
//! - [`InputModeGuard`] - RAII guard for non-canonical, no-echo stdin

pub mod baud;
pub mod input_mode;
pub mod serial;

pub use baud::BaudRate;
pub use input_mode::InputModeGuard;
pub use serial::{list_ports, DeviceConfig, PortHandle, PortInfo, SerialDevice, DEFAULT_READ_TIMEOUT};
