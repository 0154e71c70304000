//! Serial port access built on the `serialport` crate

use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};

use super::baud::BaudRate;
use espterm_core::prelude::*;

/// Read timeout on the device handle.
///
/// Reads block for data otherwise; the timeout only exists so the inbound
/// loop can notice cancellation.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// A handle to one direction of an open serial port
pub type PortHandle = Box<dyn SerialPort>;

/// Serial line configuration: 8N1, no flow control, at `baud_rate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,
    pub baud_rate: BaudRate,
    pub read_timeout: Duration,
}

impl DeviceConfig {
    pub fn new(port: impl Into<String>, baud_rate: BaudRate) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// An open, configured serial port
pub struct SerialDevice {
    port: PortHandle,
    name: String,
}

impl SerialDevice {
    /// Open and configure the port described by `config`
    pub fn open(config: &DeviceConfig) -> Result<Self> {
        info!(
            "Opening serial port {} at {} baud",
            config.port, config.baud_rate
        );

        let port = serialport::new(&config.port, config.baud_rate.as_u32())
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| Error::device_open(&config.port, e))?;

        Ok(Self {
            port,
            name: config.port.clone(),
        })
    }

    /// Device path this port was opened from
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Split into independent read and write handles.
    ///
    /// Both handles refer to the same underlying device; one is used only
    /// for reading and the other only for writing, so no locking is needed.
    pub fn split(self) -> Result<(PortHandle, PortHandle)> {
        let writer = self
            .port
            .try_clone()
            .map_err(|e| Error::device_open(&self.name, e))?;
        debug!("Split serial port {} into reader and writer", self.name);
        Ok((self.port, writer))
    }
}

/// Summary of a serial port visible to the system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub port_name: String,
    pub description: String,
}

/// List the serial ports currently available
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|e| Error::terminal(format!("Failed to enumerate serial ports: {}", e)))?;

    Ok(ports
        .into_iter()
        .map(|p| PortInfo {
            description: describe_port_type(&p.port_type),
            port_name: p.port_name,
        })
        .collect())
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut parts = vec![format!("USB {:04x}:{:04x}", usb.vid, usb.pid)];
            if let Some(manufacturer) = &usb.manufacturer {
                parts.push(manufacturer.clone());
            }
            if let Some(product) = &usb.product {
                parts.push(product.clone());
            }
            parts.join(" ")
        }
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => "Unknown".to_string(),
    }
}
