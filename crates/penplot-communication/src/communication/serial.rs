//! Serial port communication implementation
//!
//! Provides the byte channel both device links talk through:
//! - [`SerialChannel`]: blocking write, short-timeout read, buffer control
//! - [`ChannelOpener`]: how a link obtains a channel, injected at construction
//! - [`SerialPortOpener`]/[`RealSerialChannel`]: the `serialport` backed pair
//! - [`list_ports`]: port enumeration

use crate::communication::{ConnectionParams, SerialParity};
use parking_lot::Mutex;
use penplot_core::{Error, LinkError, Result};
use std::io::{self, Read, Write};
use std::time::Duration;

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// USB vendor and product ID if applicable
    pub usb_ids: Option<(u16, u16)>,
}

/// List available serial ports on the system, sorted by name
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    let ports = serialport::available_ports().map_err(|e| {
        tracing::error!("Failed to enumerate serial ports: {}", e);
        Error::other(format!("Failed to enumerate ports: {}", e))
    })?;

    let mut infos: Vec<SerialPortInfo> = ports
        .iter()
        .map(|port| SerialPortInfo {
            port_name: port.port_name.clone(),
            description: port_description(port),
            usb_ids: match &port.port_type {
                serialport::SerialPortType::UsbPort(usb) => Some((usb.vid, usb.pid)),
                _ => None,
            },
        })
        .collect();
    infos.sort_by(|a, b| a.port_name.cmp(&b.port_name));
    Ok(infos)
}

fn port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => format!(
            "USB {} {}",
            usb_info.manufacturer.as_deref().unwrap_or("Device"),
            usb_info.product.as_deref().unwrap_or("Serial Port")
        ),
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// Bidirectional byte channel to one device
pub trait SerialChannel: Send {
    /// Write every byte or fail
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Push buffered output to the device
    fn flush(&mut self) -> io::Result<()>;

    /// Read whatever is available, blocking at most the channel's read
    /// timeout. `Ok(0)` means nothing arrived in that window.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discard stale bytes in both directions
    fn clear_buffers(&mut self) -> io::Result<()>;

    /// Release the device
    fn close(&mut self) -> io::Result<()>;
}

/// Source of channels for a link
pub trait ChannelOpener: Send + Sync {
    /// Open the channel described by `params`
    fn open(&self, params: &ConnectionParams) -> Result<Box<dyn SerialChannel>>;
}

/// Opens hardware ports through `serialport`
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialPortOpener;

impl ChannelOpener for SerialPortOpener {
    fn open(&self, params: &ConnectionParams) -> Result<Box<dyn SerialChannel>> {
        Ok(Box::new(RealSerialChannel::open(params)?))
    }
}

fn to_serialport_parity(parity: SerialParity) -> serialport::Parity {
    match parity {
        SerialParity::None => serialport::Parity::None,
        SerialParity::Even => serialport::Parity::Even,
        SerialParity::Odd => serialport::Parity::Odd,
    }
}

/// Real serial port implementation using serialport crate
pub struct RealSerialChannel {
    name: String,
    port: Mutex<Option<Box<dyn serialport::SerialPort>>>,
}

impl std::fmt::Debug for RealSerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealSerialChannel")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl RealSerialChannel {
    /// Open a serial port with the given parameters
    pub fn open(params: &ConnectionParams) -> Result<Self> {
        let failed = |reason: String| LinkError::FailedToOpen {
            port: params.port.clone(),
            reason,
        };

        let data_bits = match params.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => return Err(failed(format!("invalid data bits: {other}")).into()),
        };
        let stop_bits = match params.stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            other => return Err(failed(format!("invalid stop bits: {other}")).into()),
        };

        let port = serialport::new(&params.port, params.baud_rate)
            .timeout(Duration::from_millis(params.read_timeout_ms))
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(to_serialport_parity(params.parity))
            .flow_control(if params.flow_control {
                serialport::FlowControl::Hardware
            } else {
                serialport::FlowControl::None
            })
            .open()
            .map_err(|e| {
                tracing::warn!("Failed to open serial port {}: {}", params.port, e);
                failed(e.to_string())
            })?;

        tracing::info!("Opened {} at {} baud", params.port, params.baud_rate);
        Ok(Self {
            name: params.port.clone(),
            port: Mutex::new(Some(port)),
        })
    }

    fn with_port<T>(
        &self,
        f: impl FnOnce(&mut Box<dyn serialport::SerialPort>) -> io::Result<T>,
    ) -> io::Result<T> {
        let mut guard = self.port.lock();
        match guard.as_mut() {
            Some(port) => f(port),
            None => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("{} is closed", self.name),
            )),
        }
    }
}

impl SerialChannel for RealSerialChannel {
    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.with_port(|port| port.write_all(data))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_port(|port| port.flush())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.with_port(|port| match port.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            other => other,
        })
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.with_port(|port| {
            port.clear(serialport::ClearBuffer::All)
                .map_err(io::Error::from)
        })
    }

    fn close(&mut self) -> io::Result<()> {
        if self.port.lock().take().is_some() {
            tracing::debug!("Closed {}", self.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_framing_fails_before_open() {
        let mut params = ConnectionParams::new("/dev/penplot-test-none", 115_200);
        params.data_bits = 9;
        let err = RealSerialChannel::open(&params).unwrap_err();
        assert!(matches!(
            err,
            Error::Link(LinkError::FailedToOpen { ref port, .. }) if port == "/dev/penplot-test-none"
        ));
    }

    #[test]
    fn test_missing_port_fails_to_open() {
        let params = ConnectionParams::new("/dev/penplot-test-none", 115_200);
        match SerialPortOpener.open(&params) {
            Err(err) => assert!(err.is_link_error()),
            Ok(_) => panic!("opened a port that does not exist"),
        }
    }

    #[test]
    fn test_parity_mapping() {
        assert_eq!(
            to_serialport_parity(SerialParity::Even),
            serialport::Parity::Even
        );
        assert_eq!(
            to_serialport_parity(SerialParity::None),
            serialport::Parity::None
        );
    }
}
