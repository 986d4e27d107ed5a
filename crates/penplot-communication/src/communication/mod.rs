//! Serial channel plumbing shared by both device links
//!
//! - [`serial`]: the [`SerialChannel`] seam and its `serialport` implementation
//! - [`session`]: [`SerialSession`], one open channel for one transfer
//! - [`buffered`]: acknowledgment window for command streaming

pub mod buffered;
pub mod serial;
pub mod session;

pub use buffered::{AckWindow, CommandStatus, PendingCommand};
pub use serial::{list_ports, ChannelOpener, SerialChannel, SerialPortInfo, SerialPortOpener};
pub use session::SerialSession;

use serde::{Deserialize, Serialize};

/// Parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    /// No parity bit
    #[default]
    None,
    /// Even parity
    Even,
    /// Odd parity
    Odd,
}

/// Parameters for opening a serial port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Port name (e.g. "/dev/ttyUSB0", "COM3")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5-8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    /// Stop bits (1 or 2)
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    /// Parity
    #[serde(default)]
    pub parity: SerialParity,
    /// Hardware flow control
    #[serde(default)]
    pub flow_control: bool,
    /// Upper bound for a single blocking read, in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_read_timeout_ms() -> u64 {
    10
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self::new("", 115_200)
    }
}

impl ConnectionParams {
    /// 8N1 parameters for `port` at `baud_rate`
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            data_bits: default_data_bits(),
            stop_bits: default_stop_bits(),
            parity: SerialParity::None,
            flow_control: false,
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}
