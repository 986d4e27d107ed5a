//! # Penplot Communication
//!
//! Serial transport for the two devices in the plotting cycle: the FPGA
//! edge accelerator (bulk image exchange) and the motion controller
//! (acknowledged command streaming). Both links block the calling thread
//! for bounded durations and check a shared cancel flag at every poll.

pub mod communication;
pub mod links;

pub use communication::{
    list_ports, AckWindow, ChannelOpener, CommandStatus, ConnectionParams, PendingCommand,
    SerialChannel, SerialParity, SerialPortInfo, SerialPortOpener, SerialSession,
};

pub use links::{
    ControllerConfig, ControllerLink, FlowControl, FpgaConfig, FpgaLink, FpgaReport, FpgaState,
    ReceiveMode, StreamReport,
};
