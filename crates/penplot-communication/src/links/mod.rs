//! Device links
//!
//! - [`fpga`]: trigger, bulk payload out, fixed-length response back
//! - [`controller`]: line-by-line command streaming with acknowledgments

pub mod controller;
pub mod fpga;

pub use controller::{ControllerConfig, ControllerLink, FlowControl, StreamReport};
pub use fpga::{FpgaConfig, FpgaLink, FpgaReport, FpgaState, ReceiveMode};
