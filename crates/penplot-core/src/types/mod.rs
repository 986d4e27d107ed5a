//! Shared types for long-running operations.
//!
//! Progress reporting and cooperative cancellation used by the serial
//! links and the pipeline orchestrator.

pub mod progress;

pub use progress::{CancelFlag, Progress};
