//! # Penplot Core
//!
//! Core types, errors and artifact I/O shared by the penplot crates.
//! Provides the data model that flows from raster decoding through path
//! planning to the serial links, plus progress and cancellation
//! primitives for the blocking transport operations.

pub mod artifact;
pub mod data;
pub mod error;
pub mod types;

pub use data::{
    Command, MmPoint, MmPolyline, PenFlags, PenState, PixelPoint, PixelPolyline, RasterFrame,
};

pub use error::{
    ArtifactError, Error, LinkError, ParameterError, RasterError, Result, Stage, StageContext,
};

pub use types::{CancelFlag, Progress};
