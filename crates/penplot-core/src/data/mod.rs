//! Data model shared by the planning and transport layers
//!
//! - [`PixelPoint`]/[`PixelPolyline`]: integer raster coordinates
//! - [`MmPoint`]/[`MmPolyline`]: physical coordinates in millimeters
//! - [`RasterFrame`]: binary pixel grid produced by raster decoding
//! - [`Command`]/[`PenState`]: one motion command for the controller

mod command;
mod frame;
mod geometry;

pub use command::{Command, PenFlags, PenState};
pub use frame::RasterFrame;
pub use geometry::{MmPoint, MmPolyline, PixelPoint, PixelPolyline};
