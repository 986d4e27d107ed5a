//! # Penplot CAM Tools
//!
//! Turns a raster returned by the edge accelerator into plot-ready motion
//! commands.
//!
//! ## Planning stages
//!
//! - **Raster Codec**: header search and 1bpp / byte-per-pixel unpacking
//! - **Contour Adapter**: contour tracing behind a narrow trait, short contour filtering
//! - **Path Optimizer**: greedy nearest-neighbor ordering with direction choice
//! - **Geometry**: pixel to mm conversion, RDP simplification, densification
//! - **Command Encoder**: pen-up/pen-down command generation and line format
//!
//! ## Supporting tools
//!
//! - **Edge Filter**: host-side Canny filter standing in for the accelerator
//! - **Payload**: RGB payload preparation for the accelerator
//! - **Preview**: ordered path rendering

pub mod contour;
pub mod edge_filter;
pub mod encoder;
pub mod geometry;
pub mod optimizer;
pub mod payload;
pub mod preview;
pub mod raster;

// Re-export commonly used items
pub use contour::{ContourAdapter, ContourTracer, ContourTracerKind, DEFAULT_MIN_LENGTH};
pub use edge_filter::{CannyEdgeFilter, EdgeFilter};
pub use encoder::CommandEncoder;
pub use geometry::{densify, pixels_to_mm, rdp_simplify, GeometryParams, GeometryTransformer};
pub use optimizer::{penup_distance, OrderedPath, PathOrderer};
pub use raster::{
    encode_frame, encode_packed, from_luma, to_luma, BitOrder, PixelMode, RasterCodec, RasterSpec,
};
