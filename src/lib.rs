//! # Penplot
//!
//! Raster-to-pen-plotter pipeline:
//! - FPGA edge acquisition over a bulk serial link
//! - Contour extraction, travel-minimizing ordering and geometry cleanup
//! - Acknowledged command streaming to the motion controller
//!
//! ## Architecture
//!
//! Penplot is organized as a workspace with multiple crates:
//!
//! 1. **penplot-core** - Data model, errors, progress/cancel, artifact I/O
//! 2. **penplot-camtools** - Raster codec, contours, ordering, geometry, encoding
//! 3. **penplot-communication** - Serial channels, FPGA link, controller link
//! 4. **penplot-settings** - Configuration loading and validation
//! 5. **penplot** - Pipeline orchestration and the command line tool

pub mod pipeline;

pub use pipeline::{CycleReport, Pipeline, Plan, PlanReport};

pub use penplot_core::{
    CancelFlag, Command, Error, MmPoint, MmPolyline, PenState, PixelPoint, PixelPolyline,
    Progress, RasterFrame, Result, Stage,
};

pub use penplot_camtools::{
    CannyEdgeFilter, CommandEncoder, ContourAdapter, EdgeFilter, GeometryParams,
    GeometryTransformer, OrderedPath, PathOrderer, RasterCodec, RasterSpec,
};

pub use penplot_communication::{
    list_ports, ControllerLink, FlowControl, FpgaLink, FpgaReport, FpgaState, ReceiveMode,
    SerialPortInfo, StreamReport,
};

pub use penplot_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("PENPLOT_BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output on stderr, keeping stdout for reports
/// - RUST_LOG environment variable support, INFO when unset
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_names(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
