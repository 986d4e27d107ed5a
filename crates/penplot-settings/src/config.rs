//! Configuration and settings management for penplot
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats; the default file lives in the platform config
//! directory.
//!
//! Configuration is organized into the pipeline's stages:
//! - Raster layout agreed with the accelerator
//! - Host-side edge filter (offline acquisition)
//! - Contour filtering and path ordering
//! - Geometry (scale, simplification, densification)
//! - Command encoding (pen flags, home position)
//! - FPGA and controller serial links
//!
//! Every section converts into the constructor arguments of the component
//! it configures; nothing here is global.

use crate::error::{ConfigError, SettingsError, SettingsResult};
use penplot_camtools::{
    CannyEdgeFilter, CommandEncoder, ContourAdapter, ContourTracerKind, GeometryParams,
    GeometryTransformer, PathOrderer, RasterCodec, RasterSpec, DEFAULT_MIN_LENGTH,
};
use penplot_communication::{
    ConnectionParams, ControllerConfig, FlowControl, FpgaConfig, ReceiveMode,
};
use penplot_core::{MmPoint, PenFlags, PixelPoint};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the platform config directory
pub const APP_DIR: &str = "penplot";
/// File name of the default configuration
pub const CONFIG_FILE: &str = "config.toml";

/// Contour filtering settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourSettings {
    /// Contours with fewer points are dropped
    pub min_length: usize,
    /// Tracing algorithm
    pub tracer: ContourTracerKind,
}

impl Default for ContourSettings {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            tracer: ContourTracerKind::default(),
        }
    }
}

/// Path ordering settings
///
/// An `[ordering]` section without `start` means no start point; leaving
/// the section out keeps the default of (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderingSettings {
    /// Pen position before the first stroke, in pixels. Without one the
    /// longest contour is plotted first.
    #[serde(default)]
    pub start: Option<PixelPoint>,
}

impl Default for OrderingSettings {
    fn default() -> Self {
        Self {
            start: Some(PixelPoint::new(0, 0)),
        }
    }
}

/// Command encoding settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// `z:` value for a lifted pen
    pub pen_up_flag: u8,
    /// `z:` value for a lowered pen
    pub pen_down_flag: u8,
    /// Where the first pen-up move goes, in mm
    pub home: MmPoint,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        let flags = PenFlags::default();
        Self {
            pen_up_flag: flags.up,
            pen_down_flag: flags.down,
            home: MmPoint::new(0.0, 0.0),
        }
    }
}

/// FPGA link settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FpgaSettings {
    /// Serial port name
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Byte that starts an image intake
    pub trigger_byte: u8,
    /// Settle time after opening the port
    pub settle_ms: u64,
    /// Pause between trigger and payload
    pub trigger_settle_ms: u64,
    /// Payload bytes per burst
    pub burst_size: usize,
    /// Pause between bursts
    pub burst_pause_ms: u64,
    /// Longest wait for the first response byte
    pub response_timeout_ms: u64,
    /// Longest silent gap once the response has started
    pub receive_timeout_ms: u64,
    /// Pause after an empty read
    pub poll_interval_ms: u64,
    /// Response length; defaults to the raster wire length
    pub expected_len: Option<usize>,
    /// How receiving ends
    pub receive_mode: ReceiveMode,
    /// Width the source image is resized to before upload
    pub image_width: u32,
    /// Height the source image is resized to before upload
    pub image_height: u32,
}

impl Default for FpgaSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            trigger_byte: 0xAA,
            settle_ms: 3000,
            trigger_settle_ms: 100,
            burst_size: 1500,
            burst_pause_ms: 1,
            response_timeout_ms: 10_000,
            receive_timeout_ms: 10_000,
            poll_interval_ms: 10,
            expected_len: None,
            receive_mode: ReceiveMode::Fixed,
            image_width: 170,
            image_height: 240,
        }
    }
}

/// Controller link settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Serial port name
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Byte the controller answers per consumed command
    pub ack_byte: u8,
    /// Keep several commands in flight instead of one
    pub pipelined: bool,
    /// Commands the controller can buffer when pipelined
    pub queue_capacity: usize,
    /// Longest silence tolerated while acknowledgments are owed
    pub ack_timeout_ms: u64,
    /// Pause after an empty read
    pub poll_interval_ms: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115_200,
            ack_byte: 0xBB,
            pipelined: false,
            queue_capacity: 64,
            ack_timeout_ms: 30_000,
            poll_interval_ms: 1,
        }
    }
}

impl ControllerSettings {
    /// Flow-control discipline implied by these settings
    pub fn flow(&self) -> FlowControl {
        if self.pipelined {
            FlowControl::Pipelined {
                capacity: self.queue_capacity,
            }
        } else {
            FlowControl::Sync
        }
    }
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Raster layout
    pub raster: RasterSpec,
    /// Host-side edge filter
    pub filter: CannyEdgeFilter,
    /// Contour filtering
    pub contour: ContourSettings,
    /// Path ordering
    pub ordering: OrderingSettings,
    /// Unit conversion and simplification
    pub geometry: GeometryParams,
    /// Command encoding
    pub encoder: EncoderSettings,
    /// FPGA link
    pub fpga: FpgaSettings,
    /// Controller link
    pub controller: ControllerSettings,
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(ConfigError::UnsupportedFormat(other.unwrap_or("<none>").to_string()).into()),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the per-user config file
    pub fn default_path() -> SettingsResult<PathBuf> {
        let dir = dirs::config_dir().ok_or_else(|| {
            ConfigError::UnsupportedPlatform("no per-user config directory".to_string())
        })?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| SettingsError::LoadError(format!("{}: {}", path.display(), e)))?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                SettingsError::SaveError(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        std::fs::write(path, content)
            .map_err(|e| SettingsError::SaveError(format!("{}: {}", path.display(), e)))?;

        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Load an explicitly named file, or the per-user file if one exists.
    ///
    /// A missing explicit file is an error; a missing per-user file (or no
    /// config directory at all) yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        match Self::default_path() {
            Ok(default) if default.exists() => Self::load_from_file(&default),
            Ok(default) => {
                tracing::info!("No config at {}, using defaults", default.display());
                Ok(Self::default())
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Ok(Self::default())
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        // Raster
        if self.raster.width == 0 || self.raster.height == 0 {
            return Err(SettingsError::invalid(
                "raster",
                "width and height must be > 0",
            ));
        }

        // Filter
        if self.filter.low_threshold > self.filter.high_threshold {
            return Err(SettingsError::invalid(
                "filter",
                "low_threshold must not exceed high_threshold",
            ));
        }

        // Geometry
        self.geometry.validate()?;

        // Encoder
        if self.encoder.pen_up_flag == self.encoder.pen_down_flag {
            return Err(SettingsError::invalid(
                "encoder",
                "pen_up_flag and pen_down_flag must differ",
            ));
        }

        // FPGA
        if self.fpga.baud_rate == 0 {
            return Err(SettingsError::invalid("fpga.baud_rate", "must be > 0"));
        }
        if self.fpga.burst_size == 0 {
            return Err(SettingsError::invalid("fpga.burst_size", "must be > 0"));
        }
        if self.fpga.expected_len == Some(0) {
            return Err(SettingsError::invalid("fpga.expected_len", "must be > 0"));
        }
        if self.fpga.image_width == 0 || self.fpga.image_height == 0 {
            return Err(SettingsError::invalid(
                "fpga",
                "image_width and image_height must be > 0",
            ));
        }

        // Controller
        if self.controller.baud_rate == 0 {
            return Err(SettingsError::invalid("controller.baud_rate", "must be > 0"));
        }
        if self.controller.pipelined && self.controller.queue_capacity == 0 {
            return Err(SettingsError::invalid(
                "controller.queue_capacity",
                "must be > 0",
            ));
        }
        if self.controller.ack_timeout_ms == 0 {
            return Err(SettingsError::invalid(
                "controller.ack_timeout_ms",
                "must be > 0",
            ));
        }

        Ok(())
    }

    /// Raster decoder for the configured frame layout
    pub fn raster_codec(&self) -> RasterCodec {
        RasterCodec::new(self.raster)
    }

    /// Contour stage with the configured tracer and minimum length
    pub fn contour_adapter(&self) -> ContourAdapter {
        ContourAdapter::new(Box::new(self.contour.tracer), self.contour.min_length)
    }

    /// Path orderer starting from the configured pen position
    pub fn path_orderer(&self) -> PathOrderer {
        PathOrderer::new(self.ordering.start)
    }

    /// Geometry stage with validated parameters
    pub fn geometry_transformer(&self) -> SettingsResult<GeometryTransformer> {
        Ok(GeometryTransformer::new(self.geometry)?)
    }

    /// Command encoder with the configured pen flags and home
    pub fn command_encoder(&self) -> SettingsResult<CommandEncoder> {
        let flags = PenFlags {
            up: self.encoder.pen_up_flag,
            down: self.encoder.pen_down_flag,
        };
        Ok(CommandEncoder::new(flags, self.encoder.home)?)
    }

    /// FPGA link settings; the response length defaults to one raster frame
    pub fn fpga_config(&self) -> FpgaConfig {
        let fpga = &self.fpga;
        FpgaConfig {
            connection: ConnectionParams::new(fpga.port.clone(), fpga.baud_rate),
            trigger_byte: fpga.trigger_byte,
            settle: Duration::from_millis(fpga.settle_ms),
            trigger_settle: Duration::from_millis(fpga.trigger_settle_ms),
            burst_size: fpga.burst_size,
            burst_pause: Duration::from_millis(fpga.burst_pause_ms),
            response_timeout: Duration::from_millis(fpga.response_timeout_ms),
            receive_timeout: Duration::from_millis(fpga.receive_timeout_ms),
            poll_interval: Duration::from_millis(fpga.poll_interval_ms),
            expected_len: fpga.expected_len.unwrap_or_else(|| self.raster.wire_len()),
            receive_mode: fpga.receive_mode,
        }
    }

    /// Controller link settings
    pub fn controller_config(&self) -> ControllerConfig {
        let controller = &self.controller;
        ControllerConfig {
            connection: ConnectionParams::new(controller.port.clone(), controller.baud_rate),
            ack_byte: controller.ack_byte,
            flow: controller.flow(),
            ack_timeout: Duration::from_millis(controller.ack_timeout_ms),
            poll_interval: Duration::from_millis(controller.poll_interval_ms),
        }
    }
}
