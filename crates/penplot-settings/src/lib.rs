//! Penplot Settings Crate
//!
//! Handles configuration loading, validation and persistence, and turns
//! each configuration section into the component it parameterizes.

pub mod config;
pub mod error;

pub use config::{
    Config, ContourSettings, ControllerSettings, EncoderSettings, FpgaSettings, OrderingSettings,
    APP_DIR, CONFIG_FILE,
};
pub use error::{ConfigError, SettingsError, SettingsResult};
