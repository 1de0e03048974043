//! Configuration management
//!
//! Configuration is layered: file (TOML, YAML or JSON), then environment
//! overrides (including a `.env` file), then validation.

mod env_loader;
mod file_loader;
mod model;

pub use env_loader::{apply_env, apply_env_with};
pub use file_loader::load_from_file;
pub use model::{Config, LoggingConfig, MeterConfig, OpenMeterConfig, ResilienceConfig};

use std::path::Path;

use crate::error::MeterResult;

impl Config {
    /// Load from `path`, apply environment overrides, then validate
    pub fn load(path: impl AsRef<Path>) -> MeterResult<Self> {
        let mut config = load_from_file(path.as_ref())?;
        apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides
    pub fn from_env() -> MeterResult<Self> {
        let mut config = Config::default();
        apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }
}
