//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{MeterError, MeterResult};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> MeterResult<()> {
    config.validate()?;

    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let result = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.pretty().try_init(),
    };

    result.map_err(|e| {
        MeterError::config_with_context(
            format!("Failed to install tracing subscriber: {}", e),
            "logging",
        )
    })
}

fn env_filter(config: &LoggingConfig) -> MeterResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(config.level.to_lowercase()).map_err(|e| {
            MeterError::config_with_context(
                format!("Invalid log level '{}': {}", config.level, e),
                "logging",
            )
        }),
    }
}
