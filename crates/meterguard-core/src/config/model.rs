//! Configuration data model

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MeterError, MeterResult};
use crate::resilience::circuit_breaker::{
    CircuitBreakerConfig, DEFAULT_FAILURE_THRESHOLD, DEFAULT_RESET_TIMEOUT,
};

/// Top-level Meterguard configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub resilience: ResilienceConfig,
    pub logging: LoggingConfig,
    pub openmeter: OpenMeterConfig,
}

impl Config {
    pub fn validate(&self) -> MeterResult<()> {
        self.resilience.validate()?;
        self.logging.validate()?;
        self.openmeter.validate()
    }
}

/// Circuit breaker and executor settings shared by every dependency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Consecutive failures before a circuit opens
    pub failure_threshold: u32,
    /// How long an open circuit waits before a probe call
    #[serde(with = "humantime_serde")]
    pub reset_timeout: Duration,
    /// Deadline applied to every async call; none by default
    #[serde(with = "humantime_serde")]
    pub call_timeout: Option<Duration>,
    /// Whether errors propagated unchanged still count toward opening the circuit
    pub count_passthrough_failures: bool,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: DEFAULT_RESET_TIMEOUT,
            call_timeout: None,
            count_passthrough_failures: true,
        }
    }
}

impl ResilienceConfig {
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: self.reset_timeout,
        }
    }

    pub fn validate(&self) -> MeterResult<()> {
        if self.failure_threshold == 0 {
            return Err(MeterError::config_with_context(
                "failure_threshold must be at least 1",
                "resilience",
            ));
        }
        if self.reset_timeout.is_zero() {
            return Err(MeterError::config_with_context(
                "reset_timeout must be greater than zero",
                "resilience",
            ));
        }
        if self.call_timeout.is_some_and(|t| t.is_zero()) {
            return Err(MeterError::config_with_context(
                "call_timeout must be greater than zero when set",
                "resilience",
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, compact, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "error".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    const LEVELS: [&'static str; 5] = ["trace", "debug", "info", "warn", "error"];
    const FORMATS: [&'static str; 3] = ["pretty", "compact", "json"];

    pub fn validate(&self) -> MeterResult<()> {
        if !Self::LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(MeterError::config_with_context(
                format!("Unknown log level '{}'", self.level),
                "logging",
            ));
        }
        if !Self::FORMATS.contains(&self.format.as_str()) {
            return Err(MeterError::config_with_context(
                format!("Unknown log format '{}'", self.format),
                "logging",
            ));
        }
        Ok(())
    }
}

/// Connection and naming settings for the OpenMeter vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenMeterConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    /// CloudEvents `source` attribute of ingested usage events
    pub source: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Feature used for token entitlements
    pub feature_key: String,
    /// Event type of token usage events
    pub token_event_type: String,
    /// Meter created by the provisioning routine
    pub meter: MeterConfig,
}

impl Default for OpenMeterConfig {
    fn default() -> Self {
        Self {
            api_url: "https://openmeter.cloud".to_string(),
            api_key: None,
            source: "source".to_string(),
            timeout: Duration::from_secs(1),
            feature_key: "ai_tokens".to_string(),
            token_event_type: "tokens".to_string(),
            meter: MeterConfig::default(),
        }
    }
}

impl OpenMeterConfig {
    pub fn validate(&self) -> MeterResult<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(MeterError::config_with_context(
                format!("Invalid OpenMeter API URL '{}'", self.api_url),
                "openmeter",
            ));
        }
        if self.feature_key.trim().is_empty() || self.token_event_type.trim().is_empty() {
            return Err(MeterError::config_with_context(
                "feature_key and token_event_type must not be empty",
                "openmeter",
            ));
        }
        self.meter.validate()
    }
}

/// Definition of the token meter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    pub slug: String,
    pub description: String,
    pub event_type: String,
    /// `SUM`, `COUNT`, `MAX` or `UNIQUE_COUNT`
    pub aggregation: String,
    /// Event data property holding the metered value
    pub value_property: String,
    /// Event data properties the meter groups by
    pub group_by: Vec<String>,
    /// `MINUTE`, `HOUR` or `DAY`
    pub window_size: String,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            slug: "ai_tokens".to_string(),
            description: "LLM tokens".to_string(),
            event_type: "tokens".to_string(),
            aggregation: "SUM".to_string(),
            value_property: "tokens".to_string(),
            group_by: vec!["model".to_string(), "prompt".to_string()],
            window_size: "DAY".to_string(),
        }
    }
}

const AGGREGATIONS: [&str; 4] = ["SUM", "COUNT", "MAX", "UNIQUE_COUNT"];
const WINDOW_SIZES: [&str; 3] = ["MINUTE", "HOUR", "DAY"];

impl MeterConfig {
    pub fn validate(&self) -> MeterResult<()> {
        if self.slug.trim().is_empty() || self.event_type.trim().is_empty() {
            return Err(MeterError::config_with_context(
                "meter slug and event_type must not be empty",
                "openmeter.meter",
            ));
        }
        if !AGGREGATIONS.contains(&self.aggregation.as_str()) {
            return Err(MeterError::config_with_context(
                format!("Unknown meter aggregation '{}'", self.aggregation),
                "openmeter.meter",
            ));
        }
        if !WINDOW_SIZES.contains(&self.window_size.as_str()) {
            return Err(MeterError::config_with_context(
                format!("Unknown meter window size '{}'", self.window_size),
                "openmeter.meter",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.resilience.failure_threshold, 3);
        assert_eq!(config.resilience.reset_timeout, Duration::from_secs(30));
        assert!(config.resilience.call_timeout.is_none());
        assert!(config.resilience.count_passthrough_failures);
        assert_eq!(config.logging.level, "error");
        assert_eq!(config.openmeter.feature_key, "ai_tokens");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_is_rejected() {
        let config = ResilienceConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MeterError::Config { .. })));
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let config = LoggingConfig {
            format: "xml".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [resilience]
            reset_timeout = "45s"
            call_timeout = "2s"
            "#,
        )
        .unwrap();

        assert_eq!(config.resilience.failure_threshold, 3);
        assert_eq!(config.resilience.reset_timeout, Duration::from_secs(45));
        assert_eq!(config.resilience.call_timeout, Some(Duration::from_secs(2)));
        assert_eq!(config.openmeter, OpenMeterConfig::default());
    }

    #[test]
    fn test_meter_defaults_and_validation() {
        let meter = MeterConfig::default();
        assert_eq!(meter.slug, "ai_tokens");
        assert_eq!(meter.aggregation, "SUM");
        assert_eq!(meter.group_by, vec!["model", "prompt"]);

        let config = OpenMeterConfig {
            meter: MeterConfig {
                aggregation: "AVG".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(MeterError::Config { .. })));
    }
}
