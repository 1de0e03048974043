//! Environment variable-based configuration overrides
//!
//! Variables with an empty value are ignored. Durations accept either plain seconds
//! (`1.5`) or humantime strings (`30s`, `2m`).

use std::time::Duration;

use humantime_serde::re::humantime;

use super::model::Config;
use crate::error::{MeterError, MeterResult};

/// Apply overrides from the process environment, reading `.env` first if present
pub fn apply_env(config: &mut Config) -> MeterResult<()> {
    if let Ok(path) = dotenv::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded environment file");
    }
    apply_env_with(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary variable source
pub fn apply_env_with<F>(config: &mut Config, lookup: F) -> MeterResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(level) = var("LOG_LEVEL") {
        config.logging.level = level.to_lowercase();
    }
    if let Some(format) = var("METERGUARD_LOG_FORMAT") {
        config.logging.format = format.to_lowercase();
    }

    if let Some(threshold) = var("METERGUARD_FAILURE_THRESHOLD") {
        config.resilience.failure_threshold = threshold.trim().parse().map_err(|_| {
            MeterError::config(format!(
                "Invalid METERGUARD_FAILURE_THRESHOLD value '{}'",
                threshold
            ))
        })?;
    }
    if let Some(timeout) = var("METERGUARD_RESET_TIMEOUT") {
        config.resilience.reset_timeout = parse_duration("METERGUARD_RESET_TIMEOUT", &timeout)?;
    }
    if let Some(timeout) = var("METERGUARD_CALL_TIMEOUT") {
        config.resilience.call_timeout = Some(parse_duration("METERGUARD_CALL_TIMEOUT", &timeout)?);
    }

    if let Some(api_key) = var("OPENMETER_API_KEY") {
        config.openmeter.api_key = Some(api_key);
    }
    if let Some(api_url) = var("OPENMETER_API_URL") {
        config.openmeter.api_url = api_url;
    }
    if let Some(source) = var("OPENMETER_SOURCE") {
        config.openmeter.source = source;
    }
    if let Some(timeout) = var("OPENMETER_TIMEOUT") {
        config.openmeter.timeout = parse_duration("OPENMETER_TIMEOUT", &timeout)?;
    }
    if let Some(feature_key) = var("OPENMETER_FEATURE_KEY") {
        config.openmeter.feature_key = feature_key;
    }
    if let Some(event_type) = var("OPENMETER_TOKEN_EVENT_TYPE") {
        config.openmeter.token_event_type = event_type;
    }

    let meter = &mut config.openmeter.meter;
    if let Some(slug) = var("OPENMETER_METER_SLUG") {
        meter.slug = slug;
    }
    if let Some(description) = var("OPENMETER_METER_DESCRIPTION") {
        meter.description = description;
    }
    if let Some(event_type) = var("OPENMETER_METER_EVENT_TYPE") {
        meter.event_type = event_type;
    }
    if let Some(aggregation) = var("OPENMETER_METER_AGGREGATION") {
        meter.aggregation = aggregation.to_uppercase();
    }
    if let Some(property) = var("OPENMETER_METER_VALUE_PROPERTY") {
        meter.value_property = property;
    }
    if let Some(group_by) = var("OPENMETER_METER_GROUP_BY") {
        meter.group_by = group_by
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(window) = var("OPENMETER_METER_WINDOW_SIZE") {
        meter.window_size = window.to_uppercase();
    }

    Ok(())
}

fn parse_duration(key: &str, value: &str) -> MeterResult<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds)
            .map_err(|_| MeterError::config(format!("Invalid {} value '{}'", key, value)));
    }
    humantime::parse_duration(value)
        .map_err(|e| MeterError::config(format!("Invalid {} value '{}': {}", key, value, e)))
}
