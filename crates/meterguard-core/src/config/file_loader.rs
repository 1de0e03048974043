//! File-based configuration loading

use std::fs;
use std::path::Path;

use super::model::Config;
use crate::error::{MeterError, MeterResult};

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if file doesn't exist.
pub fn load_from_file(path: &Path) -> MeterResult<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Config file not found, using defaults");
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        MeterError::config_with_context(
            format!("Failed to read config file: {}", e),
            format!("Reading configuration from '{}'", path.display()),
        )
    })?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            MeterError::config_with_context(
                format!("Failed to parse TOML config: {}", e),
                format!("Deserializing TOML configuration from '{}'", path.display()),
            )
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            MeterError::config_with_context(
                format!("Failed to parse YAML config: {}", e),
                format!("Deserializing YAML configuration from '{}'", path.display()),
            )
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            MeterError::config_with_context(
                format!("Failed to parse JSON config: {}", e),
                format!("Deserializing JSON configuration from '{}'", path.display()),
            )
        })?,
    };

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_from_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("meterguard.toml");
        fs::write(
            &path,
            r#"
            [resilience]
            failure_threshold = 5
            reset_timeout = "1m"

            [openmeter]
            api_url = "http://localhost:8888"
            feature_key = "gpu_minutes"
            "#,
        )
        .unwrap();

        let config = load_from_file(&path).unwrap();
        assert_eq!(config.resilience.failure_threshold, 5);
        assert_eq!(config.resilience.reset_timeout, Duration::from_secs(60));
        assert_eq!(config.openmeter.api_url, "http://localhost:8888");
        assert_eq!(config.openmeter.feature_key, "gpu_minutes");
        assert_eq!(config.openmeter.token_event_type, "tokens");
    }

    #[test]
    fn test_load_from_json_and_yaml_files() {
        let temp_dir = TempDir::new().unwrap();

        let json_path = temp_dir.path().join("meterguard.json");
        fs::write(&json_path, r#"{"logging": {"level": "debug", "format": "json"}}"#).unwrap();
        let config = load_from_file(&json_path).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");

        let yaml_path = temp_dir.path().join("meterguard.yaml");
        fs::write(&yaml_path, "resilience:\n  count_passthrough_failures: false\n").unwrap();
        let config = load_from_file(&yaml_path).unwrap();
        assert!(!config.resilience.count_passthrough_failures);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[resilience\nfailure_threshold = ").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(matches!(err, MeterError::Config { context: Some(_), .. }));
    }
}
