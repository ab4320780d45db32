//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::WatchConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<WatchConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: WatchConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/upstream-watch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = std::env::temp_dir();
        let path = dir.join("upstream-watch-bad-toml-test.toml");
        fs::write(&path, "watch = [not toml").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_reports_all_validation_errors() {
        let dir = std::env::temp_dir();
        let path = dir.join("upstream-watch-validation-test.toml");
        fs::write(
            &path,
            r#"
            [watch]
            probe_interval_ms = 0
            probe_timeout_ms = 0
        "#,
        )
        .unwrap();

        let err = load_config(&path).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation failure, got {}", other),
        }

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_valid_config() {
        let dir = std::env::temp_dir();
        let path = dir.join("upstream-watch-valid-test.toml");
        fs::write(
            &path,
            r#"
            [[groups]]
            namespace = "default"
            name = "checkout"
            vip = "10.96.0.12"
        "#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.groups.len(), 1);
        assert_eq!(config.watch.probe_interval_ms, 200);

        fs::remove_file(&path).ok();
    }
}
