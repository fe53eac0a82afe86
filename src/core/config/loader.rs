#![allow(clippy::result_large_err)]

use super::HarnessConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use url::Url;

pub const CONFIG_FILE_NAME: &str = "transform-harness.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/transform-harness.toml)
    /// Environment variables override config file values
    pub fn load_from_workspace(workspace_path: &Path) -> Result<HarnessConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        Self::load(Some(&config_path))
    }

    /// Load config from an optional explicit file, then apply env overrides.
    /// A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<HarnessConfig, AppError> {
        let from_file = match path {
            Some(path) => Self::load_from_file(path)?,
            None => None,
        };
        let mut config = from_file.unwrap_or_default();
        Self::apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<HarnessConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: HarnessConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(config: &mut HarnessConfig) -> Result<(), AppError> {
        if let Ok(url) = env::var("TRANSFORM_HARNESS_RUNTIME_URL") {
            config.runtime.url = url;
        }

        if let Ok(path) = env::var("TRANSFORM_HARNESS_FIXTURES") {
            config.fixtures.path = PathBuf::from(path);
        }

        if let Ok(bind) = env::var("TRANSFORM_HARNESS_RECEIVER_BIND") {
            config.receiver.bind = bind;
        }

        if let Ok(host) = env::var("HOST_ADDRESS") {
            if !host.trim().is_empty() {
                config.receiver.host_address = host;
            }
        }

        if let Ok(raw) = env::var("TRANSFORM_HARNESS_DELIVERY_TIMEOUT") {
            config.timeouts.delivery = humantime::parse_duration(&raw).map_err(|e| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    format!("TRANSFORM_HARNESS_DELIVERY_TIMEOUT is not a duration: {}", e),
                )
            })?;
        }

        Ok(())
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "TRANSFORM_HARNESS_RUNTIME_URL - Override runtime base URL (default: http://localhost:3001)",
            "TRANSFORM_HARNESS_FIXTURES - Override fixture file path (default: fixtures/expected.json)",
            "TRANSFORM_HARNESS_RECEIVER_BIND - Override receiver bind address (default: 0.0.0.0:40300)",
            "HOST_ADDRESS - Host name the runtime uses to reach the receiver (default: localhost)",
            "TRANSFORM_HARNESS_DELIVERY_TIMEOUT - Override delivery timeout, e.g. 90s (default: 1000s)",
        ]
    }

    /// Validate configuration values
    pub fn validate_config(config: &HarnessConfig) -> Result<(), AppError> {
        let url = Url::parse(&config.runtime.url).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("runtime.url {} is invalid: {}", config.runtime.url, e),
            )
        })?;
        if url.cannot_be_a_base() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("runtime.url {} cannot be used as a base URL", url),
            ));
        }

        config.receiver.bind.parse::<SocketAddr>().map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("receiver.bind {} is invalid: {}", config.receiver.bind, e),
            )
        })?;

        if config.receiver.host_address.trim().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "receiver.host_address cannot be empty".to_string(),
            ));
        }

        if config.timeouts.health_attempts == 0 {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "timeouts.health_attempts must be at least 1".to_string(),
            ));
        }

        if config.timeouts.poll_interval.is_zero() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "timeouts.poll_interval must be greater than zero".to_string(),
            ));
        }

        if config.blueprint.name.trim().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "blueprint.name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
