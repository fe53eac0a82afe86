use crate::logging::layers::console::{ConsoleFormat, ConsoleOutput};
use crate::Result;
use anyhow::{bail, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::Directive;
use url::Url;

/// Directory (relative to the workspace) holding harness state such as logs.
pub const STATE_DIR: &str = ".transform-harness";

/// The `[logging]` table of the harness config file, after env overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    pub default_level: String,
    /// `None` leaves the decision to the execution context.
    pub enable_file: Option<bool>,
    pub console_output: Option<ConsoleOutput>,
    pub console_format: ConsoleFormat,
    pub opentelemetry: OpenTelemetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenTelemetryConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub service_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_dir: None,
            default_level: "info".to_string(),
            enable_file: None,
            console_output: None,
            console_format: ConsoleFormat::Full,
            opentelemetry: OpenTelemetryConfig::default(),
        }
    }
}

impl Default for OpenTelemetryConfig {
    fn default() -> Self {
        OpenTelemetryConfig {
            enabled: false,
            endpoint: None,
            service_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    logging: LoggingConfig,
}

impl LoggingConfig {
    /// Read `[logging]` from `config_file` (absent file means defaults), apply
    /// `OTEL_EXPORTER_OTLP_ENDPOINT` and `TRANSFORM_HARNESS_LOG_CONSOLE`, then validate.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) if path.exists() => Self::read(path)?,
            _ => LoggingConfig::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file: ConfigFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse [logging] in {}", path.display()))?;
        Ok(file.logging)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(endpoint) = non_blank_env("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.opentelemetry.endpoint = Some(endpoint);
            self.opentelemetry.enabled = true;
        }
        if let Some(output) =
            non_blank_env("TRANSFORM_HARNESS_LOG_CONSOLE").and_then(|raw| ConsoleOutput::parse(&raw))
        {
            self.console_output = Some(output);
        }
    }

    fn validate(&self) -> Result<()> {
        if Directive::from_str(&self.default_level).is_err() {
            bail!(
                "logging.default_level {:?} is not a valid tracing directive",
                self.default_level
            );
        }

        let otel = &self.opentelemetry;
        match (&otel.endpoint, otel.enabled) {
            (Some(endpoint), _) => {
                Url::parse(endpoint).with_context(|| {
                    format!("invalid logging.opentelemetry.endpoint {}", endpoint)
                })?;
            }
            (None, true) => {
                bail!("logging.opentelemetry.endpoint is required when opentelemetry is enabled")
            }
            (None, false) => {}
        }
        if otel.enabled && otel.service_name.trim().is_empty() {
            bail!("logging.opentelemetry.service_name must not be empty");
        }
        Ok(())
    }
}

fn non_blank_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
