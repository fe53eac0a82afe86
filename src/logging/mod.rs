pub mod config;
pub mod context;
pub mod layers;

pub use context::{detect_context, ExecutionContext};
pub use layers::console::{ConsoleFormat, ConsoleOutput};

use crate::cli::Command;
use crate::core::config::loader::CONFIG_FILE_NAME;
use crate::logging::config::LoggingConfig;
use crate::logging::layers::{console, file, opentelemetry, or_noop, BoxLayer};
use crate::Result;
use anyhow::{anyhow, Context};
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::Registry;

static LOGGER_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Guards that keep logging sinks active for the duration of the command.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    _otel_guard: Option<opentelemetry::OpenTelemetryGuard>,
}

/// Initialize the logging framework for the provided CLI command.
///
/// Filters come from `RUST_LOG` when set, otherwise from the configured default level.
/// Sinks are chosen from the execution context and the `[logging]` table of the harness
/// config file (`--config` for `verify`, otherwise `./transform-harness.toml`).
/// Errors when called twice in one process.
pub fn init(command: &Command) -> Result<LoggingGuard> {
    if LOGGER_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return Err(anyhow!("logging already initialized"));
    }

    let context = detect_context(command);
    let workspace_root = env::current_dir().context("failed to resolve working directory")?;
    let config_file = match command {
        Command::Verify(args) => args.config.clone(),
        _ => None,
    }
    .unwrap_or_else(|| workspace_root.join(CONFIG_FILE_NAME));
    let config = LoggingConfig::load(Some(&config_file))?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .context("failed to configure tracing level")?;

    let file_enabled = config
        .enable_file
        .unwrap_or(!context.disables_file_sink());
    let log_file_path = if file_enabled {
        Some(file::log_file_path(&config, &workspace_root)?)
    } else {
        None
    };
    let (file_layer, file_guard) = match &log_file_path {
        Some(path) => {
            let (layer, guard) = file::file_layer::<Registry>(path)?;
            (layer, Some(guard))
        }
        None => (layers::noop_layer(), None),
    };

    let console_output = console::select_console_output(context, config.console_output);
    let console_layer = console::console_layer::<Registry>(console_output, config.console_format);

    let mut otel_error = None;
    let (otel_layer, otel_guard): (Option<BoxLayer<Registry>>, _) =
        if config.opentelemetry.enabled {
            match opentelemetry::build_opentelemetry_layer::<Registry>(&config.opentelemetry) {
                Ok((layer, guard)) => (Some(layer), Some(guard)),
                Err(err) => {
                    otel_error = Some(err);
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

    let sinks: Vec<BoxLayer<Registry>> = vec![file_layer, console_layer, or_noop(otel_layer)];
    tracing_subscriber::registry()
        .with(sinks)
        .with(env_filter)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Some(err) = otel_error {
        tracing::warn!("OpenTelemetry disabled: {}", err);
    }
    tracing::debug!(
        ?context,
        console = %console_output,
        log_file = ?log_file_path,
        "logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
        _otel_guard: otel_guard,
    })
}
