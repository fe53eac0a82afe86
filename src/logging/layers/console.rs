use crate::logging::context::ExecutionContext;
use crate::logging::layers::BoxLayer;
use clap::ValueEnum;
use serde::Deserialize;
use std::fmt;
use std::io;
use tracing::Subscriber;
use tracing_subscriber::fmt::{self as tracing_fmt, writer::BoxMakeWriter};
use tracing_subscriber::registry::LookupSpan;

/// Console sink for log lines.
#[derive(Deserialize, ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Stdout,
    #[default]
    Stderr,
    None,
}

/// Line format for console logs.
#[derive(Deserialize, ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    #[default]
    Full,
    Json,
}

impl ConsoleOutput {
    /// Case-insensitive lookup by sink name.
    pub fn parse(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value.trim(), true).ok()
    }
}

impl fmt::Display for ConsoleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => Ok(()),
        }
    }
}

/// Pick the console sink for a context. Verification reports own stdout, so only the
/// long-running emulator logs there unless configured otherwise.
pub fn select_console_output(
    context: ExecutionContext,
    configured: Option<ConsoleOutput>,
) -> ConsoleOutput {
    configured.unwrap_or(match context {
        ExecutionContext::Service => ConsoleOutput::Stdout,
        ExecutionContext::LocalDev | ExecutionContext::Ci => ConsoleOutput::Stderr,
    })
}

/// Build the console tracing layer for the provided subscriber type.
pub fn console_layer<S>(output: ConsoleOutput, format: ConsoleFormat) -> BoxLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync + 'static,
{
    let make_writer = match output {
        ConsoleOutput::Stdout => BoxMakeWriter::new(io::stdout),
        ConsoleOutput::Stderr => BoxMakeWriter::new(io::stderr),
        ConsoleOutput::None => BoxMakeWriter::new(io::sink),
    };
    let layer = tracing_fmt::layer()
        .with_writer(make_writer)
        .with_ansi(false)
        .with_target(false);

    match format {
        ConsoleFormat::Full => Box::new(layer),
        ConsoleFormat::Json => Box::new(layer.json()),
    }
}
