use crate::core::harness::OutputFormat;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Path to the harness config file (default: ./transform-harness.toml)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,

    /// Base URL of the transformer runtime lifecycle API
    #[arg(long, value_name = "URL", help_heading = "Runtime")]
    pub runtime_url: Option<String>,

    /// Fixture file of { input, output } pairs
    #[arg(long, value_name = "FILE", help_heading = "Fixtures")]
    pub fixtures: Option<PathBuf>,

    /// Host name the runtime uses to reach the receiver
    #[arg(long, value_name = "HOST", help_heading = "Receiver")]
    pub host_address: Option<String>,

    /// Socket address the receiver binds to
    #[arg(long, value_name = "ADDR", help_heading = "Receiver")]
    pub receiver_bind: Option<String>,

    /// Upper bound for all deliveries to arrive, e.g. 90s or 5m
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration, help_heading = "Timeouts")]
    pub delivery_timeout: Option<std::time::Duration>,

    /// Report format printed to stdout
    #[arg(long, value_enum, default_value = "text", help_heading = "Output Options")]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct TransformArgs {
    /// Event envelope JSON file ({ eventId, validTime, payload }); reads stdin when omitted
    #[arg(value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Static definition JSON passed alongside the envelope
    #[arg(long, value_name = "JSON", default_value = "null")]
    pub definition: String,

    /// Print the delivered record ({ value: ... }) instead of the bare output
    #[arg(long)]
    pub wrap: bool,
}

#[derive(Args, Debug)]
pub struct EmulateArgs {
    /// Socket address the emulator binds to
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:3001")]
    pub bind: String,
}
