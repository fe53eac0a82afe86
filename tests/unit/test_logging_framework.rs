use clap::Parser;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use transform_harness::cli::Args;
use transform_harness::core::config::loader::CONFIG_FILE_NAME;
use transform_harness::logging::config::{LoggingConfig, STATE_DIR};
use transform_harness::logging::layers::console::select_console_output;
use transform_harness::logging::layers::file::{log_file_path, LOG_FILE_NAME};
use transform_harness::logging::{detect_context, ConsoleFormat, ConsoleOutput, ExecutionContext};

fn clear_logging_env() {
    for v in &[
        "CI",
        "OTEL_EXPORTER_OTLP_ENDPOINT",
        "TRANSFORM_HARNESS_LOG_CONSOLE",
    ] {
        env::remove_var(v);
    }
}

fn write_config(workspace: &Path, content: &str) {
    fs::write(workspace.join(CONFIG_FILE_NAME), content).unwrap();
}

fn load(workspace: &Path) -> anyhow::Result<LoggingConfig> {
    LoggingConfig::load(Some(&workspace.join(CONFIG_FILE_NAME)))
}

#[test]
#[serial]
fn context_mapping_covers_all_commands() {
    clear_logging_env();
    let cases = vec![
        (vec!["transform-harness", "verify"], ExecutionContext::LocalDev),
        (vec!["transform-harness", "transform"], ExecutionContext::LocalDev),
        (vec!["transform-harness", "emulate"], ExecutionContext::Service),
    ];

    for (args, expected) in cases {
        let parsed = Args::parse_from(args);
        assert_eq!(detect_context(&parsed.command), expected);
    }
}

#[test]
#[serial]
fn ci_override_applies_to_everything_but_the_emulator() {
    clear_logging_env();
    env::set_var("CI", "true");
    let verify = Args::parse_from(["transform-harness", "verify"]);
    let emulate = Args::parse_from(["transform-harness", "emulate"]);

    assert_eq!(detect_context(&verify.command), ExecutionContext::Ci);
    assert_eq!(detect_context(&emulate.command), ExecutionContext::Service);
    assert!(ExecutionContext::Ci.disables_file_sink());
    assert!(!ExecutionContext::LocalDev.disables_file_sink());
    clear_logging_env();
}

#[test]
#[serial]
fn defaults_without_config_file() {
    clear_logging_env();
    let workspace = tempdir().unwrap();
    let config = load(workspace.path()).unwrap();

    assert_eq!(config.default_level, "info");
    assert!(config.enable_file.is_none());
    assert!(config.console_output.is_none());
    assert_eq!(config.console_format, ConsoleFormat::Full);
    assert!(!config.opentelemetry.enabled);
}

#[test]
#[serial]
fn logging_table_values_are_applied() {
    clear_logging_env();
    let workspace = tempdir().unwrap();
    write_config(
        workspace.path(),
        r#"[runtime]
url = "http://localhost:3001"

[logging]
default_level = "debug"
log_dir = "custom-logs"
enable_file = false
console_output = "stdout"
console_format = "json"
"#,
    );

    let config = load(workspace.path()).unwrap();
    assert_eq!(config.default_level, "debug");
    assert_eq!(config.log_dir, Some(PathBuf::from("custom-logs")));
    assert_eq!(config.enable_file, Some(false));
    assert_eq!(config.console_output, Some(ConsoleOutput::Stdout));
    assert_eq!(config.console_format, ConsoleFormat::Json);
}

#[test]
#[serial]
fn env_override_enables_opentelemetry() {
    clear_logging_env();
    let workspace = tempdir().unwrap();
    write_config(
        workspace.path(),
        r#"[logging.opentelemetry]
endpoint = "http://configured:4317"
service_name = "configured-service"
"#,
    );
    env::set_var("OTEL_EXPORTER_OTLP_ENDPOINT", "http://collector:4317");

    let config = load(workspace.path()).unwrap();
    clear_logging_env();

    assert!(config.opentelemetry.enabled);
    assert_eq!(
        config.opentelemetry.endpoint.as_deref(),
        Some("http://collector:4317")
    );
    assert_eq!(config.opentelemetry.service_name, "configured-service");
}

#[test]
#[serial]
fn console_env_override_wins_over_file() {
    clear_logging_env();
    let workspace = tempdir().unwrap();
    write_config(workspace.path(), "[logging]\nconsole_output = \"stdout\"\n");
    env::set_var("TRANSFORM_HARNESS_LOG_CONSOLE", "none");

    let config = load(workspace.path()).unwrap();
    clear_logging_env();
    assert_eq!(config.console_output, Some(ConsoleOutput::None));
}

#[test]
#[serial]
fn invalid_level_and_missing_endpoint_are_rejected() {
    clear_logging_env();
    let workspace = tempdir().unwrap();
    write_config(workspace.path(), "[logging]\ndefault_level = \"harness=loud\"\n");
    assert!(load(workspace.path()).is_err());

    let workspace = tempdir().unwrap();
    write_config(
        workspace.path(),
        "[logging.opentelemetry]\nenabled = true\n",
    );
    let err = load(workspace.path()).unwrap_err();
    assert!(err.to_string().contains("endpoint is required"));
}

#[test]
fn console_output_follows_context_unless_configured() {
    assert_eq!(
        select_console_output(ExecutionContext::LocalDev, None),
        ConsoleOutput::Stderr
    );
    assert_eq!(
        select_console_output(ExecutionContext::Service, None),
        ConsoleOutput::Stdout
    );
    assert_eq!(
        select_console_output(ExecutionContext::Ci, Some(ConsoleOutput::None)),
        ConsoleOutput::None
    );
}

#[test]
#[serial]
fn log_file_path_defaults_under_state_dir() {
    clear_logging_env();
    let workspace = tempdir().unwrap();
    let config = load(workspace.path()).unwrap();

    let path = log_file_path(&config, workspace.path()).unwrap();
    assert!(path.starts_with(workspace.path().join(STATE_DIR)));
    assert_eq!(path.file_name().unwrap(), LOG_FILE_NAME);
}

#[test]
#[serial]
fn log_dir_escaping_workspace_is_rejected() {
    clear_logging_env();
    let workspace = tempdir().unwrap();
    write_config(workspace.path(), "[logging]\nlog_dir = \"../outside\"\n");
    let config = load(workspace.path()).unwrap();

    assert!(log_file_path(&config, workspace.path()).is_err());
}
