use serial_test::serial;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use transform_harness::cli::{commands::resolve_verify_config, VerifyArgs};
use transform_harness::core::config::loader::CONFIG_FILE_NAME;
use transform_harness::core::config::{ConfigLoader, HarnessConfig};
use transform_harness::core::harness::{HarnessSettings, OutputFormat};
use transform_harness::core::types::ErrorCategory;

fn clear_harness_env() {
    for v in &[
        "TRANSFORM_HARNESS_RUNTIME_URL",
        "TRANSFORM_HARNESS_FIXTURES",
        "TRANSFORM_HARNESS_RECEIVER_BIND",
        "TRANSFORM_HARNESS_DELIVERY_TIMEOUT",
        "HOST_ADDRESS",
    ] {
        env::remove_var(v);
    }
}

fn verify_args() -> VerifyArgs {
    VerifyArgs {
        config: None,
        runtime_url: None,
        fixtures: None,
        host_address: None,
        receiver_bind: None,
        delivery_timeout: None,
        format: OutputFormat::Text,
    }
}

#[test]
#[serial]
fn test_defaults_without_config_file() {
    clear_harness_env();
    let temp_dir = TempDir::new().unwrap();

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();

    assert_eq!(config.runtime.url, "http://localhost:3001");
    assert_eq!(config.receiver.bind, "0.0.0.0:40300");
    assert_eq!(config.receiver.host_address, "localhost");
    assert_eq!(config.fixtures.path, PathBuf::from("fixtures/expected.json"));
    assert_eq!(config.timeouts.delivery, Duration::from_secs(1000));
    assert_eq!(config.blueprint.name, "test-transformer");
    assert_eq!(config.definition, serde_json::json!({ "hello": "world" }));
    ConfigLoader::validate_config(&config).unwrap();
}

#[test]
#[serial]
fn test_file_values_and_partial_tables() {
    clear_harness_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(CONFIG_FILE_NAME),
        r#"
[runtime]
url = "http://runtime.internal:8080/api"

[receiver]
host_address = "harness"

[blueprint]
name = "uppercase"
artifactUrl = "/app/transformers/uppercase"

[timeouts]
delivery = "90s"
poll_interval = "100ms"
"#,
    )
    .unwrap();

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();

    assert_eq!(config.runtime.url, "http://runtime.internal:8080/api");
    assert_eq!(config.receiver.host_address, "harness");
    assert_eq!(config.receiver.bind, "0.0.0.0:40300");
    assert_eq!(config.blueprint.name, "uppercase");
    assert_eq!(config.blueprint.artifact_url, "/app/transformers/uppercase");
    assert_eq!(config.blueprint.version, "1.0.0");
    assert_eq!(config.timeouts.delivery, Duration::from_secs(90));
    assert_eq!(config.timeouts.poll_interval, Duration::from_millis(100));
    assert_eq!(config.timeouts.health_attempts, 20);
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    clear_harness_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(CONFIG_FILE_NAME),
        "[receiver]\nhost_address = \"from-file\"\n",
    )
    .unwrap();

    env::set_var("HOST_ADDRESS", "host.docker.internal");
    env::set_var("TRANSFORM_HARNESS_RUNTIME_URL", "http://127.0.0.1:9000");
    env::set_var("TRANSFORM_HARNESS_DELIVERY_TIMEOUT", "2m");
    env::set_var("TRANSFORM_HARNESS_FIXTURES", "other/fixtures.json");

    let config = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap();
    clear_harness_env();

    assert_eq!(config.receiver.host_address, "host.docker.internal");
    assert_eq!(config.runtime.url, "http://127.0.0.1:9000");
    assert_eq!(config.timeouts.delivery, Duration::from_secs(120));
    assert_eq!(config.fixtures.path, PathBuf::from("other/fixtures.json"));
}

#[test]
#[serial]
fn test_blank_host_address_env_is_ignored() {
    clear_harness_env();
    env::set_var("HOST_ADDRESS", "   ");
    let config = ConfigLoader::load(None).unwrap();
    clear_harness_env();
    assert_eq!(config.receiver.host_address, "localhost");
}

#[test]
#[serial]
fn test_invalid_delivery_timeout_env_is_rejected() {
    clear_harness_env();
    env::set_var("TRANSFORM_HARNESS_DELIVERY_TIMEOUT", "soon");
    let err = ConfigLoader::load(None).unwrap_err();
    clear_harness_env();
    assert_eq!(err.category, ErrorCategory::ValidationError);
    assert!(err.message.contains("TRANSFORM_HARNESS_DELIVERY_TIMEOUT"));
}

#[test]
#[serial]
fn test_malformed_file_is_validation_error() {
    clear_harness_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "[runtime\nurl = ").unwrap();

    let err = ConfigLoader::load_from_workspace(temp_dir.path()).unwrap_err();
    assert_eq!(err.category, ErrorCategory::ValidationError);
    assert!(err.message.contains(CONFIG_FILE_NAME));
}

#[test]
fn test_validation_rejects_bad_values() {
    let mut config = HarnessConfig::default();
    config.runtime.url = "not a url".to_string();
    assert!(ConfigLoader::validate_config(&config).is_err());

    let mut config = HarnessConfig::default();
    config.runtime.url = "mailto:runtime@example.com".to_string();
    assert!(ConfigLoader::validate_config(&config).is_err());

    let mut config = HarnessConfig::default();
    config.receiver.bind = "localhost".to_string();
    assert!(ConfigLoader::validate_config(&config).is_err());

    let mut config = HarnessConfig::default();
    config.timeouts.health_attempts = 0;
    assert!(ConfigLoader::validate_config(&config).is_err());

    let mut config = HarnessConfig::default();
    config.timeouts.poll_interval = Duration::ZERO;
    assert!(ConfigLoader::validate_config(&config).is_err());

    let mut config = HarnessConfig::default();
    config.blueprint.name = " ".to_string();
    assert!(ConfigLoader::validate_config(&config).is_err());
}

#[test]
fn test_env_var_documentation_lists_every_override() {
    let docs = ConfigLoader::env_var_documentation().join("\n");
    for name in [
        "TRANSFORM_HARNESS_RUNTIME_URL",
        "TRANSFORM_HARNESS_FIXTURES",
        "TRANSFORM_HARNESS_RECEIVER_BIND",
        "HOST_ADDRESS",
        "TRANSFORM_HARNESS_DELIVERY_TIMEOUT",
    ] {
        assert!(docs.contains(name), "missing {}", name);
    }
}

#[test]
#[serial]
fn test_cli_flags_take_precedence() {
    clear_harness_env();
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(CONFIG_FILE_NAME),
        "[runtime]\nurl = \"http://from-file:3001\"\n",
    )
    .unwrap();
    env::set_var("HOST_ADDRESS", "from-env");

    let mut args = verify_args();
    args.runtime_url = Some("http://from-flag:3001".to_string());
    args.receiver_bind = Some("127.0.0.1:0".to_string());
    args.delivery_timeout = Some(Duration::from_secs(5));

    let config = resolve_verify_config(&args, temp_dir.path()).unwrap();
    clear_harness_env();

    assert_eq!(config.runtime.url, "http://from-flag:3001");
    assert_eq!(config.receiver.host_address, "from-env");
    assert_eq!(config.receiver.bind, "127.0.0.1:0");
    assert_eq!(config.timeouts.delivery, Duration::from_secs(5));
}

#[test]
#[serial]
fn test_missing_explicit_config_file_is_an_error() {
    clear_harness_env();
    let temp_dir = TempDir::new().unwrap();
    let mut args = verify_args();
    args.config = Some(temp_dir.path().join("absent.toml"));

    let err = resolve_verify_config(&args, temp_dir.path()).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn test_settings_from_config_carry_health_policy() {
    let mut config = HarnessConfig::default();
    config.receiver.bind = "127.0.0.1:0".to_string();
    config.timeouts.health_attempts = 3;

    let settings = HarnessSettings::from_config(&config).unwrap();
    assert_eq!(settings.receiver_bind.port(), 0);
    assert_eq!(settings.health.max_attempts, 3);
    assert_eq!(settings.host_address, "localhost");
}
