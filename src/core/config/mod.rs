pub mod loader;

pub use loader::ConfigLoader;

use crate::core::fixtures::DEFAULT_FIXTURE_PATH;
use crate::core::receiver::HealthPolicy;
use crate::core::runtime::TransformerBlueprint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;

/// Harness configuration loaded from transform-harness.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Runtime under test
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Webhook receiver
    #[serde(default)]
    pub receiver: ReceiverConfig,

    /// Blueprint sent to the runtime's load endpoint
    #[serde(default)]
    pub blueprint: TransformerBlueprint,

    /// Fixture source
    #[serde(default)]
    pub fixtures: FixturesConfig,

    /// Timeouts and retry schedule
    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    /// Static definition forwarded with every submission
    #[serde(default = "default_definition")]
    pub definition: Value,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            runtime: RuntimeConfig::default(),
            receiver: ReceiverConfig::default(),
            blueprint: TransformerBlueprint::default(),
            fixtures: FixturesConfig::default(),
            timeouts: TimeoutsConfig::default(),
            definition: default_definition(),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Base URL of the runtime lifecycle API
    #[serde(default = "default_runtime_url")]
    pub url: String,

    /// Per-request timeout for lifecycle calls
    #[serde(
        default = "default_request_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            url: default_runtime_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Receiver configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Socket address the receiver binds to
    #[serde(default = "default_receiver_bind")]
    pub bind: String,

    /// Host name the runtime uses to reach the receiver
    #[serde(default = "default_host_address")]
    pub host_address: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        ReceiverConfig {
            bind: default_receiver_bind(),
            host_address: default_host_address(),
        }
    }
}

/// Fixture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturesConfig {
    #[serde(default = "default_fixture_path")]
    pub path: PathBuf,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        FixturesConfig {
            path: default_fixture_path(),
        }
    }
}

/// Timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    /// Upper bound for every fixture to be delivered
    #[serde(
        default = "default_delivery_timeout",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub delivery: Duration,

    /// Interval between delivery checks
    #[serde(
        default = "default_poll_interval",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub poll_interval: Duration,

    /// Health probe attempts before giving up
    #[serde(default = "default_health_attempts")]
    pub health_attempts: u32,

    /// First health retry delay; doubles per attempt
    #[serde(
        default = "default_health_initial_interval",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub health_initial_interval: Duration,

    /// Ceiling for the health retry delay
    #[serde(
        default = "default_health_max_interval",
        serialize_with = "serialize_duration",
        deserialize_with = "deserialize_duration"
    )]
    pub health_max_interval: Duration,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        TimeoutsConfig {
            delivery: default_delivery_timeout(),
            poll_interval: default_poll_interval(),
            health_attempts: default_health_attempts(),
            health_initial_interval: default_health_initial_interval(),
            health_max_interval: default_health_max_interval(),
        }
    }
}

impl TimeoutsConfig {
    pub fn health_policy(&self) -> HealthPolicy {
        HealthPolicy {
            max_attempts: self.health_attempts,
            initial_interval: self.health_initial_interval,
            max_interval: self.health_max_interval,
        }
    }
}

fn default_runtime_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_receiver_bind() -> String {
    "0.0.0.0:40300".to_string()
}

fn default_host_address() -> String {
    "localhost".to_string()
}

fn default_fixture_path() -> PathBuf {
    PathBuf::from(DEFAULT_FIXTURE_PATH)
}

fn default_delivery_timeout() -> Duration {
    Duration::from_secs(1000)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_health_attempts() -> u32 {
    20
}

fn default_health_initial_interval() -> Duration {
    Duration::from_millis(50)
}

fn default_health_max_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_definition() -> Value {
    json!({ "hello": "world" })
}

fn serialize_duration<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

fn deserialize_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
}
