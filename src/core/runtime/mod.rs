//! Transformer runtime collaborator.
//!
//! The runtime is reached through three operations: load a blueprint, submit events
//! for a loaded process, unload the process. [`HttpRuntime`] talks to a real runtime;
//! [`InProcessRuntime`] runs a [`TransformFunction`](crate::core::transform::TransformFunction)
//! locally for fast tests and backs the HTTP emulator.

#![allow(clippy::result_large_err)] // AppError carries context the harness reports verbatim.

pub mod emulator;
pub mod http;
pub mod in_process;

use crate::core::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use emulator::{serve_emulator, serve_emulator_with_ready_notifier};
pub use http::HttpRuntime;
pub use in_process::InProcessRuntime;

pub const DEFAULT_TRANSFORMER_NAME: &str = "test-transformer";
pub const DEFAULT_TRANSFORMER_VERSION: &str = "1.0.0";
pub const DEFAULT_TRANSFORMER_RUNTIME: &str = "node";
pub const DEFAULT_ARTIFACT_URL: &str = "/app/transformers/test-transformer";
pub const DEFAULT_ENTRYPOINT: &str = "main.js";
pub const DEFAULT_START_TIME_TIMEOUT_MS: u64 = 10_000;

/// Descriptor of a loadable transformer artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformerBlueprint {
    pub name: String,
    pub version: String,
    pub runtime: String,
    pub artifact_url: String,
    pub entrypoint: String,
    /// Startup budget granted to the transformer, in milliseconds.
    pub start_time_timeout: u64,
}

impl Default for TransformerBlueprint {
    fn default() -> Self {
        TransformerBlueprint {
            name: DEFAULT_TRANSFORMER_NAME.to_string(),
            version: DEFAULT_TRANSFORMER_VERSION.to_string(),
            runtime: DEFAULT_TRANSFORMER_RUNTIME.to_string(),
            artifact_url: DEFAULT_ARTIFACT_URL.to_string(),
            entrypoint: DEFAULT_ENTRYPOINT.to_string(),
            start_time_timeout: DEFAULT_START_TIME_TIMEOUT_MS,
        }
    }
}

/// Response body of `POST /load`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadResponse {
    pub process_id: String,
}

/// Event half of a submission, as the runtime expects it on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedEvent {
    pub event_id: String,
    pub data_core: String,
    pub event_type: String,
    pub aggregator: String,
    pub time_bucket: String,
    pub valid_time: String,
    pub serialized_payload: String,
}

/// Body of `POST /transform/:processId`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSubmission {
    pub destination: String,
    #[serde(default)]
    pub definition: Value,
    pub event: SubmittedEvent,
}

/// The three lifecycle operations a transformer runtime exposes.
#[async_trait]
pub trait TransformerRuntime: Send + Sync {
    /// Load a blueprint and return the id of the process serving it.
    async fn load(&self, blueprint: &TransformerBlueprint) -> Result<String, AppError>;

    /// Submit one event. Success acknowledges acceptance, not delivery.
    async fn transform(&self, process_id: &str, submission: &EventSubmission)
        -> Result<(), AppError>;

    /// Tear down a loaded process.
    async fn unload(&self, process_id: &str) -> Result<(), AppError>;
}
