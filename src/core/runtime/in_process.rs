#![allow(clippy::result_large_err)]

use super::{EventSubmission, TransformerBlueprint, TransformerRuntime};
use crate::core::error::AppError;
use crate::core::transform::{EventEnvelope, TransformFunction};
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runtime that executes a transform function inside the current process.
///
/// Each accepted submission is acknowledged immediately; the transform and the
/// delivery POST run on a spawned task. A transform that fails is logged and its
/// event dropped without retry.
#[derive(Clone)]
pub struct InProcessRuntime {
    function: Arc<dyn TransformFunction>,
    processes: Arc<DashMap<String, TransformerBlueprint>>,
    http: reqwest::Client,
    stats: Arc<RuntimeStats>,
}

#[derive(Default)]
struct RuntimeStats {
    delivered: AtomicUsize,
    dropped: AtomicUsize,
}

impl InProcessRuntime {
    pub fn new(function: Arc<dyn TransformFunction>) -> Self {
        InProcessRuntime {
            function,
            processes: Arc::new(DashMap::new()),
            http: reqwest::Client::new(),
            stats: Arc::new(RuntimeStats::default()),
        }
    }

    /// Blueprint loaded under `process_id`, if any.
    pub fn blueprint(&self, process_id: &str) -> Option<TransformerBlueprint> {
        self.processes.get(process_id).map(|entry| entry.clone())
    }

    pub fn loaded_processes(&self) -> usize {
        self.processes.len()
    }

    /// Records successfully POSTed to their destination.
    pub fn delivered_count(&self) -> usize {
        self.stats.delivered.load(Ordering::SeqCst)
    }

    /// Events dropped because the transform or the delivery failed.
    pub fn dropped_count(&self) -> usize {
        self.stats.dropped.load(Ordering::SeqCst)
    }

    /// Run the transform and deliver the result, returning the delivered record.
    ///
    /// This is the synchronous core of [`TransformerRuntime::transform`]; the trait
    /// implementation spawns it so acknowledgement does not wait for delivery.
    pub async fn process(&self, submission: EventSubmission) -> Result<Value, AppError> {
        let envelope = EventEnvelope::from_submission(&submission.event).map_err(|err| {
            AppError::new(ErrorCategory::ValidationError, err.to_string())
                .with_code("RUNTIME-INPROC-002")
        })?;
        let output = self
            .function
            .transform(&envelope, &submission.definition)
            .await
            .map_err(|err| {
                AppError::new(ErrorCategory::InternalError, err.to_string())
                    .with_code("RUNTIME-INPROC-003")
                    .with_context("event_id", envelope.event_id.clone())
            })?;
        let record = json!({ "value": output });
        let resp = self
            .http
            .post(&submission.destination)
            .json(&record)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::new(
                ErrorCategory::TransportError,
                format!(
                    "destination {} rejected delivery: {}",
                    submission.destination, status
                ),
            )
            .with_code("RUNTIME-INPROC-004"));
        }
        Ok(record)
    }

    fn spawn_delivery(&self, submission: EventSubmission) -> JoinHandle<()> {
        let runtime = self.clone();
        tokio::spawn(async move {
            let event_id = submission.event.event_id.clone();
            match runtime.process(submission).await {
                Ok(_) => {
                    runtime.stats.delivered.fetch_add(1, Ordering::SeqCst);
                    debug!(%event_id, "delivered transformed record");
                }
                Err(err) => {
                    runtime.stats.dropped.fetch_add(1, Ordering::SeqCst);
                    warn!(%event_id, "dropping event: {}", err);
                }
            }
        })
    }
}

#[async_trait]
impl TransformerRuntime for InProcessRuntime {
    async fn load(&self, blueprint: &TransformerBlueprint) -> Result<String, AppError> {
        let process_id = Uuid::new_v4().to_string();
        self.processes.insert(process_id.clone(), blueprint.clone());
        info!(%process_id, name = %blueprint.name, version = %blueprint.version, "transformer loaded");
        Ok(process_id)
    }

    async fn transform(
        &self,
        process_id: &str,
        submission: &EventSubmission,
    ) -> Result<(), AppError> {
        if !self.processes.contains_key(process_id) {
            return Err(unknown_process(process_id, ErrorCategory::SubmissionError));
        }
        self.spawn_delivery(submission.clone());
        Ok(())
    }

    async fn unload(&self, process_id: &str) -> Result<(), AppError> {
        match self.processes.remove(process_id) {
            Some((_, blueprint)) => {
                info!(%process_id, name = %blueprint.name, "transformer unloaded");
                Ok(())
            }
            None => Err(unknown_process(process_id, ErrorCategory::TeardownError)),
        }
    }
}

pub(crate) fn unknown_process(process_id: &str, category: ErrorCategory) -> AppError {
    AppError::new(category, format!("no transformer loaded as {}", process_id))
        .with_code("RUNTIME-INPROC-001")
        .with_context("process_id", process_id)
}
