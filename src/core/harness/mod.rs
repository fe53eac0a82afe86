#![allow(clippy::result_large_err)] // AppError contains rich context; boxing would discard diagnostics needed for reporting.

//! End-to-end verification of a transformer runtime.
//!
//! A run is five steps in fixed order: start the receiver, load the blueprint, submit
//! every fixture, wait for matching deliveries, unload. Load and unload failures are
//! logged and recorded as warnings; submission and delivery failures decide the
//! verdict. The receiver is shut down whatever happens after it started.

pub mod report;
pub mod submission;

pub use report::{OutputFormat, RunReport, StepDiagnostic};
pub use submission::{receiver_name, SubmissionFactory, TIME_BUCKET_FORMAT};

use crate::core::config::HarnessConfig;
use crate::core::error::AppError;
use crate::core::fixtures::Fixture;
use crate::core::matcher::{Placeholders, RecordMatcher};
use crate::core::receiver::{start_receiver, wait_until_healthy, CallRegistry, HealthPolicy};
use crate::core::runtime::{TransformerBlueprint, TransformerRuntime};
use crate::core::types::{ErrorCategory, HarnessStep, RunStatus};
use chrono::Utc;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

/// Resolved knobs for one harness.
#[derive(Debug, Clone)]
pub struct HarnessSettings {
    pub receiver_bind: SocketAddr,
    pub host_address: String,
    pub blueprint: TransformerBlueprint,
    pub definition: Value,
    pub delivery_timeout: Duration,
    pub poll_interval: Duration,
    pub health: HealthPolicy,
}

impl HarnessSettings {
    pub fn from_config(config: &HarnessConfig) -> Result<Self, AppError> {
        let receiver_bind = config.receiver.bind.parse::<SocketAddr>().map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("receiver.bind {} is invalid: {}", config.receiver.bind, e),
            )
        })?;
        Ok(HarnessSettings {
            receiver_bind,
            host_address: config.receiver.host_address.clone(),
            blueprint: config.blueprint.clone(),
            definition: config.definition.clone(),
            delivery_timeout: config.timeouts.delivery,
            poll_interval: config.timeouts.poll_interval,
            health: config.timeouts.health_policy(),
        })
    }
}

type StepResult<T> = Result<T, (HarnessStep, AppError)>;

/// Drives a [`TransformerRuntime`] through one verification run per call.
pub struct Harness<R> {
    runtime: R,
    settings: HarnessSettings,
    registry: CallRegistry,
    placeholders: Placeholders,
    http: reqwest::Client,
}

impl<R: TransformerRuntime> Harness<R> {
    pub fn new(runtime: R, settings: HarnessSettings) -> Self {
        Harness {
            runtime,
            settings,
            registry: CallRegistry::new(),
            placeholders: Placeholders::default(),
            http: reqwest::Client::new(),
        }
    }

    /// Share an existing registry with the receiver instead of a fresh one.
    pub fn with_registry(mut self, registry: CallRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn registry(&self) -> &CallRegistry {
        &self.registry
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Run and return the report together with the deciding error, if any.
    pub async fn verify(&self, fixtures: &[Fixture]) -> Result<RunReport, AppError> {
        let (report, failure) = self.execute(fixtures).await;
        match failure {
            Some(err) => Err(err),
            None => Ok(report),
        }
    }

    /// Run and return only the report; failures are recorded in it.
    pub async fn run(&self, fixtures: &[Fixture]) -> RunReport {
        self.execute(fixtures).await.0
    }

    async fn execute(&self, fixtures: &[Fixture]) -> (RunReport, Option<AppError>) {
        let started = Instant::now();
        let name = receiver_name(&mut rand::thread_rng());
        let mut report = RunReport::new(name.clone(), fixtures.len());

        let outcome = self.execute_steps(&name, fixtures, &mut report).await;

        report.received = self.registry.call_count(&name);
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        match outcome {
            Ok(()) => {
                report.status = RunStatus::Passed;
                info!(receiver = %name, matched = report.matched, "verification passed");
                (report, None)
            }
            Err((step, err)) => {
                error!(%step, "verification failed: {}", err);
                report.status = RunStatus::Failed;
                report.failure = Some(StepDiagnostic::from_error(step, &err));
                (report, Some(err))
            }
        }
    }

    async fn execute_steps(
        &self,
        name: &str,
        fixtures: &[Fixture],
        report: &mut RunReport,
    ) -> StepResult<()> {
        let matchers = fixtures
            .iter()
            .map(|fixture| fixture.matcher(&self.placeholders))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| (HarnessStep::AssertDelivery, err))?;

        let receiver = start_receiver(self.settings.receiver_bind, self.registry.clone())
            .await
            .map_err(|err| (HarnessStep::StartReceiver, err))?;

        let outcome = self
            .with_receiver(name, receiver.port(), &receiver.health_url(), fixtures, &matchers, report)
            .await;

        if let Err(err) = receiver.shutdown().await {
            warn!("receiver shutdown failed: {}", err);
        }
        outcome
    }

    async fn with_receiver(
        &self,
        name: &str,
        port: u16,
        health_url: &str,
        fixtures: &[Fixture],
        matchers: &[RecordMatcher],
        report: &mut RunReport,
    ) -> StepResult<()> {
        wait_until_healthy(&self.http, health_url, self.settings.health)
            .await
            .map_err(|err| (HarnessStep::StartReceiver, err))?;

        let process_id = self.load(report).await;

        let destination = format!(
            "http://{}:{}/store/{}",
            self.settings.host_address, port, name
        );
        report.destination = Some(destination.clone());

        let outcome = match self
            .submit(process_id.as_deref(), &destination, fixtures, report)
            .await
        {
            Ok(()) => self.await_deliveries(name, fixtures, matchers, report).await,
            Err(err) => Err(err),
        };

        if let Some(process_id) = process_id.as_deref() {
            self.unload(process_id, report).await;
        }
        outcome
    }

    async fn load(&self, report: &mut RunReport) -> Option<String> {
        match self.runtime.load(&self.settings.blueprint).await {
            Ok(process_id) => {
                info!(%process_id, blueprint = %self.settings.blueprint.name, "transformer loaded");
                report.process_id = Some(process_id.clone());
                Some(process_id)
            }
            Err(err) => {
                warn!("error loading transformer: {}", err);
                report
                    .warnings
                    .push(StepDiagnostic::from_error(HarnessStep::Load, &err));
                None
            }
        }
    }

    async fn submit(
        &self,
        process_id: Option<&str>,
        destination: &str,
        fixtures: &[Fixture],
        report: &mut RunReport,
    ) -> StepResult<()> {
        let process_id = process_id.ok_or_else(|| {
            (
                HarnessStep::Submit,
                AppError::new(
                    ErrorCategory::SubmissionError,
                    "cannot submit events: no transformer process was loaded",
                )
                .with_code("HARNESS-SUBMIT-002"),
            )
        })?;
        let factory = SubmissionFactory::new(destination, self.settings.definition.clone());
        for (index, fixture) in fixtures.iter().enumerate() {
            let submission = factory
                .build(&mut rand::thread_rng(), &fixture.input, Utc::now())
                .map_err(|err| (HarnessStep::Submit, err))?;
            self.runtime
                .transform(process_id, &submission)
                .await
                .map_err(|mut err| {
                    err.add_context("fixture", &index.to_string());
                    (HarnessStep::Submit, err)
                })?;
            report.submitted += 1;
            info!(fixture = index, event_id = %submission.event.event_id, "event submitted");
        }
        Ok(())
    }

    async fn await_deliveries(
        &self,
        name: &str,
        fixtures: &[Fixture],
        matchers: &[RecordMatcher],
        report: &mut RunReport,
    ) -> StepResult<()> {
        let deadline = Instant::now() + self.settings.delivery_timeout;
        loop {
            let calls = self.registry.calls(name);
            let unmatched = unmatched_fixtures(matchers, &calls);
            report.matched = matchers.len() - unmatched.len();
            report.unmatched = unmatched.clone();
            if unmatched.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err((
                    HarnessStep::AssertDelivery,
                    delivery_failure(&unmatched, fixtures, matchers, calls.len(), self.settings.delivery_timeout),
                ));
            }
            sleep(self.settings.poll_interval).await;
        }
    }

    async fn unload(&self, process_id: &str, report: &mut RunReport) {
        info!(%process_id, "unloading transformer");
        if let Err(err) = self.runtime.unload(process_id).await {
            warn!("error unloading transformer: {}", err);
            report
                .warnings
                .push(StepDiagnostic::from_error(HarnessStep::Unload, &err));
        }
    }
}

/// Indexes of matchers that no recorded call satisfies.
pub fn unmatched_fixtures(matchers: &[RecordMatcher], calls: &[Value]) -> Vec<usize> {
    matchers
        .iter()
        .enumerate()
        .filter(|(_, matcher)| !calls.iter().any(|call| matcher.matches_delivery(call)))
        .map(|(index, _)| index)
        .collect()
}

fn delivery_failure(
    unmatched: &[usize],
    fixtures: &[Fixture],
    matchers: &[RecordMatcher],
    received: usize,
    timeout: Duration,
) -> AppError {
    let details: Vec<String> = unmatched
        .iter()
        .map(|&index| {
            format!(
                "#{} input {} expected {}",
                index, fixtures[index].input, matchers[index]
            )
        })
        .collect();
    let indexes: Vec<String> = unmatched.iter().map(|i| i.to_string()).collect();
    AppError::new(
        ErrorCategory::DeliveryError,
        format!(
            "{} fixture(s) not delivered within {}: {}",
            unmatched.len(),
            humantime::format_duration(timeout),
            details.join("; ")
        ),
    )
    .with_code("HARNESS-DELIVERY-001")
    .with_context("unmatched", indexes.join(","))
    .with_context("received", received.to_string())
}
