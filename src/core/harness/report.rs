#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::{ErrorCategory, HarnessStep, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rendering used by the CLI for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Diagnostic captured for one lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDiagnostic {
    pub step: HarnessStep,
    pub code: String,
    pub message: String,
}

impl StepDiagnostic {
    pub fn from_error(step: HarnessStep, error: &AppError) -> Self {
        StepDiagnostic {
            step,
            code: error.code.clone(),
            message: error.message.clone(),
        }
    }
}

/// Summary of one verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub receiver_name: String,
    pub destination: Option<String>,
    pub process_id: Option<String>,
    pub fixtures: usize,
    pub submitted: usize,
    pub matched: usize,
    /// Indexes of fixtures with no matching delivery.
    pub unmatched: Vec<usize>,
    /// Store callbacks observed under the run's receiver name.
    pub received: usize,
    /// Best-effort step failures that did not decide the verdict.
    pub warnings: Vec<StepDiagnostic>,
    pub failure: Option<StepDiagnostic>,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn new(receiver_name: impl Into<String>, fixtures: usize) -> Self {
        RunReport {
            status: RunStatus::Pending,
            receiver_name: receiver_name.into(),
            destination: None,
            process_id: None,
            fixtures,
            submitted: 0,
            matched: 0,
            unmatched: Vec::new(),
            received: 0,
            warnings: Vec::new(),
            failure: None,
            started_at: Utc::now(),
            elapsed_ms: 0,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == RunStatus::Passed
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, AppError> {
        match format {
            OutputFormat::Json => self.render_json(),
            OutputFormat::Text => Ok(self.render_text()),
        }
    }

    fn render_json(&self) -> Result<String, AppError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            AppError::new(
                ErrorCategory::SerializationError,
                format!("Failed to generate JSON report: {}", e),
            )
            .with_code("REPORT-JSON-001")
        })
    }

    fn render_text(&self) -> String {
        let verdict = match self.status {
            RunStatus::Passed => "PASSED",
            RunStatus::Failed => "FAILED",
            RunStatus::Pending => "PENDING",
        };
        let mut out = format!("Transformer verification {}\n", verdict);
        out.push_str(&format!("  receiver:   {}\n", self.receiver_name));
        if let Some(destination) = &self.destination {
            out.push_str(&format!("  destination: {}\n", destination));
        }
        out.push_str(&format!(
            "  process:    {}\n",
            self.process_id.as_deref().unwrap_or("<not loaded>")
        ));
        out.push_str(&format!(
            "  fixtures:   {} submitted / {} total, {} matched, {} callbacks received\n",
            self.submitted, self.fixtures, self.matched, self.received
        ));
        if !self.unmatched.is_empty() {
            let indexes: Vec<String> = self.unmatched.iter().map(|i| format!("#{}", i)).collect();
            out.push_str(&format!("  unmatched:  {}\n", indexes.join(", ")));
        }
        for warning in &self.warnings {
            out.push_str(&format!(
                "  warning [{}] {}: {}\n",
                warning.step, warning.code, warning.message
            ));
        }
        if let Some(failure) = &self.failure {
            out.push_str(&format!(
                "  failure [{}] {}: {}\n",
                failure.step, failure.code, failure.message
            ));
        }
        out.push_str(&format!("  elapsed:    {} ms\n", self.elapsed_ms));
        out
    }
}
