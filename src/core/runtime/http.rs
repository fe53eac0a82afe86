#![allow(clippy::result_large_err)]

use super::{EventSubmission, LoadResponse, TransformerBlueprint, TransformerRuntime};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use reqwest::{Response, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a transformer runtime reachable over HTTP.
#[derive(Clone)]
pub struct HttpRuntime {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpRuntime {
    pub fn new(base_url: Url) -> Result<Self, AppError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: Url, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::InternalError,
                    format!("failed to build runtime HTTP client: {}", err),
                )
            })?;
        Ok(HttpRuntime { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    format!("runtime URL {} cannot be a base", self.base_url),
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl TransformerRuntime for HttpRuntime {
    async fn load(&self, blueprint: &TransformerBlueprint) -> Result<String, AppError> {
        let url = self.endpoint(&["load"])?;
        tracing::debug!(%url, name = %blueprint.name, "loading transformer");
        let resp = self.http.post(url).json(blueprint).send().await?;
        let resp = require_success(resp, ErrorCategory::SetupError, "load").await?;
        let body: Value = resp.json().await?;
        let parsed: LoadResponse = serde_json::from_value(body.clone()).map_err(|_| {
            AppError::new(
                ErrorCategory::SetupError,
                format!("load response did not contain a processId: {}", body),
            )
            .with_code("RUNTIME-LOAD-002")
        })?;
        Ok(parsed.process_id)
    }

    async fn transform(
        &self,
        process_id: &str,
        submission: &EventSubmission,
    ) -> Result<(), AppError> {
        let url = self.endpoint(&["transform", process_id])?;
        let resp = self
            .http
            .post(url)
            .json(submission)
            .send()
            .await
            .map_err(|err| {
                let mut error = AppError::from(err);
                error.category = ErrorCategory::SubmissionError;
                error
            })?;
        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::new(
                ErrorCategory::SubmissionError,
                format!("transform submission rejected: {} {}", status, text),
            )
            .with_code("RUNTIME-TRANSFORM-001")
            .with_context("event_id", submission.event.event_id.clone()));
        }
        Ok(())
    }

    async fn unload(&self, process_id: &str) -> Result<(), AppError> {
        let url = self.endpoint(&["unload", process_id])?;
        let resp = self.http.post(url).send().await.map_err(|err| {
            let mut error = AppError::from(err);
            error.category = ErrorCategory::TeardownError;
            error
        })?;
        require_success(resp, ErrorCategory::TeardownError, "unload").await?;
        Ok(())
    }
}

async fn require_success(
    resp: Response,
    category: ErrorCategory,
    operation: &str,
) -> Result<Response, AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let text = resp.text().await.unwrap_or_default();
    Err(AppError::new(
        category,
        format!("runtime {} failed: {} {}", operation, status, text),
    )
    .with_code(format!("RUNTIME-{}-001", operation.to_uppercase())))
}
