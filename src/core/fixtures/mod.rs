#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::matcher::{Placeholders, RecordMatcher};
use crate::core::types::ErrorCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const DEFAULT_FIXTURE_PATH: &str = "fixtures/expected.json";

/// One input payload and the record the transformer is expected to produce from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub input: Value,
    pub output: Value,
}

impl Fixture {
    pub fn new(input: Value, output: Value) -> Self {
        Fixture { input, output }
    }

    pub fn matcher(&self, placeholders: &Placeholders) -> Result<RecordMatcher, AppError> {
        RecordMatcher::from_expected(&self.output, placeholders)
    }
}

/// Read and validate a fixture file (a JSON array of `{ input, output }`).
pub fn load_fixtures(path: &Path) -> Result<Vec<Fixture>, AppError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::new(
            ErrorCategory::IoError,
            format!("Failed to read fixture file {}: {}", path.display(), e),
        )
        .with_code("FIXTURE-READ-001")
    })?;
    parse_fixtures(&content).map_err(|mut err| {
        err.add_context("path", &path.display().to_string());
        err
    })
}

pub fn parse_fixtures(content: &str) -> Result<Vec<Fixture>, AppError> {
    let fixtures: Vec<Fixture> = serde_json::from_str(content).map_err(|e| {
        AppError::new(
            ErrorCategory::ValidationError,
            format!("Failed to parse fixtures: {}", e),
        )
        .with_code("FIXTURE-PARSE-001")
    })?;
    if fixtures.is_empty() {
        return Err(AppError::new(
            ErrorCategory::ValidationError,
            "fixture file contains no fixtures",
        )
        .with_code("FIXTURE-EMPTY-001"));
    }
    for (index, fixture) in fixtures.iter().enumerate() {
        if !fixture.output.is_object() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("fixture {} output must be a JSON object", index),
            )
            .with_code("FIXTURE-OUTPUT-001"));
        }
    }
    Ok(fixtures)
}
