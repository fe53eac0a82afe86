#![allow(clippy::result_large_err)]

//! Expected-record matching.
//!
//! A fixture's expected output compiles into a [`RecordMatcher`]: one [`FieldMatcher`]
//! per top-level field. Literal values compare by JSON equality; placeholder tokens
//! such as `:uuid:` compare by JSON type only.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const UUID_PLACEHOLDER: &str = ":uuid:";
pub const DATE_PLACEHOLDER: &str = ":date:";

/// JSON value kinds a placeholder can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Bool,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Array(_) => JsonType::Array,
            Value::Object(_) => JsonType::Object,
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JsonType::Null => "null",
            JsonType::Bool => "boolean",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Comparison applied to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMatcher {
    Exact(Value),
    OfType(JsonType),
}

impl FieldMatcher {
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            FieldMatcher::Exact(expected) => expected == actual,
            FieldMatcher::OfType(kind) => JsonType::of(actual) == *kind,
        }
    }
}

impl fmt::Display for FieldMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldMatcher::Exact(value) => write!(f, "{}", value),
            FieldMatcher::OfType(kind) => write!(f, "<any {}>", kind),
        }
    }
}

/// Placeholder tokens recognised in expected outputs.
#[derive(Debug, Clone)]
pub struct Placeholders {
    tokens: BTreeMap<String, FieldMatcher>,
}

impl Default for Placeholders {
    fn default() -> Self {
        Placeholders::empty()
            .with(UUID_PLACEHOLDER, FieldMatcher::OfType(JsonType::String))
            .with(DATE_PLACEHOLDER, FieldMatcher::OfType(JsonType::String))
    }
}

impl Placeholders {
    pub fn empty() -> Self {
        Placeholders {
            tokens: BTreeMap::new(),
        }
    }

    pub fn with(mut self, token: impl Into<String>, matcher: FieldMatcher) -> Self {
        self.tokens.insert(token.into(), matcher);
        self
    }

    /// Matcher for an expected field value.
    pub fn resolve(&self, expected: &Value) -> FieldMatcher {
        expected
            .as_str()
            .and_then(|token| self.tokens.get(token))
            .cloned()
            .unwrap_or_else(|| FieldMatcher::Exact(expected.clone()))
    }
}

/// Compiled expectation for one transformed record.
///
/// The actual record must carry exactly the expected field names.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMatcher {
    fields: BTreeMap<String, FieldMatcher>,
}

impl RecordMatcher {
    pub fn from_expected(expected: &Value, placeholders: &Placeholders) -> Result<Self, AppError> {
        let object = expected.as_object().ok_or_else(|| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!(
                    "expected output must be a JSON object, got {}",
                    JsonType::of(expected)
                ),
            )
            .with_code("MATCHER-001")
        })?;
        let fields = object
            .iter()
            .map(|(key, value)| (key.clone(), placeholders.resolve(value)))
            .collect();
        Ok(RecordMatcher { fields })
    }

    /// Whether a transform output satisfies every field matcher.
    pub fn matches_value(&self, actual: &Value) -> bool {
        match actual.as_object() {
            Some(object) => self.matches_object(object),
            None => false,
        }
    }

    /// Whether a delivered record `{ "value": ... }` carries a matching output.
    pub fn matches_delivery(&self, record: &Value) -> bool {
        record
            .get("value")
            .map(|value| self.matches_value(value))
            .unwrap_or(false)
    }

    fn matches_object(&self, object: &Map<String, Value>) -> bool {
        object.len() == self.fields.len()
            && self.fields.iter().all(|(key, matcher)| {
                object
                    .get(key)
                    .map(|actual| matcher.matches(actual))
                    .unwrap_or(false)
            })
    }
}

impl fmt::Display for RecordMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .fields
            .iter()
            .map(|(key, matcher)| format!("{}: {}", key, matcher))
            .collect();
        write!(f, "{{{}}}", rendered.join(", "))
    }
}
