//! Transform function contract.
//!
//! A transform function receives one [`EventEnvelope`] per event and returns a JSON
//! record. The runtime wraps that record as `{ "value": <output> }` before delivery.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::runtime::SubmittedEvent;

/// Per-event input handed to a transform function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: String,
    pub valid_time: String,
    #[serde(default)]
    pub payload: Value,
}

impl EventEnvelope {
    pub fn new(event_id: impl Into<String>, valid_time: impl Into<String>, payload: Value) -> Self {
        EventEnvelope {
            event_id: event_id.into(),
            valid_time: valid_time.into(),
            payload,
        }
    }

    /// Build the envelope a runtime passes to the transform for a submitted event.
    pub fn from_submission(event: &SubmittedEvent) -> Result<Self, TransformError> {
        let payload: Value = serde_json::from_str(&event.serialized_payload).map_err(|err| {
            TransformError::InvalidPayload {
                event_id: event.event_id.clone(),
                reason: err.to_string(),
            }
        })?;
        Ok(EventEnvelope::new(
            event.event_id.clone(),
            event.valid_time.clone(),
            payload,
        ))
    }
}

/// Failure raised by a transform invocation.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("event {event_id}: serialized payload is not valid JSON: {reason}")]
    InvalidPayload { event_id: String, reason: String },
    #[error("event {event_id}: payload must be a JSON object or null, got {kind}")]
    PayloadNotObject { event_id: String, kind: &'static str },
    #[error("event {event_id}: {message}")]
    Failed { event_id: String, message: String },
}

/// Contract every transformer satisfies.
///
/// Implementations must be pure functions of the envelope and the static
/// `definition`; no state may leak from one invocation into the next.
#[async_trait]
pub trait TransformFunction: Send + Sync {
    async fn transform(
        &self,
        envelope: &EventEnvelope,
        definition: &Value,
    ) -> Result<Value, TransformError>;
}

/// Default transform: passes `eventId` and `validTime` through and spreads the payload
/// object over them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadTransform;

#[async_trait]
impl TransformFunction for SpreadTransform {
    async fn transform(
        &self,
        envelope: &EventEnvelope,
        _definition: &Value,
    ) -> Result<Value, TransformError> {
        tracing::info!(
            event_id = %envelope.event_id,
            payload = %envelope.payload,
            valid_time = %envelope.valid_time,
            "received event"
        );
        spread(envelope).map(Value::Object)
    }
}

/// Merge the payload fields over the envelope identity fields.
pub fn spread(envelope: &EventEnvelope) -> Result<Map<String, Value>, TransformError> {
    let mut output = Map::new();
    output.insert("eventId".into(), Value::String(envelope.event_id.clone()));
    output.insert(
        "validTime".into(),
        Value::String(envelope.valid_time.clone()),
    );
    match &envelope.payload {
        Value::Object(fields) => {
            for (key, value) in fields {
                output.insert(key.clone(), value.clone());
            }
        }
        Value::Null => {}
        other => {
            return Err(TransformError::PayloadNotObject {
                event_id: envelope.event_id.clone(),
                kind: json_kind(other),
            })
        }
    }
    Ok(output)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
