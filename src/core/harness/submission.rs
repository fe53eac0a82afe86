#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::runtime::{EventSubmission, SubmittedEvent};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use uuid::Uuid;

/// strftime rendering of the time bucket partition (`YYYYMMDDHHmmss`).
pub const TIME_BUCKET_FORMAT: &str = "%Y%m%d%H%M%S";

/// How far back a generated valid time may lie.
const RECENT_WINDOW_MS: i64 = 24 * 60 * 60 * 1000;

const NOUNS: &[&str] = &[
    "lamp", "harbor", "meadow", "ledger", "compass", "lantern", "orchard", "quarry",
    "summit", "violin", "wagon", "beacon", "canyon", "dynamo", "falcon", "glacier",
    "hammock", "island", "jigsaw", "kettle", "Market Stall", "needle", "parcel", "river",
];

const ADJECTIVES: &[&str] = &[
    "quiet", "amber", "brisk", "candid", "dapper", "eager", "fluent", "gentle", "hollow",
    "jovial", "keen", "lucid", "mellow", "nimble", "opaque", "plucky", "rapid", "sturdy",
];

/// Builds fresh event submissions targeting one receiver endpoint.
#[derive(Debug, Clone)]
pub struct SubmissionFactory {
    destination: String,
    definition: Value,
}

impl SubmissionFactory {
    pub fn new(destination: impl Into<String>, definition: Value) -> Self {
        SubmissionFactory {
            destination: destination.into(),
            definition,
        }
    }

    /// Build a submission for `input` with random identifiers and a valid time within
    /// the 24 hours before `now`.
    pub fn build<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        input: &Value,
        now: DateTime<Utc>,
    ) -> Result<EventSubmission, AppError> {
        let valid_time = now - chrono::Duration::milliseconds(rng.gen_range(0..=RECENT_WINDOW_MS));
        Ok(EventSubmission {
            destination: self.destination.clone(),
            definition: self.definition.clone(),
            event: SubmittedEvent {
                event_id: random_uuid(rng).to_string(),
                data_core: random_uuid(rng).to_string(),
                event_type: pick(rng, NOUNS).to_string(),
                aggregator: pick(rng, ADJECTIVES).to_string(),
                time_bucket: time_bucket(&valid_time),
                valid_time: format_valid_time(&valid_time),
                serialized_payload: serde_json::to_string(input)?,
            },
        })
    }
}

/// Time-partition string for a valid time.
pub fn time_bucket(valid_time: &DateTime<Utc>) -> String {
    valid_time.format(TIME_BUCKET_FORMAT).to_string()
}

/// RFC 3339 rendering with millisecond precision and a `Z` suffix.
pub fn format_valid_time(valid_time: &DateTime<Utc>) -> String {
    valid_time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Receiver endpoint name unique to one run: a kebab-case noun plus a random suffix.
pub fn receiver_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: u32 = rng.gen();
    format!("{}-{:08x}", kebab_case(pick(rng, NOUNS)), suffix)
}

pub fn kebab_case(raw: &str) -> String {
    raw.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

fn random_uuid<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

fn pick<'a, R: Rng + ?Sized>(rng: &mut R, words: &'a [&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or("event")
}
