pub mod config;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod matcher;
pub mod receiver;
pub mod runtime;
pub mod transform;
pub mod types;

pub use config::{ConfigLoader, HarnessConfig};
pub use error::AppError;
pub use fixtures::{load_fixtures, Fixture};
pub use harness::{Harness, HarnessSettings, OutputFormat, RunReport};
pub use matcher::{FieldMatcher, JsonType, Placeholders, RecordMatcher};
pub use receiver::{start_receiver, CallRegistry, HealthPolicy, ReceiverHandle};
pub use runtime::{
    EventSubmission, HttpRuntime, InProcessRuntime, SubmittedEvent, TransformerBlueprint,
    TransformerRuntime,
};
pub use transform::{EventEnvelope, SpreadTransform, TransformError, TransformFunction};
pub use types::*;
