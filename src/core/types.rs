use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    ValidationError,
    SetupError,
    SubmissionError,
    DeliveryError,
    TeardownError,
    TransportError,
    SerializationError,
    TimeoutError,
    IoError,
    InternalError,
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Error,
    Warning,
    Info,
    Debug,
}

/// Harness lifecycle step, used to tag diagnostics in reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarnessStep {
    StartReceiver,
    Load,
    Submit,
    AssertDelivery,
    Unload,
}

impl std::fmt::Display for HarnessStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            HarnessStep::StartReceiver => "start-receiver",
            HarnessStep::Load => "load",
            HarnessStep::Submit => "submit",
            HarnessStep::AssertDelivery => "assert-delivery",
            HarnessStep::Unload => "unload",
        };
        f.write_str(label)
    }
}

/// Outcome of a verification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    Passed,
    Failed,
}
