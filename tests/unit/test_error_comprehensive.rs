use transform_harness::core::error::AppError;
use transform_harness::core::types::{ErrorCategory, ErrorSeverity, HarnessStep};

#[test]
fn test_error_creation_all_categories() {
    let categories = vec![
        ErrorCategory::ValidationError,
        ErrorCategory::SetupError,
        ErrorCategory::SubmissionError,
        ErrorCategory::DeliveryError,
        ErrorCategory::TeardownError,
        ErrorCategory::TransportError,
        ErrorCategory::SerializationError,
        ErrorCategory::TimeoutError,
        ErrorCategory::IoError,
        ErrorCategory::InternalError,
        ErrorCategory::Unknown,
    ];

    for category in categories {
        let error = AppError::new(category, "test message");
        assert_eq!(error.category, category);
        assert_eq!(error.message, "test message");
        assert!(error.context.is_empty());
        assert!(error.code.starts_with("ERR-"));
        assert!(error.occurred_at <= chrono::Utc::now());
        assert!(error.source.is_none());
    }
}

#[test]
fn test_error_severity_mapping() {
    let test_cases = vec![
        (ErrorCategory::ValidationError, ErrorSeverity::Error),
        (ErrorCategory::SetupError, ErrorSeverity::Error),
        (ErrorCategory::SubmissionError, ErrorSeverity::Error),
        (ErrorCategory::DeliveryError, ErrorSeverity::Error),
        (ErrorCategory::TeardownError, ErrorSeverity::Warning),
        (ErrorCategory::TransportError, ErrorSeverity::Error),
        (ErrorCategory::Unknown, ErrorSeverity::Info),
    ];

    for (category, expected) in test_cases {
        assert_eq!(AppError::new(category, "x").severity(), expected);
    }
}

#[test]
fn test_error_display_includes_code_and_sorted_context() {
    let error = AppError::new(ErrorCategory::DeliveryError, "1 fixture(s) not delivered")
        .with_code("HARNESS-DELIVERY-001")
        .with_context("unmatched", "0")
        .with_context("received", "3");

    assert_eq!(
        error.to_string(),
        "[HARNESS-DELIVERY-001] DeliveryError: 1 fixture(s) not delivered (Context: received=3, unmatched=0)"
    );
}

#[test]
fn test_error_with_source_renders_cause() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    let error = AppError::with_source(ErrorCategory::SetupError, "receiver unreachable", Box::new(io));

    assert!(error.source.is_some());
    assert!(error.to_string().contains("Caused by: refused"));
}

#[test]
fn test_add_context_overwrites_existing_key() {
    let mut error = AppError::new(ErrorCategory::SubmissionError, "rejected");
    error.add_context("fixture", "0");
    error.add_context("fixture", "2");
    assert_eq!(error.context.get("fixture").map(String::as_str), Some("2"));
}

#[test]
fn test_conversions_assign_categories() {
    let io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert_eq!(io.category, ErrorCategory::IoError);
    assert_eq!(io.code, "IO_ERROR");

    let json: AppError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert_eq!(json.category, ErrorCategory::SerializationError);
    assert_eq!(json.code, "JSON_ERROR");

    let anyhow: AppError = anyhow::anyhow!("boom").into();
    assert_eq!(anyhow.category, ErrorCategory::InternalError);
    assert_eq!(anyhow.message, "boom");
}

#[tokio::test]
async fn test_reqwest_connection_error_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .unwrap_err();
    let app: AppError = err.into();

    assert_eq!(app.category, ErrorCategory::TransportError);
    assert_eq!(app.code, "HTTP_ERROR");
    assert!(app.context.contains_key("url"));
}

#[test]
fn test_harness_step_display_is_kebab_case() {
    assert_eq!(HarnessStep::StartReceiver.to_string(), "start-receiver");
    assert_eq!(HarnessStep::AssertDelivery.to_string(), "assert-delivery");
    assert_eq!(
        serde_json::to_value(HarnessStep::AssertDelivery).unwrap(),
        serde_json::json!("assert_delivery")
    );
}
