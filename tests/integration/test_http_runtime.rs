use std::time::Duration;

use reqwest::Url;
use serde_json::json;
use transform_harness::core::fixtures::Fixture;
use transform_harness::core::harness::{Harness, HarnessSettings, SubmissionFactory};
use transform_harness::core::receiver::HealthPolicy;
use transform_harness::core::runtime::{
    EventSubmission, HttpRuntime, TransformerBlueprint, TransformerRuntime,
};
use transform_harness::core::types::{ErrorCategory, HarnessStep};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn build_runtime(server: &MockServer) -> HttpRuntime {
    let base = Url::parse(&server.uri()).expect("invalid mock server URL");
    HttpRuntime::with_timeout(base, Duration::from_secs(5)).expect("runtime client")
}

fn sample_submission() -> EventSubmission {
    let factory = SubmissionFactory::new("http://localhost:40300/store/falcon", json!({"hello": "world"}));
    factory
        .build(
            &mut rand::thread_rng(),
            &json!({"message": "Hello World"}),
            chrono::Utc::now(),
        )
        .expect("submission")
}

fn fast_settings() -> HarnessSettings {
    HarnessSettings {
        receiver_bind: "127.0.0.1:0".parse().unwrap(),
        host_address: "127.0.0.1".to_string(),
        blueprint: TransformerBlueprint::default(),
        definition: json!({"hello": "world"}),
        delivery_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(20),
        health: HealthPolicy::default(),
    }
}

#[tokio::test]
async fn test_load_posts_blueprint_and_returns_process_id() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .and(body_partial_json(json!({
            "name": "test-transformer",
            "version": "1.0.0",
            "runtime": "node",
            "artifactUrl": "/app/transformers/test-transformer",
            "entrypoint": "main.js",
            "startTimeTimeout": 10000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"processId": "proc-42"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let runtime = build_runtime(&mock_server);
    let process_id = runtime.load(&TransformerBlueprint::default()).await.unwrap();
    assert_eq!(process_id, "proc-42");
}

#[tokio::test]
async fn test_load_without_process_id_is_setup_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&mock_server)
        .await;

    let err = build_runtime(&mock_server)
        .load(&TransformerBlueprint::default())
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::SetupError);
    assert_eq!(err.code, "RUNTIME-LOAD-002");
}

#[tokio::test]
async fn test_load_http_failure_is_setup_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
        .mount(&mock_server)
        .await;

    let err = build_runtime(&mock_server)
        .load(&TransformerBlueprint::default())
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::SetupError);
    assert_eq!(err.code, "RUNTIME-LOAD-001");
    assert!(err.message.contains("warming up"));
}

#[tokio::test]
async fn test_transform_posts_submission_to_process_path() {
    let mock_server = MockServer::start().await;
    let submission = sample_submission();
    Mock::given(method("POST"))
        .and(path("/transform/proc-42"))
        .and(body_partial_json(json!({
            "destination": "http://localhost:40300/store/falcon",
            "definition": {"hello": "world"},
            "event": {
                "eventId": submission.event.event_id,
                "serializedPayload": "{\"message\":\"Hello World\"}"
            }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    build_runtime(&mock_server)
        .transform("proc-42", &submission)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_transform_requires_exactly_200() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/transform/proc-42"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&mock_server)
        .await;

    let submission = sample_submission();
    let err = build_runtime(&mock_server)
        .transform("proc-42", &submission)
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::SubmissionError);
    assert_eq!(err.code, "RUNTIME-TRANSFORM-001");
    assert_eq!(
        err.context.get("event_id"),
        Some(&submission.event.event_id)
    );
}

#[tokio::test]
async fn test_unload_failure_is_teardown_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/unload/proc-42"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let err = build_runtime(&mock_server)
        .unload("proc-42")
        .await
        .unwrap_err();
    assert_eq!(err.category, ErrorCategory::TeardownError);
    assert_eq!(err.code, "RUNTIME-UNLOAD-001");
}

#[tokio::test]
async fn test_rejected_submission_fails_run_and_still_unloads() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"processId": "proc-7"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/transform/proc-7"))
        .respond_with(ResponseTemplate::new(500).set_body_string("transformer crashed"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/unload/proc-7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fixtures = vec![
        Fixture::new(json!({"message": "one"}), json!({"message": "one"})),
        Fixture::new(json!({"message": "two"}), json!({"message": "two"})),
    ];
    let harness = Harness::new(build_runtime(&mock_server), fast_settings());
    let report = harness.run(&fixtures).await;

    assert!(!report.passed());
    assert_eq!(report.submitted, 0);
    assert_eq!(report.process_id.as_deref(), Some("proc-7"));
    let failure = report.failure.expect("failure recorded");
    assert_eq!(failure.step, HarnessStep::Submit);
    assert_eq!(failure.code, "RUNTIME-TRANSFORM-001");
}

#[tokio::test]
async fn test_failed_load_skips_submission_and_unload() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/load"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/unload/proc-7"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let fixtures = vec![Fixture::new(json!({"message": "one"}), json!({"message": "one"}))];
    let harness = Harness::new(build_runtime(&mock_server), fast_settings());
    let err = harness.verify(&fixtures).await.unwrap_err();

    assert_eq!(err.category, ErrorCategory::SubmissionError);
    assert_eq!(err.code, "HARNESS-SUBMIT-002");
}
