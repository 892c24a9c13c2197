use std::time::Duration;

use batch_engine::{
    BatchTransport, Criterion, HttpBatchTransport, LogKind, TransportFailure, TransportSettings,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn transport(server: &MockServer, settings: TransportSettings) -> HttpBatchTransport {
    HttpBatchTransport::new(server.uri(), "secret-token", settings).expect("build transport")
}

#[tokio::test]
async fn count_posts_criterion_and_token_and_parses_total() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/count"))
        .and(body_json(json!({
            "criterion": "missing_alt",
            "token": "secret-token",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "total": 42 },
        })))
        .mount(&server)
        .await;

    let transport = transport(&server, TransportSettings::default());
    let total = transport.count(Criterion::MissingAlt).await.expect("count");
    assert_eq!(total, 42);
}

#[tokio::test]
async fn batch_parses_typed_and_plain_log_messages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/batch"))
        .and(body_json(json!({
            "offset": 4,
            "batchSize": 2,
            "criterion": "all",
            "token": "secret-token",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "processedCount": 2,
                "logMessages": [
                    { "type": "success", "message": "ID 7: compressed 900 -> 500 bytes" },
                    { "type": "error", "message": "ID 8: compression failed" },
                    "worker restarted between pages",
                ],
            },
        })))
        .mount(&server)
        .await;

    let transport = transport(&server, TransportSettings::default());
    let outcome = transport
        .process_batch(4, 2, Criterion::All)
        .await
        .expect("batch");

    assert_eq!(outcome.processed_count, 2);
    assert_eq!(outcome.log.len(), 3);
    assert_eq!(outcome.log[0].kind, LogKind::Success);
    assert_eq!(outcome.log[1].kind, LogKind::Error);
    // Plain strings come through as info lines.
    assert_eq!(outcome.log[2].kind, LogKind::Info);
    assert_eq!(outcome.log[2].message, "worker restarted between pages");
}

#[tokio::test]
async fn server_error_status_is_fatal_not_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/batch"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let transport = transport(&server, TransportSettings::default());
    let err = transport
        .process_batch(0, 2, Criterion::MissingAlt)
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportFailure::HttpStatus(500));
}

#[tokio::test]
async fn forbidden_status_maps_to_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/count"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let transport = transport(&server, TransportSettings::default());
    let err = transport.count(Criterion::All).await.unwrap_err();
    assert_eq!(err.kind, TransportFailure::Auth);
}

#[tokio::test]
async fn slow_batch_reports_the_distinct_timeout_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/batch"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(json!({ "success": true, "data": { "processedCount": 0 } })),
        )
        .mount(&server)
        .await;

    let settings = TransportSettings {
        batch_timeout: Duration::from_millis(50),
        ..TransportSettings::default()
    };
    let transport = transport(&server, settings);
    let err = transport
        .process_batch(0, 8, Criterion::MissingAlt)
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportFailure::Timeout);
}

#[tokio::test]
async fn worker_rejection_envelope_carries_the_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "data": { "message": "unknown criterion" },
        })))
        .mount(&server)
        .await;

    let transport = transport(&server, TransportSettings::default());
    let err = transport
        .process_batch(0, 2, Criterion::All)
        .await
        .unwrap_err();
    assert_eq!(err.kind, TransportFailure::Rejected);
    assert!(err.message.contains("unknown criterion"));
}

#[tokio::test]
async fn garbage_body_is_an_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/count"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let transport = transport(&server, TransportSettings::default());
    let err = transport.count(Criterion::MissingAlt).await.unwrap_err();
    assert_eq!(err.kind, TransportFailure::InvalidResponse);
}
