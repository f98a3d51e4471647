//! Integration tests for DashboardClient.
//!
//! Uses wiremock for HTTP mocking. Tests cover chat (regular and demo),
//! metrics parsing, reference submission and status mapping (400/500,
//! malformed bodies).

use std::time::Duration;

use checkchat_core::client::CLIENT_USER_AGENT;
use checkchat_core::{
    ChatRequest, ClientConfig, ClientError, DashboardApi, DashboardClient, JobId, JobStatus,
    Language, ReferenceRequest,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_test_client(mock_server: &MockServer) -> DashboardClient {
    let config = ClientConfig::default()
        .with_url(format!("{}/api", mock_server.uri()))
        .with_poll_interval(Duration::from_millis(10));
    DashboardClient::new(&config).expect("failed to create client")
}

fn chat_request(message: &str) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        language: Language::En,
    }
}

#[tokio::test]
async fn test_chat_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("user-agent", CLIENT_USER_AGENT))
        .and(body_json(json!({
            "message": "What is the capital of France?",
            "language": "en"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "abc123",
            "response": "Paris.",
            "score": 0.91,
            "warning": false,
            "source": "France is a country whose capital is Paris."
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reply = client
        .chat(&chat_request("What is the capital of France?"))
        .await
        .expect("chat failed");

    assert_eq!(reply.id, JobId::from("abc123"));
    assert_eq!(reply.response, "Paris.");
    assert_eq!(reply.score, Some(0.91));
    assert!(!reply.warning);
}

#[tokio::test]
async fn test_chat_numeric_id_and_minimal_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 42, "response": "ok"})),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let reply = client.chat(&chat_request("hi")).await.expect("chat failed");

    assert_eq!(reply.id.as_str(), "42");
    assert_eq!(reply.score, None);
    assert!(reply.source.is_empty());
}

#[tokio::test]
async fn test_chat_demo_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat_demo"))
        .and(body_json(json!({"message": "こんにちは", "language": "ja"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 7, "response": "demo"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ClientConfig::default()
        .with_url(format!("{}/api", mock_server.uri()))
        .with_demo(true);
    let client = DashboardClient::new(&config).expect("failed to create client");
    let reply = client
        .chat(&ChatRequest {
            message: "こんにちは".to_string(),
            language: Language::Ja,
        })
        .await
        .expect("chat failed");

    assert_eq!(reply.id, JobId::from(7u64));
}

#[tokio::test]
async fn test_chat_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client.chat(&chat_request("hi")).await.unwrap_err();

    match err {
        ClientError::Request { status, message } => {
            assert_eq!(status, Some(500));
            assert!(message.contains("Internal Server Error"), "got: {message}");
        }
        other => panic!("expected Request, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_chat_malformed_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client.chat(&chat_request("hi")).await.unwrap_err();

    assert!(matches!(err, ClientError::InvalidResponse { .. }));
    assert!(err.is_request_error());
}

#[tokio::test]
async fn test_fetch_metrics_done() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/metrics/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "done",
            "factual_consistency": {"metric_value": 0.92},
            "response_toxicity": {"metric_value": 0.01},
            "factual_consistency_openai": {
                "metric_value": 0.4,
                "explanation": "The claim is <not> supported"
            }
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let snapshot = client
        .fetch_metrics(&JobId::from("abc123"))
        .await
        .expect("fetch failed");

    assert_eq!(snapshot.status, JobStatus::Done);
    assert_eq!(snapshot.metrics.len(), 3);
    assert_eq!(
        snapshot.get("factual_consistency").and_then(|m| m.metric_value),
        Some(0.92)
    );
    assert_eq!(
        snapshot
            .get("factual_consistency_openai")
            .and_then(|m| m.explanation.as_deref()),
        Some("The claim is <not> supported")
    );
}

#[tokio::test]
async fn test_fetch_metrics_pending_values() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/metrics/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "in_progress",
            "response_fluency": {"metric_value": null},
            "rouge1": {"metric_value": "n/a"}
        })))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let snapshot = client
        .fetch_metrics(&JobId::from(5u64))
        .await
        .expect("fetch failed");

    assert_eq!(snapshot.status, JobStatus::InProgress);
    assert!(snapshot.metrics.values().all(|m| m.is_pending()));
}

#[tokio::test]
async fn test_fetch_metrics_job_id_stays_one_segment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/metrics/a%2Fb%3Fc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "new"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let snapshot = client
        .fetch_metrics(&JobId::from("a/b?c"))
        .await
        .expect("fetch failed");

    assert_eq!(snapshot.status, JobStatus::New);
}

#[tokio::test]
async fn test_fetch_metrics_not_ready_error_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/metrics/abc123"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"error": "No metrics found for the given log ID"})),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .fetch_metrics(&JobId::from("abc123"))
        .await
        .unwrap_err();

    match err {
        ClientError::Request { status, message } => {
            assert_eq!(status, Some(400));
            assert_eq!(message, "HTTP 400: No metrics found for the given log ID");
        }
        other => panic!("expected Request, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_reference_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/ref_metric"))
        .and(body_json(json!({"log_id": "42", "reference": "Paris"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    client
        .submit_reference(&ReferenceRequest {
            log_id: JobId::from(42u64),
            reference: "Paris".to_string(),
        })
        .await
        .expect("reference failed");
}

#[tokio::test]
async fn test_submit_reference_empty_body_is_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/ref_metric"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client
        .submit_reference(&ReferenceRequest {
            log_id: JobId::from("abc123"),
            reference: "Paris".to_string(),
        })
        .await;

    assert!(result.is_ok(), "got: {result:?}");
}

#[tokio::test]
async fn test_submit_reference_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/ref_metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .submit_reference(&ReferenceRequest {
            log_id: JobId::from("abc123"),
            reference: "Paris".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Request { status: None, .. }));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_submit_reference_server_error_no_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/ref_metric"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .submit_reference(&ReferenceRequest {
            log_id: JobId::from("abc123"),
            reference: "Paris".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        ClientError::Request { status, message } => {
            assert_eq!(status, Some(503));
            assert_eq!(message, "HTTP 503: 503 Service Unavailable");
        }
        other => panic!("expected Request, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_request_error() {
    let config = ClientConfig::default().with_url("http://127.0.0.1:1/api");
    let client = DashboardClient::new(&config).expect("failed to create client");

    let err = client.chat(&chat_request("hi")).await.unwrap_err();
    assert!(matches!(err, ClientError::Request { status: None, .. }));
}
