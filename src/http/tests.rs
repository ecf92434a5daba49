//! Tests for the HTTP client facade

use super::*;
use crate::backoff::{ConstantBackoff, StopBackoff, WithMaxRetries};
use crate::config::{BackoffConfig, ClientConfig};
use crate::error::Error;
use crate::logging::NoopLogger;
use crate::types::BackoffType;
use reqwest::{Method, Request, Response, Url};
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn quick() -> WithMaxRetries<ConstantBackoff> {
    WithMaxRetries::new(ConstantBackoff::new(Duration::from_millis(10)), 3)
}

fn quick_config(retries: u32) -> BackoffConfig {
    BackoffConfig {
        backoff_type: BackoffType::Constant,
        initial_ms: 10,
        max_ms: 10,
        max_retries: retries,
        ..BackoffConfig::default()
    }
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

#[test]
fn test_client_default() {
    let client = Client::default();
    assert_eq!(client.default_backoff_config(), &BackoffConfig::default());
    assert_eq!(client.executor().attempt_timeout(), None);
}

#[test]
fn test_client_debug() {
    let client = Client::new();
    let debug_str = format!("{client:?}");
    assert!(debug_str.contains("Client"));
    assert!(debug_str.contains("backoff"));
}

#[test]
fn test_builder_settings() {
    let client = Client::builder()
        .attempt_timeout(Duration::from_millis(750))
        .user_agent("billing/1.0")
        .header("X-Client", "billing")
        .max_retries(4)
        .logger(NoopLogger)
        .build()
        .unwrap();

    assert_eq!(
        client.executor().attempt_timeout(),
        Some(Duration::from_millis(750))
    );
    assert_eq!(client.default_backoff_config().max_retries, 4);
}

#[test]
fn test_builder_rejects_invalid_config() {
    let result = Client::builder()
        .backoff(BackoffConfig {
            multiplier: 0.0,
            ..BackoffConfig::default()
        })
        .build();

    assert!(matches!(result, Err(Error::InvalidConfigValue { .. })));
}

#[test]
fn test_builder_debug() {
    let builder = Client::builder().logger(NoopLogger);
    let debug_str = format!("{builder:?}");
    assert!(debug_str.contains("has_logger: true"));
}

#[tokio::test]
async fn test_execute_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "users": [{"id": 1, "name": "Alice"}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let response = client
        .get(&format!("{}/api/users", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_get_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": 42
        })))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let data: serde_json::Value = client
        .get_json(&format!("{}/api/data", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(data["value"], 42);
}

#[tokio::test]
async fn test_get_invalid_url() {
    let client = Client::new();
    let result = client.get("not a url").await;
    assert!(matches!(result, Err(Error::InvalidUrl(_))));
}

#[tokio::test]
async fn test_retry_on_500_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let request = Request::new(
        Method::GET,
        Url::parse(&format!("{}/api/flaky", mock_server.uri())).unwrap(),
    );
    let response = client.execute_with_backoff(request, quick()).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");
    assert_eq!(requests_to(&mock_server, "/api/flaky").await, 3);
}

#[tokio::test]
async fn test_max_retries_exceeded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/always-fail"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Server error"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let request = Request::new(
        Method::GET,
        Url::parse(&format!("{}/api/always-fail", mock_server.uri())).unwrap(),
    );
    let err = client
        .execute_with_backoff(request, quick())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::RetriesExhausted {
            attempts: 4,
            status: 503
        }
    ));
}

#[tokio::test]
async fn test_not_implemented_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/unsupported"))
        .respond_with(ResponseTemplate::new(501))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let response = client
        .get(&format!("{}/api/unsupported", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status(), 501);
}

#[tokio::test]
async fn test_post_body_replayed_across_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/items"))
        .and(body_string(r#"{"name":"test"}"#))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/items"))
        .and(body_string(r#"{"name":"test"}"#))
        .respond_with(ResponseTemplate::new(201))
        .mount(&mock_server)
        .await;

    let client = Client::builder().backoff(quick_config(5)).build().unwrap();
    let response = client
        .post(
            &format!("{}/api/items", mock_server.uri()),
            r#"{"name":"test"}"#,
        )
        .await
        .unwrap();

    assert_eq!(response.status(), 201);

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
    for request in received {
        assert_eq!(request.body, br#"{"name":"test"}"#.to_vec());
    }
}

#[tokio::test]
async fn test_send_builder_with_json_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/items/7"))
        .and(header("X-Request-Id", "req-456"))
        .and(body_string(r#"{"qty":3}"#))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/api/items/7"))
        .and(header("X-Request-Id", "req-456"))
        .and(body_string(r#"{"qty":3}"#))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = Client::builder().backoff(quick_config(2)).build().unwrap();
    let builder = client
        .request(Method::PUT, &format!("{}/api/items/7", mock_server.uri()))
        .header("X-Request-Id", "req-456")
        .json(&serde_json::json!({"qty": 3}));

    let response = client.send(builder).await.unwrap();
    assert_eq!(response.status(), 204);
    assert_eq!(requests_to(&mock_server, "/api/items/7").await, 2);
}

#[tokio::test]
async fn test_default_headers_sent_on_every_attempt() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/secure"))
        .and(header("X-API-Key", "secret123"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/secure"))
        .and(header("X-API-Key", "secret123"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .header("X-API-Key", "secret123")
        .backoff(quick_config(1))
        .build()
        .unwrap();
    let response = client
        .get(&format!("{}/api/secure", mock_server.uri()))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_custom_predicate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/queue"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/queue"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let request = Request::new(
        Method::GET,
        Url::parse(&format!("{}/api/queue", mock_server.uri())).unwrap(),
    );
    let response = client
        .execute_with_predicate(request, quick(), retry_on_statuses([503]))
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
    assert_eq!(requests_to(&mock_server, "/api/queue").await, 2);
}

#[tokio::test]
async fn test_never_retry_predicate_returns_first_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/once"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let request = Request::new(
        Method::GET,
        Url::parse(&format!("{}/api/once", mock_server.uri())).unwrap(),
    );
    let response = client
        .execute_with_predicate(request, quick(), never_retry)
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn test_connection_refused_exhausts_as_transport_error() {
    let client = Client::builder()
        .backoff(quick_config(1))
        .logger(NoopLogger)
        .build()
        .unwrap();

    let err = client.get("http://127.0.0.1:1/unreachable").await.unwrap_err();

    match err {
        Error::TransportExhausted { attempts, source } => {
            assert_eq!(attempts, 2);
            assert!(matches!(*source, Error::Http(_)));
        }
        other => panic!("expected TransportExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_attempt_timeout_against_slow_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .attempt_timeout(Duration::from_millis(100))
        .backoff(quick_config(1))
        .build()
        .unwrap();

    let err = client
        .get(&format!("{}/api/slow", mock_server.uri()))
        .await
        .unwrap_err();

    match err {
        Error::TransportExhausted { source, .. } => {
            assert!(matches!(*source, Error::Timeout { timeout_ms: 100 }));
        }
        other => panic!("expected TransportExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_execute_until_cancels() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/hang"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let request = Request::new(
        Method::GET,
        Url::parse(&format!("{}/api/hang", mock_server.uri())).unwrap(),
    );

    let err = client
        .execute_until(
            request,
            StopBackoff,
            default_retry_predicate,
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled { attempts: 1 }));
}

#[tokio::test]
async fn test_from_config() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/configured"))
        .and(header("X-Client", "billing"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let yaml = r#"
transport:
  default_headers:
    X-Client: billing
retry:
  type: constant
  initial_ms: 5
  max_ms: 5
  max_retries: 2
"#;
    let client = Client::from_config(ClientConfig::from_yaml_str(yaml).unwrap()).unwrap();
    let err = client
        .get(&format!("{}/api/configured", mock_server.uri()))
        .await
        .unwrap_err();

    assert!(err.is_exhausted());
}

#[tokio::test]
async fn test_with_client_uses_given_reqwest_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/agent"))
        .and(header("user-agent", "custom-agent/9"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let inner = reqwest::Client::builder()
        .user_agent("custom-agent/9")
        .build()
        .unwrap();
    let client = Client::with_client(inner).with_logger(NoopLogger);

    let response = client
        .get(&format!("{}/api/agent", mock_server.uri()))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_with_transport() {
    struct Fixed;

    #[async_trait::async_trait]
    impl Transport for Fixed {
        async fn send(&self, _request: Request) -> crate::Result<Response> {
            Ok(Response::from(
                ::http::Response::builder()
                    .status(202)
                    .body("accepted")
                    .unwrap(),
            ))
        }
    }

    let client = Client::with_transport(Fixed);
    let response = client.get("http://example.invalid/jobs").await.unwrap();
    assert_eq!(response.status(), 202);
    assert_eq!(response.text().await.unwrap(), "accepted");
}
