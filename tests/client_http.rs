mod support;

use std::time::Duration;

use serde_json::{json, Value};
use steward::client::ApiClient;
use steward::session::SessionState;
use support::{envelope, error_body, test_config};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_for(server: &MockServer) -> ApiClient {
    let config = test_config(&server.uri());
    ApiClient::new(&config, SessionState::anonymous()).expect("client")
}

#[tokio::test]
async fn bare_payload_is_wrapped_into_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workload/team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "weekStarting": "2026-08-03",
            "teamCapacity": 160.0,
            "teamAllocation": 120.0,
            "utilizationRate": 0.75,
            "members": [],
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response: steward::types::Envelope<Value> =
        client.get("workload/team", &[]).await.expect("response");

    assert!(response.success);
    assert!(response.data.is_some());
    let meta = response.meta.expect("generated meta");
    assert!(meta.request_id.starts_with("req_"));
}

#[tokio::test]
async fn enveloped_payload_passes_through_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "projects": [support::project_json("p1", "Atlas")],
            "total": 1,
        }))))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response: steward::types::Envelope<Value> =
        client.get("projects", &[]).await.expect("response");

    // The server's own meta survives instead of being regenerated.
    assert_eq!(response.meta.expect("meta").request_id, "req_fixture");
}

#[tokio::test]
async fn structured_error_body_surfaces_server_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tasks"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(error_body("VALIDATION_ERROR", "title is required")),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client
        .post::<Value, _>("tasks", &json!({"title": ""}))
        .await
        .expect_err("validation failure");

    assert_eq!(err.code(), "VALIDATION_ERROR");
    assert!(err.to_string().contains("title is required"));
}

#[tokio::test]
async fn unstructured_failure_maps_to_http_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.list_tasks(None).await.expect_err("server down");
    assert_eq!(err.code(), "HTTP_503");
}

#[tokio::test]
async fn empty_query_params_are_omitted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks"))
        .and(query_param_is_missing("projectId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "tasks": [],
            "total": 0,
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    // An absent filter must not serialize as "undefined" or "".
    client.list_tasks(None).await.expect("list");
}

#[tokio::test]
async fn present_query_params_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks"))
        .and(query_param("projectId", "p1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "tasks": [support::task_json("t1", "p1", "Design")],
            "total": 1,
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let response = client.list_tasks(Some("p1")).await.expect("list");
    assert_eq!(response.tasks.len(), 1);
    assert_eq!(response.tasks[0].project_id, "p1");
}

#[tokio::test]
async fn session_headers_are_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .and(header("Authorization", "Bearer tok_123"))
        .and(header("X-Organization-Id", "org_9"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
            "projects": [],
            "total": 0,
        }))))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server.uri());
    let session = SessionState::new(Some("tok_123".to_string()), Some("org_9".to_string()));
    let client = ApiClient::new(&config, session).expect("client");
    client.list_projects(None).await.expect("list");
}

#[tokio::test]
async fn slow_responses_fail_with_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!({"projects": [], "total": 0})))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.api.timeout_secs = 1;
    let client = ApiClient::new(&config, SessionState::anonymous()).expect("client");

    let err = client.list_projects(None).await.expect_err("timeout");
    assert_eq!(err.code(), "TIMEOUT");
}

#[tokio::test]
async fn non_json_success_body_is_rejected_for_typed_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/projects"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.list_projects(None).await.expect_err("not json");
    assert_eq!(err.code(), "HTTP_200");
    assert!(err.to_string().contains("expected JSON"));
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    // Nothing listens on this port.
    let mut config = test_config("http://127.0.0.1:9");
    config.api.timeout_secs = 2;
    let client = ApiClient::new(&config, SessionState::anonymous()).expect("client");

    let err = client.list_projects(None).await.expect_err("refused");
    assert!(matches!(err.code().as_str(), "NETWORK_ERROR" | "TIMEOUT"));
}
