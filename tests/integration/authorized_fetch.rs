use std::sync::Arc;

use klabis_hal::core::HalError;
use klabis_hal::test_utils::MockTokenProvider;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{client, client_with_tokens, mount_json, mount_problem};

#[tokio::test]
async fn test_bearer_token_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/members"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let body = client(&server, Some("abc123")).fetch().get_json("/api/members").await.unwrap();
    assert_eq!(body, Some(json!({"ok": true})));
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/members", 200, json!({})).await;

    client(&server, None).fetch().get_json("/api/members").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("authorization"));
    assert!(requests[0].headers.contains_key("accept"));
}

#[tokio::test]
async fn test_token_looked_up_per_request() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/members", 200, json!({})).await;

    let tokens = Arc::new(MockTokenProvider::new(Some("rotating")));
    let client = client_with_tokens(&server, tokens.clone());
    client.fetch().get_json("/api/members").await.unwrap();
    client.fetch().get_json("/api/members").await.unwrap();

    assert_eq!(tokens.calls(), 2);
}

#[tokio::test]
async fn test_non_success_status_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/broken"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let error = client(&server, None).fetch().get_json("/api/broken").await.unwrap_err();
    match &error {
        HalError::Http(http) => {
            assert_eq!(http.status, 500);
            assert_eq!(http.body.as_deref(), Some("boom"));
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    assert!(error.is_status(&[500]));
}

#[tokio::test]
async fn test_empty_body_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/members/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let body = client(&server, None)
        .fetch()
        .send_json(reqwest::Method::DELETE, "/api/members/1", json!({}))
        .await
        .unwrap();
    assert_eq!(body, None);
}

#[tokio::test]
async fn test_problem_document_classified_as_validation() {
    let server = MockServer::start().await;
    mount_problem(
        &server,
        "POST",
        "/api/members",
        400,
        json!({"title": "Bad Request", "status": 400, "errors": {"email": "Invalid email"}}),
    )
    .await;

    let error = client(&server, None)
        .fetch()
        .send_json(reqwest::Method::POST, "/api/members", json!({"email": "x"}))
        .await
        .unwrap_err()
        .classify();
    match error {
        HalError::Validation(problem) => {
            assert_eq!(problem.status, 400);
            assert_eq!(problem.errors["email"], "Invalid email");
        }
        other => panic!("expected Validation error, got {other:?}"),
    }
}
