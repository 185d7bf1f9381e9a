//! Shared helpers for integration tests.

use std::sync::Arc;

use klabis_hal::client::HalClient;
use klabis_hal::config::ClientConfig;
use klabis_hal::http::AccessTokenProvider;
use klabis_hal::test_utils::init_test_logging;
use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Client pointed at `server` with an optional static token.
pub fn client(server: &MockServer, token: Option<&str>) -> HalClient {
    init_test_logging(None);
    let config = ClientConfig {
        base_url: server.uri(),
        access_token: token.map(str::to_string),
        ..ClientConfig::default()
    };
    HalClient::from_config(&config, None).expect("valid test config")
}

/// Client pointed at `server` using `tokens` for authorization.
pub fn client_with_tokens(server: &MockServer, tokens: Arc<dyn AccessTokenProvider>) -> HalClient {
    init_test_logging(None);
    let config = ClientConfig {
        base_url: server.uri(),
        ..ClientConfig::default()
    };
    HalClient::from_config(&config, Some(tokens)).expect("valid test config")
}

/// Serve `body` for `verb path`.
pub async fn mount_json(server: &MockServer, verb: &str, route: &str, status: u16, body: Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Serve a problem document for `verb path`.
pub async fn mount_problem(server: &MockServer, verb: &str, route: &str, status: u16, body: Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_raw(body.to_string(), "application/problem+json"),
        )
        .mount(server)
        .await;
}

/// Requests received so far, as `METHOD path` strings.
pub async fn received(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(describe)
        .collect()
}

/// Received requests whose path equals `route`.
pub async fn received_for(server: &MockServer, route: &str) -> Vec<String> {
    received(server)
        .await
        .into_iter()
        .filter(|r| r.split_once(' ').is_some_and(|(_, p)| p == route))
        .collect()
}

fn describe(request: &Request) -> String {
    format!("{} {}", request.method, request.url.path())
}
