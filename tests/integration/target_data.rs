use std::sync::Arc;
use std::time::Duration;

use klabis_hal::forms::TargetPhase;
use klabis_hal::hal::HalFormsTemplate;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{client, mount_json, received_for};

fn template(target: &str) -> HalFormsTemplate {
    serde_json::from_value(json!({"method": "PUT", "target": target, "properties": [{"name": "note"}]}))
        .unwrap()
}

fn current() -> Option<Arc<Value>> {
    Some(Arc::new(json!({"id": 1, "note": "current"})))
}

#[tokio::test]
async fn test_different_target_is_fetched() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/members/1/profile", 200, json!({"note": "profile"})).await;

    let resolver = client(&server, None).target_resolver();
    let target = format!("{}/api/members/1/profile", server.uri());
    let state = resolver.resolve(Some(&template(&target)), "/members/1", current()).await;

    assert_eq!(state.phase, TargetPhase::Ready);
    assert_eq!(state.data.as_deref(), Some(&json!({"note": "profile"})));
    assert_eq!(resolver.state().await.phase, TargetPhase::Ready);
}

#[tokio::test]
async fn test_same_target_uses_current_data() {
    let server = MockServer::start().await;

    let resolver = client(&server, None).target_resolver();
    let target = format!("{}/api/members/1", server.uri());
    let state = resolver.resolve(Some(&template(&target)), "/members/1", current()).await;

    assert_eq!(state.phase, TargetPhase::UseCurrent);
    assert_eq!(state.data.as_deref(), current().as_deref());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreadable_target_falls_back_silently() {
    for status in [404, 405] {
        let server = MockServer::start().await;
        mount_json(&server, "GET", "/api/members/1/profile", status, json!({})).await;

        let resolver = client(&server, None).target_resolver();
        let state = resolver.resolve(Some(&template("/api/members/1/profile")), "/members/1", current()).await;

        assert_eq!(state.phase, TargetPhase::SuppressedError, "status {status}");
        assert!(state.error.is_none());
        assert_eq!(state.data.as_deref(), current().as_deref());
    }
}

#[tokio::test]
async fn test_server_error_reported_with_fallback_data() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/members/1/profile", 500, json!({})).await;

    let resolver = client(&server, None).target_resolver();
    let state = resolver.resolve(Some(&template("/api/members/1/profile")), "/members/1", current()).await;

    assert_eq!(state.phase, TargetPhase::Error);
    assert!(state.error.as_ref().is_some_and(|e| e.is_status(&[500])));
    assert_eq!(state.data.as_deref(), current().as_deref());
}

#[tokio::test]
async fn test_refetch_repeats_last_target_request() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/members/1/profile", 200, json!({"note": "profile"})).await;

    let resolver = client(&server, None).target_resolver();
    resolver.resolve(Some(&template("/api/members/1/profile")), "/members/1", current()).await;
    let state = resolver.refetch().await;

    assert_eq!(state.phase, TargetPhase::Ready);
    assert_eq!(received_for(&server, "/api/members/1/profile").await.len(), 2);
}

#[tokio::test]
async fn test_newer_resolve_wins_over_slower_older_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/members/1/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"v": "slow"}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    mount_json(&server, "GET", "/api/members/1/fast", 200, json!({"v": "fast"})).await;

    let resolver = client(&server, None).target_resolver();
    let slow_template = template("/api/members/1/slow");
    let fast_template = template("/api/members/1/fast");
    let (older, newer) = tokio::join!(
        resolver.resolve(Some(&slow_template), "/members/1", current()),
        resolver.resolve(Some(&fast_template), "/members/1", current()),
    );

    assert_eq!(newer.data.as_deref(), Some(&json!({"v": "fast"})));
    assert_eq!(older.data.as_deref(), Some(&json!({"v": "fast"})));
    let state = resolver.state().await;
    assert_eq!(state.phase, TargetPhase::Ready);
    assert_eq!(state.data.as_deref(), Some(&json!({"v": "fast"})));
    assert_eq!(received_for(&server, "/api/members/1/slow").await.len(), 1);
}

#[tokio::test]
async fn test_refetch_follows_latest_resolve() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/members/1/profile", 200, json!({"note": "old target"})).await;

    let resolver = client(&server, None).target_resolver();
    resolver.resolve(Some(&template("/api/members/1/profile")), "/members/1", current()).await;

    let untargeted: HalFormsTemplate =
        serde_json::from_value(json!({"method": "PUT", "properties": [{"name": "note"}]})).unwrap();
    let state = resolver.resolve(Some(&untargeted), "/members/2", current()).await;
    assert_eq!(state.phase, TargetPhase::UseCurrent);

    let refetched = resolver.refetch().await;
    assert_eq!(refetched.phase, TargetPhase::UseCurrent);
    assert_eq!(refetched.data.as_deref(), current().as_deref());
    assert_eq!(received_for(&server, "/api/members/1/profile").await.len(), 1);
}
