use std::time::Duration;

use futures::future::join;
use klabis_hal::forms::SelectOption;
use klabis_hal::hal::{HalFormsOptions, HalLink};
use klabis_hal::test_utils::fixtures;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{client, mount_json, received_for};

fn linked(server: &MockServer, route: &str) -> HalFormsOptions {
    HalFormsOptions {
        link: Some(HalLink::new(format!("{}{route}", server.uri()))),
        ..HalFormsOptions::default()
    }
}

#[tokio::test]
async fn test_concurrent_resolves_share_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/clubs/options"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(fixtures::club_options())
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, None);
    let first = client.option_resolver();
    let second = client.option_resolver();
    let definition = linked(&server, "/api/clubs/options");

    let (a, b) = join(first.resolve(Some(&definition)), second.resolve(Some(&definition))).await;

    let expected = vec![SelectOption::new("ZBM", "SK Brno"), SelectOption::new("PGP", "Praha")];
    assert_eq!(a.options, expected);
    assert_eq!(b.options, expected);
    assert!(a.error.is_none() && b.error.is_none());
}

#[tokio::test]
async fn test_snapshot_loading_until_first_response() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/clubs/options", 200, fixtures::club_options()).await;

    let resolver = client(&server, None).option_resolver();
    let definition = linked(&server, "/api/clubs/options");

    let before = resolver.snapshot(Some(&definition));
    assert!(before.is_loading);
    assert!(before.options.is_empty());

    resolver.resolve(Some(&definition)).await;

    let after = resolver.snapshot(Some(&definition));
    assert!(!after.is_loading);
    assert_eq!(after.options.len(), 2);
}

#[tokio::test]
async fn test_cached_options_not_refetched() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/clubs/options", 200, fixtures::club_options()).await;

    let resolver = client(&server, None).option_resolver();
    let definition = linked(&server, "/api/clubs/options");
    resolver.resolve(Some(&definition)).await;
    resolver.resolve(Some(&definition)).await;

    assert_eq!(received_for(&server, "/api/clubs/options").await.len(), 1);
}

#[tokio::test]
async fn test_failed_link_reports_error() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/clubs/options", 503, json!({})).await;

    let state = client(&server, None)
        .option_resolver()
        .resolve(Some(&linked(&server, "/api/clubs/options")))
        .await;

    assert!(state.options.is_empty());
    assert!(!state.is_loading);
    assert!(state.error.is_some_and(|e| e.is_status(&[503])));
}

#[tokio::test]
async fn test_non_array_response_yields_no_options() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/clubs/options", 200, json!({"value": "ZBM"})).await;

    let state = client(&server, None)
        .option_resolver()
        .resolve(Some(&linked(&server, "/api/clubs/options")))
        .await;

    assert!(state.options.is_empty());
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_inline_options_make_no_request() {
    let server = MockServer::start().await;
    let definition: HalFormsOptions =
        serde_json::from_value(json!({"inline": ["A", {"value": "B", "prompt": "Bee"}]})).unwrap();

    let state = client(&server, None).option_resolver().resolve(Some(&definition)).await;

    assert_eq!(state.options, vec![SelectOption::new("A", "A"), SelectOption::new("B", "Bee")]);
    assert!(server.received_requests().await.unwrap().is_empty());
}
