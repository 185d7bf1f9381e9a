use klabis_hal::core::HalError;
use klabis_hal::hal::HalResource;
use klabis_hal::route::SortDirection;
use klabis_hal::test_utils::fixtures;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{client, mount_json, received_for};

#[tokio::test]
async fn test_load_is_cached_and_refetch_forces_request() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/members/7", 200, fixtures::member(&server.uri(), 7, "Eva", "Nová")).await;

    let route = client(&server, None).route("/members/7");
    let first = route.load().await;
    let second = route.load().await;
    assert_eq!(first.resource_data, second.resource_data);
    assert_eq!(received_for(&server, "/api/members/7").await.len(), 1);

    let refreshed = route.refetch().await;
    assert!(refreshed.error.is_none());
    assert_eq!(received_for(&server, "/api/members/7").await.len(), 2);

    let resource = refreshed.resource().unwrap().unwrap();
    assert_eq!(resource.property("firstName"), Some(&json!("Eva")));
}

#[tokio::test]
async fn test_api_prefixed_path_normalized() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/members/7", 200, json!({"id": 7})).await;

    let route = client(&server, None).route("/api/members/7");
    assert_eq!(route.pathname(), "/members/7");
    assert_eq!(route.load().await.resource_data.as_deref(), Some(&json!({"id": 7})));
}

#[tokio::test]
async fn test_auth_routes_are_not_fetched() {
    let server = MockServer::start().await;

    for pathname in ["/login", "/auth/callback"] {
        let state = client(&server, None).route(pathname).load().await;
        assert!(state.resource_data.is_none());
        assert!(state.error.is_none());
        assert!(!state.is_loading);
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_load_error_surfaces_in_state() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/members/404", 404, json!({})).await;

    let state = client(&server, None).route("/members/404").load().await;
    assert!(state.resource_data.is_none());
    assert!(state.error.is_some_and(|e| e.is_status(&[404])));
}

#[tokio::test]
async fn test_navigation_changes_loaded_resource() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_json(&server, "GET", "/api/members", 200, fixtures::member_collection(&base)).await;
    mount_json(&server, "GET", "/api/members/1", 200, fixtures::member(&base, 1, "Jan", "Novák")).await;

    let route = client(&server, None).route("/members");
    let mut changes = route.subscribe();
    let collection = route.load().await.resource().unwrap().unwrap();

    let item: &HalResource = &collection.embedded_items("memberList")[0];
    let pathname = route.navigate_to_resource(item).unwrap();
    assert_eq!(pathname, "/members/1");
    assert!(changes.has_changed().unwrap());

    let member = route.load().await.resource().unwrap().unwrap();
    assert_eq!(member.property("lastName"), Some(&json!("Novák")));
}

#[tokio::test]
async fn test_navigation_without_self_link_fails() {
    let server = MockServer::start().await;
    let route = client(&server, None).route("/members");

    let data = json!({"name": "detached"});
    let error = route.navigate_to_resource(&data).unwrap_err();
    assert!(matches!(error, HalError::MissingLink { rel, .. } if rel == "self"));
    assert_eq!(route.pathname(), "/members");
}

#[tokio::test]
async fn test_subresource_follows_link() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_json(&server, "GET", "/api/members/7", 200, fixtures::member(&base, 7, "Eva", "Nová")).await;
    mount_json(&server, "GET", "/api/members/7/payments", 200, json!({"total": 350})).await;

    let route = client(&server, None).route("/members/7");
    let payments = route.subresource("payments").await.unwrap();
    assert_eq!(payments["total"], 350);

    let missing = route.subresource("trainings").await.unwrap_err();
    assert!(matches!(missing, HalError::MissingLink { rel, .. } if rel == "trainings"));
}

#[tokio::test]
async fn test_collection_page_with_sort_and_paging() {
    let server = MockServer::start().await;
    let base = server.uri();
    let mut page = fixtures::member_collection(&base);
    page["page"] = json!({"size": 1, "totalElements": 3, "totalPages": 3, "number": 1});
    Mock::given(method("GET"))
        .and(path("/api/members"))
        .and(query_param("page", "1"))
        .and(query_param("size", "1"))
        .and(query_param("sort", "lastName,desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, None);
    let query = client
        .collection_query("/api/members?page=0")
        .collection("memberList")
        .page(1)
        .size(1)
        .sort("lastName", SortDirection::Desc);

    let result = client.route("/members").collection(&query).await.unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0]["firstName"], "Jan");
    let meta = result.page.unwrap();
    assert!(meta.has_next() && meta.has_previous());
}
