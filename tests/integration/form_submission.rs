use std::sync::{Arc, Mutex};

use klabis_hal::client::HalClient;
use klabis_hal::forms::{
    FieldPath, FieldRegistry, FormDisplay, FormRequest, FormRequestController, SubmitError, SubmitOutcome,
};
use klabis_hal::query::QueryKey;
use klabis_hal::test_utils::fixtures;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{client, mount_json, mount_problem, received_for};

async fn members_server() -> MockServer {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/api/members", 200, fixtures::member_collection(&server.uri())).await;
    mount_json(&server, "GET", "/api/clubs/options", 200, fixtures::club_options()).await;
    server
}

fn display(client: &HalClient) -> FormDisplay {
    let controller = FormRequestController::new();
    controller.request_form(FormRequest::modal("create"));
    client.form_display(client.route("/members"), controller, FieldRegistry::new())
}

fn fill_names(form: &mut klabis_hal::forms::OpenForm) {
    form.session.set_value(&FieldPath::key("firstName"), json!("Eva"));
    form.session.set_value(&FieldPath::key("lastName"), json!("Dvořáková"));
}

#[tokio::test]
async fn test_success_refetches_route_then_closes_then_calls_back() {
    let server = members_server().await;
    Mock::given(method("POST"))
        .and(path("/api/members"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 2})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, None);
    let seen: Arc<Mutex<Vec<(Option<Value>, bool, bool)>>> = Arc::default();
    let display = {
        let base = display(&client);
        let controller = base.controller().clone();
        let route = base.route().clone();
        let seen = Arc::clone(&seen);
        base.on_success(move |body| {
            let form_open = controller.current().is_some();
            let route_loaded = route.state().resource_data.is_some();
            seen.lock().unwrap().push((body.cloned(), form_open, route_loaded));
        })
    };

    let mut form = display.open().await.unwrap().expect("form requested");
    let clubs = QueryKey::new("/clubs/options");
    assert!(client.cache().snapshot(&clubs).data.is_some());
    assert!(!client.cache().snapshot(&clubs).is_invalidated);

    fill_names(&mut form);
    let outcome = display.submit(&mut form).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Submitted(Some(json!({"id": 2}))));
    assert!(client.cache().snapshot(&clubs).is_invalidated);
    let club_options = form.session.template().property("club").and_then(|p| p.options.clone());
    let reloaded = client.option_resolver().resolve(club_options.as_ref()).await;
    assert_eq!(reloaded.options.len(), 2);
    assert_eq!(received_for(&server, "/api/clubs/options").await.len(), 2);
    assert_eq!(
        received_for(&server, "/api/members").await,
        vec!["GET /api/members", "POST /api/members", "GET /api/members"]
    );
    assert_eq!(*seen.lock().unwrap(), vec![(Some(json!({"id": 2})), false, true)]);
    assert!(display.controller().current().is_none());
    assert!(form.session.submit_error().is_none());
}

#[tokio::test]
async fn test_submitted_body_contains_form_values() {
    let server = members_server().await;
    mount_json(&server, "POST", "/api/members", 201, json!({})).await;

    let client = client(&server, None);
    let display = display(&client);
    let mut form = display.open().await.unwrap().unwrap();
    fill_names(&mut form);
    form.session.set_value(&FieldPath::key("club"), json!("ZBM"));
    display.submit(&mut form).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let post = requests.iter().find(|r| r.method.as_str() == "POST").expect("POST sent");
    let body: Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body["firstName"], "Eva");
    assert_eq!(body["lastName"], "Dvořáková");
    assert_eq!(body["club"], "ZBM");
    assert_eq!(body["email"], "");
}

#[tokio::test]
async fn test_client_validation_blocks_request() {
    let server = members_server().await;
    Mock::given(method("POST"))
        .and(path("/api/members"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server, None);
    let display = display(&client);
    let mut form = display.open().await.unwrap().unwrap();

    let outcome = display.submit(&mut form).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Invalid);
    let errors = form.session.visible_errors();
    assert_eq!(errors[&FieldPath::key("firstName")], "This field is required");
    assert_eq!(errors[&FieldPath::key("lastName")], "This field is required");
    assert!(display.controller().current().is_some());
}

#[tokio::test]
async fn test_server_validation_errors_merged_without_invalidation() {
    let server = members_server().await;
    mount_problem(
        &server,
        "POST",
        "/api/members",
        400,
        fixtures::validation_problem(json!({"firstName": "Name already registered", "address.city": "Unknown city"})),
    )
    .await;

    let client = client(&server, None);
    let display = display(&client);
    let mut form = display.open().await.unwrap().unwrap();
    fill_names(&mut form);

    let error = display.submit(&mut form).await.unwrap_err();

    assert!(matches!(error, SubmitError::Validation(_)));
    assert_eq!(error.field_errors().unwrap().len(), 2);
    let errors = form.session.visible_errors();
    assert_eq!(errors[&FieldPath::key("firstName")], "Name already registered");
    assert_eq!(errors[&"address.city".parse::<FieldPath>().unwrap()], "Unknown city");
    assert!(matches!(form.session.submit_error(), Some(SubmitError::Validation(_))));

    assert!(display.controller().current().is_some());
    assert!(!client.cache().snapshot(&QueryKey::new("/members")).is_invalidated);
    assert_eq!(received_for(&server, "/api/members").await, vec!["GET /api/members", "POST /api/members"]);
}

#[tokio::test]
async fn test_server_failure_recorded_on_session() {
    let server = members_server().await;
    mount_json(&server, "POST", "/api/members", 500, json!({"message": "down"})).await;

    let client = client(&server, None);
    let called = Arc::new(Mutex::new(false));
    let display = {
        let called = Arc::clone(&called);
        display(&client).on_success(move |_| *called.lock().unwrap() = true)
    };
    let mut form = display.open().await.unwrap().unwrap();
    fill_names(&mut form);

    let error = display.submit(&mut form).await.unwrap_err();

    assert!(matches!(&error, SubmitError::Http(http) if http.status == 500));
    assert!(error.field_errors().is_none());
    assert!(matches!(form.session.submit_error(), Some(SubmitError::Http(_))));
    assert!(!*called.lock().unwrap());
}

#[tokio::test]
async fn test_unknown_template_is_an_error() {
    let server = members_server().await;
    let client = client(&server, None);
    let controller = FormRequestController::new();
    controller.request_form(FormRequest::modal("delete"));
    let display = client.form_display(client.route("/members"), controller, FieldRegistry::new());

    let error = display.open().await.unwrap_err();
    assert!(matches!(error, klabis_hal::core::HalError::TemplateNotFound { name } if name == "delete"));
}

#[tokio::test]
async fn test_no_request_opens_nothing() {
    let server = members_server().await;
    let client = client(&server, None);
    let display = client.form_display(client.route("/members"), FormRequestController::new(), FieldRegistry::new());

    assert!(display.open().await.unwrap().is_none());
    assert!(server.received_requests().await.unwrap().is_empty());
}
