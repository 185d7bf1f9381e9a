//! Register a member the way an interactive client would: the URL asks for
//! the `create` form, the user fills it in, and the list refreshes.

use klabis_hal::forms::{
    FieldKind, FieldPath, FieldRegistry, FormOrigin, FormRequestController, SubmitOutcome, TargetPhase,
};
use klabis_hal::test_utils::fixtures;
use serde_json::json;
use wiremock::MockServer;

use crate::common::{client, mount_json, received_for};

#[tokio::test]
async fn test_register_member_from_url_form() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_json(&server, "GET", "/api/members", 200, fixtures::member_collection(&base)).await;
    mount_json(&server, "GET", "/api/clubs/options", 200, fixtures::club_options()).await;
    mount_json(&server, "POST", "/api/members", 201, fixtures::member(&base, 2, "Eva", "Dvořáková")).await;

    let client = client(&server, None);
    let controller = FormRequestController::new();
    controller.sync_url_form(Some("create"));
    let display = client.form_display(client.route("/members"), controller.clone(), FieldRegistry::new());

    let mut form = display.open().await.unwrap().expect("URL requested a form");
    assert_eq!(form.request.origin, FormOrigin::Url);
    assert!(!form.request.modal);
    assert_eq!(form.target.phase, TargetPhase::UseCurrent);

    let fields = display.render(&form);
    let kinds: Vec<_> = fields.iter().map(|f| (f.path.to_string(), f.kind.clone())).collect();
    assert_eq!(
        kinds,
        vec![
            ("firstName".to_string(), FieldKind::Text),
            ("lastName".to_string(), FieldKind::Text),
            ("email".to_string(), FieldKind::Email),
            ("sex".to_string(), FieldKind::RadioGroup),
            ("club".to_string(), FieldKind::Select),
        ]
    );
    assert!(fields[0].required);
    assert_eq!(fields[3].options.len(), 2);
    assert_eq!(fields[4].options[0].label, "SK Brno");
    assert!(!fields[4].options_loading);

    // Leaving a required field empty shows its error once touched.
    assert_eq!(form.session.blur(&FieldPath::key("firstName")), Some("This field is required"));

    form.session.set_value(&FieldPath::key("firstName"), json!("Eva"));
    form.session.set_value(&FieldPath::key("lastName"), json!("Dvořáková"));
    form.session.set_value(&FieldPath::key("email"), json!("eva@example.com"));
    form.session.set_value(&FieldPath::key("sex"), json!("FEMALE"));
    form.session.set_value(&FieldPath::key("club"), json!("ZBM"));
    assert!(form.session.visible_errors().is_empty());

    let outcome = display.submit(&mut form).await.unwrap();
    let SubmitOutcome::Submitted(Some(created)) = &outcome else {
        panic!("expected a created member, got {outcome:?}");
    };
    assert_eq!(created["id"], 2);

    assert!(controller.current().is_none());
    assert_eq!(received_for(&server, "/api/members").await.len(), 3);

    // The URL still carries no form; clearing it must not reopen anything.
    controller.sync_url_form(None);
    assert!(controller.current().is_none());
    assert!(display.open().await.unwrap().is_none());
}

#[tokio::test]
async fn test_edit_member_with_composite_address() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_json(&server, "GET", "/api/members/1", 200, fixtures::member(&base, 1, "Jan", "Novák")).await;
    mount_json(&server, "PUT", "/api/members/1", 200, json!({})).await;

    let client = client(&server, None);
    let controller = FormRequestController::new();
    controller.request_form(klabis_hal::forms::FormRequest::modal("default"));
    let display = client.form_display(client.route("/members/1"), controller, FieldRegistry::new());

    let mut form = display.open().await.unwrap().unwrap();
    assert_eq!(form.session.value(&FieldPath::key("firstName")), Some(&json!("Jan")));

    let fields = display.render(&form);
    let address = fields.iter().find(|f| f.path == FieldPath::key("address")).unwrap();
    assert_eq!(address.kind, FieldKind::Composite("AddressApiDto".to_string()));
    let city = address.children.iter().find(|c| c.path.to_string() == "address.city").unwrap();
    assert_eq!(city.value, json!("Brno"));

    form.session.set_value(&"address.city".parse().unwrap(), json!("Olomouc"));
    assert!(matches!(display.submit(&mut form).await.unwrap(), SubmitOutcome::Submitted(_)));

    let requests = server.received_requests().await.unwrap();
    let put = requests.iter().find(|r| r.method.as_str() == "PUT").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(body["address"]["city"], "Olomouc");
    assert_eq!(body["address"]["postalCode"], "60200");
}

#[tokio::test]
async fn test_single_field_create_blocks_empty_then_posts() {
    let server = MockServer::start().await;
    let resource = json!({
        "id": 1,
        "_links": {"self": {"href": format!("{}/api/members", server.uri())}},
        "_templates": {"create": {
            "method": "POST",
            "target": "/api/members",
            "properties": [{"name": "name", "type": "text", "required": true}]
        }}
    });
    mount_json(&server, "GET", "/api/members", 200, resource).await;
    mount_json(&server, "POST", "/api/members", 200, json!({})).await;

    let client = client(&server, None);
    let controller = FormRequestController::new();
    controller.request_form(klabis_hal::forms::FormRequest::modal("create"));
    let display = client.form_display(client.route("/members"), controller.clone(), FieldRegistry::new());

    let mut form = display.open().await.unwrap().unwrap();
    let fields = display.render(&form);
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].label, "name");
    assert_eq!(fields[0].kind, FieldKind::Text);

    assert_eq!(display.submit(&mut form).await.unwrap(), SubmitOutcome::Invalid);
    assert_eq!(form.session.visible_errors()[&FieldPath::key("name")], "This field is required");
    assert_eq!(received_for(&server, "/api/members").await, vec!["GET /api/members"]);

    form.session.set_value(&FieldPath::key("name"), json!("Alice"));
    assert!(matches!(display.submit(&mut form).await.unwrap(), SubmitOutcome::Submitted(_)));

    let requests = server.received_requests().await.unwrap();
    let post = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let body: serde_json::Value = serde_json::from_slice(&post.body).unwrap();
    assert_eq!(body, json!({"name": "Alice"}));
    assert!(controller.current().is_none());
    assert_eq!(
        received_for(&server, "/api/members").await,
        vec!["GET /api/members", "POST /api/members", "GET /api/members"]
    );
}
