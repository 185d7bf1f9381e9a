//! HAL document fixtures.
//!
//! Hrefs are absolute and built from `base` so tests can point them at a
//! mock server.

use serde_json::{Value, json};

/// Members collection offering a `create` template with inline and linked options.
#[must_use]
pub fn member_collection(base: &str) -> Value {
    json!({
        "_links": {
            "self": {"href": format!("{base}/api/members")},
            "events": {"href": format!("{base}/api/events"), "title": "Events"}
        },
        "_embedded": {
            "memberList": [member(base, 1, "Jan", "Novák")]
        },
        "page": {"size": 10, "totalElements": 1, "totalPages": 1, "number": 0},
        "_templates": {
            "create": create_member_template(base)
        }
    })
}

/// The `create` template: name fields, an email, a sex choice and a linked club.
#[must_use]
pub fn create_member_template(base: &str) -> Value {
    json!({
        "title": "Register member",
        "method": "POST",
        "target": format!("{base}/api/members"),
        "properties": [
            {"name": "firstName", "prompt": "First name", "required": true},
            {"name": "lastName", "prompt": "Last name", "required": true},
            {"name": "email", "prompt": "Email", "type": "email"},
            {"name": "sex", "prompt": "Sex", "type": "radioGroup",
             "options": {"inline": [{"value": "MALE", "prompt": "Male"}, {"value": "FEMALE", "prompt": "Female"}]}},
            {"name": "club", "prompt": "Club",
             "options": {"link": {"href": format!("{base}/api/clubs/options")}}}
        ]
    })
}

/// A single member with an edit template targeting itself.
#[must_use]
pub fn member(base: &str, id: u64, first_name: &str, last_name: &str) -> Value {
    json!({
        "id": id,
        "firstName": first_name,
        "lastName": last_name,
        "address": {"streetAndNumber": "Hlavní 1", "city": "Brno", "postalCode": "60200", "country": "CZ"},
        "_links": {
            "self": {"href": format!("{base}/api/members/{id}")},
            "payments": {"href": format!("{base}/api/members/{id}/payments")}
        },
        "_templates": {
            "default": {
                "method": "PUT",
                "properties": [
                    {"name": "firstName", "required": true},
                    {"name": "lastName", "required": true},
                    {"name": "address", "type": "AddressApiDto"}
                ]
            }
        }
    })
}

/// Option list served behind an options link.
#[must_use]
pub fn club_options() -> Value {
    json!([
        {"value": "ZBM", "prompt": "SK Brno"},
        {"value": "PGP", "prompt": "Praha"}
    ])
}

/// `application/problem+json` body with field errors.
#[must_use]
pub fn validation_problem(errors: Value) -> Value {
    json!({
        "type": "about:blank",
        "title": "Bad Request",
        "status": 400,
        "detail": "Validation failed",
        "errors": errors
    })
}
