//! Typed view of HAL+JSON resources and HAL-FORMS templates.
//!
//! A [`HalResource`] separates the reserved members (`_links`, `_embedded`,
//! `_templates` and collection `page` metadata) from the plain data
//! properties. Resources are immutable snapshots: the engine never edits
//! them in place, it refetches.
//!
//! # Examples
//!
//! ```rust
//! use klabis_hal::hal::HalResource;
//! use serde_json::json;
//!
//! let resource = HalResource::from_value(&json!({
//!     "id": 1,
//!     "_links": {"self": {"href": "/api/members/1"}, "edit": {"href": "/api/members/1/edit"}},
//!     "_templates": {"default": {"method": "PUT", "properties": []}}
//! })).unwrap();
//!
//! assert_eq!(resource.self_href().unwrap(), "/api/members/1");
//! assert_eq!(resource.navigation_links().len(), 1);
//! assert!(resource.template("default").is_ok());
//! assert!(!resource.is_collection());
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::core::HalError;

/// Relation name of a resource's own link.
pub const SELF_REL: &str = "self";

/// A single hypermedia link.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HalLink {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templated: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl HalLink {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            ..Self::default()
        }
    }

    /// Title if present, else the relation name it was found under.
    #[must_use]
    pub fn label<'a>(&'a self, rel: &'a str) -> &'a str {
        self.title.as_deref().filter(|t| !t.is_empty()).unwrap_or(rel)
    }
}

/// A relation's value: one link or an array of links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkValue {
    One(HalLink),
    Many(Vec<HalLink>),
}

impl LinkValue {
    #[must_use]
    pub fn first(&self) -> Option<&HalLink> {
        match self {
            Self::One(link) => Some(link),
            Self::Many(links) => links.first(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &HalLink> {
        let slice = match self {
            Self::One(link) => std::slice::from_ref(link),
            Self::Many(links) => links.as_slice(),
        };
        slice.iter()
    }
}

/// Zero-based pagination metadata of a collection resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub number: u64,
}

impl PageMetadata {
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number + 1 < self.total_pages
    }

    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 0
    }
}

/// A hypermedia resource: data properties plus reserved members.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HalResource {
    #[serde(rename = "_links", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, LinkValue>,

    #[serde(
        rename = "_embedded",
        default,
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "embedded_collections"
    )]
    pub embedded: BTreeMap<String, Vec<HalResource>>,

    #[serde(rename = "_templates", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub templates: BTreeMap<String, HalFormsTemplate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageMetadata>,

    /// Every other member of the document.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

/// Accept both `"rel": [..]` and a single embedded object.
fn embedded_collections<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<HalResource>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<HalResource>),
        One(Box<HalResource>),
    }

    let raw = BTreeMap::<String, OneOrMany>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, items)| {
            let items = match items {
                OneOrMany::Many(items) => items,
                OneOrMany::One(item) => vec![*item],
            };
            (name, items)
        })
        .collect())
}

impl HalResource {
    /// Parse a resource from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Json`] when reserved members have the wrong shape.
    pub fn from_value(value: &Value) -> Result<Self, HalError> {
        Ok(Self::deserialize(value)?)
    }

    /// A resource is a collection when it embeds anything or carries page metadata.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.embedded.values().any(|items| !items.is_empty()) || self.page.is_some()
    }

    /// First link of a relation.
    #[must_use]
    pub fn link(&self, rel: &str) -> Option<&HalLink> {
        self.links.get(rel).and_then(LinkValue::first)
    }

    /// Href of the `self` link.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::MissingLink`] when there is no non-empty `self` link.
    pub fn self_href(&self) -> Result<&str, HalError> {
        self.link(SELF_REL).map(|l| l.href.as_str()).filter(|h| !h.is_empty()).ok_or_else(|| {
            HalError::MissingLink {
                rel: SELF_REL.to_string(),
                context: "resource data".to_string(),
            }
        })
    }

    /// Links offered as user-facing navigation, excluding `self`.
    #[must_use]
    pub fn navigation_links(&self) -> Vec<(&str, &HalLink)> {
        self.links
            .iter()
            .filter(|(rel, _)| rel.as_str() != SELF_REL)
            .flat_map(|(rel, value)| value.iter().map(move |link| (rel.as_str(), link)))
            .collect()
    }

    /// Template by name.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::TemplateNotFound`] if the resource does not offer it.
    pub fn template(&self, name: &str) -> Result<&HalFormsTemplate, HalError> {
        self.templates.get(name).ok_or_else(|| HalError::TemplateNotFound {
            name: name.to_string(),
        })
    }

    /// Items embedded under `name`, empty if absent.
    #[must_use]
    pub fn embedded_items(&self, name: &str) -> &[HalResource] {
        self.embedded.get(name).map_or(&[], Vec::as_slice)
    }

    /// Data property by name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.data.get(name).filter(|_| !name.starts_with('_'))
    }

    /// Data properties, skipping unknown reserved (`_`-prefixed) members.
    pub fn data_properties(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.data.iter().filter(|(k, _)| !k.starts_with('_'))
    }
}

/// A server-described form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HalFormsTemplate {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Rendering order.
    #[serde(default)]
    pub properties: Vec<HalFormsProperty>,
}

fn default_method() -> String {
    "POST".to_string()
}

impl HalFormsTemplate {
    /// Submission target, treating an empty string as absent.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref().filter(|t| !t.is_empty())
    }

    /// HTTP method for submission.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidTemplate`] for a method token that is not valid HTTP.
    pub fn http_method(&self) -> Result<reqwest::Method, HalError> {
        let method = match self.method.trim() {
            "" => "POST".to_string(),
            m => m.to_ascii_uppercase(),
        };
        reqwest::Method::from_bytes(method.as_bytes()).map_err(|e| HalError::InvalidTemplate {
            template: self.title.clone().unwrap_or_default(),
            reason: format!("invalid method '{}': {e}", self.method),
        })
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&HalFormsProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// One form field descriptor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HalFormsProperty {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<HalFormsOptions>,
}

impl HalFormsProperty {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: Some(field_type.into()),
            ..Self::default()
        }
    }

    /// Declared type, defaulting to `text`.
    #[must_use]
    pub fn type_name(&self) -> &str {
        self.field_type.as_deref().filter(|t| !t.is_empty()).unwrap_or("text")
    }

    /// Prompt when non-empty, else the field name.
    #[must_use]
    pub fn label(&self) -> &str {
        self.prompt.as_deref().filter(|p| !p.is_empty()).unwrap_or(&self.name)
    }
}

/// Where a field's choices come from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HalFormsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline: Option<Vec<OptionItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<HalLink>,
}

/// A raw option: a scalar, or `{value, prompt?}` where `value` may nest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionItem {
    Object {
        value: Box<OptionItem>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt: Option<String>,
    },
    Scalar(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_reserved_members() {
        let resource = HalResource::from_value(&json!({
            "id": 7,
            "firstName": "Jan",
            "_links": {
                "self": {"href": "/api/members/7"},
                "payments": [{"href": "/api/members/7/payments", "title": "Payments"}, {"href": "/api/p2"}]
            },
            "_templates": {
                "default": {"method": "put", "properties": [{"name": "firstName", "required": true}]}
            }
        }))
        .unwrap();

        assert_eq!(resource.property("id"), Some(&json!(7)));
        assert_eq!(resource.data_properties().count(), 2);
        assert_eq!(resource.links["payments"].iter().count(), 2);

        let template = resource.template("default").unwrap();
        assert_eq!(template.http_method().unwrap(), reqwest::Method::PUT);
        assert_eq!(template.properties[0].type_name(), "text");
        assert!(template.properties[0].required);
        assert!(template.target().is_none());
    }

    #[test]
    fn test_navigation_links_exclude_self() {
        let resource = HalResource::from_value(&json!({
            "_links": {"self": {"href": "/a"}, "next": {"href": "/b"}, "items": [{"href": "/c"}, {"href": "/d"}]}
        }))
        .unwrap();

        let rels: Vec<&str> = resource.navigation_links().iter().map(|(rel, _)| *rel).collect();
        assert_eq!(rels, vec!["items", "items", "next"]);
    }

    #[test]
    fn test_missing_self_link() {
        let resource = HalResource::from_value(&json!({"id": 1})).unwrap();
        assert!(matches!(resource.self_href(), Err(HalError::MissingLink { .. })));
        assert!(matches!(resource.template("create"), Err(HalError::TemplateNotFound { .. })));
    }

    #[test]
    fn test_collection_detection() {
        let plain = HalResource::from_value(&json!({"_embedded": {}})).unwrap();
        assert!(!plain.is_collection());

        let embedded =
            HalResource::from_value(&json!({"_embedded": {"members": [{"id": 1}]}})).unwrap();
        assert!(embedded.is_collection());
        assert_eq!(embedded.embedded_items("members").len(), 1);
        assert!(embedded.embedded_items("events").is_empty());

        let paged = HalResource::from_value(&json!({
            "page": {"size": 10, "totalElements": 0, "totalPages": 0, "number": 0}
        }))
        .unwrap();
        assert!(paged.is_collection());
    }

    #[test]
    fn test_single_embedded_object_is_accepted() {
        let resource =
            HalResource::from_value(&json!({"_embedded": {"owner": {"id": 3}}})).unwrap();
        assert_eq!(resource.embedded_items("owner")[0].property("id"), Some(&json!(3)));
    }

    #[test]
    fn test_page_navigation() {
        let page = PageMetadata {
            size: 10,
            total_elements: 25,
            total_pages: 3,
            number: 1,
        };
        assert!(page.has_next());
        assert!(page.has_previous());
        let last = PageMetadata {
            number: 2,
            ..page
        };
        assert!(!last.has_next());
    }

    #[test]
    fn test_template_defaults() {
        let template: HalFormsTemplate = serde_json::from_value(json!({"target": ""})).unwrap();
        assert_eq!(template.method, "POST");
        assert!(template.target().is_none());
        assert!(template.properties.is_empty());
    }

    #[test]
    fn test_option_item_shapes() {
        let items: Vec<OptionItem> =
            serde_json::from_value(json!(["a", 5, {"value": "id1", "prompt": "Label"}, {"value": {"value": "x"}}]))
                .unwrap();
        assert_eq!(items[0], OptionItem::Scalar(json!("a")));
        assert!(matches!(&items[2], OptionItem::Object { prompt: Some(p), .. } if p == "Label"));
        assert!(matches!(&items[3], OptionItem::Object { value, .. } if matches!(**value, OptionItem::Object { .. })));
    }

    #[test]
    fn test_property_label_fallback() {
        let mut prop = HalFormsProperty::new("name", "text");
        assert_eq!(prop.label(), "name");
        prop.prompt = Some(String::new());
        assert_eq!(prop.label(), "name");
        prop.prompt = Some("Name".into());
        assert_eq!(prop.label(), "Name");
    }
}
