//! Option resolution for choice fields.
//!
//! A HAL-FORMS property lists its choices either inline or behind a link.
//! [`OptionResolver`] turns both into a uniform `Vec<SelectOption>`:
//!
//! - **inline**: converted synchronously, never loading
//! - **link**: fetched through the [`QueryCache`] keyed by the normalized
//!   href (five-minute staleness by default), then converted the same way
//! - **neither**: empty, not loading, no error
//!
//! Fetch failures are reported in [`OptionsState::error`], separately from
//! "no options defined".

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::OPTIONS_STALE_TIME;
use crate::core::HalError;
use crate::hal::{ApiPaths, HalFormsOptions, OptionItem};
use crate::http::AuthorizedFetch;
use crate::query::{QueryCache, QueryKey};

/// A resolved choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Options plus loading and error flags.
#[derive(Debug, Clone, Default)]
pub struct OptionsState {
    pub options: Vec<SelectOption>,
    pub is_loading: bool,
    pub error: Option<HalError>,
}

/// Convert raw option items.
#[must_use]
pub fn convert_options(items: &[OptionItem]) -> Vec<SelectOption> {
    items
        .iter()
        .map(|item| SelectOption {
            value: option_value(item),
            label: option_label(item),
        })
        .collect()
}

/// Convert a fetched options document, which must be a JSON array.
#[must_use]
pub fn convert_json_options(document: &Value) -> Vec<SelectOption> {
    match document {
        Value::Array(_) => match serde_json::from_value::<Vec<OptionItem>>(document.clone()) {
            Ok(items) => convert_options(&items),
            Err(e) => {
                warn!(target: "forms", "Unreadable option list: {e}");
                Vec::new()
            }
        },
        Value::Null => Vec::new(),
        other => {
            warn!(target: "forms", "Expected an array of options, got {}", json_kind(other));
            Vec::new()
        }
    }
}

fn option_value(item: &OptionItem) -> String {
    match item {
        OptionItem::Object {
            value, ..
        } => option_value(value),
        OptionItem::Scalar(scalar) => scalar_text(scalar),
    }
}

fn option_label(item: &OptionItem) -> String {
    match item {
        OptionItem::Object {
            value,
            prompt,
        } => match prompt.as_deref().filter(|p| !p.is_empty()) {
            Some(prompt) => prompt.to_string(),
            None => option_label(value),
        },
        OptionItem::Scalar(scalar) => scalar_text(scalar),
    }
}

/// Text form of a JSON scalar; strings are taken verbatim.
pub(crate) fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Resolves option definitions, sharing fetched lists through the query cache.
#[derive(Debug, Clone)]
pub struct OptionResolver {
    fetch: AuthorizedFetch,
    cache: QueryCache,
    paths: ApiPaths,
    stale_time: Duration,
}

impl OptionResolver {
    #[must_use]
    pub fn new(fetch: AuthorizedFetch, cache: QueryCache, paths: ApiPaths) -> Self {
        Self {
            fetch,
            cache,
            paths,
            stale_time: OPTIONS_STALE_TIME,
        }
    }

    #[must_use]
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    fn link_href(definition: Option<&HalFormsOptions>) -> Option<&str> {
        definition
            .and_then(|d| d.link.as_ref())
            .map(|l| l.href.as_str())
            .filter(|h| !h.is_empty())
    }

    /// Current state without waiting: inline options, or whatever the cache
    /// holds for a link (loading until the first response).
    #[must_use]
    pub fn snapshot(&self, definition: Option<&HalFormsOptions>) -> OptionsState {
        if let Some(inline) = definition.and_then(|d| d.inline.as_ref()) {
            return OptionsState {
                options: convert_options(inline),
                ..OptionsState::default()
            };
        }

        let Some(href) = Self::link_href(definition) else {
            return OptionsState::default();
        };

        let state = self.cache.snapshot(&QueryKey::new(&self.paths.normalize(href)));
        OptionsState {
            options: state.data.as_deref().map(convert_json_options).unwrap_or_default(),
            is_loading: state.data.is_none() && (state.error.is_none() || state.is_fetching),
            error: state.error,
        }
    }

    /// Resolve options, fetching a link's list if it is not cached and fresh.
    pub async fn resolve(&self, definition: Option<&HalFormsOptions>) -> OptionsState {
        if definition.is_some_and(|d| d.inline.is_some()) {
            return self.snapshot(definition);
        }

        let Some(href) = Self::link_href(definition) else {
            return OptionsState::default();
        };

        let key = QueryKey::new(&self.paths.normalize(href));
        let request_path = self.paths.request_path(href);
        let fetch = self.fetch.clone();
        debug!(target: "forms", "Resolving options from {request_path}");

        let result = self
            .cache
            .fetch(&key, self.stale_time, move || async move {
                Ok(fetch.get_json(&request_path).await?.unwrap_or(Value::Null))
            })
            .await;

        match result {
            Ok(document) => OptionsState {
                options: convert_json_options(&document),
                ..OptionsState::default()
            },
            Err(error) => {
                warn!(target: "forms", "Failed to load options from {href}: {error}");
                OptionsState {
                    options: Vec::new(),
                    is_loading: false,
                    error: Some(error),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::HalLink;
    use serde_json::json;

    fn items(value: Value) -> Vec<OptionItem> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_inline_strings() {
        assert_eq!(
            convert_options(&items(json!(["a", "b"]))),
            vec![SelectOption::new("a", "a"), SelectOption::new("b", "b")]
        );
    }

    #[test]
    fn test_option_item_shapes() {
        let converted = convert_options(&items(json!([
            {"value": "id1", "prompt": "Label"},
            5,
            {"value": {"value": "x"}, "prompt": "Y"},
            {"value": {"value": "inner", "prompt": "Inner"}},
            {"value": 3, "prompt": ""},
            true
        ])));

        assert_eq!(converted[0], SelectOption::new("id1", "Label"));
        assert_eq!(converted[1], SelectOption::new("5", "5"));
        assert_eq!(converted[2], SelectOption::new("x", "Y"));
        assert_eq!(converted[3], SelectOption::new("inner", "Inner"));
        assert_eq!(converted[4], SelectOption::new("3", "3"));
        assert_eq!(converted[5], SelectOption::new("true", "true"));
    }

    #[test]
    fn test_convert_json_requires_array() {
        assert_eq!(convert_json_options(&json!(["x"])).len(), 1);
        assert!(convert_json_options(&json!({"x": 1})).is_empty());
        assert!(convert_json_options(&Value::Null).is_empty());
    }

    fn resolver() -> OptionResolver {
        let fetch = AuthorizedFetch::new(
            reqwest::Url::parse("http://127.0.0.1:9").unwrap(),
            std::sync::Arc::new(crate::http::StaticTokenProvider::default()),
        )
        .unwrap();
        OptionResolver::new(fetch, QueryCache::new(), ApiPaths::default())
    }

    #[tokio::test]
    async fn test_inline_resolves_without_loading() {
        let definition = HalFormsOptions {
            inline: Some(items(json!(["a"]))),
            link: None,
        };
        let state = resolver().resolve(Some(&definition)).await;
        assert!(!state.is_loading);
        assert!(state.error.is_none());
        assert_eq!(state.options, vec![SelectOption::new("a", "a")]);
    }

    #[tokio::test]
    async fn test_no_definition_is_empty() {
        let r = resolver();
        for state in [r.resolve(None).await, r.resolve(Some(&HalFormsOptions::default())).await] {
            assert!(state.options.is_empty());
            assert!(!state.is_loading);
            assert!(state.error.is_none());
        }
    }

    #[test]
    fn test_link_snapshot_is_loading_before_first_response() {
        let definition = HalFormsOptions {
            inline: None,
            link: Some(HalLink::new("/api/options")),
        };
        let state = resolver().snapshot(Some(&definition));
        assert!(state.is_loading);
        assert!(state.options.is_empty());
    }

    #[test]
    fn test_link_snapshot_reads_cache() {
        let r = resolver();
        r.cache.set_data(&QueryKey::new("/options"), json!([{"value": 1, "prompt": "One"}]));
        let definition = HalFormsOptions {
            inline: None,
            link: Some(HalLink::new("http://host/api/options")),
        };
        let state = r.snapshot(Some(&definition));
        assert!(!state.is_loading);
        assert_eq!(state.options, vec![SelectOption::new("1", "One")]);
    }
}
