//! Paged collection queries.

use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::constants::COLLECTION_STALE_TIME;
use crate::core::HalError;
use crate::hal::{HalLink, HalResource, PageMetadata};

/// Base used only to parse relative hrefs.
const PLACEHOLDER_ORIGIN: &str = "http://placeholder.invalid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// A page request against a collection link.
#[derive(Debug, Clone)]
pub struct CollectionQuery {
    href: String,
    collection: Option<String>,
    page: u64,
    size: Option<u64>,
    sort: Vec<(String, SortDirection)>,
    stale_time: Duration,
}

impl CollectionQuery {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            collection: None,
            page: 0,
            size: None,
            sort: Vec::new(),
            stale_time: COLLECTION_STALE_TIME,
        }
    }

    /// Query for the collection a resource links to under `rel`; `self`
    /// queries the resource itself.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::MissingLink`] if the link is absent.
    pub fn from_link(resource: &HalResource, rel: &str) -> Result<Self, HalError> {
        resource
            .link(rel)
            .filter(|link| !link.href.is_empty())
            .map(|link: &HalLink| Self::new(link.href.clone()))
            .ok_or_else(|| HalError::MissingLink {
                rel: rel.to_string(),
                context: "collection resource".to_string(),
            })
    }

    /// Rows are read from `_embedded[name]` instead of the first embedded collection.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Zero-based page number.
    #[must_use]
    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Add a sort column; earlier columns take precedence.
    #[must_use]
    pub fn sort(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push((column.into(), direction));
        self
    }

    #[must_use]
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    #[must_use]
    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    #[must_use]
    pub fn collection_name(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// The href with `page`, `size` and `sort` replacing any it already had.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidUrl`] if the href does not parse.
    pub fn href_with_params(&self) -> Result<String, HalError> {
        let base = reqwest::Url::parse(PLACEHOLDER_ORIGIN).map_err(|e| HalError::InvalidUrl {
            url: PLACEHOLDER_ORIGIN.to_string(),
            reason: e.to_string(),
        })?;
        let mut url = base.join(&self.href).map_err(|e| HalError::InvalidUrl {
            url: self.href.clone(),
            reason: e.to_string(),
        })?;

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| !matches!(name.as_ref(), "page" | "size" | "sort"))
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        {
            let mut query = url.query_pairs_mut();
            query.clear();
            query.extend_pairs(kept);
            query.append_pair("page", &self.page.to_string());
            if let Some(size) = self.size {
                query.append_pair("size", &size.to_string());
            }
            for (column, direction) in &self.sort {
                query.append_pair("sort", &format!("{column},{direction}"));
            }
        }

        let mut href = url.path().to_string();
        if let Some(query) = url.query() {
            href.push('?');
            href.push_str(query);
        }
        Ok(href)
    }
}

/// One page of rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionPage {
    pub rows: Vec<Value>,
    pub page: Option<PageMetadata>,
}

impl CollectionPage {
    /// Extract rows from `_embedded[collection]` (or the first embedded
    /// collection), falling back to a plain `content` array.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Json`] for malformed page metadata.
    pub fn from_value(document: &Value, collection: Option<&str>) -> Result<Self, HalError> {
        let embedded = document.get("_embedded").and_then(Value::as_object);
        let rows = match (embedded, collection) {
            (Some(embedded), Some(name)) => embedded.get(name).and_then(Value::as_array).cloned(),
            (Some(embedded), None) => embedded.values().find_map(Value::as_array).cloned(),
            (None, _) => None,
        }
        .or_else(|| document.get("content").and_then(Value::as_array).cloned())
        .unwrap_or_default();

        let page = match document.get("page") {
            Some(page) if !page.is_null() => Some(serde_json::from_value(page.clone())?),
            _ => None,
        };

        Ok(Self {
            rows,
            page,
        })
    }
}
