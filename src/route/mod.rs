//! The resource behind the current navigation path.
//!
//! Navigation paths mirror API paths without the API prefix: the path
//! `/members/7` shows the resource at `<prefix>/members/7`. [`RouteResource`]
//! tracks the current path, loads its resource through the query cache and
//! lets callers navigate to another resource by its `self` link.
//!
//! Paths under `/login` and `/auth/callback` belong to the sign-in flow and
//! are never fetched.

pub mod collection;

pub use collection::{CollectionPage, CollectionQuery, SortDirection};

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use crate::constants::{RESOURCE_STALE_TIME, UNFETCHED_ROUTE_PREFIXES};
use crate::core::HalError;
use crate::hal::{ApiPaths, HalLink, HalResource, SELF_REL};
use crate::http::AuthorizedFetch;
use crate::query::{QueryCache, QueryKey};

/// Snapshot of the route's resource.
#[derive(Debug, Clone, Default)]
pub struct RouteState {
    pub pathname: String,
    pub resource_data: Option<Arc<Value>>,
    pub is_loading: bool,
    pub error: Option<HalError>,
}

impl RouteState {
    /// Typed view of the loaded data.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Json`] when the reserved members are malformed.
    pub fn resource(&self) -> Option<Result<HalResource, HalError>> {
        self.resource_data.as_deref().map(HalResource::from_value)
    }
}

/// Something that can be navigated to through its `self` link.
#[derive(Debug, Clone, Copy)]
pub enum ResourceRef<'a> {
    Resource(&'a HalResource),
    Link(&'a HalLink),
    Data(&'a Value),
}

impl<'a> From<&'a HalResource> for ResourceRef<'a> {
    fn from(resource: &'a HalResource) -> Self {
        Self::Resource(resource)
    }
}

impl<'a> From<&'a HalLink> for ResourceRef<'a> {
    fn from(link: &'a HalLink) -> Self {
        Self::Link(link)
    }
}

impl<'a> From<&'a Value> for ResourceRef<'a> {
    fn from(data: &'a Value) -> Self {
        Self::Data(data)
    }
}

impl ResourceRef<'_> {
    fn href(&self) -> Result<String, HalError> {
        let missing = || HalError::MissingLink {
            rel: SELF_REL.to_string(),
            context: "navigation target".to_string(),
        };
        match self {
            Self::Resource(resource) => resource.self_href().map(str::to_string),
            Self::Link(link) if !link.href.is_empty() => Ok(link.href.clone()),
            Self::Link(_) => Err(missing()),
            Self::Data(data) => data
                .pointer("/_links/self/href")
                .and_then(Value::as_str)
                .filter(|href| !href.is_empty())
                .map(str::to_string)
                .ok_or_else(missing),
        }
    }
}

/// Whether a navigation path has a backing resource.
#[must_use]
pub fn is_fetchable_path(pathname: &str) -> bool {
    !UNFETCHED_ROUTE_PREFIXES.iter().any(|prefix| {
        pathname
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    })
}

/// Route-bound resource loader.
#[derive(Debug, Clone)]
pub struct RouteResource {
    fetch: AuthorizedFetch,
    cache: QueryCache,
    paths: ApiPaths,
    stale_time: Duration,
    pathname: Arc<watch::Sender<String>>,
}

impl RouteResource {
    #[must_use]
    pub fn new(fetch: AuthorizedFetch, cache: QueryCache, paths: ApiPaths, pathname: &str) -> Self {
        let pathname = paths.normalize(pathname);
        Self {
            fetch,
            cache,
            paths,
            stale_time: RESOURCE_STALE_TIME,
            pathname: Arc::new(watch::Sender::new(pathname)),
        }
    }

    #[must_use]
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    #[must_use]
    pub fn fetch(&self) -> &AuthorizedFetch {
        &self.fetch
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub fn paths(&self) -> &ApiPaths {
        &self.paths
    }

    #[must_use]
    pub fn pathname(&self) -> String {
        self.pathname.borrow().clone()
    }

    /// Receiver observing navigation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.pathname.subscribe()
    }

    /// Change the current navigation path.
    pub fn navigate(&self, path: &str) {
        let path = self.paths.normalize(path);
        debug!(target: "route", "Navigating to {path}");
        self.pathname.send_replace(path);
    }

    /// Navigate to a resource's own location.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::MissingLink`] if the target has no `self` href.
    pub fn navigate_to_resource<'a>(&self, target: impl Into<ResourceRef<'a>>) -> Result<String, HalError> {
        let href = target.into().href()?;
        self.navigate(&href);
        Ok(self.pathname())
    }

    fn key(&self, pathname: &str) -> QueryKey {
        QueryKey::new(&self.paths.normalize(pathname))
    }

    fn fetcher(
        &self,
        href: &str,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Value, HalError>> + Send>>
    {
        let fetch = self.fetch.clone();
        let request_path = self.paths.request_path(href);
        move || Box::pin(async move { Ok(fetch.get_json(&request_path).await?.unwrap_or(Value::Null)) })
    }

    /// State from the cache, without fetching.
    #[must_use]
    pub fn state(&self) -> RouteState {
        let pathname = self.pathname();
        if !is_fetchable_path(&pathname) {
            return RouteState {
                pathname,
                ..RouteState::default()
            };
        }
        let snapshot = self.cache.snapshot(&self.key(&pathname));
        RouteState {
            is_loading: snapshot.data.is_none() && (snapshot.error.is_none() || snapshot.is_fetching),
            resource_data: snapshot.data,
            error: snapshot.error,
            pathname,
        }
    }

    /// Load the current path's resource unless a fresh copy is cached.
    pub async fn load(&self) -> RouteState {
        let pathname = self.pathname();
        if !is_fetchable_path(&pathname) {
            debug!(target: "route", "Not fetching {pathname}");
            return self.state();
        }
        let result = self.cache.fetch(&self.key(&pathname), self.stale_time, self.fetcher(&pathname)).await;
        self.state_after(pathname, result)
    }

    /// Fetch the current path's resource again regardless of staleness.
    pub async fn refetch(&self) -> RouteState {
        let pathname = self.pathname();
        if !is_fetchable_path(&pathname) {
            return self.state();
        }
        let result = self.cache.refetch(&self.key(&pathname), self.fetcher(&pathname)).await;
        self.state_after(pathname, result)
    }

    fn state_after(&self, pathname: String, result: Result<Arc<Value>, HalError>) -> RouteState {
        match result {
            Ok(data) => RouteState {
                pathname,
                resource_data: Some(data),
                is_loading: false,
                error: None,
            },
            Err(error) => RouteState {
                resource_data: self.cache.snapshot(&self.key(&pathname)).data,
                pathname,
                is_loading: false,
                error: Some(error),
            },
        }
    }

    /// Load the resource linked from the current one under `rel`.
    ///
    /// # Errors
    ///
    /// Returns the parent's load error, [`HalError::MissingLink`] if the
    /// parent has no such link, or the subresource's fetch error.
    pub async fn subresource(&self, rel: &str) -> Result<Arc<Value>, HalError> {
        let parent = self.load().await;
        if let Some(error) = parent.error {
            return Err(error);
        }
        let parent = parent.resource().transpose()?.unwrap_or_default();
        let href = parent
            .link(rel)
            .map(|link| link.href.clone())
            .filter(|href| !href.is_empty())
            .ok_or_else(|| HalError::MissingLink {
                rel: rel.to_string(),
                context: format!("resource at {}", parent_label(&self.pathname())),
            })?;
        self.cache.fetch(&self.key(&href), self.stale_time, self.fetcher(&href)).await
    }

    /// Load one page of a collection.
    ///
    /// # Errors
    ///
    /// Returns the fetch error or [`HalError::Json`] for a malformed page.
    pub async fn collection(&self, query: &CollectionQuery) -> Result<CollectionPage, HalError> {
        let href = query.href_with_params()?;
        let data = self
            .cache
            .fetch(&self.key(&href), query.stale_time(), self.fetcher(&href))
            .await?;
        CollectionPage::from_value(&data, query.collection_name())
    }
}

fn parent_label(pathname: &str) -> &str {
    if pathname.is_empty() { "/" } else { pathname }
}
