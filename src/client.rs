//! Engine assembly.
//!
//! [`HalClient`] owns the pieces every component shares (the authorized HTTP
//! client, the query cache, the path rules and the staleness windows) and
//! hands out components wired to them.
//!
//! # Examples
//!
//! ```rust,no_run
//! use klabis_hal::client::HalClient;
//! use klabis_hal::config::ClientConfig;
//! use klabis_hal::forms::{FieldRegistry, FormDisplay, FormRequest, FormRequestController};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = HalClient::from_config(&ClientConfig::default(), None)?;
//! let route = client.route("/members");
//! let controller = FormRequestController::new();
//! controller.request_form(FormRequest::modal("create"));
//!
//! let display = client.form_display(route, controller, FieldRegistry::new());
//! if let Some(form) = display.open().await? {
//!     for field in display.render(&form) {
//!         println!("{}: {}", field.label, field.value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::config::{ClientConfig, StaleTimes};
use crate::core::HalError;
use crate::forms::{FieldRegistry, FormDisplay, FormRequestController, OptionResolver, SubmissionPipeline, TargetDataResolver};
use crate::hal::ApiPaths;
use crate::http::{AccessTokenProvider, AuthorizedFetch};
use crate::query::QueryCache;
use crate::route::{CollectionQuery, RouteResource};

/// Shared client context.
#[derive(Debug, Clone)]
pub struct HalClient {
    fetch: AuthorizedFetch,
    cache: QueryCache,
    paths: ApiPaths,
    stale: StaleTimes,
}

impl HalClient {
    #[must_use]
    pub fn new(fetch: AuthorizedFetch, paths: ApiPaths) -> Self {
        Self {
            fetch,
            cache: QueryCache::new(),
            paths,
            stale: StaleTimes::default(),
        }
    }

    /// Client for a configuration; `tokens` replaces the configured static token.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid base URL or HTTP client setup failure.
    pub fn from_config(
        config: &ClientConfig,
        tokens: Option<Arc<dyn AccessTokenProvider>>,
    ) -> Result<Self, HalError> {
        config.validate()?;
        Ok(Self {
            fetch: AuthorizedFetch::from_config(config, tokens)?,
            cache: QueryCache::new(),
            paths: config.api_paths(),
            stale: config.stale.clone(),
        })
    }

    #[must_use]
    pub fn with_stale_times(mut self, stale: StaleTimes) -> Self {
        self.stale = stale;
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
    pub fn route(&self, pathname: &str) -> RouteResource {
        RouteResource::new(self.fetch.clone(), self.cache.clone(), self.paths.clone(), pathname)
            .with_stale_time(self.stale.resource())
    }

    /// Collection query over `href` with the configured collection staleness.
    #[must_use]
    pub fn collection_query(&self, href: &str) -> CollectionQuery {
        CollectionQuery::new(href).with_stale_time(self.stale.collection())
    }

    #[must_use]
    pub fn option_resolver(&self) -> OptionResolver {
        OptionResolver::new(self.fetch.clone(), self.cache.clone(), self.paths.clone())
            .with_stale_time(self.stale.options())
    }

    #[must_use]
    pub fn target_resolver(&self) -> TargetDataResolver {
        TargetDataResolver::new(self.fetch.clone(), self.cache.clone(), self.paths.clone())
            .with_stale_time(self.stale.target())
    }

    #[must_use]
    pub fn submission(&self) -> SubmissionPipeline {
        SubmissionPipeline::new(self.fetch.clone(), self.paths.clone())
    }

    /// Form display for `route` using this client's staleness windows.
    #[must_use]
    pub fn form_display(
        &self,
        route: RouteResource,
        controller: FormRequestController,
        registry: FieldRegistry,
    ) -> FormDisplay {
        FormDisplay::new(route, controller, registry)
            .with_option_resolver(self.option_resolver())
            .with_target_resolver(self.target_resolver())
    }
}
