//! Authorized HTTP access to the API.
//!
//! [`AuthorizedFetch`] wraps a [`reqwest::Client`] with three behaviors every
//! caller relies on:
//!
//! 1. Relative hrefs are resolved against the configured base URL
//! 2. The current access token is injected as `Authorization: Bearer <token>`
//! 3. Non-2xx responses become [`HalError::Http`] (status, headers and a
//!    best-effort body snippet) when `throw_on_error` is set
//!
//! Transport failures map to [`HalError::Network`]. Tokens come from an
//! injected [`AccessTokenProvider`]; the engine never implements the login
//! protocol itself.
//!
//! # Examples
//!
//! ```rust,no_run
//! use klabis_hal::http::{AuthorizedFetch, StaticTokenProvider};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), klabis_hal::core::HalError> {
//! let base = reqwest::Url::parse("http://localhost:8080").unwrap();
//! let fetch = AuthorizedFetch::new(base, Arc::new(StaticTokenProvider::new(Some("token".into()))))?;
//! let member = fetch.get_json("/api/members/1").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Response, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::constants::{ACCEPT_MEDIA_TYPES, JSON_CONTENT_TYPE};
use crate::core::{HalError, HttpError};

/// Source of the current access token.
///
/// Implementations typically wrap an OIDC session; returning `Ok(None)` means
/// "not signed in" and the request goes out without an `Authorization` header.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>, HalError>;
}

/// Provider returning a fixed token.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<Option<String>, HalError> {
        Ok(self.token.clone())
    }
}

/// Per-request options.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    /// Request with a JSON body.
    #[must_use]
    pub fn json(method: Method, body: Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        Self {
            method,
            headers,
            body: Some(body),
        }
    }
}

/// HTTP client with bearer-token injection and uniform error translation.
#[derive(Clone)]
pub struct AuthorizedFetch {
    client: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl std::fmt::Debug for AuthorizedFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedFetch").field("base_url", &self.base_url.as_str()).finish()
    }
}

impl AuthorizedFetch {
    /// Client with the default request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Config`] if the HTTP client cannot be built.
    pub fn new(base_url: Url, tokens: Arc<dyn AccessTokenProvider>) -> Result<Self, HalError> {
        let timeout = Duration::from_secs(crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS);
        Ok(Self::with_client(build_client(timeout)?, base_url, tokens))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: Url, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            client,
            base_url,
            tokens,
        }
    }

    /// Client configured from a [`ClientConfig`].
    ///
    /// Without an explicit provider the config's static token is used.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparsable base URL or client build failure.
    pub fn from_config(
        config: &ClientConfig,
        tokens: Option<Arc<dyn AccessTokenProvider>>,
    ) -> Result<Self, HalError> {
        let tokens = tokens
            .unwrap_or_else(|| Arc::new(StaticTokenProvider::new(config.access_token.clone())));
        Ok(Self::with_client(
            build_client(config.request_timeout())?,
            config.parsed_base_url()?,
            tokens,
        ))
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for an href; relative hrefs are joined to the base URL.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidUrl`] when the href cannot be joined.
    pub fn resolve(&self, href: &str) -> Result<Url, HalError> {
        self.base_url.join(href).map_err(|e| HalError::InvalidUrl {
            url: href.to_string(),
            reason: e.to_string(),
        })
    }

    /// Perform a request with the bearer token attached.
    ///
    /// With `throw_on_error`, a non-2xx status is returned as [`HalError::Http`]
    /// after reading the body best-effort. Without it the response is handed
    /// back untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::Network`] on transport failure, [`HalError::Http`]
    /// as described above, or the token provider's error.
    pub async fn fetch(
        &self,
        href: &str,
        options: FetchOptions,
        throw_on_error: bool,
    ) -> Result<Response, HalError> {
        let url = self.resolve(href)?;
        let token = self.tokens.access_token().await?;

        let mut headers = options.headers;
        if !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_MEDIA_TYPES));
        }
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| HalError::Config {
                message: format!("access token is not a valid header value: {e}"),
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        debug!(target: "http", "{} {}", options.method, url);
        let mut request = self.client.request(options.method.clone(), url.clone()).headers(headers);
        if let Some(body) = &options.body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await.map_err(|e| HalError::network(url.as_str(), &e))?;
        let status = response.status();
        debug!(target: "http", "{} {} -> {}", options.method, url, status.as_u16());

        if throw_on_error && !status.is_success() {
            let headers = response.headers().clone();
            let body = match response.text().await {
                Ok(body) => Some(body),
                Err(e) => {
                    warn!(target: "http", "Could not read error body from {url}: {e}");
                    None
                }
            };
            return Err(HttpError::new(
                url.as_str(),
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                headers,
                body,
            )
            .into());
        }

        Ok(response)
    }

    /// GET an href and parse the body as JSON.
    ///
    /// An empty or non-JSON success body yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Same as [`AuthorizedFetch::fetch`] with `throw_on_error`.
    pub async fn get_json(&self, href: &str) -> Result<Option<Value>, HalError> {
        let response = self.fetch(href, FetchOptions::get(), true).await?;
        read_json(href, response).await
    }

    /// Send a JSON body and parse the JSON response, if any.
    ///
    /// # Errors
    ///
    /// Same as [`AuthorizedFetch::fetch`] with `throw_on_error`.
    pub async fn send_json(
        &self,
        method: Method,
        href: &str,
        body: Value,
    ) -> Result<Option<Value>, HalError> {
        let response = self.fetch(href, FetchOptions::json(method, body), true).await?;
        read_json(href, response).await
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, HalError> {
    reqwest::Client::builder().timeout(timeout).build().map_err(|e| HalError::Config {
        message: format!("failed to build HTTP client: {e}"),
    })
}

async fn read_json(href: &str, response: Response) -> Result<Option<Value>, HalError> {
    let bytes = response.bytes().await.map_err(|e| HalError::network(href, &e))?;
    if bytes.is_empty() {
        return Ok(None);
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            debug!(target: "http", "Response from {href} is not JSON: {e}");
            Ok(None)
        }
    }
}
