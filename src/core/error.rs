//! Error handling for the HAL-FORMS client
//!
//! This module provides the error types shared by every layer of the engine and
//! the user-friendly reporting used at the command-line boundary. The error
//! system is designed around two core principles:
//! 1. **Strongly-typed errors** so callers can discriminate by status or payload
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`HalError`] - Enumerated error types for all failure cases
//! - [`HttpError`] - Non-2xx response details (status, headers, body snippet)
//! - [`ValidationProblem`] - Field-level messages parsed from a problem response
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Transport**: [`HalError::Network`] for DNS, refused connections, timeouts
//! - **HTTP**: [`HalError::Http`] for any non-2xx status
//! - **Validation**: [`HalError::Validation`] for `application/problem+json`
//!   bodies carrying an `errors` map
//! - **Hypermedia**: [`HalError::MissingLink`], [`HalError::TemplateNotFound`],
//!   [`HalError::InvalidTemplate`]
//! - **Local**: [`HalError::Config`], [`HalError::Json`], [`HalError::Io`]
//!
//! Lower layers return these errors; the option, target-data and submission
//! layers fold them into state structs so they never reach rendering code as
//! failures.
//!
//! # Examples
//!
//! ```rust,no_run
//! use klabis_hal::core::{HalError, user_friendly_error};
//!
//! let error = HalError::MissingLink {
//!     rel: "self".to_string(),
//!     context: "member resource".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // colored error with suggestion
//! ```

use colored::Colorize;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::constants::PROBLEM_JSON_CONTENT_TYPE;

/// Maximum number of characters of a response body kept on an [`HttpError`].
const BODY_SNIPPET_LIMIT: usize = 2048;

/// The main error type for the HAL-FORMS client.
///
/// `HalError` is `Clone` so a single failed request stored in the query cache
/// can be handed to every caller that was waiting on it. Variants wrapping
/// foreign errors that are not `Clone` degrade to [`HalError::Other`] when
/// cloned.
#[derive(Error, Debug)]
pub enum HalError {
    /// Transport-level failure before any HTTP status was received
    ///
    /// Covers DNS failures, refused connections, TLS problems and client-side
    /// timeouts. Retrying the same operation is the expected recovery.
    #[error("Request to {url} failed: {reason}")]
    Network {
        /// URL that was being requested
        url: String,
        /// Transport error description
        reason: String,
    },

    /// The server answered with a non-2xx status
    #[error(transparent)]
    Http(HttpError),

    /// The server rejected submitted values with field-level messages
    #[error("{0}")]
    Validation(ValidationProblem),

    /// A link relation the caller depends on is absent from the resource
    #[error("Link '{rel}' not found in {context}")]
    MissingLink {
        /// The missing relation name (e.g. `self`)
        rel: String,
        /// Description of where the link was expected
        context: String,
    },

    /// The resource has no `_templates` entry with this name
    #[error("Form template '{name}' not found")]
    TemplateNotFound {
        /// Requested template name
        name: String,
    },

    /// A template property cannot be interpreted
    #[error("Invalid form template '{template}': {reason}")]
    InvalidTemplate {
        /// Template or property identifier
        template: String,
        /// Why interpretation failed
        reason: String,
    },

    /// A URL or href could not be parsed or joined to the base URL
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// Client configuration is unusable
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// JSON serialization or parsing failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for HalError {
    fn clone(&self) -> Self {
        match self {
            Self::Network {
                url,
                reason,
            } => Self::Network {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::Http(e) => Self::Http(e.clone()),
            Self::Validation(p) => Self::Validation(p.clone()),
            Self::MissingLink {
                rel,
                context,
            } => Self::MissingLink {
                rel: rel.clone(),
                context: context.clone(),
            },
            Self::TemplateNotFound {
                name,
            } => Self::TemplateNotFound {
                name: name.clone(),
            },
            Self::InvalidTemplate {
                template,
                reason,
            } => Self::InvalidTemplate {
                template: template.clone(),
                reason: reason.clone(),
            },
            Self::InvalidUrl {
                url,
                reason,
            } => Self::InvalidUrl {
                url: url.clone(),
                reason: reason.clone(),
            },
            Self::Config {
                message,
            } => Self::Config {
                message: message.clone(),
            },
            // serde_json::Error is not Clone
            Self::Json(e) => Self::Other {
                message: format!("JSON error: {e}"),
            },
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

impl From<HttpError> for HalError {
    fn from(error: HttpError) -> Self {
        Self::Http(error)
    }
}

impl HalError {
    /// HTTP status carried by this error, if it came from a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => Some(e.status),
            Self::Validation(p) => Some(p.status),
            _ => None,
        }
    }

    /// Whether the error carries one of the given HTTP statuses.
    #[must_use]
    pub fn is_status(&self, codes: &[u16]) -> bool {
        self.status().is_some_and(|s| codes.contains(&s))
    }

    /// Re-classify an HTTP failure by payload shape.
    ///
    /// An [`HalError::Http`] whose body is a problem document with an `errors`
    /// object becomes [`HalError::Validation`]; everything else is returned
    /// unchanged. The status code alone never decides.
    #[must_use]
    pub fn classify(self) -> Self {
        match self {
            Self::Http(http) => match ValidationProblem::from_http(&http) {
                Some(problem) => Self::Validation(problem),
                None => Self::Http(http),
            },
            other => other,
        }
    }

    pub(crate) fn network(url: impl Into<String>, error: &reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            reason: error.to_string(),
        }
    }
}

/// Details of a non-2xx HTTP response.
///
/// The body is read best-effort and truncated; a failure to read it leaves
/// `body` empty rather than replacing the HTTP error.
#[derive(Debug, Clone)]
pub struct HttpError {
    /// Requested URL
    pub url: String,
    /// Numeric status code
    pub status: u16,
    /// Canonical reason phrase for the status
    pub status_text: String,
    /// Response headers, kept for downstream discrimination
    pub headers: HeaderMap,
    /// Response body snippet, when one could be read
    pub body: Option<String>,
}

impl HttpError {
    /// Build an error, truncating the body to a bounded snippet.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        status: u16,
        status_text: impl Into<String>,
        headers: HeaderMap,
        body: Option<String>,
    ) -> Self {
        let body = body.filter(|b| !b.is_empty()).map(|b| truncate_chars(b, BODY_SNIPPET_LIMIT));
        Self {
            url: url.into(),
            status,
            status_text: status_text.into(),
            headers,
            body,
        }
    }

    /// Media type of the response without parameters, lowercased.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
    }

    /// Parse the body snippet as JSON.
    #[must_use]
    pub fn body_json(&self) -> Option<Value> {
        self.body.as_deref().and_then(|b| serde_json::from_str(b).ok())
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(body) => write!(f, "HTTP {}: {}", self.status, body),
            None => write!(f, "HTTP {}: {}", self.status, self.status_text),
        }
    }
}

impl std::error::Error for HttpError {}

/// Field-level validation failure reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationProblem {
    /// HTTP status of the response (usually 400, but not relied upon)
    pub status: u16,
    /// Problem `title` or `detail`, when present
    pub title: Option<String>,
    /// Field name to message
    pub errors: BTreeMap<String, String>,
}

impl ValidationProblem {
    /// Extract a validation problem from an HTTP error.
    ///
    /// Returns `None` unless the response is `application/problem+json` and
    /// its body has an object under `errors`.
    #[must_use]
    pub fn from_http(error: &HttpError) -> Option<Self> {
        if error.content_type().as_deref() != Some(PROBLEM_JSON_CONTENT_TYPE) {
            return None;
        }
        let body = error.body_json()?;
        let errors = body.get("errors")?.as_object()?;

        let errors = errors
            .iter()
            .map(|(field, message)| (field.clone(), message_text(message)))
            .collect();
        let title = body
            .get("detail")
            .or_else(|| body.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            status: error.status,
            title,
            errors,
        })
    }
}

impl fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.title {
            Some(title) => write!(f, "Validation failed: {title}")?,
            None => write!(f, "Validation failed")?,
        }
        if !self.errors.is_empty() {
            let fields: Vec<&str> = self.errors.keys().map(String::as_str).collect();
            write!(f, " ({})", fields.join(", "))?;
        }
        Ok(())
    }
}

fn message_text(message: &Value) -> String {
    match message {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            items.iter().map(message_text).collect::<Vec<_>>().join("; ")
        }
        other => other.to_string(),
    }
}

fn truncate_chars(text: String, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text,
    }
}

/// Error wrapper carrying user-facing suggestion and details.
///
/// # Examples
///
/// ```rust,no_run
/// use klabis_hal::core::{ErrorContext, HalError};
///
/// let context = ErrorContext::new(HalError::TemplateNotFound { name: "edit".into() })
///     .with_suggestion("Run `klabis show <path>` to list available templates")
///     .with_details("Templates are advertised under _templates");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: HalError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a context with no suggestion or details.
    #[must_use]
    pub const fn new(error: HalError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion (shown in green).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details (shown in yellow).
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error, details and suggestion to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions.
///
/// Recognizes [`HalError`], [`reqwest::Error`], [`toml::de::Error`] and
/// [`std::io::Error`] anywhere in the chain; anything else is reported with its
/// full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(hal_error) = cause.downcast_ref::<HalError>() {
            return create_error_context(hal_error.clone());
        }

        if let Some(http_error) = cause.downcast_ref::<reqwest::Error>() {
            let url = http_error.url().map(ToString::to_string).unwrap_or_default();
            return create_error_context(HalError::network(url, http_error));
        }

        if let Some(toml_error) = cause.downcast_ref::<toml::de::Error>() {
            return ErrorContext::new(HalError::Config {
                message: toml_error.to_string(),
            })
            .with_suggestion("Check the TOML syntax of your config file. Verify quotes and table headers")
            .with_details(chain_message(&error));
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::PermissionDenied {
            return ErrorContext::new(HalError::Io(std::io::Error::new(
                io_error.kind(),
                io_error.to_string(),
            )))
            .with_suggestion("Check the ownership and permissions of the config file");
        }
    }

    ErrorContext::new(HalError::Other {
        message: chain_message(&error),
    })
}

fn chain_message(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

fn create_error_context(error: HalError) -> ErrorContext {
    match &error {
        HalError::Network { .. } => ErrorContext::new(error)
            .with_suggestion("Check that the API is reachable and the base URL is correct, then retry")
            .with_details("No HTTP response was received"),

        HalError::Http(http) => {
            let suggestion = match http.status {
                401 => "The access token is missing or expired. Pass a fresh one with --token",
                403 => "The current user is not allowed to access this resource",
                404 => "Check the path. Navigation paths do not include the API prefix",
                405 => "The endpoint does not support this method",
                500..=599 => "The server failed. Retry later or check the server logs",
                _ => "Inspect the response body above for details",
            };
            ErrorContext::new(error.clone()).with_suggestion(suggestion)
        }

        HalError::Validation(problem) => {
            let details = problem
                .errors
                .iter()
                .map(|(field, message)| format!("{field}: {message}"))
                .collect::<Vec<_>>()
                .join("\n");
            ErrorContext::new(error.clone())
                .with_details(details)
                .with_suggestion("Correct the listed fields and submit again")
        }

        HalError::MissingLink { rel, .. } => {
            let suggestion = format!("The resource does not advertise a '{rel}' link; it cannot be navigated to");
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        HalError::TemplateNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run `klabis show <path>` to list the templates the resource offers"),

        HalError::Config { .. } => ErrorContext::new(error)
            .with_suggestion("Check ~/.klabis/config.toml or the file passed with --config"),

        _ => ErrorContext::new(error),
    }
}
