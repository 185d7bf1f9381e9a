//! Form submission.
//!
//! [`SubmissionPipeline`] sends form values to a template's target and
//! classifies failures. The follow-up work after a success (invalidating
//! the cache, refetching the route resource, closing the form) belongs to
//! [`crate::forms::FormDisplay::submit`], which owns those collaborators.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::{HalError, HttpError, ValidationProblem};
use crate::hal::{ApiPaths, HalFormsTemplate};
use crate::http::AuthorizedFetch;

/// Why a submission failed.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    /// Server rejected individual fields.
    #[error("{0}")]
    Validation(ValidationProblem),

    /// Any other non-2xx response.
    #[error("{0}")]
    Http(HttpError),

    #[error("Network error contacting {url}: {reason}")]
    Network { url: String, reason: String },

    #[error(transparent)]
    Other(HalError),
}

impl SubmitError {
    /// Field messages of a validation failure.
    #[must_use]
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Self::Validation(problem) => Some(&problem.errors),
            _ => None,
        }
    }
}

impl From<HalError> for SubmitError {
    fn from(error: HalError) -> Self {
        match error.classify() {
            HalError::Validation(problem) => Self::Validation(problem),
            HalError::Http(http) => Self::Http(http),
            HalError::Network {
                url,
                reason,
            } => Self::Network {
                url,
                reason,
            },
            other => Self::Other(other),
        }
    }
}

impl From<SubmitError> for HalError {
    fn from(error: SubmitError) -> Self {
        match error {
            SubmitError::Validation(problem) => Self::Validation(problem),
            SubmitError::Http(http) => Self::Http(http),
            SubmitError::Network {
                url,
                reason,
            } => Self::Network {
                url,
                reason,
            },
            SubmitError::Other(error) => error,
        }
    }
}

/// Sends form values with the template's method.
#[derive(Debug, Clone)]
pub struct SubmissionPipeline {
    fetch: AuthorizedFetch,
    paths: ApiPaths,
}

impl SubmissionPipeline {
    #[must_use]
    pub fn new(fetch: AuthorizedFetch, paths: ApiPaths) -> Self {
        Self {
            fetch,
            paths,
        }
    }

    /// Where a template submits: its target, else the route's resource.
    #[must_use]
    pub fn submit_path(&self, template: &HalFormsTemplate, route_path: &str) -> String {
        self.paths.request_path(template.target().unwrap_or(route_path))
    }

    /// Submit `values` as JSON. Returns the response body, if it was JSON.
    ///
    /// # Errors
    ///
    /// Returns a classified [`SubmitError`]; problem documents with field
    /// errors become [`SubmitError::Validation`] whatever their status.
    pub async fn submit(
        &self,
        template: &HalFormsTemplate,
        route_path: &str,
        values: &Value,
    ) -> Result<Option<Value>, SubmitError> {
        let method = template.http_method()?;
        let path = self.submit_path(template, route_path);
        debug!(target: "forms", "Submitting {method} {path}");

        let response = self.fetch.send_json(method.clone(), &path, values.clone()).await?;
        info!(target: "forms", "Submitted {method} {path}");
        Ok(response)
    }
}
