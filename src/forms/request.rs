//! Which form is currently requested.
//!
//! At most one [`FormRequest`] is active; a new request replaces the old one.
//! Requests come from two places: a `?form=<template>` query parameter
//! ([`FormOrigin::Url`], shown inline) and explicit calls such as a button
//! press ([`FormOrigin::Programmatic`], usually modal). Removing the query
//! parameter only closes a URL-originated form.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// How a form request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOrigin {
    Url,
    Programmatic,
}

/// A request to display a template's form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormRequest {
    pub template_name: String,
    pub modal: bool,
    /// Name of a caller-defined layout, if any.
    pub custom_layout: Option<String>,
    pub origin: FormOrigin,
}

impl FormRequest {
    /// Programmatic modal request.
    pub fn modal(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            modal: true,
            custom_layout: None,
            origin: FormOrigin::Programmatic,
        }
    }

    /// Programmatic inline request.
    pub fn inline(template_name: impl Into<String>) -> Self {
        Self {
            modal: false,
            ..Self::modal(template_name)
        }
    }

    /// Inline request taken from the `form` query parameter.
    pub fn from_url(template_name: impl Into<String>) -> Self {
        Self {
            origin: FormOrigin::Url,
            ..Self::inline(template_name)
        }
    }

    #[must_use]
    pub fn with_layout(mut self, layout: impl Into<String>) -> Self {
        self.custom_layout = Some(layout.into());
        self
    }
}

/// Holds the active form request and notifies subscribers of changes.
#[derive(Debug, Clone)]
pub struct FormRequestController {
    current: Arc<watch::Sender<Option<FormRequest>>>,
}

impl Default for FormRequestController {
    fn default() -> Self {
        Self::new()
    }
}

impl FormRequestController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Arc::new(watch::Sender::new(None)),
        }
    }

    /// Make `request` the active one.
    pub fn request_form(&self, request: FormRequest) {
        debug!(target: "forms", "Form '{}' requested ({:?})", request.template_name, request.origin);
        self.current.send_replace(Some(request));
    }

    /// Close whatever form is active.
    pub fn close_form(&self) {
        if self.current.send_replace(None).is_some() {
            debug!(target: "forms", "Form closed");
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<FormRequest> {
        self.current.borrow().clone()
    }

    /// Receiver that observes every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<FormRequest>> {
        self.current.subscribe()
    }

    /// Apply the `form` query parameter of the current URL.
    ///
    /// A non-empty value opens that template inline. No value closes the
    /// active form only if it came from the URL.
    pub fn sync_url_form(&self, form_param: Option<&str>) {
        match form_param.filter(|name| !name.is_empty()) {
            Some(name) => {
                let request = FormRequest::from_url(name);
                self.current.send_if_modified(|current| {
                    if current.as_ref() == Some(&request) {
                        false
                    } else {
                        *current = Some(request);
                        true
                    }
                });
            }
            None => {
                self.current.send_if_modified(|current| {
                    if current.as_ref().is_some_and(|r| r.origin == FormOrigin::Url) {
                        *current = None;
                        true
                    } else {
                        false
                    }
                });
            }
        }
    }
}
