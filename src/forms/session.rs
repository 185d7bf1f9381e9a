//! Interactive form state and the display controller.
//!
//! [`FormSession`] holds the values, touched flags and errors of one open
//! form. Errors are shown only for touched fields; blurring a field or
//! attempting submission touches it.
//!
//! [`FormDisplay`] connects the pieces for the active [`FormRequest`]:
//!
//! 1. load the route resource and look up the requested template
//! 2. resolve the target data and compute initial values
//! 3. resolve every property's options
//! 4. on submit: validate, send, then `invalidate_all` → route refetch →
//!    close the form → success callback, in that order

use futures::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::HalError;
use crate::forms::fields::{FieldProps, FieldRegistry, RenderedField};
use crate::forms::options::{OptionResolver, OptionsState};
use crate::forms::path::{FieldPath, PathSegment};
use crate::forms::request::{FormRequest, FormRequestController};
use crate::forms::submit::{SubmissionPipeline, SubmitError};
use crate::forms::target::{TargetDataResolver, TargetState};
use crate::forms::template::{ValidationRules, build_validation_rules, compute_initial_values};
use crate::hal::HalFormsTemplate;
use crate::route::RouteResource;

/// State of one open form.
#[derive(Debug, Clone)]
pub struct FormSession {
    template: HalFormsTemplate,
    rules: ValidationRules,
    values: Value,
    errors: BTreeMap<FieldPath, String>,
    touched: BTreeSet<FieldPath>,
    submit_error: Option<SubmitError>,
}

fn top_level_name(path: &FieldPath) -> Option<&str> {
    match path.segments().first() {
        Some(PathSegment::Key(name)) => Some(name),
        _ => None,
    }
}

impl FormSession {
    /// Start a session over `data`.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidTemplate`] if a property's regex is invalid.
    pub fn new(template: HalFormsTemplate, data: &Value) -> Result<Self, HalError> {
        let rules = build_validation_rules(&template)?;
        let values = compute_initial_values(&template, data);
        Ok(Self {
            template,
            rules,
            values,
            errors: BTreeMap::new(),
            touched: BTreeSet::new(),
            submit_error: None,
        })
    }

    #[must_use]
    pub fn template(&self) -> &HalFormsTemplate {
        &self.template
    }

    #[must_use]
    pub fn values(&self) -> &Value {
        &self.values
    }

    #[must_use]
    pub fn value(&self, path: &FieldPath) -> Option<&Value> {
        path.get(&self.values)
    }

    /// All recorded errors, touched or not.
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<FieldPath, String> {
        &self.errors
    }

    #[must_use]
    pub fn submit_error(&self) -> Option<&SubmitError> {
        self.submit_error.as_ref()
    }

    /// Whether `path` or one of its ancestors was touched.
    #[must_use]
    pub fn is_touched(&self, path: &FieldPath) -> bool {
        self.touched.iter().any(|touched| path.starts_with(touched))
    }

    /// Errors of touched fields.
    #[must_use]
    pub fn visible_errors(&self) -> BTreeMap<FieldPath, String> {
        self.errors
            .iter()
            .filter(|(path, _)| self.is_touched(path))
            .map(|(path, message)| (path.clone(), message.clone()))
            .collect()
    }

    fn revalidate(&mut self, name: &str) {
        let path = FieldPath::key(name);
        match self.rules.validate_field(name, &self.values) {
            Some(message) => {
                self.errors.insert(path, message.to_string());
            }
            None => {
                self.errors.remove(&path);
            }
        }
    }

    /// Change a value. A touched field is re-validated.
    ///
    /// Returns `false`, leaving the values unchanged, when `path` indexes
    /// past the end of a list.
    pub fn set_value(&mut self, path: &FieldPath, value: Value) -> bool {
        if !path.set(&mut self.values, value) {
            debug!(target: "forms", "Ignoring value for unreachable field {path}");
            return false;
        }
        self.errors.remove(path);
        if let Some(name) = top_level_name(path).map(str::to_string) {
            if self.is_touched(&FieldPath::key(&name)) || self.is_touched(path) {
                self.revalidate(&name);
            }
        }
        true
    }

    /// Mark a field touched and validate it. Returns its error, if any.
    pub fn blur(&mut self, path: &FieldPath) -> Option<&str> {
        self.touched.insert(path.clone());
        if let Some(name) = top_level_name(path).map(str::to_string) {
            self.revalidate(&name);
        }
        self.errors.get(path).map(String::as_str)
    }

    /// Touch and validate every property. Returns `true` when all pass.
    pub fn validate_all(&mut self) -> bool {
        for (name, _) in self.rules.iter() {
            self.touched.insert(FieldPath::key(name));
        }
        self.errors = self.rules.validate(&self.values);
        self.errors.is_empty()
    }

    /// Merge server-reported field messages, keyed by field path text.
    pub fn apply_server_errors(&mut self, errors: &BTreeMap<String, String>) {
        for (field, message) in errors {
            let path = field.parse().unwrap_or_else(|_| FieldPath::key(field));
            self.touched.insert(path.clone());
            self.errors.insert(path, message.clone());
        }
    }

    /// Append a blank item of `item_type` to the list at `list`. Returns its index.
    pub fn add_list_item(&mut self, list: &FieldPath, item_type: &str) -> usize {
        let mut items = list.get(&self.values).and_then(Value::as_array).cloned().unwrap_or_default();
        items.push(FieldRegistry::empty_value(item_type).unwrap_or(Value::Null));
        let index = items.len() - 1;
        let _ = list.set(&mut self.values, Value::Array(items));
        index
    }

    /// Remove item `index` of the list at `list`.
    ///
    /// Later items shift down; their errors and touched flags move with them.
    /// Returns `false` if there was no such item.
    pub fn remove_list_item(&mut self, list: &FieldPath, index: usize) -> bool {
        if list.index(index).remove(&mut self.values).is_none() {
            return false;
        }
        self.errors = std::mem::take(&mut self.errors)
            .into_iter()
            .filter_map(|(path, message)| path.after_removal(list, index).map(|p| (p, message)))
            .collect();
        self.touched = std::mem::take(&mut self.touched)
            .into_iter()
            .filter_map(|path| path.after_removal(list, index))
            .collect();
        true
    }

    /// Render every property in template order.
    #[must_use]
    pub fn render(&self, registry: &FieldRegistry, options: &BTreeMap<String, OptionsState>) -> Vec<RenderedField> {
        let errors = self.visible_errors();
        let no_options = OptionsState::default();
        self.template
            .properties
            .iter()
            .map(|property| {
                let path = FieldPath::key(&property.name);
                let value = self.values.get(&property.name).unwrap_or(&Value::Null);
                registry.render(property.type_name(), &FieldProps {
                    property,
                    path: &path,
                    value,
                    errors: &errors,
                    options: options.get(&property.name).unwrap_or(&no_options),
                })
            })
            .collect()
    }
}

/// A form opened for the active request.
#[derive(Debug, Clone)]
pub struct OpenForm {
    pub request: FormRequest,
    pub session: FormSession,
    pub target: TargetState,
    /// Resolved options by property name.
    pub options: BTreeMap<String, OptionsState>,
}

/// Result of a submission attempt that did not fail on the server side.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Sent and accepted; carries the JSON response body, if any.
    Submitted(Option<Value>),
    /// Blocked by client-side validation; nothing was sent.
    Invalid,
}

/// Called with the response body after a successful submission.
pub type SuccessCallback = Arc<dyn Fn(Option<&Value>) + Send + Sync>;

/// Opens, renders and submits the requested form for a route.
#[derive(Clone)]
pub struct FormDisplay {
    route: RouteResource,
    controller: FormRequestController,
    registry: FieldRegistry,
    options: OptionResolver,
    target: TargetDataResolver,
    pipeline: SubmissionPipeline,
    on_success: Option<SuccessCallback>,
}

impl std::fmt::Debug for FormDisplay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormDisplay")
            .field("route", &self.route.pathname())
            .field("request", &self.controller.current())
            .finish_non_exhaustive()
    }
}

impl FormDisplay {
    /// Display sharing the route's client, cache and path rules.
    #[must_use]
    pub fn new(route: RouteResource, controller: FormRequestController, registry: FieldRegistry) -> Self {
        let fetch = route.fetch().clone();
        let cache = route.cache().clone();
        let paths = route.paths().clone();
        Self {
            options: OptionResolver::new(fetch.clone(), cache.clone(), paths.clone()),
            target: TargetDataResolver::new(fetch.clone(), cache, paths.clone()),
            pipeline: SubmissionPipeline::new(fetch, paths),
            route,
            controller,
            registry,
            on_success: None,
        }
    }

    #[must_use]
    pub fn with_option_resolver(mut self, options: OptionResolver) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_target_resolver(mut self, target: TargetDataResolver) -> Self {
        self.target = target;
        self
    }

    #[must_use]
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(Option<&Value>) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn controller(&self) -> &FormRequestController {
        &self.controller
    }

    #[must_use]
    pub fn route(&self) -> &RouteResource {
        &self.route
    }

    /// Open the active form request, if any.
    ///
    /// # Errors
    ///
    /// Returns the route resource's load error when there is no data to show,
    /// [`HalError::TemplateNotFound`] for an unknown template, or
    /// [`HalError::InvalidTemplate`].
    pub async fn open(&self) -> Result<Option<OpenForm>, HalError> {
        let Some(request) = self.controller.current() else {
            return Ok(None);
        };

        let route_state = self.route.load().await;
        if let (None, Some(error)) = (&route_state.resource_data, &route_state.error) {
            return Err(error.clone());
        }
        let resource = route_state.resource().transpose()?.unwrap_or_default();
        let template = resource.template(&request.template_name)?.clone();

        let target = self
            .target
            .resolve(Some(&template), &route_state.pathname, route_state.resource_data.clone())
            .await;
        let data = target.data.as_deref().cloned().unwrap_or(Value::Null);
        let session = FormSession::new(template, &data)?;
        let options = self.resolve_options(session.template()).await;

        debug!(target: "forms", "Opened form '{}' ({:?})", request.template_name, target.phase);
        Ok(Some(OpenForm {
            request,
            session,
            target,
            options,
        }))
    }

    async fn resolve_options(&self, template: &HalFormsTemplate) -> BTreeMap<String, OptionsState> {
        let resolved = join_all(
            template
                .properties
                .iter()
                .filter(|p| p.options.is_some())
                .map(|p| async move { (p.name.clone(), self.options.resolve(p.options.as_ref()).await) }),
        )
        .await;
        resolved.into_iter().collect()
    }

    /// Re-run the target fetch and restart the session from its data.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidTemplate`] if the session cannot restart.
    pub async fn retry_target(&self, form: &mut OpenForm) -> Result<(), HalError> {
        form.target = self.target.refetch().await;
        let data = form.target.data.as_deref().cloned().unwrap_or(Value::Null);
        form.session = FormSession::new(form.session.template().clone(), &data)?;
        Ok(())
    }

    #[must_use]
    pub fn render(&self, form: &OpenForm) -> Vec<RenderedField> {
        form.session.render(&self.registry, &form.options)
    }

    /// Validate and submit the form.
    ///
    /// On success the cache is invalidated, the route resource refetched,
    /// the form closed and the success callback run, strictly in that order.
    /// On failure nothing is invalidated and the error is recorded on the
    /// session; server field errors are merged into its field errors.
    ///
    /// # Errors
    ///
    /// Returns the classified [`SubmitError`].
    pub async fn submit(&self, form: &mut OpenForm) -> Result<SubmitOutcome, SubmitError> {
        if !form.session.validate_all() {
            debug!(target: "forms", "Submission blocked by {} field error(s)", form.session.errors.len());
            return Ok(SubmitOutcome::Invalid);
        }
        form.session.submit_error = None;

        let pathname = self.route.pathname();
        let result = self.pipeline.submit(form.session.template(), &pathname, form.session.values()).await;

        match result {
            Ok(body) => {
                let invalidated = self.route.cache().invalidate_all();
                debug!(target: "forms", "Invalidated {invalidated} cached queries after submit");
                self.route.refetch().await;
                self.controller.close_form();
                if let Some(callback) = &self.on_success {
                    callback(body.as_ref());
                }
                info!(target: "forms", "Form '{}' submitted", form.request.template_name);
                Ok(SubmitOutcome::Submitted(body))
            }
            Err(error) => {
                if let Some(errors) = error.field_errors() {
                    form.session.apply_server_errors(errors);
                }
                form.session.submit_error = Some(error.clone());
                Err(error)
            }
        }
    }
}
