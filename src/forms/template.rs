//! Form template interpretation: initial values and validation rules.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::core::HalError;
use crate::forms::options::scalar_text;
use crate::forms::path::FieldPath;
use crate::hal::{HalFormsProperty, HalFormsTemplate};

pub const REQUIRED_MESSAGE: &str = "This field is required";
pub const NUMBER_MESSAGE: &str = "Must be a number";
pub const EMAIL_MESSAGE: &str = "Invalid email address";
pub const PATTERN_MESSAGE: &str = "Invalid format";
pub const LIST_MESSAGE: &str = "Must be a list";

/// Starting form values for a template over the target resource's data.
///
/// `multiple` properties take the array at `data[name]` or `[]`. Other
/// properties take `data[name]` unless it is missing or null, then the
/// property's own non-empty `value`, then `""`.
#[must_use]
pub fn compute_initial_values(template: &HalFormsTemplate, data: &Value) -> Value {
    let mut values = Map::new();
    for property in &template.properties {
        let current = data.get(&property.name);
        let initial = if property.multiple {
            match current {
                Some(Value::Array(items)) => Value::Array(items.clone()),
                _ => Value::Array(Vec::new()),
            }
        } else {
            match current {
                Some(value) if !value.is_null() => value.clone(),
                _ => property
                    .value
                    .clone()
                    .filter(|v| !v.is_null() && v.as_str() != Some(""))
                    .unwrap_or_else(|| Value::String(String::new())),
            }
        };
        values.insert(property.name.clone(), initial);
    }
    Value::Object(values)
}

/// Value category a rule checks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Text,
    Number,
    Email,
    List,
}

/// Checks for one property.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub kind: RuleKind,
    pub required: bool,
    pub pattern: Option<Regex>,
}

impl FieldRule {
    /// Rule for a property; `multiple` wins over the declared type.
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidTemplate`] if `regex` does not compile.
    pub fn from_property(property: &HalFormsProperty) -> Result<Self, HalError> {
        let kind = if property.multiple {
            RuleKind::List
        } else {
            match property.type_name() {
                "number" => RuleKind::Number,
                "email" => RuleKind::Email,
                _ => RuleKind::Text,
            }
        };

        let pattern = match property.regex.as_deref().filter(|r| !r.is_empty()) {
            Some(source) => Some(Regex::new(source).map_err(|e| HalError::InvalidTemplate {
                template: property.name.clone(),
                reason: format!("invalid regex '{source}': {e}"),
            })?),
            None => None,
        };

        Ok(Self {
            kind,
            required: property.required,
            pattern,
        })
    }

    /// Error message for `value`, or `None` when it passes.
    ///
    /// An empty value only fails the required check.
    #[must_use]
    pub fn check(&self, value: Option<&Value>) -> Option<&'static str> {
        let value = value.unwrap_or(&Value::Null);

        if self.kind == RuleKind::List {
            return match value {
                Value::Array(items) if self.required && items.is_empty() => Some(REQUIRED_MESSAGE),
                Value::Array(_) => None,
                Value::Null if self.required => Some(REQUIRED_MESSAGE),
                Value::Null => None,
                _ => Some(LIST_MESSAGE),
            };
        }

        if is_empty(value) {
            return self.required.then_some(REQUIRED_MESSAGE);
        }

        match self.kind {
            RuleKind::Number if !is_number(value) => return Some(NUMBER_MESSAGE),
            RuleKind::Email if !is_email(&scalar_text(value)) => return Some(EMAIL_MESSAGE),
            _ => {}
        }

        match &self.pattern {
            Some(pattern) if !value.is_object() && !pattern.is_match(&scalar_text(value)) => {
                Some(PATTERN_MESSAGE)
            }
            _ => None,
        }
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn is_number(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

fn is_email(text: &str) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }
    match text.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Rules for every property of a template, in template order.
#[derive(Debug, Clone, Default)]
pub struct ValidationRules {
    rules: Vec<(String, FieldRule)>,
}

impl ValidationRules {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|(n, _)| n == name).map(|(_, rule)| rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Validate one top-level property against the form values.
    #[must_use]
    pub fn validate_field(&self, name: &str, values: &Value) -> Option<&'static str> {
        self.get(name)?.check(values.get(name))
    }

    /// Validate every property; the map holds only failing fields.
    #[must_use]
    pub fn validate(&self, values: &Value) -> BTreeMap<FieldPath, String> {
        self.rules
            .iter()
            .filter_map(|(name, rule)| {
                rule.check(values.get(name)).map(|message| (FieldPath::key(name), message.to_string()))
            })
            .collect()
    }
}

/// Compile the validation rules of a template.
///
/// # Errors
///
/// Returns [`HalError::InvalidTemplate`] for an uncompilable `regex`.
pub fn build_validation_rules(template: &HalFormsTemplate) -> Result<ValidationRules, HalError> {
    let rules = template
        .properties
        .iter()
        .map(|property| Ok((property.name.clone(), FieldRule::from_property(property)?)))
        .collect::<Result<Vec<_>, HalError>>()?;
    Ok(ValidationRules {
        rules,
    })
}
