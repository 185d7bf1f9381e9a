//! Field renderer registry.
//!
//! Turns a form property into a [`RenderedField`]: a presentation-neutral
//! description of the widget, its current value, resolved options and
//! visible error. Caller-supplied factories are consulted first, in the
//! order they were added, then the built-in types:
//!
//! | Type | Kind |
//! |------|------|
//! | `text` (default) | text input; `select` with options, `checkboxGroup` with options and `multiple` |
//! | `email`, `number`, `date`, `datetime`, `url`, `tel` | typed inputs |
//! | `textarea`, `checkbox`, `boolean` | single-value widgets |
//! | `select`, `radioGroup`, `checkboxGroup` | choice widgets |
//! | `address`, `contact`, `identityDocument` | composite groups |
//! | `guardians` | list of composite groups |
//!
//! The API's DTO names (`AddressApiDto`, `ContactApiDto`,
//! `IdentityCardApiDto`, `LegalGuardians`) are accepted as aliases.
//!
//! Composite sub-fields go back through the same registry, so a custom
//! factory for `email` also renders the email inside a contact group.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::forms::options::{OptionsState, SelectOption};
use crate::forms::path::FieldPath;
use crate::hal::HalFormsProperty;

/// What kind of widget a field is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Number,
    Date,
    DateTime,
    Url,
    Tel,
    TextArea,
    Checkbox,
    Boolean,
    Select,
    RadioGroup,
    CheckboxGroup,
    /// Named group of sub-fields.
    Composite(String),
    /// Repeatable composite; `children` holds one [`FieldKind::Group`] per item.
    CompositeList(String),
    /// One item of a composite list.
    Group,
    /// Custom widget produced by a caller factory.
    Custom(String),
    /// No renderer knows this type; shown as a diagnostic.
    Unknown(String),
}

/// Renderer input for one field.
#[derive(Debug, Clone, Copy)]
pub struct FieldProps<'a> {
    pub property: &'a HalFormsProperty,
    pub path: &'a FieldPath,
    pub value: &'a Value,
    /// Errors visible to the user, keyed by field path.
    pub errors: &'a BTreeMap<FieldPath, String>,
    pub options: &'a OptionsState,
}

impl FieldProps<'_> {
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.errors.get(self.path).cloned()
    }
}

/// Presentation-neutral description of a field.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedField {
    pub path: FieldPath,
    pub label: String,
    pub kind: FieldKind,
    pub value: Value,
    pub required: bool,
    pub read_only: bool,
    pub multiple: bool,
    pub options: Vec<SelectOption>,
    pub options_loading: bool,
    pub error: Option<String>,
    pub children: Vec<RenderedField>,
}

impl RenderedField {
    /// Field of `kind` filled from `props`.
    #[must_use]
    pub fn from_props(kind: FieldKind, props: &FieldProps<'_>) -> Self {
        Self {
            path: props.path.clone(),
            label: props.property.label().to_string(),
            kind,
            value: props.value.clone(),
            required: props.property.required,
            read_only: props.property.read_only,
            multiple: props.property.multiple,
            options: props.options.options.clone(),
            options_loading: props.options.is_loading,
            error: props.error(),
            children: Vec::new(),
        }
    }

    /// This field and all descendants, depth first.
    pub fn walk(&self) -> Box<dyn Iterator<Item = &RenderedField> + '_> {
        Box::new(std::iter::once(self).chain(self.children.iter().flat_map(RenderedField::walk)))
    }
}

/// Caller-supplied renderer. Returns `None` to defer to later factories and
/// the built-ins.
pub type FieldFactory = Arc<dyn Fn(&str, &FieldProps<'_>) -> Option<RenderedField> + Send + Sync>;

struct SubField {
    key: &'static str,
    label: &'static str,
    field_type: &'static str,
}

struct Composite {
    name: &'static str,
    aliases: &'static [&'static str],
    fields: &'static [SubField],
    list: bool,
}

const fn sub(key: &'static str, label: &'static str, field_type: &'static str) -> SubField {
    SubField {
        key,
        label,
        field_type,
    }
}

const COMPOSITES: &[Composite] = &[
    Composite {
        name: "address",
        aliases: &["AddressApiDto"],
        fields: &[
            sub("streetAndNumber", "Street and number", "text"),
            sub("city", "City", "text"),
            sub("postalCode", "Postal code", "text"),
            sub("country", "Country", "text"),
        ],
        list: false,
    },
    Composite {
        name: "contact",
        aliases: &["ContactApiDto"],
        fields: &[sub("email", "Email", "email"), sub("phone", "Phone", "tel"), sub("note", "Note", "text")],
        list: false,
    },
    Composite {
        name: "identityDocument",
        aliases: &["IdentityCardApiDto"],
        fields: &[sub("number", "Number", "text"), sub("expiryDate", "Expiry date", "date")],
        list: false,
    },
    Composite {
        name: "guardians",
        aliases: &["LegalGuardians"],
        fields: &[
            sub("firstName", "First name", "text"),
            sub("lastName", "Last name", "text"),
            sub("contact", "Contact", "contact"),
            sub("note", "Note", "text"),
        ],
        list: true,
    },
];

fn composite(field_type: &str) -> Option<&'static Composite> {
    COMPOSITES.iter().find(|c| c.name == field_type || c.aliases.contains(&field_type))
}

fn builtin_kind(field_type: &str, property: &HalFormsProperty) -> Option<FieldKind> {
    let has_options = property.options.is_some();
    let kind = match field_type {
        "text" if has_options && property.multiple => FieldKind::CheckboxGroup,
        "text" if has_options => FieldKind::Select,
        "text" => FieldKind::Text,
        "email" => FieldKind::Email,
        "number" => FieldKind::Number,
        "date" => FieldKind::Date,
        "datetime" | "datetime-local" => FieldKind::DateTime,
        "url" => FieldKind::Url,
        "tel" => FieldKind::Tel,
        "textarea" => FieldKind::TextArea,
        "checkbox" => FieldKind::Checkbox,
        "boolean" => FieldKind::Boolean,
        "select" => FieldKind::Select,
        "radio" | "radioGroup" => FieldKind::RadioGroup,
        "checkboxGroup" => FieldKind::CheckboxGroup,
        _ => return None,
    };
    Some(kind)
}

/// Ordered set of field renderers.
#[derive(Clone, Default)]
pub struct FieldRegistry {
    factories: Vec<FieldFactory>,
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry").field("factories", &self.factories.len()).finish()
    }
}

impl FieldRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory consulted after those already added and before the built-ins.
    #[must_use]
    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&str, &FieldProps<'_>) -> Option<RenderedField> + Send + Sync + 'static,
    {
        self.factories.push(Arc::new(factory));
        self
    }

    /// Render `field_type`, or `None` when nothing handles it.
    #[must_use]
    pub fn resolve(&self, field_type: &str, props: &FieldProps<'_>) -> Option<RenderedField> {
        if let Some(field) = self.factories.iter().find_map(|factory| factory(field_type, props)) {
            return Some(field);
        }
        if let Some(kind) = builtin_kind(field_type, props.property) {
            return Some(RenderedField::from_props(kind, props));
        }
        composite(field_type).map(|definition| self.render_composite(field_type, definition, props))
    }

    /// Render `field_type`, falling back to a [`FieldKind::Unknown`] diagnostic.
    #[must_use]
    pub fn render(&self, field_type: &str, props: &FieldProps<'_>) -> RenderedField {
        self.resolve(field_type, props).unwrap_or_else(|| {
            tracing::warn!(target: "forms", "No renderer for field type '{field_type}' ({})", props.path);
            RenderedField::from_props(FieldKind::Unknown(field_type.to_string()), props)
        })
    }

    /// Whether `field_type` is a repeatable composite.
    #[must_use]
    pub fn is_list(field_type: &str) -> bool {
        composite(field_type).is_some_and(|c| c.list)
    }

    /// Blank value for a composite (for a list, one blank item).
    #[must_use]
    pub fn empty_value(field_type: &str) -> Option<Value> {
        let definition = composite(field_type)?;
        let mut item = Map::new();
        for field in definition.fields {
            let value = match composite(field.field_type) {
                Some(nested) if !nested.list => Self::empty_value(nested.name).unwrap_or(Value::Null),
                Some(_) => Value::Array(Vec::new()),
                None => Value::String(String::new()),
            };
            item.insert(field.key.to_string(), value);
        }
        Some(Value::Object(item))
    }

    fn render_composite(
        &self,
        field_type: &str,
        definition: &Composite,
        props: &FieldProps<'_>,
    ) -> RenderedField {
        if definition.list {
            let items = props.value.as_array().map_or(&[][..], Vec::as_slice);
            let children = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let item_path = props.path.index(index);
                    let mut group = RenderedField::from_props(FieldKind::Group, &FieldProps {
                        path: &item_path,
                        value: item,
                        ..*props
                    });
                    group.label = format!("{} {}", props.property.label(), index + 1);
                    group.options.clear();
                    group.children = self.render_sub_fields(definition, props, &item_path, item);
                    group
                })
                .collect();

            let mut field =
                RenderedField::from_props(FieldKind::CompositeList(field_type.to_string()), props);
            field.options.clear();
            field.children = children;
            return field;
        }

        let mut field = RenderedField::from_props(FieldKind::Composite(field_type.to_string()), props);
        field.options.clear();
        field.children = self.render_sub_fields(definition, props, props.path, props.value);
        field
    }

    fn render_sub_fields(
        &self,
        definition: &Composite,
        parent: &FieldProps<'_>,
        base: &FieldPath,
        value: &Value,
    ) -> Vec<RenderedField> {
        let no_options = OptionsState::default();
        definition
            .fields
            .iter()
            .map(|field| {
                let property = HalFormsProperty {
                    name: field.key.to_string(),
                    prompt: Some(field.label.to_string()),
                    field_type: Some(field.field_type.to_string()),
                    read_only: parent.property.read_only,
                    ..HalFormsProperty::default()
                };
                let path = base.child(field.key);
                let sub_value = value.get(field.key).unwrap_or(&Value::Null);
                self.render(field.field_type, &FieldProps {
                    property: &property,
                    path: &path,
                    value: sub_value,
                    errors: parent.errors,
                    options: &no_options,
                })
            })
            .collect()
    }
}
