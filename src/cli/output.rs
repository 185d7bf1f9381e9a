//! Terminal formatting shared by commands.

use colored::Colorize;
use serde_json::Value;

use crate::forms::{FieldKind, RenderedField, SelectOption};
use crate::route::CollectionPage;

/// One-line rendering of a JSON value.
pub(super) fn format_scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".dimmed().to_string(),
        Value::String(s) if s.is_empty() => "\"\"".dimmed().to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind_name(kind: &FieldKind) -> String {
    match kind {
        FieldKind::Composite(name) | FieldKind::CompositeList(name) | FieldKind::Custom(name) => name.clone(),
        FieldKind::Unknown(name) => format!("{name}?"),
        other => format!("{other:?}").to_ascii_lowercase(),
    }
}

fn format_options(options: &[SelectOption]) -> String {
    options
        .iter()
        .map(|o| if o.label == o.value { o.value.clone() } else { format!("{}={}", o.value, o.label) })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Print fields as an indented tree.
pub(super) fn print_fields(fields: &[RenderedField], depth: usize) {
    let indent = "  ".repeat(depth + 1);
    for field in fields {
        let marker = if field.required { "*".red().to_string() } else { String::new() };
        let mut line = format!("{indent}{}{marker} [{}] {}", field.label.bold(), kind_name(&field.kind), field.path);
        if field.read_only {
            line.push_str(&format!(" {}", "(read-only)".dimmed()));
        }
        if field.children.is_empty() {
            line.push_str(&format!(" = {}", format_scalar(&field.value)));
        }
        println!("{line}");

        if field.options_loading {
            println!("{indent}  {}", "options loading…".dimmed());
        } else if !field.options.is_empty() {
            println!("{indent}  options: {}", format_options(&field.options));
        }
        if let Some(error) = &field.error {
            println!("{indent}  {} {}", "✗".red(), error.red());
        }
        print_fields(&field.children, depth + 1);
    }
}

/// Print collection rows with their page position.
pub(super) fn print_page(page: &CollectionPage) {
    if page.rows.is_empty() {
        println!("{}", "No rows.".yellow());
    }
    for (i, row) in page.rows.iter().enumerate() {
        let summary = row
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter(|(k, v)| !k.starts_with('_') && !v.is_object() && !v.is_array())
                    .map(|(k, v)| format!("{}={}", k.cyan(), format_scalar(v)))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_else(|| format_scalar(row));
        println!("{:>3}. {summary}", i + 1);
    }
    if let Some(meta) = &page.page {
        let more = match (meta.has_previous(), meta.has_next()) {
            (true, true) => " (more before and after)",
            (true, false) => " (more before)",
            (false, true) => " (more after)",
            (false, false) => "",
        };
        println!(
            "\nPage {} of {}, {} total{more}",
            meta.number + 1,
            meta.total_pages.max(1),
            meta.total_elements
        );
    }
}
