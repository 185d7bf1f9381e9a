//! Open, fill and submit a form template.

use anyhow::{Context, Result, anyhow, bail};
use clap::Args;
use colored::Colorize;
use serde_json::Value;

use super::CliConfig;
use super::output::print_fields;
use crate::core::HalError;
use crate::forms::{FieldPath, FieldRegistry, FormRequest, FormRequestController, SubmitOutcome, TargetPhase};

/// Arguments for `klabis form`.
#[derive(Args, Debug)]
pub struct FormCommand {
    /// Navigation path of the resource offering the template
    path: String,

    /// Template name from `_templates`
    template: String,

    /// Set a field, e.g. `firstName=Jan` or `address.city=Brno`.
    /// Values that parse as JSON are used as such, anything else is a string.
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    assignments: Vec<String>,

    /// Submit the form after applying assignments
    #[arg(long)]
    submit: bool,
}

/// Split `path=value` into a field path and a JSON value.
fn parse_assignment(assignment: &str) -> Result<(FieldPath, Value)> {
    let (path, raw) = assignment
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected FIELD=VALUE, got '{assignment}'"))?;
    let path: FieldPath = path
        .trim()
        .parse()
        .with_context(|| format!("Invalid field path in '{assignment}'"))?;
    if path.is_root() {
        bail!("Missing field name in '{assignment}'");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((path, value))
}

impl FormCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let assignments = self
            .assignments
            .iter()
            .map(String::as_str)
            .map(parse_assignment)
            .collect::<Result<Vec<_>>>()?;

        let client = config.client().await?;
        let controller = FormRequestController::new();
        controller.request_form(FormRequest::modal(self.template.as_str()));
        let display = client.form_display(client.route(&self.path), controller, FieldRegistry::new());

        let spinner = config.spinner();
        spinner.set_message(format!("Opening '{}' on {}", self.template, self.path));
        let opened = display.open().await;
        spinner.finish_and_clear();
        let mut form = opened?.ok_or_else(|| anyhow!("No form is active"))?;

        match form.target.phase {
            TargetPhase::Error => {
                let reason = form.target.error.as_ref().map(ToString::to_string).unwrap_or_default();
                println!("{} could not load target data: {reason}", "Warning:".yellow());
            }
            TargetPhase::SuppressedError => {
                println!("{}", "Target not readable, starting from the current resource".dimmed());
            }
            _ => {}
        }

        for (path, value) in assignments {
            if !form.session.set_value(&path, value) {
                bail!("Cannot set '{path}': index is past the end of the list");
            }
            form.session.blur(&path);
        }

        let title = form.session.template().title.clone().unwrap_or_else(|| self.template.clone());
        println!("{}", title.bold());
        print_fields(&display.render(&form), 0);

        if !self.submit {
            return Ok(());
        }

        let spinner = config.spinner();
        spinner.set_message("Submitting");
        let result = display.submit(&mut form).await;
        spinner.finish_and_clear();

        match result {
            Ok(SubmitOutcome::Submitted(body)) => {
                println!("✅ Submitted '{}'", self.template.green());
                if let Some(body) = body {
                    println!("{}", serde_json::to_string_pretty(&body)?);
                }
                Ok(())
            }
            Ok(SubmitOutcome::Invalid) => {
                print_field_errors(&form.session.visible_errors());
                bail!("Form has {} invalid field(s)", form.session.errors().len())
            }
            Err(error) => {
                print_field_errors(&form.session.visible_errors());
                Err(HalError::from(error).into())
            }
        }
    }
}

fn print_field_errors(errors: &std::collections::BTreeMap<FieldPath, String>) {
    for (path, message) in errors {
        println!("  {} {}: {}", "✗".red(), path.to_string().bold(), message.red());
    }
}
