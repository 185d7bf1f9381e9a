//! Resolve and print the option lists of a template.

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;
use futures::future::join_all;

use super::CliConfig;

/// Arguments for `klabis options`.
#[derive(Args, Debug)]
pub struct OptionsCommand {
    /// Navigation path of the resource offering the template
    path: String,

    /// Template name from `_templates`
    template: String,

    /// Only this property
    #[arg(long)]
    property: Option<String>,
}

impl OptionsCommand {
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let client = config.client().await?;
        let route = client.route(&self.path);

        let spinner = config.spinner();
        spinner.set_message(format!("Loading {}", route.pathname()));
        let state = route.load().await;
        let resource = match (state.resource(), state.error) {
            (Some(resource), _) => resource?,
            (None, Some(error)) => {
                spinner.finish_and_clear();
                return Err(error.into());
            }
            (None, None) => {
                spinner.finish_and_clear();
                return Err(anyhow!("{} has no backing resource", route.pathname()));
            }
        };
        let template = resource.template(&self.template)?;

        let properties: Vec<_> = template
            .properties
            .iter()
            .filter(|p| p.options.is_some())
            .filter(|p| self.property.as_ref().is_none_or(|name| &p.name == name))
            .collect();
        if let Some(name) = &self.property {
            if properties.is_empty() {
                spinner.finish_and_clear();
                return Err(anyhow!("Property '{name}' of '{}' has no options", self.template));
            }
        }

        spinner.set_message("Resolving options");
        let resolver = client.option_resolver();
        let resolved = join_all(properties.iter().map(|p| resolver.resolve(p.options.as_ref()))).await;
        spinner.finish_and_clear();

        if properties.is_empty() {
            println!("{}", "No properties with options.".yellow());
        }
        for (property, state) in properties.iter().zip(resolved) {
            println!("{} ({})", property.label().bold(), property.name.cyan());
            if let Some(error) = &state.error {
                println!("  {} {}", "✗".red(), error.to_string().red());
                continue;
            }
            if state.options.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for option in &state.options {
                println!("  {} {}", option.value.green(), option.label);
            }
        }
        Ok(())
    }
}
