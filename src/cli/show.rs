//! Print the resource behind a navigation path.

use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use colored::Colorize;

use super::CliConfig;
use super::output::{format_scalar, print_page};
use crate::core::HalError;
use crate::hal::HalResource;
use crate::route::{CollectionQuery, SortDirection};

/// Arguments for `klabis show`.
#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Navigation path, e.g. `/members/42`
    path: String,

    /// Print the raw JSON document
    #[arg(long)]
    json: bool,

    /// Page through the collection behind this link relation instead of the resource itself
    #[arg(long)]
    rel: Option<String>,

    /// Embedded collection name to read rows from
    #[arg(long)]
    collection: Option<String>,

    /// Zero-based page number
    #[arg(long)]
    page: Option<u64>,

    /// Page size
    #[arg(long)]
    size: Option<u64>,

    /// Sort column
    #[arg(long)]
    sort: Option<String>,

    /// Sort direction
    #[arg(long, value_enum, default_value_t = Direction::Asc, requires = "sort")]
    direction: Direction,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    Asc,
    Desc,
}

impl From<Direction> for SortDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Asc => Self::Asc,
            Direction::Desc => Self::Desc,
        }
    }
}

impl ShowCommand {
    fn wants_page(&self) -> bool {
        self.rel.is_some()
            || self.collection.is_some()
            || self.page.is_some()
            || self.size.is_some()
            || self.sort.is_some()
    }

    fn collection_href(&self, resource: &HalResource, pathname: &str) -> Result<String, HalError> {
        match &self.rel {
            Some(rel) => resource
                .link(rel)
                .map(|link| link.href.clone())
                .ok_or_else(|| HalError::MissingLink {
                    rel: rel.clone(),
                    context: pathname.to_string(),
                }),
            None => resource.self_href().map(str::to_string),
        }
    }

    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let client = config.client().await?;
        let route = client.route(&self.path);
        let pathname = route.pathname();

        let spinner = config.spinner();
        spinner.set_message(format!("Loading {pathname}"));
        let state = route.load().await;
        spinner.finish_and_clear();

        let data = match (state.resource_data, state.error) {
            (Some(data), _) => data,
            (None, Some(error)) => return Err(error.into()),
            (None, None) => {
                println!("{} has no backing resource", pathname.yellow());
                return Ok(());
            }
        };

        if self.json && !self.wants_page() {
            println!("{}", serde_json::to_string_pretty(&*data)?);
            return Ok(());
        }

        let resource = HalResource::from_value(&data)?;
        if !self.wants_page() {
            print_resource(&pathname, &resource);
            return Ok(());
        }

        let mut query = client.collection_query(&self.collection_href(&resource, &pathname)?);
        if let Some(name) = &self.collection {
            query = query.collection(name.clone());
        }
        if let Some(page) = self.page {
            query = query.page(page);
        }
        if let Some(size) = self.size {
            if size == 0 {
                bail!("Page size must be at least 1");
            }
            query = query.size(size);
        }
        if let Some(sort) = &self.sort {
            query = query.sort(sort.clone(), self.direction.into());
        }

        let page = route.collection(&query).await?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&page.rows)?);
        } else {
            print_page(&page);
        }
        Ok(())
    }
}

fn print_resource(pathname: &str, resource: &HalResource) {
    println!("{}", pathname.bold());

    for (name, value) in resource.data_properties() {
        println!("  {}: {}", name.cyan(), format_scalar(value));
    }

    let links = resource.navigation_links();
    if !links.is_empty() {
        println!("\n{}", "Links:".bold());
        for (rel, link) in links {
            println!("  {} → {}", link.label(rel).cyan(), link.href);
        }
    }

    if !resource.embedded.is_empty() {
        println!("\n{}", "Embedded:".bold());
        for (name, items) in &resource.embedded {
            println!("  {} ({} item(s))", name.cyan(), items.len());
        }
    }

    if let Some(page) = &resource.page {
        println!(
            "\nPage {} of {} ({} total)",
            page.number + 1,
            page.total_pages.max(1),
            page.total_elements
        );
    }

    if !resource.templates.is_empty() {
        println!("\n{}", "Forms:".bold());
        for (name, template) in &resource.templates {
            let title = template.title.as_deref().unwrap_or("");
            println!("  {} {} {}", name.green(), template.method.to_ascii_uppercase(), title.dimmed());
        }
    }
}
