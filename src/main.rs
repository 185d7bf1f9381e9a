//! klabis CLI entry point
//!
//! Parses arguments, runs the command and prints failures with context and
//! suggestions:
//! - `show` - Load the resource behind a navigation path
//! - `form` - Open, fill and submit a HAL-FORMS template
//! - `options` - Resolve a template's option lists
//! - `config` - Manage the configuration file

use anyhow::Result;
use clap::Parser;
use klabis_hal::cli;
use klabis_hal::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
