//! Command-line interface for the Anonium client.
//!
//! Each invocation is stateless apart from the view state kept under the
//! state directory: `thread` replays saved expansions, `collapse` toggles
//! and persists, `reset-view` forgets.

pub mod args;
pub mod commands;
pub mod utils;

use crate::config::ClientConfig;
use crate::Result;
use std::process;

pub use args::{Command, Invocation};
pub use commands::Context;

/// Main entry point for the CLI application
pub async fn run() -> Result<()> {
    // Parse command line arguments
    let invocation = match args::parse_args() {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error parsing arguments: {}", e);
            args::print_usage();
            process::exit(1);
        }
    };

    if invocation.command == Command::Help {
        args::print_usage();
        return Ok(());
    }

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = &invocation.api_url {
        config.set_api_url(url);
    }
    if let Some(dir) = invocation.state_dir {
        config.state_dir = dir;
    }
    config.validate()?;

    let ctx = Context::new(config)?;

    // Execute command
    match invocation.command {
        Command::Thread {
            post,
            sort,
            include_deleted,
        } => commands::thread(&ctx, post, sort, include_deleted).await,
        Command::Subthread { post, comment } => commands::subthread(&ctx, post, comment).await,
        Command::Expand { post, comment } => commands::expand(&ctx, post, comment).await,
        Command::Collapse { post, comment } => commands::collapse(&ctx, post, comment).await,
        Command::ResetView { post } => commands::reset_view(&ctx, post),
        Command::Whoami => commands::whoami(&ctx).await,
        Command::Logout => commands::logout(&ctx).await,
        Command::Chat { community, once } => commands::chat(&ctx, community, once).await,
        Command::Help => Ok(()),
    }
}
