//! Notepad CLI - edit notes on a Notepad server from the terminal
//!
//! Edits go through the same editor session as every other client, so local
//! drafts, conflict checks and share links behave identically.

mod cli;
mod commands;
mod error;
mod prompt;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::common::AppContext;
use crate::commands::delete::run_delete;
use crate::commands::drafts::run_drafts;
use crate::commands::edit::run_edit;
use crate::commands::list::run_list;
use crate::commands::share::run_share;
use crate::commands::shared::run_shared;
use crate::commands::show::run_show;
use crate::error::CliError;

// Prompts and $EDITOR block the thread; a single-threaded runtime keeps
// session timers from firing underneath them.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("notepad=info")),
        )
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::new(cli.config.as_deref(), cli.api_url, cli.db_path, cli.yes)?;

    match cli.command {
        Some(Commands::Add { title, content }) => run_add(&ctx, title, &content).await?,
        Some(Commands::List { limit, json }) => run_list(&ctx, limit, json).await?,
        Some(Commands::Show { id, json }) => run_show(&ctx, &id, json).await?,
        Some(Commands::Edit { id, title, content }) => {
            run_edit(&ctx, &id, title, &content).await?;
        }
        Some(Commands::Delete { id }) => run_delete(&ctx, &id).await?,
        Some(Commands::Share { id }) => run_share(&ctx, &id).await?,
        Some(Commands::Shared { share_id, json }) => run_shared(&ctx, &share_id, json).await?,
        Some(Commands::Drafts { json }) => run_drafts(&ctx, json)?,
        None => {
            // Quick capture mode: notepad "my note"
            if cli.note.is_empty() {
                Cli::command().print_help().map_err(CliError::Io)?;
                println!();
            } else {
                run_add(&ctx, None, &cli.note).await?;
            }
        }
    }

    Ok(())
}
