use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "notepad")]
#[command(about = "Edit notes on a Notepad server from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Note service base URL (overrides `NOTEPAD_API_URL`)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Optional path to a JSON config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Optional path to the local draft database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Answer every prompt without asking (drafts are restored, conflicts are saved as a copy)
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Quick capture: notepad "my note here"
    #[arg(trailing_var_arg = true)]
    pub note: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new note
    #[command(alias = "new")]
    Add {
        /// Optional note title
        #[arg(long)]
        title: Option<String>,
        /// Note content
        content: Vec<String>,
    },
    /// List recent notes
    List {
        /// Number of notes to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a note
    Show {
        /// Note ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit an existing note (opens $EDITOR unless content is given)
    Edit {
        /// Note ID
        id: String,
        /// Replace the title
        #[arg(long)]
        title: Option<String>,
        /// Replacement content
        content: Vec<String>,
    },
    /// Delete an existing note
    Delete {
        /// Note ID
        id: String,
    },
    /// Publish a note and print its public link
    Share {
        /// Note ID
        id: String,
    },
    /// Print a shared note by its share ID
    Shared {
        /// Share ID from a public link
        share_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List local drafts that are not yet saved
    Drafts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
