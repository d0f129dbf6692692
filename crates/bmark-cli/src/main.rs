//! bmark CLI
//!
//! Command-line interface for bmark - browser-independent bookmarks.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bmark_core::{Config, Format, Store};

mod commands;
mod output;
mod web;

#[derive(Parser)]
#[command(name = "bmark")]
#[command(about = "Browser-independent bookmark manager")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the bookmark database
    #[arg(short, long, global = true, value_name = "DB")]
    database: Option<PathBuf>,

    /// Input/output format (text, json, binary, html)
    #[arg(
        short,
        long,
        global = true,
        default_value = "text",
        value_parser = parse_format
    )]
    format: Format,

    /// Open query results in the default browser
    #[arg(short, long, global = true)]
    web: bool,

    /// Display tags alongside each URL while listing
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag a URL ('+name' as URL extends the tag set of that name)
    Add {
        /// URL to bookmark; '-' reads a URL list from stdin
        url: String,
        /// Tags to apply ('+name' expands to the set's members)
        tags: Vec<String>,
    },
    /// List URLs matching every given tag
    #[command(alias = "ls")]
    List {
        /// Tags to filter by; none lists everything
        tags: Vec<String>,
    },
    /// Remove tags from a URL
    #[command(alias = "rm")]
    Remove {
        /// URL to untag; '-' reads a URL list from stdin
        url: String,
        /// Tags to remove
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Delete URLs from the database
    Delete {
        /// URLs to delete; '-' reads a URL list from stdin
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Import URLs into the database
    Import {
        /// Files to import; '-' reads stdin
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List tags from the database
    Tags {
        /// URLs whose tags to union; none shows global usage counts
        urls: Vec<String>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (database)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    // Config management never touches the store
    if let Commands::Config { command } = &cli.command {
        return match command.clone() {
            Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value),
            Some(ConfigCommands::Show) | None => commands::config::show(),
        };
    }

    let mut config = Config::load()?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    let mut store = Store::open_with_config(config)?;

    match cli.command {
        Commands::Add { url, tags } => commands::add::run(&mut store, url, tags),
        Commands::List { tags } => {
            commands::list::run(&store, tags, cli.format, cli.verbose, cli.web)
        }
        Commands::Remove { url, tags } => commands::remove::run(&mut store, url, tags),
        Commands::Delete { urls } => commands::delete::run(&mut store, urls),
        Commands::Import { files } => commands::import::run(&mut store, files, cli.format),
        Commands::Tags { urls } => commands::tags::run(&store, urls, cli.format, cli.web),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Install the logging sink once, before any store is constructed
///
/// `BMARK_LOG` takes tracing's filter syntax (e.g. `bmark_core=debug`);
/// unset means no output.
fn init_logging() {
    let filter = EnvFilter::try_from_env("BMARK_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
