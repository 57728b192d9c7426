//! Bookshelf CLI
//!
//! Command-line interface for Bookshelf - a book collection kept in a
//! cookie jar, localStorage, sessionStorage or an IndexedDB-style database.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use bookshelf_core::{BackendKind, CollectionStore, Config, StorageError};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(about = "Bookshelf - a book collection over browser-style storage")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long = "config-file", global = true)]
    config_file: Option<PathBuf>,

    /// Storage backend for this run (cookie, localstorage, session, indexeddb)
    #[arg(long, global = true, value_parser = parse_backend)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a book
    Add {
        title: String,
        author: String,
        /// Number of pages
        pages: String,
    },
    /// Change an existing book
    #[command(alias = "edit")]
    Update {
        id: u64,
        #[arg(short = 'T', long)]
        title: Option<String>,
        #[arg(short, long)]
        author: Option<String>,
        #[arg(short, long)]
        pages: Option<String>,
    },
    /// Remove a book
    #[command(alias = "rm")]
    Remove { id: u64 },
    /// Show book details
    Show { id: u64 },
    /// List all books (default)
    #[command(alias = "ls")]
    List,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show store and storage status
    Status,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, log_file, backend, store_name, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn parse_backend(value: &str) -> std::result::Result<BackendKind, String> {
    value.parse().map_err(|e: bookshelf_core::Error| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let result = run(cli, &output).await;
    if let Err(ref e) = result {
        if let Some(hint) = recovery_hint(e) {
            eprintln!("Hint: {}", hint);
        }
    }
    result
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    // Config commands don't need the store
    if let Some(Commands::Config { command }) = &cli.command {
        return handle_config_command(command.clone(), cli.config_file.as_ref(), output);
    }

    let mut config = Config::load_with_cli_override(cli.config_file.as_ref())
        .context("Failed to load configuration")?;
    if let Some(backend) = cli.backend {
        config.persistence = config.persistence.with_backend(backend);
    }
    init_logging(&config);
    debug!("Using {} backend in {:?}", config.persistence.backend(), config.data_dir);

    let mut store = CollectionStore::open_with_config(&config)
        .await
        .context("Failed to open book collection")?;

    match cli.command.unwrap_or(Commands::List) {
        Commands::Add {
            title,
            author,
            pages,
        } => commands::book::add(&mut store, title, author, pages, output).await,
        Commands::Update {
            id,
            title,
            author,
            pages,
        } => commands::book::update(&mut store, id, title, author, pages, output).await,
        Commands::Remove { id } => commands::book::remove(&mut store, id, output).await,
        Commands::Show { id } => commands::book::show(&store, id, output),
        Commands::List => commands::book::list(&store, output),
        Commands::Status => commands::status::show(&store, &config, output),
        Commands::Config { command } => {
            handle_config_command(command, cli.config_file.as_ref(), output)
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Initialize logging
///
/// Only initializes if BOOKSHELF_LOG environment variable is set.
/// Logs to config.log_file when set, otherwise to stderr.
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("BOOKSHELF_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "bookshelf_core={},bookshelf_cli={}",
        log_level, log_level
    ));

    match &config.log_file {
        Some(log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}

/// Recovery suggestion for the first storage failure in an error chain
fn recovery_hint(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| {
        if let Some(storage) = cause.downcast_ref::<StorageError>() {
            return storage.recovery_suggestion();
        }
        match cause.downcast_ref::<bookshelf_core::Error>()? {
            bookshelf_core::Error::Storage(storage)
            | bookshelf_core::Error::DataServiceUnavailable {
                source: storage, ..
            } => storage.recovery_suggestion(),
            _ => None,
        }
    })
}
