//! marks CLI
//!
//! Command-line interface for editing a browser's bookmark file: list,
//! add, move, rename and delete bookmarks, with history and undo.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use marks_core::{Bookmarks, Config, MutationError, StorageError};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "marks")]
#[command(about = "marks - edit browser bookmarks from the command line")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Bookmarks file to operate on (overrides configuration)
    #[arg(long, global = true, value_name = "PATH")]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List bookmarks
    #[command(alias = "ls")]
    List {
        /// Only bookmarks directly in this folder (e.g. bookmark_bar/Work)
        #[arg(short, long)]
        folder: Option<String>,
    },
    /// Show all folders with bookmark and subfolder counts
    Folders,
    /// Add a bookmark
    Add {
        /// URL to save
        url: String,
        /// Bookmark title
        title: String,
        /// Folder path to add to
        #[arg(short, long, default_value = "bookmark_bar")]
        folder: String,
    },
    /// Create a folder
    Mkdir {
        /// Folder name
        name: String,
        /// Parent folder path
        #[arg(short, long, default_value = "bookmark_bar")]
        parent: String,
    },
    /// Move a bookmark to another folder
    Mv {
        /// URL of the bookmark
        url: String,
        /// Target folder path
        folder: String,
    },
    /// Rename a bookmark
    Rename {
        /// URL of the bookmark
        url: String,
        /// New title
        title: String,
    },
    /// Delete a bookmark
    #[command(alias = "delete")]
    Rm {
        /// URL of the bookmark
        url: String,
    },
    /// Move many bookmarks from a JSON list of {url, target_folder}
    BulkMove {
        /// JSON file, or - for stdin
        source: String,
    },
    /// Show recent changes
    History {
        /// Number of changes to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Revert the most recent change
    Undo,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show status (bookmarks file, counts, history)
    Status,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (bookmarks_file, browser_profile, data_dir, history_limit)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let result = run(cli, &output);
    if let Err(err) = &result {
        if let Some(hint) = recovery_hint(err) {
            eprintln!("Hint: {}", hint);
        }
    }
    result
}

fn run(cli: Cli, output: &Output) -> Result<()> {
    // Config commands don't need the bookmarks file
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), output);
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(file) = cli.file {
        config.bookmarks_file = Some(file);
    }
    debug!("Using bookmarks file {:?}", config.bookmarks_path());

    let bookmarks = Bookmarks::open_with_config(config)?;

    match cli.command {
        Commands::List { folder } => commands::bookmark::list(&bookmarks, folder, output),
        Commands::Folders => commands::bookmark::folders(&bookmarks, output),
        Commands::Add { url, title, folder } => {
            commands::bookmark::add(&bookmarks, url, title, folder, output)
        }
        Commands::Mkdir { name, parent } => {
            commands::bookmark::mkdir(&bookmarks, name, parent, output)
        }
        Commands::Mv { url, folder } => commands::bookmark::mv(&bookmarks, url, folder, output),
        Commands::Rename { url, title } => {
            commands::bookmark::rename(&bookmarks, url, title, output)
        }
        Commands::Rm { url } => commands::bookmark::rm(&bookmarks, url, output),
        Commands::BulkMove { source } => {
            commands::bookmark::bulk_move(&bookmarks, source, output)
        }
        Commands::History { limit } => commands::history::show(&bookmarks, limit, output),
        Commands::Undo => commands::history::undo(&bookmarks, output),
        Commands::Status => commands::status::show(&bookmarks, output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Recovery suggestion for the first storage error in the chain
fn recovery_hint(err: &anyhow::Error) -> Option<&'static str> {
    err.chain().find_map(|cause| {
        if let Some(storage) = cause.downcast_ref::<StorageError>() {
            return storage.recovery_suggestion();
        }
        match cause.downcast_ref::<MutationError>() {
            Some(MutationError::Storage(storage)) => storage.recovery_suggestion(),
            _ => None,
        }
    })
}

/// Log to stderr; level from --verbose, else MARKS_LOG, else warnings only
fn init_logging(verbose: bool) {
    let log_level = if verbose {
        "debug".to_string()
    } else {
        std::env::var("MARKS_LOG").unwrap_or_else(|_| "warn".to_string())
    };
    let env_filter = EnvFilter::new(format!("marks_core={},marks_cli={}", log_level, log_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_defaults_to_bookmark_bar() {
        let cli = Cli::parse_from(["marks", "add", "https://a.com", "A"]);
        match cli.command {
            Commands::Add { folder, .. } => assert_eq!(folder, "bookmark_bar"),
            _ => panic!("expected add"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["marks", "list", "--json", "--file", "/tmp/Bookmarks"]);
        assert!(cli.json);
        assert_eq!(cli.file, Some(PathBuf::from("/tmp/Bookmarks")));
        assert!(matches!(cli.command, Commands::List { folder: None }));
    }

    #[test]
    fn test_recovery_hint_for_malformed_file() {
        let err = anyhow::Error::new(MutationError::Storage(StorageError::Malformed {
            path: PathBuf::from("/profile/Bookmarks"),
            details: "EOF while parsing".to_string(),
        }))
        .context("Failed to add bookmark https://a.com");

        assert!(recovery_hint(&err).unwrap().contains(".bak"));
    }

    #[test]
    fn test_recovery_hint_for_missing_file() {
        let err = anyhow::Error::new(StorageError::NotFound {
            path: PathBuf::from("/profile/Bookmarks"),
        })
        .context("Failed to load \"/profile/Bookmarks\"");

        assert!(recovery_hint(&err).unwrap().contains("bookmarks_file"));
    }

    #[test]
    fn test_no_recovery_hint_for_lookup_errors() {
        let err = anyhow::Error::new(MutationError::BookmarkNotFound {
            url: "https://a.com".to_string(),
        });
        assert!(recovery_hint(&err).is_none());
    }

    #[test]
    fn test_bulk_move_stdin() {
        let cli = Cli::parse_from(["marks", "bulk-move", "-"]);
        assert!(matches!(cli.command, Commands::BulkMove { ref source } if source == "-"));
    }
}
