//! jot CLI
//!
//! Command-line interface for jot, a personal journal with auto-save.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jot_core::{BlockKind, Config, StorageError, Store};

mod commands;
mod editor;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "jot")]
#[command(about = "jot - a personal journal that saves as you write")]
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
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Create a new entry
    #[command(alias = "add")]
    New {
        /// Entry title
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Entry body (opens editor if not provided)
        #[arg(short, long)]
        body: Option<String>,
        /// Tags as name or name:color
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// List entries, most recently modified first
    #[command(alias = "ls")]
    List,
    /// Show an entry with its blocks
    Show {
        /// Entry ID
        id: i64,
    },
    /// Search entries by title, body or tag
    Search {
        /// Keyword (case-sensitive); lists everything when omitted
        keyword: Option<String>,
    },
    /// Delete an entry and its blocks
    #[command(alias = "rm")]
    Delete {
        /// Entry ID
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Write interactively, saving automatically
    Write {
        /// Entry ID to continue; starts a new entry when omitted
        id: Option<i64>,
    },
    /// Manage checklist items and toggle blocks
    Block {
        #[command(subcommand)]
        command: BlockCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show storage and user status
    Status,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a user
    Add {
        name: String,
        /// Credential stored with the user
        #[arg(long)]
        credential: Option<String>,
    },
    /// Write as an existing user
    Use { name: String },
    /// Show the active user
    Show,
    /// Rename the active user
    Rename { name: String },
    /// Delete a user and all of its entries
    Delete {
        name: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum BlockCommands {
    /// List an entry's blocks
    #[command(alias = "ls")]
    List {
        /// Entry ID
        entry_id: i64,
    },
    /// Add a checklist item
    Todo {
        /// Entry ID
        entry_id: i64,
        description: String,
    },
    /// Add a collapsible block
    Toggle {
        /// Entry ID
        entry_id: i64,
        title: String,
        content: Option<String>,
    },
    /// Check off a checklist item
    Check {
        /// Todo ID
        todo_id: i64,
        /// Uncheck instead
        #[arg(long)]
        undo: bool,
    },
    /// Delete a block
    Rm {
        /// Block kind (todo or toggle)
        kind: BlockKind,
        /// Block ID
        id: i64,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, autosave_quiet_ms, active_user, log_file)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(hint) = recovery_hint(&e) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Suggestion attached to a storage error anywhere in the chain
fn recovery_hint(error: &anyhow::Error) -> Option<&'static str> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
        .and_then(StorageError::recovery_suggestion)
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work without a database
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let mut store = Store::open_with_config(&config).with_context(|| {
        format!(
            "Failed to open journal database at {}",
            config.database_path().display()
        )
    })?;

    match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::User { command } => {
            handle_user_command(command, &mut store, &mut config, config_path, &output)
        }
        Commands::New { title, body, tag } => {
            commands::entry::create(&mut store, &config, title, body, tag, &output)
        }
        Commands::List => commands::entry::list(&mut store, &config, &output),
        Commands::Show { id } => commands::entry::show(&mut store, &config, id, &output),
        Commands::Search { keyword } => {
            commands::entry::search(&mut store, &config, keyword, &output)
        }
        Commands::Delete { id, yes } => {
            commands::entry::delete(&mut store, &config, id, yes, &output)
        }
        Commands::Write { id } => commands::write::run(store, &config, id, &output).await,
        Commands::Block { command } => handle_block_command(command, &mut store, &config, &output),
        Commands::Status => commands::status::show(&store, &config, &output),
    }
}

fn handle_user_command(
    command: UserCommands,
    store: &mut Store,
    config: &mut Config,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        UserCommands::Add { name, credential } => {
            commands::user::add(store, config, config_path, name, credential, output)
        }
        UserCommands::Use { name } => commands::user::switch(store, config, config_path, name, output),
        UserCommands::Show => commands::user::show(store, config, output),
        UserCommands::Rename { name } => {
            commands::user::rename(store, config, config_path, name, output)
        }
        UserCommands::Delete { name, yes } => {
            commands::user::delete(store, config, config_path, name, yes, output)
        }
    }
}

fn handle_block_command(
    command: BlockCommands,
    store: &mut Store,
    config: &Config,
    output: &Output,
) -> Result<()> {
    match command {
        BlockCommands::List { entry_id } => commands::block::list(store, config, entry_id, output),
        BlockCommands::Todo {
            entry_id,
            description,
        } => commands::block::add_todo(store, config, entry_id, description, output),
        BlockCommands::Toggle {
            entry_id,
            title,
            content,
        } => commands::block::add_toggle(store, config, entry_id, title, content, output),
        BlockCommands::Check { todo_id, undo } => {
            commands::block::check(store, config, todo_id, !undo, output)
        }
        BlockCommands::Rm { kind, id } => commands::block::remove(store, config, kind, id, output),
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
/// Level comes from JOT_LOG (default warn). Logs go to config.log_file when
/// set, otherwise stderr.
fn init_logging(config: &Config) {
    let log_level = std::env::var("JOT_LOG").unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::new(format!("jot_core={},jot={}", log_level, log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore the error if a subscriber is already installed
    match &config.log_file {
        Some(path) => {
            let log_file = match File::options().create(true).append(true).open(path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                    return;
                }
            };
            let _ = builder.with_ansi(false).with_writer(log_file).try_init();
            info!("logging to {:?}", path);
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_block_rm_kind() {
        let cli = Cli::try_parse_from(["jot", "block", "rm", "toggle", "7"]).unwrap();
        match cli.command {
            Commands::Block {
                command: BlockCommands::Rm { kind, id },
            } => {
                assert_eq!(kind, BlockKind::Toggle);
                assert_eq!(id, 7);
            }
            _ => panic!("expected block rm"),
        }
        assert!(Cli::try_parse_from(["jot", "block", "rm", "heading", "7"]).is_err());
    }

    #[test]
    fn test_recovery_hint_found_through_context() {
        let err = anyhow::Error::new(StorageError::Unhealthy("closed".to_string()))
            .context("Failed to save entry");
        assert_eq!(
            recovery_hint(&err),
            Some("Reconnect to the database and retry the operation.")
        );

        let plain = anyhow::anyhow!("Entry not found: 3");
        assert!(recovery_hint(&plain).is_none());
    }

    #[test]
    fn test_parse_user_delete() {
        let cli = Cli::try_parse_from(["jot", "user", "delete", "ada", "--yes"]).unwrap();
        match cli.command {
            Commands::User {
                command: UserCommands::Delete { name, yes },
            } => {
                assert_eq!(name, "ada");
                assert!(yes);
            }
            _ => panic!("expected user delete"),
        }
    }

    #[test]
    fn test_parse_new_with_tags() {
        let cli = Cli::try_parse_from([
            "jot", "--json", "new", "-T", "Trip", "-t", "travel:red", "-t", "2024",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::New { title, tag, body } => {
                assert_eq!(title.as_deref(), Some("Trip"));
                assert_eq!(tag, vec!["travel:red", "2024"]);
                assert!(body.is_none());
            }
            _ => panic!("expected new"),
        }
    }
}
