//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod auth;
mod env;
mod pipeline;
mod watch;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};

use super::helpers::admin_client;
use crate::config::{load_settings_with_options, LoadOptions};
use crate::environment::Environment;
use crate::panels::{BookFilter, BookSort, WatchOptions};

#[derive(Parser)]
#[command(name = "libradmin")]
#[command(about = "Operator console for the book-import pipeline")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Target this environment for one command without changing the saved selection
    #[arg(long = "env", global = true, value_enum)]
    environment: Option<Environment>,

    /// Skip confirmation prompts
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the target environment
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },

    /// Manage the admin API token
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Inspect and control pipeline runs
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
}

#[derive(Subcommand)]
enum EnvCommands {
    /// Show both environments and which one is active
    Show,

    /// Switch the saved environment (production asks for confirmation)
    Switch {
        #[arg(value_enum)]
        environment: Environment,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Save an admin token (read from stdin when omitted)
    Login { token: Option<String> },

    /// Remove the saved token
    Logout,

    /// Show where the active token comes from
    Status,
}

#[derive(Subcommand)]
enum PipelineCommands {
    /// Show a run's current status
    Status {
        run_id: String,
        /// Output the raw status as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the books in a run
    Books {
        run_id: String,
        #[arg(short, long, value_enum, default_value_t = BookFilter::All)]
        filter: BookFilter,
        #[arg(short, long, value_enum, default_value_t = BookSort::Server)]
        sort: BookSort,
        /// Show at most this many books
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output the raw book list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the final report of a finished run
    Report {
        run_id: String,
        /// Output the raw report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask the server to cancel a run
    Cancel { run_id: String },

    /// Follow a run live until it finishes
    Watch {
        run_id: String,
        /// Poll interval in milliseconds (minimum 250; default from config)
        #[arg(short, long)]
        interval: Option<u64>,
        #[arg(short, long, value_enum, default_value_t = BookFilter::All)]
        filter: BookFilter,
        #[arg(short, long, value_enum, default_value_t = BookSort::Server)]
        sort: BookSort,
        /// Keep the view open after the run finishes
        #[arg(long)]
        stay: bool,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
    };
    let (settings, _config) = load_settings_with_options(options)
        .await
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Env { command } => match command {
            EnvCommands::Show => env::cmd_env_show(&settings),
            EnvCommands::Switch { environment } => {
                env::cmd_env_switch(&settings, environment, cli.yes)
            }
        },
        Commands::Auth { command } => match command {
            AuthCommands::Login { token } => auth::cmd_login(&settings, token),
            AuthCommands::Logout => auth::cmd_logout(&settings),
            AuthCommands::Status => auth::cmd_status(&settings),
        },
        Commands::Pipeline { command } => {
            let client = admin_client(&settings, cli.environment, cli.yes)?;
            match command {
                PipelineCommands::Status { run_id, json } => {
                    pipeline::cmd_status(&client, &run_id, json).await
                }
                PipelineCommands::Books {
                    run_id,
                    filter,
                    sort,
                    limit,
                    json,
                } => pipeline::cmd_books(&client, &run_id, filter, sort, limit, json).await,
                PipelineCommands::Report { run_id, json } => {
                    pipeline::cmd_report(&client, &run_id, json).await
                }
                PipelineCommands::Cancel { run_id } => {
                    pipeline::cmd_cancel(&client, &run_id, cli.yes).await
                }
                PipelineCommands::Watch {
                    run_id,
                    interval,
                    filter,
                    sort,
                    stay,
                } => {
                    let options = WatchOptions::resolve(&settings, interval, filter, sort, !stay)?;
                    watch::cmd_watch(client, &run_id, options).await
                }
            }
        }
    }
}
