//! Binary entry point for lockout.
//!
//! This binary drives the lockout library from the command line.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use commands::{
    AdminAction, LockArgs, TodayArgs, cmd_admin, cmd_check, cmd_config, cmd_lock, cmd_migrate,
    cmd_today,
};
use lockout::config::LockoutConfig;
use lockout::observability;
use std::process::ExitCode;

/// Lockout - claim a contact before you dial it.
#[derive(Parser)]
#[command(name = "lockout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Lock a contact.
    Lock {
        #[command(flatten)]
        contact: LockArgs,

        /// Confirm past duplicate warnings without prompting.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show possible duplicates without locking.
    Check {
        #[command(flatten)]
        contact: LockArgs,
    },

    /// List today's locks.
    Today {
        #[command(flatten)]
        filter: TodayArgs,
    },

    /// Clear or archive locks (requires the admin PIN).
    Admin {
        /// Admin subcommand.
        #[command(subcommand)]
        action: AdminAction,
    },

    /// Create the ledger or migrate it to the current schema.
    Migrate,

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    for warning in config.security_warnings() {
        eprintln!("Warning: {warning}");
    }

    match run_command(cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &LockoutConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Lock { contact, yes } => cmd_lock(config, &contact, yes),
        Commands::Check { contact } => cmd_check(config, &contact),
        Commands::Today { filter } => cmd_today(config, &filter),
        Commands::Admin { action } => cmd_admin(config, action),
        Commands::Migrate => cmd_migrate(config),
        Commands::Config { show } => cmd_config(config, show),
    }
}

/// Loads configuration.
fn load_config(path: Option<&str>) -> Result<LockoutConfig, Box<dyn std::error::Error>> {
    if let Some(config_path) = path {
        return LockoutConfig::load_from_file(std::path::Path::new(config_path))
            .map_err(std::convert::Into::into);
    }
    LockoutConfig::load_default().map_err(std::convert::Into::into)
}
