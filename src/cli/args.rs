//! CLI argument definitions using clap
//!
//! Commands:
//! - petport init --config <path>
//! - petport serve --config <path>
//! - petport run-job <name> [--at <rfc3339>] --config <path>
//! - petport notify --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PetPort - subscription lifecycle jobs and functions
#[derive(Parser, Debug)]
#[command(name = "petport")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty subscriber store
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./petport.json")]
        config: PathBuf,
    },

    /// Serve the HTTP functions and run the job scheduler
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./petport.json")]
        config: PathBuf,

        /// Override `http.port`
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run one job immediately and print its outcome
    RunJob {
        /// suspend-expired-grace, check-data-corruption or send-grace-reminders
        name: String,

        /// Evaluate as of this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<String>,

        /// Path to configuration file
        #[arg(long, default_value = "./petport.json")]
        config: PathBuf,
    },

    /// Send one grace period notification read as JSON from stdin
    Notify {
        /// Path to configuration file
        #[arg(long, default_value = "./petport.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
