//! CLI module for PetPort
//!
//! - init: Create an empty subscriber store
//! - serve: HTTP functions plus the job scheduler
//! - run-job: One job, once, outcome on stdout
//! - notify: One grace period notification from stdin

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{init, notify, run, run_command, run_job, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, read_request_from, write_error, write_response};
