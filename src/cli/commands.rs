//! CLI command implementations
//!
//! Every command loads and validates the config first, then applies its
//! `log_level` before doing any work.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::config::PetPortConfig;
use crate::http_server::HttpServer;
use crate::jobs::{spawn_worker, JobKind, JobOutcome, Scheduler};
use crate::observability::{log_event, log_event_with_fields, Event, Logger};
use crate::services::Services;
use crate::subscription::GracePeriodEventRequest;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_response};

/// Main CLI entry point; the only function main.rs calls
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    log_event(Event::BootStart);

    match cmd {
        Command::Init { config } => init(&config),
        Command::Serve { config, port } => serve(&config, port),
        Command::RunJob { name, at, config } => run_job(&config, &name, at.as_deref()),
        Command::Notify { config } => notify(&config),
    }
}

fn load_config(path: &Path) -> CliResult<PetPortConfig> {
    let config = PetPortConfig::load(path)?;
    if let Some(severity) = config.log_severity() {
        Logger::set_min_severity(severity);
    }

    log_event_with_fields(Event::ConfigLoaded, &[("config", &path.display().to_string())]);
    Ok(config)
}

/// Create the subscriber store as an empty JSON array
pub fn init(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let store_path = config.store_path();

    if store_path.exists() {
        return Err(CliError::already_initialized(store_path.display()));
    }

    if let Some(parent) = store_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                CliError::config_error(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
    }
    fs::write(&store_path, "[]\n")?;

    write_response(json!({
        "initialized": true,
        "store_path": store_path.display().to_string(),
    }))
}

/// Serve the HTTP functions until ctrl-c, with the scheduler worker alongside
/// when `http.run_scheduler` is set
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let services = Services::from_config(&config);

    let mut http_config = config.http.clone();
    if let Some(port) = port {
        http_config.port = port;
    }

    let scheduler = if http_config.run_scheduler {
        Some(Arc::new(Scheduler::from_config(&config.schedule, Utc::now())?))
    } else {
        None
    };
    let poll_interval = Duration::from_secs(config.schedule.poll_interval_secs);
    let runner = Arc::clone(&services.runner);
    let server = HttpServer::new(http_config, services);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async move {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker =
            scheduler.map(|s| spawn_worker(s, Arc::clone(&runner), poll_interval, shutdown_rx));

        let served = server
            .start(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await;

        log_event(Event::ShutdownStart);
        let _ = shutdown_tx.send(true);
        if let Some(worker) = worker {
            let _ = worker.await;
        }

        served.map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Run one job and print its outcome
pub fn run_job(config_path: &Path, name: &str, at: Option<&str>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let outcome = execute_job(&Services::from_config(&config), name, at)?;
    write_response(serde_json::to_value(&outcome)?)
}

fn execute_job(services: &Services, name: &str, at: Option<&str>) -> CliResult<JobOutcome> {
    let kind: JobKind = name.parse()?;
    let now = match at {
        Some(at) => parse_instant(at)?,
        None => Utc::now(),
    };

    Ok(services.runner.run(kind, now)?)
}

fn parse_instant(value: &str) -> CliResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CliError::invalid_argument(format!("Invalid --at '{}': {}", value, e)))
}

/// Send one grace period notification described on stdin
pub fn notify(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    let request = read_request()?;
    let response = send_notification(&Services::from_config(&config), request)?;
    write_response(response)
}

fn send_notification(services: &Services, request: Value) -> CliResult<Value> {
    let request: GracePeriodEventRequest = serde_json::from_value(request)
        .map_err(|e| CliError::invalid_argument(format!("Invalid notification request: {}", e)))?;

    services.engine.notify_grace_period_event(&request)?;

    Ok(json!({
        "sent": true,
        "event_kind": request.event_kind,
    }))
}
