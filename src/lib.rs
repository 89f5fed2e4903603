//! petport - subscription lifecycle jobs and gesture arbitration
//!
//! - `subscription`: subscriber records, stores, grace lifecycle, corruption scan
//! - `notify`: notification rendering and delivery
//! - `jobs`: cron schedules, job runner, scheduler worker
//! - `gesture`: swipe recognition and navigation/pull-to-refresh arbitration
//! - `http_server`: the lifecycle jobs as HTTP functions
//! - `cli`: `petport init|serve|run-job|notify`

pub mod cli;
pub mod config;
pub mod gesture;
pub mod http_server;
pub mod jobs;
pub mod notify;
pub mod observability;
pub mod services;
pub mod subscription;
