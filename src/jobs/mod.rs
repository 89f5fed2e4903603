//! # Lifecycle Jobs
//!
//! Cron-scheduled invocation of the subscription jobs:
//! `suspend-expired-grace`, `check-data-corruption` and
//! `send-grace-reminders`.

pub mod errors;
pub mod runner;
pub mod scheduler;
pub mod worker;

pub use errors::{SchedulerError, SchedulerResult};
pub use runner::{JobOutcome, JobRunner};
pub use scheduler::{next_occurrence, JobKind, ScheduleConfig, ScheduledJob, Scheduler};
pub use worker::{run_due_jobs, spawn_worker};
