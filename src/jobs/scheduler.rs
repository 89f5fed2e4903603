//! # Job Scheduler
//!
//! Cron schedules for the lifecycle jobs. The scheduler only says which jobs
//! are due; running them is the worker's business.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use croner::Cron;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{SchedulerError, SchedulerResult};

/// The externally triggered jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    SuspendExpiredGrace,
    CheckDataCorruption,
    SendGraceReminders,
}

impl JobKind {
    pub fn all() -> [JobKind; 3] {
        [
            JobKind::SuspendExpiredGrace,
            JobKind::CheckDataCorruption,
            JobKind::SendGraceReminders,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::SuspendExpiredGrace => "suspend-expired-grace",
            JobKind::CheckDataCorruption => "check-data-corruption",
            JobKind::SendGraceReminders => "send-grace-reminders",
        }
    }
}

impl FromStr for JobKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobKind::all()
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| SchedulerError::UnknownJob(s.to_string()))
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cron expressions per job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_suspend_cron")]
    pub suspend_expired_grace: String,

    #[serde(default = "default_corruption_cron")]
    pub check_data_corruption: String,

    #[serde(default = "default_reminder_cron")]
    pub send_grace_reminders: String,

    /// How often the worker looks for due jobs
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_suspend_cron() -> String {
    "0 * * * *".to_string()
}

fn default_corruption_cron() -> String {
    "0 */6 * * *".to_string()
}

fn default_reminder_cron() -> String {
    "0 9 * * *".to_string()
}

fn default_poll_interval_secs() -> u64 {
    30
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            suspend_expired_grace: default_suspend_cron(),
            check_data_corruption: default_corruption_cron(),
            send_grace_reminders: default_reminder_cron(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl ScheduleConfig {
    pub fn cron_for(&self, kind: JobKind) -> &str {
        match kind {
            JobKind::SuspendExpiredGrace => &self.suspend_expired_grace,
            JobKind::CheckDataCorruption => &self.check_data_corruption,
            JobKind::SendGraceReminders => &self.send_grace_reminders,
        }
    }

    /// Check every cron expression parses
    pub fn validate(&self) -> SchedulerResult<()> {
        for kind in JobKind::all() {
            parse_cron(self.cron_for(kind))?;
        }
        if self.poll_interval_secs == 0 {
            return Err(SchedulerError::Internal(
                "poll_interval_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_cron(expr: &str) -> SchedulerResult<Cron> {
    Cron::new(expr)
        .parse()
        .map_err(|e| SchedulerError::InvalidCron {
            expr: expr.to_string(),
            reason: e.to_string(),
        })
}

/// First occurrence of `expr` strictly after `after`
pub fn next_occurrence(expr: &str, after: DateTime<Utc>) -> SchedulerResult<DateTime<Utc>> {
    parse_cron(expr)?
        .find_next_occurrence(&after, false)
        .map_err(|e| SchedulerError::InvalidCron {
            expr: expr.to_string(),
            reason: e.to_string(),
        })
}

/// A scheduled job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledJob {
    pub id: Uuid,
    pub kind: JobKind,
    pub cron: String,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: DateTime<Utc>,
    pub enabled: bool,
}

impl ScheduledJob {
    /// Schedule `kind` on `cron`, first firing after `now`
    pub fn new(kind: JobKind, cron: impl Into<String>, now: DateTime<Utc>) -> SchedulerResult<Self> {
        let cron = cron.into();
        let next_run = next_occurrence(&cron, now)?;

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            cron,
            last_run: None,
            next_run,
            enabled: true,
        })
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run <= now
    }

    /// Record a run at `now` and move `next_run` past it
    pub fn mark_run(&mut self, now: DateTime<Utc>) -> SchedulerResult<()> {
        self.last_run = Some(now);
        self.next_run = next_occurrence(&self.cron, now)?;
        Ok(())
    }
}

/// Job scheduler
#[derive(Debug, Default)]
pub struct Scheduler {
    jobs: RwLock<HashMap<Uuid, ScheduledJob>>,
}

fn poisoned() -> SchedulerError {
    SchedulerError::Internal("Lock poisoned".into())
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// One job per kind from `config`
    pub fn from_config(config: &ScheduleConfig, now: DateTime<Utc>) -> SchedulerResult<Self> {
        let scheduler = Self::new();
        for kind in JobKind::all() {
            scheduler.schedule(ScheduledJob::new(kind, config.cron_for(kind), now)?)?;
        }
        Ok(scheduler)
    }

    pub fn schedule(&self, job: ScheduledJob) -> SchedulerResult<Uuid> {
        let id = job.id;
        self.jobs.write().map_err(|_| poisoned())?.insert(id, job);
        Ok(id)
    }

    pub fn cancel(&self, job_id: Uuid) -> SchedulerResult<()> {
        self.jobs.write().map_err(|_| poisoned())?.remove(&job_id);
        Ok(())
    }

    /// Jobs due at `now`, earliest first
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Vec<ScheduledJob> {
        let mut due: Vec<ScheduledJob> = self
            .jobs
            .read()
            .map(|jobs| jobs.values().filter(|j| j.is_due(now)).cloned().collect())
            .unwrap_or_default();
        due.sort_by_key(|j| j.next_run);
        due
    }

    pub fn mark_run(&self, job_id: Uuid, now: DateTime<Utc>) -> SchedulerResult<()> {
        let mut jobs = self.jobs.write().map_err(|_| poisoned())?;
        match jobs.get_mut(&job_id) {
            Some(job) => job.mark_run(now),
            None => Err(SchedulerError::UnknownJob(job_id.to_string())),
        }
    }

    pub fn jobs(&self) -> Vec<ScheduledJob> {
        self.jobs
            .read()
            .map(|jobs| jobs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.jobs.read().map(|j| j.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
