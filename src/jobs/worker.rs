//! # Scheduler Worker
//!
//! Tokio loop that polls the scheduler and runs due jobs. Job bodies do
//! blocking store and SMTP I/O, so each run goes through `spawn_blocking`.
//! A failed run is logged and the job waits for its next cron slot; there is
//! no retry inside the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::runner::JobRunner;
use super::scheduler::Scheduler;
use crate::observability::{log_event_with_fields, Event};

/// Run every job due now; returns how many ran
pub async fn run_due_jobs(scheduler: &Scheduler, runner: &Arc<JobRunner>) -> usize {
    let now = Utc::now();
    let due = scheduler.due_jobs(now);

    for job in &due {
        let runner = Arc::clone(runner);
        let kind = job.kind;
        let result = tokio::task::spawn_blocking(move || runner.run(kind, now)).await;

        if let Err(e) = result {
            log_event_with_fields(
                Event::JobFailed,
                &[("job", kind.as_str()), ("error", &e.to_string())],
            );
        }

        // Job errors are already logged by the runner
        if let Err(e) = scheduler.mark_run(job.id, now) {
            log_event_with_fields(
                Event::JobFailed,
                &[("job", kind.as_str()), ("error", &e.to_string())],
            );
        }
    }

    due.len()
}

/// Spawn the polling loop. Send `true` on the shutdown channel to stop it.
pub fn spawn_worker(
    scheduler: Arc<Scheduler>,
    runner: Arc<JobRunner>,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    for job in scheduler.jobs() {
        log_event_with_fields(
            Event::JobScheduled,
            &[
                ("job", job.kind.as_str()),
                ("cron", &job.cron),
                ("next_run", &job.next_run.to_rfc3339()),
            ],
        );
    }

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_due_jobs(&scheduler, &runner).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::scheduler::{JobKind, ScheduledJob};
    use crate::notify::MemoryDispatcher;
    use crate::observability::MetricsRegistry;
    use crate::subscription::{
        CorruptionDetector, InMemorySubscriberStore, LifecycleConfig, LifecycleEngine,
    };
    use chrono::Duration as ChronoDuration;

    fn runner(metrics: Arc<MetricsRegistry>) -> Arc<JobRunner> {
        let store = Arc::new(InMemorySubscriberStore::new());
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let engine = LifecycleEngine::new(
            store.clone(),
            dispatcher.clone(),
            LifecycleConfig::default(),
            metrics.clone(),
        );
        let detector = CorruptionDetector::new(store, dispatcher, vec![], metrics.clone());
        Arc::new(JobRunner::new(Arc::new(engine), Arc::new(detector), metrics))
    }

    #[tokio::test]
    async fn test_due_job_runs_once() {
        let metrics = Arc::new(MetricsRegistry::new());
        let runner = runner(metrics.clone());
        let scheduler = Scheduler::new();

        let past = Utc::now() - ChronoDuration::hours(2);
        let job = ScheduledJob::new(JobKind::SuspendExpiredGrace, "0 * * * *", past).unwrap();
        scheduler.schedule(job).unwrap();

        assert_eq!(run_due_jobs(&scheduler, &runner).await, 1);
        assert_eq!(run_due_jobs(&scheduler, &runner).await, 0);
        assert_eq!(metrics.snapshot().job_runs, 1);
    }

    #[tokio::test]
    async fn test_worker_stops_on_shutdown() {
        let metrics = Arc::new(MetricsRegistry::new());
        let scheduler = Arc::new(Scheduler::new());
        let (tx, rx) = watch::channel(false);

        let handle = spawn_worker(scheduler, runner(metrics), Duration::from_millis(10), rx);
        tx.send(true).unwrap();

        assert!(handle.await.is_ok());
    }
}
