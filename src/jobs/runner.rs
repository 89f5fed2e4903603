//! # Job Runner
//!
//! Runs one lifecycle job synchronously inside an observation scope. Shared
//! by the scheduler worker, the HTTP function routes and `petport run-job`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::scheduler::JobKind;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};
use crate::subscription::{
    CorruptionDetector, CorruptionReport, GraceSweep, LifecycleEngine, LifecycleResult,
};

/// What a job run did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "job", rename_all = "kebab-case")]
pub enum JobOutcome {
    SuspendExpiredGrace {
        sweep: GraceSweep,
        notices_sent: usize,
    },
    CheckDataCorruption {
        report: CorruptionReport,
    },
    SendGraceReminders {
        sent: usize,
    },
}

impl JobOutcome {
    pub fn kind(&self) -> JobKind {
        match self {
            JobOutcome::SuspendExpiredGrace { .. } => JobKind::SuspendExpiredGrace,
            JobOutcome::CheckDataCorruption { .. } => JobKind::CheckDataCorruption,
            JobOutcome::SendGraceReminders { .. } => JobKind::SendGraceReminders,
        }
    }

    /// Records affected: transitioned, corrupted or reminded
    pub fn affected(&self) -> usize {
        match self {
            JobOutcome::SuspendExpiredGrace { sweep, .. } => sweep.count(),
            JobOutcome::CheckDataCorruption { report } => report.len(),
            JobOutcome::SendGraceReminders { sent } => *sent,
        }
    }
}

pub struct JobRunner {
    engine: Arc<LifecycleEngine>,
    detector: Arc<CorruptionDetector>,
    metrics: Arc<MetricsRegistry>,
}

impl JobRunner {
    pub fn new(
        engine: Arc<LifecycleEngine>,
        detector: Arc<CorruptionDetector>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            engine,
            detector,
            metrics,
        }
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    pub fn detector(&self) -> &CorruptionDetector {
        &self.detector
    }

    pub fn run(&self, kind: JobKind, now: DateTime<Utc>) -> LifecycleResult<JobOutcome> {
        let scope = ObservationScope::with_fields("JOB_RUN", &[("job", kind.as_str())]);
        self.metrics.increment_job_runs();

        match self.execute(kind, now) {
            Ok(outcome) => {
                let affected = outcome.affected().to_string();
                scope.complete_with_fields(&[("affected", &affected)]);
                Ok(outcome)
            }
            Err(e) => {
                self.metrics.increment_job_failures();
                log_event_with_fields(
                    Event::JobFailed,
                    &[("job", kind.as_str()), ("error", &e.to_string())],
                );
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn execute(&self, kind: JobKind, now: DateTime<Utc>) -> LifecycleResult<JobOutcome> {
        match kind {
            JobKind::SuspendExpiredGrace => {
                let sweep = self.engine.process_expired_grace_periods_at(now)?;
                let notices_sent = self.engine.send_pending_expiry_notices_at(now)?;
                Ok(JobOutcome::SuspendExpiredGrace {
                    sweep,
                    notices_sent,
                })
            }
            JobKind::CheckDataCorruption => Ok(JobOutcome::CheckDataCorruption {
                report: self.detector.scan_for_corruption_at(now)?,
            }),
            JobKind::SendGraceReminders => Ok(JobOutcome::SendGraceReminders {
                sent: self.engine.send_grace_reminders_at(now)?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryDispatcher;
    use crate::subscription::{
        InMemorySubscriberStore, LifecycleConfig, Subscriber, SubscriberStore, SubscriptionStatus,
    };
    use chrono::TimeZone;
    use uuid::Uuid;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap()
    }

    fn runner(
        subscribers: Vec<Subscriber>,
        dispatcher: Arc<MemoryDispatcher>,
    ) -> (JobRunner, Arc<InMemorySubscriberStore>, Arc<MetricsRegistry>) {
        let store = Arc::new(InMemorySubscriberStore::with_subscribers(subscribers));
        let (runner, metrics) = runner_over(store.clone(), dispatcher);
        (runner, store, metrics)
    }

    fn runner_over(
        store: Arc<InMemorySubscriberStore>,
        dispatcher: Arc<MemoryDispatcher>,
    ) -> (JobRunner, Arc<MetricsRegistry>) {
        let metrics = Arc::new(MetricsRegistry::new());
        let engine = LifecycleEngine::new(
            store.clone(),
            dispatcher.clone(),
            LifecycleConfig::default(),
            metrics.clone(),
        );
        let detector = CorruptionDetector::new(
            store.clone(),
            dispatcher,
            vec!["ops@petport.test".to_string()],
            metrics.clone(),
        );
        (
            JobRunner::new(Arc::new(engine), Arc::new(detector), metrics.clone()),
            metrics,
        )
    }

    #[test]
    fn test_suspend_job_sends_expiry_notices() {
        let mut sub = Subscriber::active(Uuid::new_v4(), "g@example.com", "cus_g", at(1));
        sub.status = SubscriptionStatus::Grace;
        sub.grace_period_end = Some(at(2));
        let id = sub.user_id;
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let (runner, store, metrics) = runner(vec![sub], dispatcher.clone());

        let outcome = runner.run(JobKind::SuspendExpiredGrace, at(3)).unwrap();

        assert_eq!(outcome.kind(), JobKind::SuspendExpiredGrace);
        assert_eq!(outcome.affected(), 1);
        assert_eq!(dispatcher.sent_count(), 1);
        assert_eq!(
            store.get(id).unwrap().unwrap().status,
            SubscriptionStatus::Suspended
        );
        assert_eq!(metrics.snapshot().job_runs, 1);
    }

    #[test]
    fn test_expiry_notice_survives_failed_run() {
        let mut sub = Subscriber::active(Uuid::new_v4(), "r@example.com", "cus_r", at(1));
        sub.status = SubscriptionStatus::Grace;
        sub.grace_period_end = Some(at(2));
        let store = Arc::new(InMemorySubscriberStore::with_subscribers(vec![sub]));

        let (failing, metrics) =
            runner_over(store.clone(), Arc::new(MemoryDispatcher::failing("smtp down")));
        assert!(failing.run(JobKind::SuspendExpiredGrace, at(3)).is_err());
        assert_eq!(metrics.snapshot().job_failures, 1);

        let dispatcher = Arc::new(MemoryDispatcher::new());
        let (healthy, _) = runner_over(store, dispatcher.clone());

        // Already suspended, so the rerun moves nothing but still owes the notice
        let outcome = healthy.run(JobKind::SuspendExpiredGrace, at(4)).unwrap();
        assert_eq!(outcome.affected(), 0);
        assert_eq!(dispatcher.sent_count(), 1);

        healthy.run(JobKind::SuspendExpiredGrace, at(5)).unwrap();
        assert_eq!(dispatcher.sent_count(), 1);
    }

    #[test]
    fn test_failed_job_is_counted() {
        let mut sub = Subscriber::active(Uuid::new_v4(), "c@example.com", "cus_c", at(1));
        sub.stripe_customer_id = None;
        let (runner, _, metrics) = runner(vec![sub], Arc::new(MemoryDispatcher::failing("down")));

        assert!(runner.run(JobKind::CheckDataCorruption, at(3)).is_err());
        assert_eq!(metrics.snapshot().job_failures, 1);
    }

    #[test]
    fn test_outcome_json_is_tagged() {
        let (runner, _, _) = runner(Vec::new(), Arc::new(MemoryDispatcher::new()));
        let outcome = runner.run(JobKind::SendGraceReminders, at(3)).unwrap();

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["job"], "send-grace-reminders");
        assert_eq!(json["sent"], 0);
    }
}
