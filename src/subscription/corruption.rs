//! # Corruption Detector
//!
//! Read-only scan for active or grace subscribers without a billing
//! customer reference. Findings go out as one batched alert; records are
//! never repaired here.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::errors::LifecycleResult;
use super::lifecycle::dispatch_counted;
use super::store::{SubscriberFilter, SubscriberStore};
use super::subscriber::{Subscriber, SubscriptionStatus};
use crate::notify::{Notification, NotificationDispatcher};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// One corrupted record as reported to operators
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorruptionEntry {
    pub user_id: Uuid,
    pub email: String,
    /// Always `None`; kept so the alert shows the broken field
    pub stripe_customer_id: Option<String>,
    pub status: SubscriptionStatus,
    pub detected_at: DateTime<Utc>,
}

impl CorruptionEntry {
    fn from_subscriber(subscriber: &Subscriber, detected_at: DateTime<Utc>) -> Self {
        Self {
            user_id: subscriber.user_id,
            email: subscriber.email.clone(),
            stripe_customer_id: subscriber.stripe_customer_id.clone(),
            status: subscriber.status,
            detected_at,
        }
    }
}

/// Result of one scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorruptionReport {
    pub detected_at: DateTime<Utc>,
    pub records: Vec<CorruptionEntry>,
}

impl CorruptionReport {
    pub fn is_healthy(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct CorruptionDetector {
    store: Arc<dyn SubscriberStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    recipients: Vec<String>,
    metrics: Arc<MetricsRegistry>,
}

impl CorruptionDetector {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        recipients: Vec<String>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            recipients,
            metrics,
        }
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn scan_for_corruption(&self) -> LifecycleResult<CorruptionReport> {
        self.scan_for_corruption_at(Utc::now())
    }

    /// Scan with `detected_at` fixed to `now`.
    ///
    /// Healthy scans have no side effect. Otherwise exactly one alert carries
    /// the full batch; a query or dispatch error fails the whole scan.
    pub fn scan_for_corruption_at(&self, now: DateTime<Utc>) -> LifecycleResult<CorruptionReport> {
        let matches = self
            .store
            .select(&SubscriberFilter::missing_billing_reference())?;

        let report = CorruptionReport {
            detected_at: now,
            records: matches
                .iter()
                .map(|s| CorruptionEntry::from_subscriber(s, now))
                .collect(),
        };

        if report.is_healthy() {
            self.metrics.record_corruption_scan(0);
            log_event_with_fields(Event::CorruptionScanHealthy, &[]);
            return Ok(report);
        }

        let alert = Notification::CorruptionBatch {
            recipients: self.recipients.clone(),
            detected_at: now,
            records: report.records.clone(),
        };
        dispatch_counted(self.dispatcher.as_ref(), &self.metrics, &alert)?;

        self.metrics.record_corruption_scan(report.len() as u64);
        let count = report.len().to_string();
        let ids = report
            .records
            .iter()
            .map(|r| r.user_id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        log_event_with_fields(
            Event::CorruptionDetected,
            &[("count", &count), ("user_ids", &ids)],
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryDispatcher;
    use crate::subscription::errors::LifecycleError;
    use crate::subscription::store::InMemorySubscriberStore;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, day, 12, 0, 0).unwrap()
    }

    fn detector(
        subscribers: Vec<Subscriber>,
        dispatcher: Arc<MemoryDispatcher>,
    ) -> (CorruptionDetector, Arc<InMemorySubscriberStore>) {
        let store = Arc::new(InMemorySubscriberStore::with_subscribers(subscribers));
        let detector = CorruptionDetector::new(
            store.clone(),
            dispatcher,
            vec!["ops@petport.test".to_string()],
            Arc::new(MetricsRegistry::new()),
        );
        (detector, store)
    }

    fn corrupted(status: SubscriptionStatus) -> Subscriber {
        let mut sub = Subscriber::active(Uuid::new_v4(), "c@example.com", "cus_x", at(1));
        sub.stripe_customer_id = None;
        sub.status = status;
        if status == SubscriptionStatus::Grace {
            sub.grace_period_end = Some(at(8));
        }
        sub
    }

    #[test]
    fn test_healthy_scan_has_no_side_effect() {
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let healthy = Subscriber::active(Uuid::new_v4(), "a@example.com", "cus_a", at(1));
        let (detector, _) = detector(vec![healthy], dispatcher.clone());

        let report = detector.scan_for_corruption_at(at(2)).unwrap();

        assert!(report.is_healthy());
        assert_eq!(dispatcher.sent_count(), 0);
    }

    #[test]
    fn test_findings_are_batched_into_one_alert() {
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let subs = vec![
            corrupted(SubscriptionStatus::Active),
            corrupted(SubscriptionStatus::Grace),
            corrupted(SubscriptionStatus::Active),
        ];
        let (detector, _) = detector(subs, dispatcher.clone());

        let report = detector.scan_for_corruption_at(at(2)).unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(dispatcher.sent_count(), 1);
        match &dispatcher.sent()[0] {
            Notification::CorruptionBatch {
                recipients,
                records,
                detected_at,
            } => {
                assert_eq!(recipients, &vec!["ops@petport.test".to_string()]);
                assert_eq!(records.len(), 3);
                assert_eq!(*detected_at, at(2));
                assert!(records.iter().all(|r| r.stripe_customer_id.is_none()));
            }
            other => panic!("unexpected notification: {:?}", other),
        }
    }

    #[test]
    fn test_scan_never_repairs() {
        let dispatcher = Arc::new(MemoryDispatcher::new());
        let sub = corrupted(SubscriptionStatus::Active);
        let before = sub.clone();
        let (detector, store) = detector(vec![sub], dispatcher);

        detector.scan_for_corruption_at(at(2)).unwrap();

        assert_eq!(store.get(before.user_id).unwrap(), Some(before));
    }

    #[test]
    fn test_dispatch_failure_fails_scan() {
        let dispatcher = Arc::new(MemoryDispatcher::failing("relay down"));
        let (detector, _) = detector(vec![corrupted(SubscriptionStatus::Grace)], dispatcher);

        let err = detector.scan_for_corruption_at(at(2)).unwrap_err();
        assert!(matches!(err, LifecycleError::Dispatch(_)));
    }
}
