//! # Lifecycle Transition Engine
//!
//! Moves subscribers `active -> grace -> suspended` and sends the grace
//! period notices. Every store write is a conditional update, so any of these
//! operations can run concurrently with itself.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{LifecycleError, LifecycleResult, StoreError};
use super::store::{StatusChange, SubscriberFilter, SubscriberStore};
use super::subscriber::{Subscriber, SubscriptionStatus};
use crate::notify::{
    DispatchError, GraceEventKind, GracePeriodNotice, Notification, NotificationDispatcher,
};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

/// Longest grace period the engine will start
pub const MAX_GRACE_DAYS: i64 = 365;

/// Lifecycle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Length of a grace period in days
    #[serde(default = "default_grace_days")]
    pub grace_days: i64,

    /// Whole days remaining at which a reminder goes out
    #[serde(default = "default_reminder_days")]
    pub reminder_days: Vec<i64>,

    /// Send an `expired` notice for each subscriber the suspend job moves
    #[serde(default = "default_notify_on_suspend")]
    pub notify_on_suspend: bool,
}

fn default_grace_days() -> i64 {
    7
}

fn default_reminder_days() -> Vec<i64> {
    vec![3, 1]
}

fn default_notify_on_suspend() -> bool {
    true
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grace_days: default_grace_days(),
            reminder_days: default_reminder_days(),
            notify_on_suspend: default_notify_on_suspend(),
        }
    }
}

/// Caller-supplied grace period event.
///
/// `event_kind` stays a raw string so unknown kinds are rejected by the
/// engine instead of the deserializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GracePeriodEventRequest {
    #[serde(alias = "recipientEmail")]
    pub recipient_email: String,

    #[serde(default, alias = "displayName")]
    pub display_name: Option<String>,

    #[serde(alias = "eventKind")]
    pub event_kind: String,

    #[serde(default, alias = "gracePeriodEnd")]
    pub grace_period_end: Option<DateTime<Utc>>,

    #[serde(default, alias = "daysRemaining")]
    pub days_remaining: Option<i64>,
}

/// A subscriber moved to `suspended` by a sweep
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuspendedSubscriber {
    pub user_id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    /// The grace end that expired
    pub grace_period_end: Option<DateTime<Utc>>,
    pub suspended_at: DateTime<Utc>,
}

/// Result of one `process_expired_grace_periods` run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraceSweep {
    pub evaluated_at: DateTime<Utc>,
    /// Records the query matched
    pub candidates: usize,
    /// Records this run actually transitioned
    pub transitioned: Vec<SuspendedSubscriber>,
}

impl GraceSweep {
    pub fn count(&self) -> usize {
        self.transitioned.len()
    }

    pub fn transitioned_ids(&self) -> Vec<Uuid> {
        self.transitioned.iter().map(|s| s.user_id).collect()
    }
}

/// Dispatch one notification and record the outcome
pub(crate) fn dispatch_counted(
    dispatcher: &dyn NotificationDispatcher,
    metrics: &MetricsRegistry,
    notification: &Notification,
) -> Result<(), DispatchError> {
    match dispatcher.dispatch(notification) {
        Ok(()) => {
            metrics.increment_notifications_dispatched();
            log_event_with_fields(
                Event::NotificationDispatched,
                &[("template", notification.template_name())],
            );
            Ok(())
        }
        Err(e) => {
            metrics.increment_dispatch_failures();
            log_event_with_fields(
                Event::DispatchFailed,
                &[
                    ("template", notification.template_name()),
                    ("error", &e.to_string()),
                ],
            );
            Err(e)
        }
    }
}

pub struct LifecycleEngine {
    store: Arc<dyn SubscriberStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    config: LifecycleConfig,
    metrics: Arc<MetricsRegistry>,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<dyn SubscriberStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        config: LifecycleConfig,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn process_expired_grace_periods(&self) -> LifecycleResult<GraceSweep> {
        self.process_expired_grace_periods_at(Utc::now())
    }

    /// Suspend every grace subscriber whose `grace_period_end < now`.
    ///
    /// A record another run already moved is skipped, not counted. Store
    /// errors abort the run; updates applied before the error stay applied
    /// and a rerun picks up the rest.
    pub fn process_expired_grace_periods_at(&self, now: DateTime<Utc>) -> LifecycleResult<GraceSweep> {
        let candidates = self.store.select(&SubscriberFilter::expired_grace(now))?;
        let change = StatusChange::suspend(now);
        let mut transitioned = Vec::new();

        for subscriber in &candidates {
            let user_id = subscriber.user_id.to_string();
            if self
                .store
                .update_if_status(subscriber.user_id, SubscriptionStatus::Grace, &change)?
            {
                self.metrics.increment_grace_suspensions();
                log_event_with_fields(Event::SubscriberSuspended, &[("user_id", &user_id)]);
                transitioned.push(SuspendedSubscriber {
                    user_id: subscriber.user_id,
                    email: subscriber.email.clone(),
                    display_name: subscriber.display_name.clone(),
                    grace_period_end: subscriber.grace_period_end,
                    suspended_at: now,
                });
            } else {
                self.metrics.increment_transitions_skipped();
                log_event_with_fields(
                    Event::TransitionSkipped,
                    &[("user_id", &user_id), ("expected", "grace")],
                );
            }
        }

        Ok(GraceSweep {
            evaluated_at: now,
            candidates: candidates.len(),
            transitioned,
        })
    }

    /// Validate `event_kind` and send exactly one notice. No retry.
    pub fn notify_grace_period_event(&self, request: &GracePeriodEventRequest) -> LifecycleResult<()> {
        let kind: GraceEventKind = match request.event_kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                log_event_with_fields(
                    Event::UnknownEventKind,
                    &[("event_kind", &request.event_kind)],
                );
                return Err(LifecycleError::UnknownEventKind(e));
            }
        };

        let notice = GracePeriodNotice {
            recipient_email: request.recipient_email.clone(),
            display_name: request.display_name.clone(),
            kind,
            grace_period_end: request.grace_period_end,
            days_remaining: request.days_remaining,
        };
        self.send_notice(notice)
    }

    pub fn begin_grace_period(&self, user_id: Uuid, grace_days: i64) -> LifecycleResult<bool> {
        self.begin_grace_period_at(user_id, grace_days, Utc::now())
    }

    /// Move an active subscriber into grace ending `grace_days` after `now`.
    ///
    /// Returns `Ok(false)` when the record is already in grace or was moved
    /// by a concurrent writer.
    pub fn begin_grace_period_at(
        &self,
        user_id: Uuid,
        grace_days: i64,
        now: DateTime<Utc>,
    ) -> LifecycleResult<bool> {
        if grace_days <= 0 || grace_days > MAX_GRACE_DAYS {
            return Err(LifecycleError::InvalidGracePeriod(format!(
                "grace_days must be between 1 and {}, got {}",
                MAX_GRACE_DAYS, grace_days
            )));
        }
        let end = Duration::try_days(grace_days)
            .and_then(|length| now.checked_add_signed(length))
            .ok_or_else(|| {
                LifecycleError::InvalidGracePeriod(format!(
                    "grace period of {} days from {} is out of range",
                    grace_days,
                    now.to_rfc3339()
                ))
            })?;

        let subscriber = self
            .store
            .get(user_id)?
            .ok_or(StoreError::NotFound(user_id))?;

        match subscriber.status {
            SubscriptionStatus::Grace => return Ok(false),
            status if !status.can_transition_to(SubscriptionStatus::Grace) => {
                return Err(LifecycleError::InvalidTransition {
                    from: status,
                    to: SubscriptionStatus::Grace,
                });
            }
            _ => {}
        }
        if subscriber.stripe_customer_id.is_none() {
            return Err(LifecycleError::MissingCustomerReference(user_id));
        }

        let change = StatusChange::enter_grace(end, now);
        let applied = self
            .store
            .update_if_status(user_id, SubscriptionStatus::Active, &change)?;

        let id = user_id.to_string();
        if applied {
            self.metrics.increment_grace_started();
            log_event_with_fields(
                Event::GraceStarted,
                &[("user_id", &id), ("grace_period_end", &end.to_rfc3339())],
            );
        } else {
            self.metrics.increment_transitions_skipped();
            log_event_with_fields(
                Event::TransitionSkipped,
                &[("user_id", &id), ("expected", "active")],
            );
        }
        Ok(applied)
    }

    pub fn send_grace_reminders(&self) -> LifecycleResult<usize> {
        self.send_grace_reminders_at(Utc::now())
    }

    /// Remind grace subscribers whose days remaining hit a configured mark.
    /// The first dispatch failure aborts the run.
    pub fn send_grace_reminders_at(&self, now: DateTime<Utc>) -> LifecycleResult<usize> {
        let in_grace = self
            .store
            .select(&SubscriberFilter::with_status(SubscriptionStatus::Grace))?;

        let mut sent = 0;
        for subscriber in &in_grace {
            let days = match subscriber.grace_days_remaining(now) {
                Some(days) if days > 0 && self.config.reminder_days.contains(&days) => days,
                _ => continue,
            };
            self.send_notice(notice_for(subscriber, GraceEventKind::Reminder, Some(days)))?;
            sent += 1;
        }
        Ok(sent)
    }

    pub fn send_pending_expiry_notices(&self) -> LifecycleResult<usize> {
        self.send_pending_expiry_notices_at(Utc::now())
    }

    /// Send the `expired` notice owed to each suspended subscriber, stamping
    /// the record once its send succeeds. The first dispatch failure aborts
    /// the run and leaves the remaining records pending for the next one.
    pub fn send_pending_expiry_notices_at(&self, now: DateTime<Utc>) -> LifecycleResult<usize> {
        if !self.config.notify_on_suspend {
            return Ok(0);
        }
        let pending = self.store.select(&SubscriberFilter::pending_expiry_notice())?;

        let mut sent = 0;
        for subscriber in &pending {
            self.send_notice(notice_for(subscriber, GraceEventKind::Expired, Some(0)))?;
            sent += 1;

            if !self.store.mark_expiry_notified(subscriber.user_id, now)? {
                self.metrics.increment_transitions_skipped();
                log_event_with_fields(
                    Event::TransitionSkipped,
                    &[("user_id", &subscriber.user_id.to_string()), ("expected", "suspended")],
                );
            }
        }
        Ok(sent)
    }

    fn send_notice(&self, notice: GracePeriodNotice) -> LifecycleResult<()> {
        let kind = notice.kind;
        let notification = Notification::GracePeriod(notice);
        dispatch_counted(self.dispatcher.as_ref(), &self.metrics, &notification)?;
        self.metrics.increment_grace_notices();
        log_event_with_fields(Event::GraceNoticeSent, &[("kind", kind.as_str())]);
        Ok(())
    }
}

fn notice_for(subscriber: &Subscriber, kind: GraceEventKind, days_remaining: Option<i64>) -> GracePeriodNotice {
    GracePeriodNotice {
        recipient_email: subscriber.email.clone(),
        display_name: subscriber.display_name.clone(),
        kind,
        grace_period_end: subscriber.grace_period_end,
        days_remaining,
    }
}
