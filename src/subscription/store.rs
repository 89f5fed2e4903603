//! # Subscriber Store
//!
//! Storage abstraction for subscriber records. Mutation goes through
//! `update_if_status`, a compare-and-swap on `status`, so overlapping job
//! runs (possibly in different processes) never apply the same transition
//! twice.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::{StoreError, StoreResult};
use super::subscriber::{Subscriber, SubscriptionStatus};

/// Predicate for `SubscriberStore::select`. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriberFilter {
    /// Status must be one of these
    pub statuses: Option<Vec<SubscriptionStatus>>,

    /// `grace_period_end < t`; records without an end never match
    pub grace_period_end_before: Option<DateTime<Utc>>,

    /// `stripe_customer_id IS NULL`
    pub missing_customer_reference: bool,

    /// `expiry_notified_at IS NULL`
    pub expiry_notice_pending: bool,
}

impl SubscriberFilter {
    pub fn with_status(status: SubscriptionStatus) -> Self {
        Self {
            statuses: Some(vec![status]),
            ..Default::default()
        }
    }

    /// `status = grace AND grace_period_end < now`
    pub fn expired_grace(now: DateTime<Utc>) -> Self {
        Self {
            statuses: Some(vec![SubscriptionStatus::Grace]),
            grace_period_end_before: Some(now),
            ..Default::default()
        }
    }

    /// `status = suspended AND expiry_notified_at IS NULL`
    pub fn pending_expiry_notice() -> Self {
        Self {
            statuses: Some(vec![SubscriptionStatus::Suspended]),
            expiry_notice_pending: true,
            ..Default::default()
        }
    }

    /// `stripe_customer_id IS NULL AND status IN (active, grace)`
    pub fn missing_billing_reference() -> Self {
        Self {
            statuses: Some(vec![SubscriptionStatus::Active, SubscriptionStatus::Grace]),
            missing_customer_reference: true,
            ..Default::default()
        }
    }

    pub fn matches(&self, subscriber: &Subscriber) -> bool {
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&subscriber.status) {
                return false;
            }
        }
        if let Some(cutoff) = self.grace_period_end_before {
            match subscriber.grace_period_end {
                Some(end) if end < cutoff => {}
                _ => return false,
            }
        }
        if self.missing_customer_reference && subscriber.stripe_customer_id.is_some() {
            return false;
        }
        if self.expiry_notice_pending && subscriber.expiry_notified_at.is_some() {
            return false;
        }
        true
    }
}

/// The write half of a conditional update
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: SubscriptionStatus,
    pub grace_period_end: Option<DateTime<Utc>>,
    pub suspended_at: Option<DateTime<Utc>>,
    /// Becomes `updated_at`
    pub at: DateTime<Utc>,
}

impl StatusChange {
    /// `grace -> suspended` at `at`; clears `grace_period_end`
    pub fn suspend(at: DateTime<Utc>) -> Self {
        Self {
            status: SubscriptionStatus::Suspended,
            grace_period_end: None,
            suspended_at: Some(at),
            at,
        }
    }

    /// `active -> grace` ending at `grace_period_end`
    pub fn enter_grace(grace_period_end: DateTime<Utc>, at: DateTime<Utc>) -> Self {
        Self {
            status: SubscriptionStatus::Grace,
            grace_period_end: Some(grace_period_end),
            suspended_at: None,
            at,
        }
    }

    pub fn apply(&self, subscriber: &mut Subscriber) {
        subscriber.status = self.status;
        subscriber.grace_period_end = self.grace_period_end;
        subscriber.suspended_at = self.suspended_at;
        subscriber.expiry_notified_at = None;
        subscriber.updated_at = self.at;
    }
}

/// Subscriber store trait
///
/// Implementations must make `update_if_status` atomic with respect to every
/// other writer of the same record.
pub trait SubscriberStore: Send + Sync {
    /// Insert a new record
    fn insert(&self, subscriber: &Subscriber) -> StoreResult<()>;

    /// Find a record by user
    fn get(&self, user_id: Uuid) -> StoreResult<Option<Subscriber>>;

    /// All records matching `filter`, ordered by `user_id`
    fn select(&self, filter: &SubscriberFilter) -> StoreResult<Vec<Subscriber>>;

    /// Apply `change` only if the record's status is still `expected`.
    /// A change into `active` or `grace` also requires a customer reference
    /// at the moment of the swap.
    ///
    /// Returns `Ok(false)` when the record moved on or does not exist.
    fn update_if_status(
        &self,
        user_id: Uuid,
        expected: SubscriptionStatus,
        change: &StatusChange,
    ) -> StoreResult<bool>;

    /// Stamp `expiry_notified_at` if the record is still suspended and not
    /// yet stamped. Returns whether the stamp applied.
    fn mark_expiry_notified(&self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool>;

    /// Every record, ordered by `user_id`
    fn all(&self) -> StoreResult<Vec<Subscriber>> {
        self.select(&SubscriberFilter::default())
    }
}

/// Shared helper for stores that hold records in a map
pub(crate) fn compare_and_swap(
    records: &mut BTreeMap<Uuid, Subscriber>,
    user_id: Uuid,
    expected: SubscriptionStatus,
    change: &StatusChange,
) -> bool {
    match records.get_mut(&user_id) {
        Some(record) if record.status == expected => {
            if change.status.requires_customer_reference() && record.stripe_customer_id.is_none() {
                return false;
            }
            change.apply(record);
            true
        }
        _ => false,
    }
}

/// Shared helper for `mark_expiry_notified`
pub(crate) fn stamp_expiry_notified(
    records: &mut BTreeMap<Uuid, Subscriber>,
    user_id: Uuid,
    at: DateTime<Utc>,
) -> bool {
    match records.get_mut(&user_id) {
        Some(record)
            if record.status == SubscriptionStatus::Suspended
                && record.expiry_notified_at.is_none() =>
        {
            record.expiry_notified_at = Some(at);
            record.updated_at = at;
            true
        }
        _ => false,
    }
}

/// In-memory subscriber store
#[derive(Debug, Default)]
pub struct InMemorySubscriberStore {
    records: RwLock<BTreeMap<Uuid, Subscriber>>,
}

impl InMemorySubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `subscribers`
    pub fn with_subscribers(subscribers: impl IntoIterator<Item = Subscriber>) -> Self {
        let records = subscribers
            .into_iter()
            .map(|s| (s.user_id, s))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn len(&self) -> StoreResult<usize> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("Lock poisoned".to_string())
}

impl SubscriberStore for InMemorySubscriberStore {
    fn insert(&self, subscriber: &Subscriber) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        if records.contains_key(&subscriber.user_id) {
            return Err(StoreError::AlreadyExists(subscriber.user_id));
        }
        records.insert(subscriber.user_id, subscriber.clone());
        Ok(())
    }

    fn get(&self, user_id: Uuid) -> StoreResult<Option<Subscriber>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(&user_id).cloned())
    }

    fn select(&self, filter: &SubscriberFilter) -> StoreResult<Vec<Subscriber>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect())
    }

    fn update_if_status(
        &self,
        user_id: Uuid,
        expected: SubscriptionStatus,
        change: &StatusChange,
    ) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(compare_and_swap(&mut records, user_id, expected, change))
    }

    fn mark_expiry_notified(&self, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<bool> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(stamp_expiry_notified(&mut records, user_id, at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn in_grace(end: DateTime<Utc>) -> Subscriber {
        let mut sub = Subscriber::active(Uuid::new_v4(), "g@example.com", "cus_g", at(1));
        sub.status = SubscriptionStatus::Grace;
        sub.grace_period_end = Some(end);
        sub
    }

    #[test]
    fn test_expired_grace_filter_is_strict() {
        let filter = SubscriberFilter::expired_grace(at(5));

        assert!(filter.matches(&in_grace(at(4))));
        assert!(!filter.matches(&in_grace(at(5))));
        assert!(!filter.matches(&in_grace(at(6))));

        let active = Subscriber::active(Uuid::new_v4(), "a@example.com", "cus_a", at(1));
        assert!(!filter.matches(&active));
    }

    #[test]
    fn test_missing_reference_filter() {
        let filter = SubscriberFilter::missing_billing_reference();

        let mut sub = Subscriber::new(Uuid::new_v4(), "n@example.com", at(1));
        assert!(!filter.matches(&sub));

        sub.status = SubscriptionStatus::Active;
        assert!(filter.matches(&sub));

        sub.stripe_customer_id = Some("cus_1".into());
        assert!(!filter.matches(&sub));
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let store = InMemorySubscriberStore::new();
        let sub = Subscriber::new(Uuid::new_v4(), "d@example.com", at(1));

        store.insert(&sub).unwrap();
        assert!(matches!(store.insert(&sub), Err(StoreError::AlreadyExists(_))));
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_update_if_status_is_compare_and_swap() {
        let sub = in_grace(at(2));
        let id = sub.user_id;
        let store = InMemorySubscriberStore::with_subscribers([sub]);
        let change = StatusChange::suspend(at(3));

        assert!(store
            .update_if_status(id, SubscriptionStatus::Grace, &change)
            .unwrap());
        assert!(!store
            .update_if_status(id, SubscriptionStatus::Grace, &change)
            .unwrap());

        let stored = store.get(id).unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Suspended);
        assert_eq!(stored.suspended_at, Some(at(3)));
        assert_eq!(stored.grace_period_end, None);
        assert_eq!(stored.updated_at, at(3));
    }

    #[test]
    fn test_update_missing_record_is_a_miss() {
        let store = InMemorySubscriberStore::new();
        let applied = store
            .update_if_status(Uuid::new_v4(), SubscriptionStatus::Grace, &StatusChange::suspend(at(3)))
            .unwrap();
        assert!(!applied);
    }

    #[test]
    fn test_swap_into_grace_requires_customer_reference() {
        let mut sub = Subscriber::active(Uuid::new_v4(), "a@example.com", "cus_a", at(1));
        sub.stripe_customer_id = None;
        let id = sub.user_id;
        let store = InMemorySubscriberStore::with_subscribers([sub]);

        let applied = store
            .update_if_status(id, SubscriptionStatus::Active, &StatusChange::enter_grace(at(8), at(1)))
            .unwrap();

        assert!(!applied);
        assert_eq!(store.get(id).unwrap().unwrap().status, SubscriptionStatus::Active);
    }

    #[test]
    fn test_expiry_stamp_applies_once_and_resets_on_change() {
        let sub = in_grace(at(2));
        let id = sub.user_id;
        let store = InMemorySubscriberStore::with_subscribers([sub]);

        assert!(!store.mark_expiry_notified(id, at(3)).unwrap());

        store
            .update_if_status(id, SubscriptionStatus::Grace, &StatusChange::suspend(at(3)))
            .unwrap();
        let pending = SubscriberFilter::pending_expiry_notice();
        assert_eq!(store.select(&pending).unwrap().len(), 1);

        assert!(store.mark_expiry_notified(id, at(4)).unwrap());
        assert!(!store.mark_expiry_notified(id, at(5)).unwrap());
        assert!(store.select(&pending).unwrap().is_empty());
        assert_eq!(store.get(id).unwrap().unwrap().expiry_notified_at, Some(at(4)));
    }

    #[test]
    fn test_poisoned_lock_surfaces_in_len() {
        let store = std::sync::Arc::new(InMemorySubscriberStore::new());
        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.records.write().unwrap();
            panic!("poison");
        })
        .join();

        assert!(matches!(store.len(), Err(StoreError::Unavailable(_))));
    }
}
