//! Subscriber File Store Tests
//!
//! The JSON file store is shared by separate job invocations. Conditional
//! updates must hold across independent handles on the same file.

mod common;

use std::sync::Arc;
use std::thread;

use petport::notify::MemoryDispatcher;
use petport::observability::MetricsRegistry;
use petport::subscription::{
    JsonFileSubscriberStore, LifecycleConfig, LifecycleEngine, StatusChange, SubscriberStore,
    SubscriptionStatus,
};
use tempfile::TempDir;

use common::{at, in_grace};

fn engine_for(store: JsonFileSubscriberStore) -> LifecycleEngine {
    LifecycleEngine::new(
        Arc::new(store),
        Arc::new(MemoryDispatcher::new()),
        LifecycleConfig::default(),
        Arc::new(MetricsRegistry::new()),
    )
}

#[test]
fn test_records_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("subscribers.json");
    let subscriber = in_grace("owner@petport.test", at(2024, 1, 1));

    JsonFileSubscriberStore::new(&path).insert(&subscriber).unwrap();

    let reopened = JsonFileSubscriberStore::new(&path);
    assert_eq!(reopened.get(subscriber.user_id).unwrap(), Some(subscriber));
}

#[test]
fn test_conditional_update_against_stale_status() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("subscribers.json");
    let subscriber = in_grace("owner@petport.test", at(2024, 1, 1));

    let first = JsonFileSubscriberStore::new(&path);
    let second = JsonFileSubscriberStore::new(&path);
    first.insert(&subscriber).unwrap();

    let change = StatusChange::suspend(at(2024, 1, 2));
    assert!(first
        .update_if_status(subscriber.user_id, SubscriptionStatus::Grace, &change)
        .unwrap());
    assert!(!second
        .update_if_status(subscriber.user_id, SubscriptionStatus::Grace, &change)
        .unwrap());
}

/// Overlapping sweeps over the same file suspend each record once in total.
#[test]
fn test_overlapping_sweeps_transition_each_record_once() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("subscribers.json");

    let seed = JsonFileSubscriberStore::new(&path);
    for i in 0..20 {
        seed.insert(&in_grace(&format!("owner{}@petport.test", i), at(2024, 1, 1)))
            .unwrap();
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine_for(JsonFileSubscriberStore::new(&path));
            thread::spawn(move || {
                engine
                    .process_expired_grace_periods_at(at(2024, 1, 2))
                    .unwrap()
                    .count()
            })
        })
        .collect();

    let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(total, 20);
    let suspended = seed
        .all()
        .unwrap()
        .into_iter()
        .filter(|s| s.status == SubscriptionStatus::Suspended)
        .count();
    assert_eq!(suspended, 20);
}

#[test]
fn test_expiry_stamp_persists_across_handles() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("subscribers.json");
    let subscriber = in_grace("owner@petport.test", at(2024, 1, 1));
    let id = subscriber.user_id;
    JsonFileSubscriberStore::new(&path).insert(&subscriber).unwrap();

    let engine = engine_for(JsonFileSubscriberStore::new(&path));
    engine.process_expired_grace_periods_at(at(2024, 1, 2)).unwrap();

    let other = JsonFileSubscriberStore::new(&path);
    assert!(other.mark_expiry_notified(id, at(2024, 1, 2)).unwrap());
    assert!(!JsonFileSubscriberStore::new(&path)
        .mark_expiry_notified(id, at(2024, 1, 3))
        .unwrap());

    assert_eq!(engine.send_pending_expiry_notices_at(at(2024, 1, 3)).unwrap(), 0);
    let stored = other.get(id).unwrap().unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Suspended);
    assert_eq!(stored.expiry_notified_at, Some(at(2024, 1, 2)));
}
