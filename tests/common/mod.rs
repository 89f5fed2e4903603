//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use petport::notify::MemoryDispatcher;
use petport::services::Services;
use petport::subscription::{
    InMemorySubscriberStore, LifecycleConfig, Subscriber, SubscriptionStatus,
};
use uuid::Uuid;

pub const OPS: &str = "ops@petport.test";

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

pub fn active(email: &str, customer: &str) -> Subscriber {
    Subscriber::active(Uuid::new_v4(), email, customer, at(2023, 12, 1))
}

pub fn in_grace(email: &str, grace_period_end: DateTime<Utc>) -> Subscriber {
    let mut subscriber = active(email, "cus_grace");
    subscriber.status = SubscriptionStatus::Grace;
    subscriber.grace_period_end = Some(grace_period_end);
    subscriber
}

pub fn with_status(email: &str, status: SubscriptionStatus, customer: Option<&str>) -> Subscriber {
    let mut subscriber = Subscriber::new(Uuid::new_v4(), email, at(2023, 12, 1));
    subscriber.status = status;
    subscriber.stripe_customer_id = customer.map(str::to_string);
    subscriber
}

pub fn memory_services(
    subscribers: Vec<Subscriber>,
) -> (Services, Arc<InMemorySubscriberStore>, Arc<MemoryDispatcher>) {
    let store = Arc::new(InMemorySubscriberStore::with_subscribers(subscribers));
    let dispatcher = Arc::new(MemoryDispatcher::new());
    let services = Services::new(
        store.clone(),
        dispatcher.clone(),
        LifecycleConfig::default(),
        vec![OPS.to_string()],
    );
    (services, store, dispatcher)
}
