//! # Subscription Lifecycle
//!
//! Subscriber records, their stores, the grace period transition engine and
//! the billing-reference corruption detector.

pub mod corruption;
pub mod errors;
pub mod file_store;
pub mod lifecycle;
pub mod store;
pub mod subscriber;

pub use corruption::{CorruptionDetector, CorruptionEntry, CorruptionReport};
pub use errors::{LifecycleError, LifecycleResult, StoreError, StoreResult};
pub use file_store::JsonFileSubscriberStore;
pub use lifecycle::{
    GracePeriodEventRequest, GraceSweep, LifecycleConfig, LifecycleEngine, SuspendedSubscriber,
    MAX_GRACE_DAYS,
};
pub use store::{InMemorySubscriberStore, StatusChange, SubscriberFilter, SubscriberStore};
pub use subscriber::{InvariantViolation, Subscriber, SubscriptionStatus};
