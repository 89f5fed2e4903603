//! # Service Wiring
//!
//! Builds the store, dispatcher, engine, detector and job runner once from
//! configuration. The HTTP surface, the scheduler worker and the CLI all
//! share one `Services`.

use std::sync::Arc;

use crate::config::PetPortConfig;
use crate::jobs::JobRunner;
use crate::notify::{create_dispatcher, NotificationDispatcher};
use crate::observability::MetricsRegistry;
use crate::subscription::{
    CorruptionDetector, JsonFileSubscriberStore, LifecycleConfig, LifecycleEngine, SubscriberStore,
};

#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn SubscriberStore>,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub metrics: Arc<MetricsRegistry>,
    pub engine: Arc<LifecycleEngine>,
    pub detector: Arc<CorruptionDetector>,
    pub runner: Arc<JobRunner>,
}

impl Services {
    /// File store plus the dispatcher the config selects
    pub fn from_config(config: &PetPortConfig) -> Self {
        let store: Arc<dyn SubscriberStore> =
            Arc::new(JsonFileSubscriberStore::new(config.store_path()));
        let dispatcher = create_dispatcher(config.email.as_ref(), &config.app_url);

        Self::new(
            store,
            dispatcher,
            config.lifecycle.clone(),
            config.alerts.recipients.clone(),
        )
    }

    pub fn new(
        store: Arc<dyn SubscriberStore>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        lifecycle: LifecycleConfig,
        alert_recipients: Vec<String>,
    ) -> Self {
        let metrics = Arc::new(MetricsRegistry::new());
        let engine = Arc::new(LifecycleEngine::new(
            Arc::clone(&store),
            Arc::clone(&dispatcher),
            lifecycle,
            Arc::clone(&metrics),
        ));
        let detector = Arc::new(CorruptionDetector::new(
            Arc::clone(&store),
            Arc::clone(&dispatcher),
            alert_recipients,
            Arc::clone(&metrics),
        ));
        let runner = Arc::new(JobRunner::new(
            Arc::clone(&engine),
            Arc::clone(&detector),
            Arc::clone(&metrics),
        ));

        Self {
            store,
            dispatcher,
            metrics,
            engine,
            detector,
            runner,
        }
    }
}
