//! # Notification Dispatchers
//!
//! The dispatcher owns delivery and any delivery retries; callers get one
//! success or failure per notification.

use std::sync::{Arc, RwLock};

use super::errors::{DispatchError, DispatchResult};
use super::notification::Notification;
use super::smtp::{EmailSettings, SmtpDispatcher};
use crate::observability::{log_event_with_fields, Event};

/// Dispatcher trait for abstraction over delivery channels
pub trait NotificationDispatcher: Send + Sync {
    /// Deliver one notification
    fn dispatch(&self, notification: &Notification) -> DispatchResult<()>;
}

/// Records notifications in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryDispatcher {
    sent: RwLock<Vec<Notification>>,
    failure: Option<String>,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher whose every delivery fails with `reason`
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            sent: RwLock::new(Vec::new()),
            failure: Some(reason.into()),
        }
    }

    /// Delivered notifications, oldest first
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.write() {
            sent.clear();
        }
    }
}

impl NotificationDispatcher for MemoryDispatcher {
    fn dispatch(&self, notification: &Notification) -> DispatchResult<()> {
        if let Some(reason) = &self.failure {
            return Err(DispatchError::Transport(reason.clone()));
        }
        self.sent
            .write()
            .map_err(|_| DispatchError::Transport("Lock poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

/// Writes rendered notifications to the structured log instead of sending them.
///
/// Selected when no SMTP relay is configured.
#[derive(Debug, Clone)]
pub struct LogDispatcher {
    app_url: String,
}

impl LogDispatcher {
    pub fn new(app_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into(),
        }
    }
}

impl NotificationDispatcher for LogDispatcher {
    fn dispatch(&self, notification: &Notification) -> DispatchResult<()> {
        let message = notification.render(&self.app_url);
        let to = message.to.join(",");
        log_event_with_fields(
            Event::NotificationLogged,
            &[
                ("template", notification.template_name()),
                ("to", &to),
                ("subject", &message.subject),
            ],
        );
        Ok(())
    }
}

/// Pick a dispatcher from configuration
pub fn create_dispatcher(email: Option<&EmailSettings>, app_url: &str) -> Arc<dyn NotificationDispatcher> {
    match email {
        Some(settings) => Arc::new(SmtpDispatcher::new(settings.clone(), app_url)),
        None => Arc::new(LogDispatcher::new(app_url)),
    }
}
