//! # SMTP Delivery
//!
//! Sends rendered notifications through an SMTP relay with `lettre`.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use serde::{Deserialize, Serialize};

use super::dispatcher::NotificationDispatcher;
use super::errors::{DispatchError, DispatchResult};
use super::notification::{Notification, RenderedMessage};

/// SMTP relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    /// SMTP server host
    pub smtp_host: String,

    /// SMTP server port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username; empty means an unauthenticated local relay
    #[serde(default)]
    pub smtp_user: String,

    /// SMTP password (should come from secrets)
    #[serde(default, skip_serializing)]
    pub smtp_password: String,

    #[serde(default = "default_from_email")]
    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_email() -> String {
    "billing@petport.app".to_string()
}

fn default_from_name() -> String {
    "PetPort".to_string()
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_user: String::new(),
            smtp_password: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
        }
    }
}

/// SMTP notification dispatcher
pub struct SmtpDispatcher {
    settings: EmailSettings,
    /// Public app URL used in message links
    app_url: String,
}

impl SmtpDispatcher {
    pub fn new(settings: EmailSettings, app_url: impl Into<String>) -> Self {
        Self {
            settings,
            app_url: app_url.into(),
        }
    }

    fn build_message(&self, rendered: &RenderedMessage) -> DispatchResult<Message> {
        let from: Mailbox = format!("{} <{}>", self.settings.from_name, self.settings.from_email)
            .parse()
            .map_err(|e| DispatchError::InvalidAddress(format!("from: {}", e)))?;

        if rendered.to.is_empty() {
            return Err(DispatchError::InvalidAddress("no recipients".to_string()));
        }

        let mut builder = Message::builder().from(from);
        for recipient in &rendered.to {
            let mailbox: Mailbox = recipient
                .parse()
                .map_err(|e| DispatchError::InvalidAddress(format!("{}: {}", recipient, e)))?;
            builder = builder.to(mailbox);
        }

        builder
            .subject(rendered.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(rendered.body.clone())
            .map_err(|e| DispatchError::Build(e.to_string()))
    }

    fn transport(&self) -> DispatchResult<SmtpTransport> {
        if self.settings.smtp_user.is_empty() {
            // Local development relays take plaintext without auth
            return Ok(SmtpTransport::builder_dangerous(&self.settings.smtp_host)
                .port(self.settings.smtp_port)
                .build());
        }

        let creds = Credentials::new(
            self.settings.smtp_user.clone(),
            self.settings.smtp_password.clone(),
        );

        Ok(SmtpTransport::relay(&self.settings.smtp_host)
            .map_err(|e| DispatchError::Transport(format!("SMTP relay error: {}", e)))?
            .credentials(creds)
            .port(self.settings.smtp_port)
            .build())
    }
}

impl NotificationDispatcher for SmtpDispatcher {
    fn dispatch(&self, notification: &Notification) -> DispatchResult<()> {
        let rendered = notification.render(&self.app_url);
        let message = self.build_message(&rendered)?;

        self.transport()?
            .send(&message)
            .map_err(|e| DispatchError::Transport(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}
