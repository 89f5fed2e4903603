//! # Notifications
//!
//! What the lifecycle engine and corruption detector hand to a dispatcher,
//! and the plain-text templates they render to.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::UnknownEventKind;
use crate::subscription::CorruptionEntry;

/// Grace period event kinds, one template each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraceEventKind {
    Started,
    Reminder,
    Expired,
}

impl GraceEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Reminder => "reminder",
            Self::Expired => "expired",
        }
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            Self::Started => "grace_started",
            Self::Reminder => "grace_reminder",
            Self::Expired => "grace_expired",
        }
    }
}

impl FromStr for GraceEventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "started" => Ok(Self::Started),
            "reminder" => Ok(Self::Reminder),
            "expired" => Ok(Self::Expired),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

impl fmt::Display for GraceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-facing grace period message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GracePeriodNotice {
    pub recipient_email: String,
    pub display_name: Option<String>,
    pub kind: GraceEventKind,
    pub grace_period_end: Option<DateTime<Utc>>,
    pub days_remaining: Option<i64>,
}

/// Anything a dispatcher can deliver
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    GracePeriod(GracePeriodNotice),

    /// One ops alert covering every corrupted record found by a scan
    CorruptionBatch {
        recipients: Vec<String>,
        detected_at: DateTime<Utc>,
        records: Vec<CorruptionEntry>,
    },
}

impl Notification {
    pub fn template_name(&self) -> &'static str {
        match self {
            Notification::GracePeriod(notice) => notice.kind.template_name(),
            Notification::CorruptionBatch { .. } => "corruption_batch",
        }
    }

    pub fn recipients(&self) -> Vec<&str> {
        match self {
            Notification::GracePeriod(notice) => vec![notice.recipient_email.as_str()],
            Notification::CorruptionBatch { recipients, .. } => {
                recipients.iter().map(String::as_str).collect()
            }
        }
    }

    /// Render to subject and body. `app_url` prefixes the billing link.
    pub fn render(&self, app_url: &str) -> RenderedMessage {
        let to = self.recipients().into_iter().map(str::to_string).collect();
        let (subject, body) = match self {
            Notification::GracePeriod(notice) => render_grace(notice, app_url),
            Notification::CorruptionBatch {
                detected_at,
                records,
                ..
            } => render_corruption(*detected_at, records),
        };
        RenderedMessage { to, subject, body }
    }
}

/// A rendered plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|| "the end of your grace period".to_string())
}

fn render_grace(notice: &GracePeriodNotice, app_url: &str) -> (String, String) {
    let greeting = match &notice.display_name {
        Some(name) if !name.trim().is_empty() => format!("Hi {},", name.trim()),
        _ => "Hi there,".to_string(),
    };
    let billing_link = format!("{}/settings/billing", app_url.trim_end_matches('/'));
    let end = format_date(notice.grace_period_end);

    match notice.kind {
        GraceEventKind::Started => (
            "Your PetPort payment didn't go through".to_string(),
            format!(
                "{}\n\n\
                We couldn't process your latest PetPort payment.\n\n\
                Your pet profiles, emergency info and documents stay fully available until {}.\n\
                Update your payment method to keep everything running:\n\n\
                {}\n\n\
                Thanks,\n\
                The PetPort Team",
                greeting, end, billing_link
            ),
        ),
        GraceEventKind::Reminder => {
            let days = notice.days_remaining.unwrap_or(0).max(0);
            let unit = if days == 1 { "day" } else { "days" };
            (
                format!("{} {} left to update your PetPort payment", days, unit),
                format!(
                    "{}\n\n\
                    Your PetPort grace period ends on {} ({} {} from now).\n\
                    After that, premium features on your pet profiles will be paused.\n\n\
                    Update your payment method here:\n\n\
                    {}\n\n\
                    Thanks,\n\
                    The PetPort Team",
                    greeting, end, days, unit, billing_link
                ),
            )
        }
        GraceEventKind::Expired => (
            "Your PetPort subscription has been suspended".to_string(),
            format!(
                "{}\n\n\
                Your grace period has ended and your PetPort subscription is now suspended.\n\
                Your data is safe. Reactivate any time to restore full access:\n\n\
                {}\n\n\
                Thanks,\n\
                The PetPort Team",
                greeting, billing_link
            ),
        ),
    }
}

fn render_corruption(detected_at: DateTime<Utc>, records: &[CorruptionEntry]) -> (String, String) {
    let noun = if records.len() == 1 { "record" } else { "records" };
    let subject = format!(
        "[PetPort] {} subscriber {} missing billing reference",
        records.len(),
        noun
    );

    let mut body = format!(
        "Corruption scan at {} found {} active or grace subscriber {} without a stripe_customer_id.\n\
        These records were NOT modified. Re-link them with the billing processor.\n\n",
        detected_at.to_rfc3339(),
        records.len(),
        noun
    );
    for entry in records {
        body.push_str(&format!(
            "- user_id={} email={} status={}\n",
            entry.user_id, entry.email, entry.status
        ));
    }

    (subject, body)
}
