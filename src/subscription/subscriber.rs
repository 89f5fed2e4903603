//! # Subscriber Records
//!
//! Subscriber model and billing status. Records are created by the billing
//! collaborator and mutated only through conditional status changes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing status of a subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid and in good standing
    Active,
    /// Payment failed; service continues until `grace_period_end`
    Grace,
    /// Grace period ran out without payment
    Suspended,
    /// Explicitly canceled
    Canceled,
    /// Never subscribed
    NotStarted,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Grace => "grace",
            Self::Suspended => "suspended",
            Self::Canceled => "canceled",
            Self::NotStarted => "not_started",
        }
    }

    /// Statuses that must carry a billing-processor customer reference
    pub fn requires_customer_reference(&self) -> bool {
        matches!(self, Self::Active | Self::Grace)
    }

    /// Whether `self -> target` is a legal lifecycle step.
    ///
    /// Reactivation to `Active` is driven by payment confirmation from the
    /// billing processor; everything else moves forward only.
    pub fn can_transition_to(&self, target: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (NotStarted, Active)
                | (Active, Grace)
                | (Active, Canceled)
                | (Grace, Suspended)
                | (Grace, Active)
                | (Suspended, Active)
                | (Canceled, Active)
        )
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record that breaks one of the subscriber invariants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantViolation {
    /// `grace` without a `grace_period_end`
    GraceWithoutEnd,
    /// `suspended` without a `suspended_at`
    SuspendedWithoutTimestamp,
    /// `active`/`grace` without a billing customer reference
    MissingCustomerReference,
}

impl InvariantViolation {
    pub fn description(&self) -> &'static str {
        match self {
            Self::GraceWithoutEnd => "grace subscriber has no grace_period_end",
            Self::SuspendedWithoutTimestamp => "suspended subscriber has no suspended_at",
            Self::MissingCustomerReference => "active or grace subscriber has no stripe_customer_id",
        }
    }
}

/// Subscriber record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Owning user
    pub user_id: Uuid,

    /// Where notifications go
    pub email: String,

    /// Greeting name for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Billing-processor customer reference
    pub stripe_customer_id: Option<String>,

    pub status: SubscriptionStatus,

    /// Set on entering grace, cleared on exit
    #[serde(default)]
    pub grace_period_end: Option<DateTime<Utc>>,

    /// Set on entering suspended
    #[serde(default)]
    pub suspended_at: Option<DateTime<Utc>>,

    /// When the `expired` notice for the current suspension went out.
    /// Reset by every status change.
    #[serde(default)]
    pub expiry_notified_at: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

impl Subscriber {
    /// A subscriber who has not started billing yet
    pub fn new(user_id: Uuid, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            email: email.into(),
            display_name: None,
            stripe_customer_id: None,
            status: SubscriptionStatus::NotStarted,
            grace_period_end: None,
            suspended_at: None,
            expiry_notified_at: None,
            updated_at: now,
        }
    }

    /// An active subscriber linked to a billing customer
    pub fn active(
        user_id: Uuid,
        email: impl Into<String>,
        stripe_customer_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            stripe_customer_id: Some(stripe_customer_id.into()),
            status: SubscriptionStatus::Active,
            ..Self::new(user_id, email, now)
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Active/grace without a customer reference
    pub fn is_corrupted(&self) -> bool {
        self.status.requires_customer_reference() && self.stripe_customer_id.is_none()
    }

    /// Check the record-level invariants. Timing of `grace_period_end` is only
    /// checked when entering grace, not here.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.is_corrupted() {
            return Err(InvariantViolation::MissingCustomerReference);
        }
        match self.status {
            SubscriptionStatus::Grace if self.grace_period_end.is_none() => {
                Err(InvariantViolation::GraceWithoutEnd)
            }
            SubscriptionStatus::Suspended if self.suspended_at.is_none() => {
                Err(InvariantViolation::SuspendedWithoutTimestamp)
            }
            _ => Ok(()),
        }
    }

    /// Whole days left in grace at `now`, rounded up. `None` outside grace.
    pub fn grace_days_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.status != SubscriptionStatus::Grace {
            return None;
        }
        let end = self.grace_period_end?;
        let seconds = (end - now).num_seconds();
        if seconds <= 0 {
            return Some(0);
        }
        Some((seconds + 86_399) / 86_400)
    }
}
