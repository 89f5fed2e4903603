//! # Subscription Errors

use thiserror::Error;
use uuid::Uuid;

use super::subscriber::SubscriptionStatus;
use crate::notify::{DispatchError, UnknownEventKind};

/// Result type for subscriber store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for lifecycle and corruption operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Subscriber store errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store could not be reached or locked
    #[error("Subscriber store unavailable: {0}")]
    Unavailable(String),

    #[error("Subscriber not found: {0}")]
    NotFound(Uuid),

    #[error("Subscriber already exists: {0}")]
    AlreadyExists(Uuid),

    /// Stored data could not be decoded
    #[error("Subscriber store data is unreadable: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn status_code(&self) -> u16 {
        match self {
            StoreError::Unavailable(_) => 503,
            StoreError::NotFound(_) => 404,
            StoreError::AlreadyExists(_) => 409,
            StoreError::Corrupt(_) => 500,
        }
    }
}

/// Errors surfaced by the lifecycle engine and corruption detector
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Contract error from the caller; never defaulted to a template
    #[error(transparent)]
    UnknownEventKind(#[from] UnknownEventKind),

    /// Delivery failed; retry belongs to the caller
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    },

    #[error("Subscriber {0} has no billing customer reference")]
    MissingCustomerReference(Uuid),

    #[error("Invalid grace period: {0}")]
    InvalidGracePeriod(String),
}

impl LifecycleError {
    /// HTTP status code for the function surface
    pub fn status_code(&self) -> u16 {
        match self {
            LifecycleError::Store(e) => e.status_code(),
            LifecycleError::UnknownEventKind(_) => 400,
            LifecycleError::Dispatch(_) => 502,
            LifecycleError::InvalidTransition { .. } => 409,
            LifecycleError::MissingCustomerReference(_) => 422,
            LifecycleError::InvalidGracePeriod(_) => 400,
        }
    }

    /// Errors caused by the caller rather than by a collaborator
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
