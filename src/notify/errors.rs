//! # Notification Errors

use thiserror::Error;

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Notification delivery errors
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Build(String),

    /// Relay refused or was unreachable
    #[error("Transport error: {0}")]
    Transport(String),
}

/// A grace period event kind outside `started | reminder | expired`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown grace period event kind: {0}")]
pub struct UnknownEventKind(pub String);
