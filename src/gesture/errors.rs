//! # Gesture Errors
//!
//! Only configuration can fail. Refresh failures and multi-touch aborts are
//! absorbed by the arbiter and recognizer.

use thiserror::Error;

/// Result type for gesture configuration
pub type GestureResult<T> = Result<T, GestureError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GestureError {
    #[error("Invalid gesture config: {0}")]
    InvalidConfig(String),
}
