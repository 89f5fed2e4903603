//! # Scheduler Errors

use thiserror::Error;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler errors
#[derive(Debug, Clone, Error)]
pub enum SchedulerError {
    #[error("Invalid cron expression '{expr}': {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("Unknown job: {0}")]
    UnknownJob(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            SchedulerError::InvalidCron { .. } => 400,
            SchedulerError::UnknownJob(_) => 404,
            SchedulerError::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = SchedulerError::InvalidCron {
            expr: "nope".into(),
            reason: "bad".into(),
        };
        assert_eq!(err.status_code(), 400);
        assert_eq!(SchedulerError::UnknownJob("x".into()).status_code(), 404);
    }
}
