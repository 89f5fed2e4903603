//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::jobs::SchedulerError;
use crate::subscription::LifecycleError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Store file already exists
    AlreadyInitialized,
    /// Bad command argument
    InvalidArgument,
    /// A job or notification failed
    JobFailed,
    /// Server failed to start
    BootFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "PETPORT_CLI_CONFIG_ERROR",
            Self::IoError => "PETPORT_CLI_IO_ERROR",
            Self::AlreadyInitialized => "PETPORT_CLI_ALREADY_INITIALIZED",
            Self::InvalidArgument => "PETPORT_CLI_INVALID_ARGUMENT",
            Self::JobFailed => "PETPORT_CLI_JOB_FAILED",
            Self::BootFailed => "PETPORT_CLI_BOOT_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn already_initialized(path: impl fmt::Display) -> Self {
        Self::new(
            CliErrorCode::AlreadyInitialized,
            format!("Subscriber store already exists at {}", path),
        )
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::JobFailed, msg)
    }

    pub fn boot_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::BootFailed, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<LifecycleError> for CliError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::UnknownEventKind(_) | LifecycleError::InvalidGracePeriod(_) => {
                Self::invalid_argument(e.to_string())
            }
            other => Self::job_failed(other.to_string()),
        }
    }
}

impl From<SchedulerError> for CliError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::UnknownJob(_) => Self::invalid_argument(e.to_string()),
            SchedulerError::InvalidCron { .. } => Self::config_error(e.to_string()),
            SchedulerError::Internal(_) => Self::boot_failed(e.to_string()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::UnknownEventKind;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::invalid_argument("bad --at");
        assert_eq!(err.to_string(), "PETPORT_CLI_INVALID_ARGUMENT: bad --at");
    }

    #[test]
    fn test_unknown_event_kind_is_invalid_argument() {
        let err: CliError =
            LifecycleError::UnknownEventKind(UnknownEventKind("renewed".into())).into();
        assert_eq!(err.code(), &CliErrorCode::InvalidArgument);
    }
}
