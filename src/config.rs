//! # PetPort Configuration
//!
//! One JSON file. Every section has serde defaults except `alerts`, which
//! must name at least one operator address.
//!
//! ```json
//! {
//!   "store_path": "./data/subscribers.json",
//!   "app_url": "https://app.petport.app",
//!   "alerts": { "recipients": ["ops@petport.app"] },
//!   "email": { "smtp_host": "smtp.example.com", "smtp_user": "petport" },
//!   "schedule": { "suspend_expired_grace": "0 * * * *" },
//!   "lifecycle": { "grace_days": 7 },
//!   "log_level": "info"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gesture::GestureConfig;
use crate::http_server::HttpServerConfig;
use crate::jobs::ScheduleConfig;
use crate::notify::EmailSettings;
use crate::observability::Severity;
use crate::subscription::{LifecycleConfig, MAX_GRACE_DAYS};

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Operator alert routing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Corruption alerts go to every address here
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PetPortConfig {
    /// JSON subscriber store
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Public app URL used in notification links
    #[serde(default = "default_app_url")]
    pub app_url: String,

    #[serde(default)]
    pub http: HttpServerConfig,

    /// SMTP relay; notifications are only logged when absent
    #[serde(default)]
    pub email: Option<EmailSettings>,

    #[serde(default)]
    pub alerts: AlertConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    pub gesture: GestureConfig,

    /// Minimum log severity (`trace` .. `fatal`)
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_store_path() -> String {
    "./data/subscribers.json".to_string()
}

fn default_app_url() -> String {
    "http://localhost:5173".to_string()
}

impl Default for PetPortConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            app_url: default_app_url(),
            http: HttpServerConfig::default(),
            email: None,
            alerts: AlertConfig::default(),
            schedule: ScheduleConfig::default(),
            lifecycle: LifecycleConfig::default(),
            gesture: GestureConfig::default(),
            log_level: None,
        }
    }
}

impl PetPortConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config: PetPortConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.store_path.trim().is_empty() {
            return Err(ConfigError::Invalid("store_path must not be empty".into()));
        }

        if self.alerts.recipients.is_empty() {
            return Err(ConfigError::Invalid(
                "alerts.recipients must name at least one address".into(),
            ));
        }
        if let Some(bad) = self.alerts.recipients.iter().find(|r| !r.contains('@')) {
            return Err(ConfigError::Invalid(format!(
                "alerts.recipients contains an invalid address: '{}'",
                bad
            )));
        }

        self.schedule
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("schedule: {}", e)))?;

        let grace_days = self.lifecycle.grace_days;
        if grace_days <= 0 || grace_days > MAX_GRACE_DAYS {
            return Err(ConfigError::Invalid(format!(
                "lifecycle.grace_days must be between 1 and {}, got {}",
                MAX_GRACE_DAYS, grace_days
            )));
        }
        if self.lifecycle.reminder_days.iter().any(|d| *d <= 0) {
            return Err(ConfigError::Invalid(
                "lifecycle.reminder_days must all be positive".into(),
            ));
        }

        self.gesture
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("gesture: {}", e)))?;

        if let Some(level) = &self.log_level {
            if Severity::parse(level).is_none() {
                return Err(ConfigError::Invalid(format!("Unknown log_level: '{}'", level)));
            }
        }

        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(&self.store_path)
    }

    pub fn log_severity(&self) -> Option<Severity> {
        self.log_level.as_deref().and_then(Severity::parse)
    }
}
