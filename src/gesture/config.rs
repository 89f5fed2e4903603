//! Gesture recognizer and arbiter configuration

use serde::{Deserialize, Serialize};

use super::errors::{GestureError, GestureResult};

/// Recognizer and arbiter constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Displacement in px before an axis is committed
    #[serde(default = "default_min_delta_px")]
    pub min_delta_px: f64,

    /// Largest angle from horizontal, in degrees, still read as a swipe
    #[serde(default = "default_max_angle_deg")]
    pub max_angle_deg: f64,

    /// Pull distance in px that arms a refresh
    #[serde(default = "default_refresh_threshold_px")]
    pub refresh_threshold_px: f64,

    /// How long the pull affordance lingers after the pull returns to 0
    #[serde(default = "default_affordance_hide_delay_ms")]
    pub affordance_hide_delay_ms: u64,
}

fn default_min_delta_px() -> f64 {
    56.0
}

fn default_max_angle_deg() -> f64 {
    30.0
}

fn default_refresh_threshold_px() -> f64 {
    80.0
}

fn default_affordance_hide_delay_ms() -> u64 {
    5000
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_delta_px: default_min_delta_px(),
            max_angle_deg: default_max_angle_deg(),
            refresh_threshold_px: default_refresh_threshold_px(),
            affordance_hide_delay_ms: default_affordance_hide_delay_ms(),
        }
    }
}

impl GestureConfig {
    pub fn validate(&self) -> GestureResult<()> {
        if !(self.min_delta_px.is_finite() && self.min_delta_px > 0.0) {
            return Err(GestureError::InvalidConfig(format!(
                "min_delta_px must be positive, got {}",
                self.min_delta_px
            )));
        }
        if !(self.max_angle_deg > 0.0 && self.max_angle_deg < 90.0) {
            return Err(GestureError::InvalidConfig(format!(
                "max_angle_deg must be in (0, 90), got {}",
                self.max_angle_deg
            )));
        }
        if !(self.refresh_threshold_px.is_finite() && self.refresh_threshold_px > 0.0) {
            return Err(GestureError::InvalidConfig(format!(
                "refresh_threshold_px must be positive, got {}",
                self.refresh_threshold_px
            )));
        }
        Ok(())
    }
}
