//! Editor configuration.

use crate::design::Dimensions;
use crate::history::MAX_UNDO_HISTORY;
use crate::selection::ROTATION_SNAP_DEGREES;
use crate::tools::ToolSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Parse(String),
    #[error("Invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for an editor session. Every field has a default, so partial
/// JSON is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Undo snapshots kept.
    pub history_limit: usize,
    /// Quiet period before an auto-save fires.
    pub autosave_delay_ms: u64,
    /// Thumbnail render scale relative to the design size.
    pub thumbnail_multiplier: f64,
    /// Thumbnail JPEG quality, 0.0 to 1.0.
    pub thumbnail_quality: f64,
    pub default_dimensions: Dimensions,
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub nudge_step: f64,
    pub nudge_step_large: f64,
    pub rotation_snap_degrees: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: MAX_UNDO_HISTORY,
            autosave_delay_ms: 2500,
            thumbnail_multiplier: 0.25,
            thumbnail_quality: 0.4,
            default_dimensions: Dimensions::default(),
            zoom_min: 0.1,
            zoom_max: 5.0,
            nudge_step: 1.0,
            nudge_step_large: 10.0,
            rotation_snap_degrees: ROTATION_SNAP_DEGREES,
        }
    }
}

impl EditorConfig {
    /// Parse and validate.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.history_limit == 0 {
            return Err(invalid("history_limit", "must be at least 1"));
        }
        if !(self.thumbnail_multiplier > 0.0 && self.thumbnail_multiplier <= 4.0) {
            return Err(invalid("thumbnail_multiplier", "must be in (0, 4]"));
        }
        if !(0.0..=1.0).contains(&self.thumbnail_quality) {
            return Err(invalid("thumbnail_quality", "must be in [0, 1]"));
        }
        if !(self.zoom_min > 0.0 && self.zoom_min <= self.zoom_max) {
            return Err(invalid("zoom_min", "must be positive and not above zoom_max"));
        }
        if !(self.nudge_step > 0.0 && self.nudge_step_large > 0.0) {
            return Err(invalid("nudge_step", "must be positive"));
        }
        if self.rotation_snap_degrees <= 0.0 {
            return Err(invalid("rotation_snap_degrees", "must be positive"));
        }
        self.default_dimensions
            .validate()
            .map_err(|e| invalid("default_dimensions", e.to_string()))
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            nudge_step: self.nudge_step,
            nudge_step_large: self.nudge_step_large,
            rotation_snap_degrees: self.rotation_snap_degrees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EditorConfig::default();
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.autosave_delay_ms, 2500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = EditorConfig::from_json(r#"{ "autosave_delay_ms": 1000 }"#).unwrap();
        assert_eq!(config.autosave_delay_ms, 1000);
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            EditorConfig::from_json(r#"{ "history_limit": 0 }"#),
            Err(ConfigError::Invalid { field: "history_limit", .. })
        ));
        assert!(matches!(EditorConfig::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
