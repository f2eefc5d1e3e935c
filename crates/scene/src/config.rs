use std::path::Path;

use serde::{Deserialize, Serialize};
use stagecraft_assets::ResourceSettings;
use stagecraft_events::DEFAULT_DRAIN_BUDGET;

/// Errors loading a [`StageConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Frame-loop and resource settings.
///
/// Every field has a default, so a partial JSON document is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Deferred events dispatched per tick.
    pub drain_budget: usize,
    pub camera_near: f32,
    pub camera_far: f32,
    /// Fixed update step, in seconds.
    pub tick_rate: f64,
    #[serde(flatten)]
    pub resources: ResourceSettings,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            drain_budget: DEFAULT_DRAIN_BUDGET,
            camera_near: -1000.0,
            camera_far: 1000.0,
            tick_rate: 1.0 / 60.0,
            resources: ResourceSettings::default(),
        }
    }
}

impl StageConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "stage config loaded");
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.drain_budget == 0 {
            return Err(ConfigError::Invalid("drain_budget must be positive".into()));
        }
        if !(self.tick_rate.is_finite() && self.tick_rate > 0.0) {
            return Err(ConfigError::Invalid("tick_rate must be positive".into()));
        }
        if self.camera_near >= self.camera_far {
            return Err(ConfigError::Invalid(
                "camera_near must be below camera_far".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecraft_assets::LoadMode;

    #[test]
    fn defaults() {
        let c = StageConfig::default();
        assert_eq!(c.drain_budget, 10);
        assert_eq!(c.resources.asset_root, "assets/");
        assert_eq!(c.resources.load_mode, LoadMode::Threaded);
        assert_eq!((c.camera_near, c.camera_far), (-1000.0, 1000.0));
        assert!((c.tick_rate - 1.0 / 60.0).abs() < 1e-12);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c = StageConfig::from_json_str(r#"{"drain_budget": 3, "load_mode": "inline"}"#)
            .unwrap();
        assert_eq!(c.drain_budget, 3);
        assert_eq!(c.resources.load_mode, LoadMode::Inline);
        assert_eq!(c.resources.asset_root, "assets/");
    }

    #[test]
    fn rejects_zero_budget() {
        assert!(matches!(
            StageConfig::from_json_str(r#"{"drain_budget": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.json");
        std::fs::write(&path, r#"{"asset_root": "data/", "tick_rate": 0.02}"#).unwrap();
        let c = StageConfig::load(&path).unwrap();
        assert_eq!(c.resources.asset_root, "data/");
        assert!((c.tick_rate - 0.02).abs() < 1e-12);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            StageConfig::load(dir.path().join("nope.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
