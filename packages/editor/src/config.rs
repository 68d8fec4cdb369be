//! # Editor Configuration
//!
//! Read from `trellis.config.json` in the project directory. Every field is
//! optional; a missing file means all defaults.
//!
//! ```json
//! {
//!   "settleIntervalMs": 300,
//!   "maxUndoLevels": 0,
//!   "textPreviewLength": 100,
//!   "styleMode": "instance"
//! }
//! ```

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use trellis_code::{CodeManagerOptions, StyleMode};
use trellis_livetree::DEFAULT_TEXT_PREVIEW_LENGTH;

pub const CONFIG_FILE_NAME: &str = "trellis.config.json";

const MAX_SETTLE_INTERVAL_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Quiet period between two writes of the write queue.
    pub settle_interval_ms: u64,
    /// Undo depth; 0 keeps everything.
    pub max_undo_levels: usize,
    /// Characters of text shown per layer.
    pub text_preview_length: usize,
    pub style_mode: StyleMode,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            settle_interval_ms: 300,
            max_undo_levels: 0,
            text_preview_length: DEFAULT_TEXT_PREVIEW_LENGTH,
            style_mode: StyleMode::Instance,
        }
    }
}

impl EditorConfig {
    /// Load `trellis.config.json` from `dir`, or defaults if it does not exist.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settle_interval_ms > MAX_SETTLE_INTERVAL_MS {
            return Err(ConfigError::Invalid {
                field: "settleIntervalMs",
                reason: format!("must be at most {}", MAX_SETTLE_INTERVAL_MS),
            });
        }
        if self.text_preview_length == 0 {
            return Err(ConfigError::Invalid {
                field: "textPreviewLength",
                reason: "must be greater than 0".into(),
            });
        }
        Ok(())
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    pub fn code_manager_options(&self) -> CodeManagerOptions {
        CodeManagerOptions {
            settle_interval: self.settle_interval(),
            style_mode: self.style_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config, EditorConfig::default());
        assert_eq!(config.settle_interval(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{ "maxUndoLevels": 50, "styleMode": "root" }"#,
        )
        .unwrap();

        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config.max_undo_levels, 50);
        assert_eq!(config.style_mode, StyleMode::Root);
        assert_eq!(config.text_preview_length, 100);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{ "textPreviewLength": 0 }"#).unwrap();
        assert!(matches!(
            EditorConfig::load(dir.path()),
            Err(ConfigError::Invalid { field: "textPreviewLength", .. })
        ));

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(EditorConfig::load(dir.path()), Err(ConfigError::Parse { .. })));
    }
}
