//! Editor configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{PREFERRED_HEIGHT, PREFERRED_WIDTH, SdError, SdResult};

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Frame resource sets kept in flight
    pub frames_in_flight: usize,
    /// Swap chain back buffers (independent of `frames_in_flight`)
    pub back_buffers: usize,
    /// Capacity of each cross-thread queue
    pub queue_capacity: usize,
    /// Host timer period driving render ticks
    pub timer_interval_ms: u64,
    pub width: u32,
    pub height: u32,
    /// Present with vsync. Off by default: the host compositor owns pacing.
    pub vsync: bool,
    /// Premultiplied RGBA clear color
    pub clear_color: [f32; 4],
    /// Enable the graphics debug layer on device creation
    pub debug_layer: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: 3,
            back_buffers: 3,
            queue_capacity: 4096,
            timer_interval_ms: 30,
            width: PREFERRED_WIDTH,
            height: PREFERRED_HEIGHT,
            vsync: false,
            clear_color: [0.45, 0.55, 0.60, 1.00],
            debug_layer: cfg!(debug_assertions),
        }
    }
}

impl EditorConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> SdResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> SdResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        log::info!("Loaded editor config from {}", path.display());
        Ok(config)
    }

    /// Reject configurations the frame pipeline cannot run with
    pub fn validate(&self) -> SdResult<()> {
        if self.frames_in_flight == 0 {
            return Err(SdError::InvalidConfig(
                "frames_in_flight must be at least 1".into(),
            ));
        }
        if !(2..=16).contains(&self.back_buffers) {
            return Err(SdError::InvalidConfig(format!(
                "back_buffers must be in 2..=16, got {}",
                self.back_buffers
            )));
        }
        if self.queue_capacity == 0 {
            return Err(SdError::InvalidConfig("queue_capacity must be non-zero".into()));
        }
        if self.timer_interval_ms == 0 {
            return Err(SdError::InvalidConfig(
                "timer_interval_ms must be non-zero".into(),
            ));
        }
        if self.width == 0 || self.height == 0 {
            return Err(SdError::InvalidConfig(format!(
                "editor size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Timer period as a `Duration`
    #[inline]
    pub fn timer_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timer_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frames_in_flight, 3);
        assert_eq!(config.back_buffers, 3);
        assert!(!config.vsync);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = EditorConfig::from_toml_str("").unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = EditorConfig::from_toml_str(
            r#"
            frames_in_flight = 2
            queue_capacity = 32
            vsync = true
            "#,
        )
        .unwrap();

        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.queue_capacity, 32);
        assert!(config.vsync);
        assert_eq!(config.back_buffers, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            EditorConfig::from_toml_str("frames_in_flight = 0"),
            Err(SdError::InvalidConfig(_))
        ));
        assert!(matches!(
            EditorConfig::from_toml_str("back_buffers = 1"),
            Err(SdError::InvalidConfig(_))
        ));
        assert!(matches!(
            EditorConfig::from_toml_str("width = 0"),
            Err(SdError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            EditorConfig::from_toml_str("frames_in_flight = \"three\""),
            Err(SdError::ConfigParse(_))
        ));
    }
}
