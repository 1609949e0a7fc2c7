//! Pipeline configuration, loadable from TOML.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! standard behavior:
//!
//! ```toml
//! jpeg_quality = 92
//! software = "Cameraly"
//!
//! [[correction_rules]]
//! manufacturerMatch = "oneplus"
//! rotationOffsetDegrees = 180
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::DEFAULT_SOFTWARE;
use crate::orientation::sensor::{DEFAULT_SAMPLING_WINDOW, GRAVITY_AXIS_THRESHOLD};
use crate::orientation::{CorrectionTable, DeviceCorrection, OrientationEstimator};

pub const DEFAULT_JPEG_QUALITY: u8 = 95;
pub const DEFAULT_THUMBNAIL_SIZE: u32 = 256;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid correction rule #{index}: {reason}")]
    InvalidRule { index: usize, reason: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Quality used when a rotated JPEG is re-encoded (1-100).
    pub jpeg_quality: u8,
    /// Value of the EXIF `Software` tag.
    pub software: String,
    pub sampling_window_ms: u64,
    /// m/s² an axis must exceed to count as pointing down.
    pub gravity_threshold: f64,
    /// Rotate the pixels upright instead of only recording the rotation.
    pub rotate_pixels: bool,
    pub embed_exif: bool,
    pub write_orientation_sidecar: bool,
    /// Write a metadata sidecar when the container cannot carry EXIF.
    pub sidecar_fallback: bool,
    /// Longest thumbnail edge; `None` disables thumbnails.
    pub thumbnail_size: Option<u32>,
    /// Extra rules consulted before the built-in corrections.
    pub correction_rules: Vec<DeviceCorrection>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            software: DEFAULT_SOFTWARE.to_string(),
            sampling_window_ms: DEFAULT_SAMPLING_WINDOW.as_millis() as u64,
            gravity_threshold: GRAVITY_AXIS_THRESHOLD,
            rotate_pixels: true,
            embed_exif: true,
            write_orientation_sidecar: true,
            sidecar_fallback: true,
            thumbnail_size: Some(DEFAULT_THUMBNAIL_SIZE),
            correction_rules: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::InvalidValue {
                field: "jpeg_quality",
                reason: format!("{} is outside 1-100", self.jpeg_quality),
            });
        }
        if !(self.gravity_threshold.is_finite() && self.gravity_threshold > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "gravity_threshold",
                reason: format!("{} is not a positive number", self.gravity_threshold),
            });
        }
        if self.thumbnail_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "thumbnail_size",
                reason: "must be at least 1".to_string(),
            });
        }
        for (index, rule) in self.correction_rules.iter().enumerate() {
            if rule.manufacturer_match.trim().is_empty() {
                return Err(ConfigError::InvalidRule {
                    index,
                    reason: "manufacturerMatch is empty".to_string(),
                });
            }
            if rule.rotation_offset_degrees % 90 != 0 || rule.rotation_offset_degrees >= 360 {
                return Err(ConfigError::InvalidRule {
                    index,
                    reason: format!(
                        "offset {} is not one of 0, 90, 180, 270",
                        rule.rotation_offset_degrees
                    ),
                });
            }
        }
        Ok(())
    }

    pub fn sampling_window(&self) -> Duration {
        Duration::from_millis(self.sampling_window_ms)
    }

    pub fn correction_table(&self) -> CorrectionTable {
        CorrectionTable::with_overrides(self.correction_rules.iter().cloned())
    }

    pub fn estimator(&self) -> OrientationEstimator {
        OrientationEstimator::new(self.correction_table()).with_gravity_threshold(self.gravity_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::LensDirection;
    use tempfile::tempdir;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.sampling_window(), Duration::from_millis(300));
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = PipelineConfig::from_toml_str(
            r#"
            jpeg_quality = 80
            thumbnail_size = 512

            [[correction_rules]]
            manufacturerMatch = "oneplus"
            modelMatch = "nord"
            rotationOffsetDegrees = 180
            appliesToLensDirection = "front"
            "#,
        )
        .unwrap();

        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.thumbnail_size, Some(512));
        assert_eq!(config.software, DEFAULT_SOFTWARE);

        let table = config.correction_table();
        assert_eq!(table.offset_for("OnePlus", "Nord 2", LensDirection::Front), 180);
        assert_eq!(table.offset_for("OnePlus", "Nord 2", LensDirection::Back), 0);
        assert_eq!(table.offset_for("samsung", "S21", LensDirection::Back), 90);
    }

    #[test]
    fn test_rejects_bad_offset() {
        let err = PipelineConfig::from_toml_str(
            r#"
            [[correction_rules]]
            manufacturerMatch = "acme"
            rotationOffsetDegrees = 45
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRule { index: 0, .. }));
    }

    #[test]
    fn test_rejects_bad_quality() {
        let err = PipelineConfig::from_toml_str("jpeg_quality = 0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "jpeg_quality", .. }));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let err = PipelineConfig::from_toml_str("jpeg_quality = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cameraly.toml");
        fs::write(&path, "write_orientation_sidecar = false\n").unwrap();
        let config = PipelineConfig::load_from_path(&path).unwrap();
        assert!(!config.write_orientation_sidecar);

        let missing = PipelineConfig::load_from_path(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
