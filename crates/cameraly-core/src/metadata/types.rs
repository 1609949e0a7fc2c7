//! Capture-time metadata snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::orientation::sensor::Vector3;
use crate::orientation::{DeviceInfo, LensDirection};

/// Location at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsData {
    /// Decimal degrees, positive north.
    pub latitude: Option<f64>,
    /// Decimal degrees, positive east.
    pub longitude: Option<f64>,
    /// Metres above sea level.
    pub altitude: Option<f64>,
    /// Metres per second.
    pub speed: Option<f64>,
    /// Degrees clockwise from true north.
    pub heading: Option<f64>,
}

impl GpsData {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    Off,
    Auto,
    Always,
    Torch,
}

impl FlashMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashMode::Off => "off",
            FlashMode::Auto => "auto",
            FlashMode::Always => "always",
            FlashMode::Torch => "torch",
        }
    }

    /// EXIF `Flash` bit field.
    pub fn exif_value(self) -> u16 {
        match self {
            // did not fire, compulsory suppression
            FlashMode::Off => 0x10,
            // did not fire, auto mode
            FlashMode::Auto => 0x18,
            // fired, compulsory
            FlashMode::Always => 0x09,
            FlashMode::Torch => 0x01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusMode {
    Auto,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhiteBalance {
    Auto,
    Manual,
}

/// Camera settings in effect for the capture.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraSettings {
    pub focal_length_mm: Option<f64>,
    /// f-number.
    pub aperture: Option<f64>,
    /// Seconds.
    pub exposure_time: Option<f64>,
    pub iso: Option<u32>,
    pub zoom: Option<f64>,
    pub flash_mode: Option<FlashMode>,
    pub white_balance: Option<WhiteBalance>,
    pub focus_mode: Option<FocusMode>,
    pub lens_direction: Option<LensDirection>,
}

/// Optional environmental sensor readings.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentReadings {
    pub temperature_celsius: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub light_lux: Option<f64>,
}

/// Everything known about a photo at capture time.
///
/// Built once with the `with_*` methods and not changed afterwards; it is
/// written to EXIF and, when the container cannot carry EXIF, to a JSON
/// sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoMetadata {
    /// Local capture time with its UTC offset.
    pub captured_at: DateTime<FixedOffset>,
    pub device: DeviceInfo,
    #[serde(default)]
    pub camera: CameraSettings,
    #[serde(default)]
    pub gps: Option<GpsData>,
    #[serde(default)]
    pub environment: Option<EnvironmentReadings>,
    /// Device tilt from the accelerometer at capture time.
    #[serde(default)]
    pub tilt: Option<Vector3>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

impl PhotoMetadata {
    pub fn new(captured_at: DateTime<FixedOffset>, device: DeviceInfo) -> Self {
        Self {
            captured_at,
            device,
            camera: CameraSettings::default(),
            gps: None,
            environment: None,
            tilt: None,
            width: None,
            height: None,
            file_size: None,
            tags: Vec::new(),
            custom: BTreeMap::new(),
        }
    }

    pub fn with_camera(mut self, camera: CameraSettings) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_gps(mut self, gps: GpsData) -> Self {
        self.gps = Some(gps);
        self
    }

    pub fn with_environment(mut self, environment: EnvironmentReadings) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_tilt(mut self, tilt: Vector3) -> Self {
        self.tilt = Some(tilt);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}
