//! Device orientation estimation for captures.
//!
//! The estimate combines three inputs:
//! - the device angle classified from motion sensors ([`sensor`])
//! - a per-manufacturer correction offset ([`correction`])
//! - the capturing camera's fixed sensor orientation and lens direction
//!
//! and produces an [`OrientationData`] record that drives pixel rotation and
//! is persisted next to the media file (see [`crate::sidecar`]).

pub mod correction;
pub mod estimator;
pub mod sensor;

use serde::{Deserialize, Serialize};

pub use correction::{CorrectionTable, DeviceCorrection};
pub use estimator::{final_rotation, OrientationData, OrientationEstimator};
pub use sensor::{
    ChannelSensorSource, Classification, DeviceAngle, SensorCapabilities, SensorError, SensorFeed,
    SensorReader, SensorReading, SensorSample, SensorSource, Vector3,
};

/// Which way the capturing lens faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensDirection {
    Front,
    #[default]
    Back,
}

impl LensDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            LensDirection::Front => "front",
            LensDirection::Back => "back",
        }
    }
}

/// The host camera plugin's description of the capturing lens.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDescription {
    pub name: String,
    pub lens_direction: LensDirection,
    /// Clockwise angle the sensor is mounted at relative to the device's
    /// natural orientation (0, 90, 180 or 270).
    pub sensor_orientation: u16,
}

impl CameraDescription {
    pub fn new(name: impl Into<String>, lens_direction: LensDirection, sensor_orientation: u16) -> Self {
        Self {
            name: name.into(),
            lens_direction,
            sensor_orientation: sensor_orientation % 360,
        }
    }
}

/// Identity of the capturing device.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub manufacturer: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

impl DeviceInfo {
    pub fn new(manufacturer: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: model.into(),
            os_version: None,
            app_version: None,
        }
    }
}
