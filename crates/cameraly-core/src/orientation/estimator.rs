//! Final rotation decision and accuracy scoring.
//!
//! ```text
//! rotation = (device angle + sensor orientation + correction offset) mod 360
//! ```
//!
//! Front lenses are mounted mirrored, so their rotation is negated mod 360.
//!
//! # Accuracy bands
//!
//! | Sensors                         | Score                          |
//! |---------------------------------|--------------------------------|
//! | none                            | 0.10                           |
//! | accelerometer, ambiguous        | 0.10 + 0.30·c (< 0.5)          |
//! | + gyroscope, ambiguous          | adds up to 0.05·c·s            |
//! | accelerometer, clear            | 0.50 + 0.30·c (0.5 – 0.8)      |
//! | + gyroscope, clear              | adds up to 0.20·c·s (≤ 1.0)    |
//!
//! `c` is the classification clarity and `s` the gyroscope stability.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::correction::CorrectionTable;
use super::sensor::{Classification, DeviceAngle, SensorReading, GRAVITY_AXIS_THRESHOLD};
use super::{CameraDescription, DeviceInfo, LensDirection};

/// Score when no usable sensor data arrived.
pub const NO_SENSOR_SCORE: f64 = 0.1;

/// Orientation decided for one capture event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationData {
    pub device_angle_degrees: u16,
    pub camera_rotation_needed: u16,
    pub sensor_orientation: u16,
    pub accuracy_score: f64,
    pub device_manufacturer: String,
    pub device_model: String,
    pub lens_direction: LensDirection,
    pub timestamp: DateTime<Utc>,
}

impl OrientationData {
    /// Accuracy as a whole percentage.
    pub fn accuracy_percent(&self) -> u8 {
        (self.accuracy_score * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Combine the rotation inputs.
pub fn final_rotation(
    device_angle: u16,
    sensor_orientation: u16,
    correction_offset: u16,
    lens: LensDirection,
) -> u16 {
    let sum = (u32::from(device_angle)
        + u32::from(sensor_orientation)
        + u32::from(correction_offset))
        % 360;
    let rotation = match lens {
        LensDirection::Back => sum,
        LensDirection::Front => (360 - sum) % 360,
    };
    rotation as u16
}

/// Score an estimate from its classification and gyroscope stability.
pub fn accuracy_score(classification: Option<&Classification>, stability: Option<f64>) -> f64 {
    let Some(c) = classification else {
        return NO_SENSOR_SCORE;
    };

    let clarity = c.clarity.clamp(0.0, 1.0);
    let stability = stability.map(|s| s.clamp(0.0, 1.0));

    let (base, gyro_weight) = if c.clear {
        (0.5 + 0.3 * clarity, 0.2)
    } else {
        (NO_SENSOR_SCORE + 0.3 * clarity, 0.05)
    };
    let bonus = stability.map_or(0.0, |s| gyro_weight * clarity * s);

    (base + bonus).clamp(0.0, 1.0)
}

/// Produces [`OrientationData`] from sensor readings and device identity.
#[derive(Debug, Clone)]
pub struct OrientationEstimator {
    table: CorrectionTable,
    gravity_threshold: f64,
}

impl Default for OrientationEstimator {
    fn default() -> Self {
        Self::new(CorrectionTable::built_in())
    }
}

impl OrientationEstimator {
    pub fn new(table: CorrectionTable) -> Self {
        Self {
            table,
            gravity_threshold: GRAVITY_AXIS_THRESHOLD,
        }
    }

    pub fn with_gravity_threshold(mut self, threshold: f64) -> Self {
        self.gravity_threshold = threshold;
        self
    }

    pub fn table(&self) -> &CorrectionTable {
        &self.table
    }

    /// Estimate the orientation of one capture.
    ///
    /// `reading` is `None` when the sensors were unavailable; the estimate
    /// then rests on the correction table alone with the lowest score.
    pub fn estimate(
        &self,
        reading: Option<&SensorReading>,
        camera: &CameraDescription,
        device: &DeviceInfo,
        timestamp: DateTime<Utc>,
    ) -> OrientationData {
        let classification = reading.and_then(|r| r.classify(self.gravity_threshold));
        let stability = reading.and_then(SensorReading::stability);

        let angle = classification
            .map(|c| c.angle)
            .unwrap_or(DeviceAngle::PortraitUp);
        let offset = self
            .table
            .offset_for(&device.manufacturer, &device.model, camera.lens_direction);
        let rotation = final_rotation(
            angle.degrees(),
            camera.sensor_orientation,
            offset,
            camera.lens_direction,
        );
        let score = accuracy_score(classification.as_ref(), stability);

        log::debug!(
            "orientation estimate: device {}°, sensor {}°, offset {}°, rotation {}°, accuracy {:.2}",
            angle.degrees(),
            camera.sensor_orientation,
            offset,
            rotation,
            score
        );

        OrientationData {
            device_angle_degrees: angle.degrees(),
            camera_rotation_needed: rotation,
            sensor_orientation: camera.sensor_orientation,
            accuracy_score: score,
            device_manufacturer: device.manufacturer.clone(),
            device_model: device.model.clone(),
            lens_direction: camera.lens_direction,
            timestamp,
        }
    }
}
