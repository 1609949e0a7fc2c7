//! Orientation estimation bindings.
//!
//! A browser host collects `DeviceMotionEvent` samples itself (there is no
//! blocking sensor loop on the web) and hands the window over in one call:
//!
//! ```typescript
//! const estimate = estimate_orientation({
//!   samples: [{ sensor: "accelerometer", x: 0.1, y: 9.7, z: 0.3 }],
//!   camera: { name: "user", lensDirection: "front", sensorOrientation: 0 },
//!   device: { manufacturer: "Google", model: "Pixel 7" },
//! });
//! console.log(estimate.cameraRotationNeeded, estimate.accuracyScore);
//! ```

use cameraly_core::orientation::sensor::GRAVITY_AXIS_THRESHOLD;
use cameraly_core::orientation::{
    CameraDescription, CorrectionTable, DeviceCorrection, DeviceInfo, LensDirection,
    OrientationData, OrientationEstimator, SensorReading, SensorSample,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EstimateRequest {
    #[serde(default)]
    samples: Vec<SensorSample>,
    camera: CameraDescription,
    device: DeviceInfo,
    /// Rules consulted before the built-in corrections.
    #[serde(default)]
    corrections: Vec<DeviceCorrection>,
    #[serde(default)]
    gravity_threshold: Option<f64>,
}

pub(crate) fn estimate(request: EstimateRequest, now: DateTime<Utc>) -> OrientationData {
    let estimator = OrientationEstimator::new(CorrectionTable::with_overrides(request.corrections))
        .with_gravity_threshold(request.gravity_threshold.unwrap_or(GRAVITY_AXIS_THRESHOLD));
    let reading = (!request.samples.is_empty()).then(|| SensorReading::from_samples(request.samples));
    estimator.estimate(reading.as_ref(), &request.camera, &request.device, now)
}

fn now() -> Result<DateTime<Utc>, JsValue> {
    DateTime::from_timestamp_millis(js_sys::Date::now() as i64)
        .ok_or_else(|| JsValue::from_str("system clock out of range"))
}

/// Estimate the rotation a capture needs.
///
/// An empty `samples` list is treated as unavailable sensors and yields the
/// lowest accuracy band.
#[wasm_bindgen]
pub fn estimate_orientation(request: JsValue) -> Result<JsValue, JsValue> {
    let request: EstimateRequest =
        serde_wasm_bindgen::from_value(request).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let data = estimate(request, now()?);
    log::debug!(
        "estimated {}° rotation ({}% accuracy)",
        data.camera_rotation_needed,
        data.accuracy_percent()
    );
    serde_wasm_bindgen::to_value(&data).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Built-in correction offset for a device, in degrees.
#[wasm_bindgen]
pub fn device_correction(manufacturer: &str, model: &str, front_lens: bool) -> u16 {
    let lens = if front_lens {
        LensDirection::Front
    } else {
        LensDirection::Back
    };
    CorrectionTable::built_in().offset_for(manufacturer, model, lens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cameraly_core::orientation::Vector3;
    use chrono::TimeZone;
    use std::borrow::Cow;

    fn request(samples: Vec<SensorSample>, manufacturer: &str) -> EstimateRequest {
        EstimateRequest {
            samples,
            camera: CameraDescription::new("environment", LensDirection::Back, 90),
            device: DeviceInfo::new(manufacturer, "Test"),
            corrections: Vec::new(),
            gravity_threshold: None,
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_samsung_portrait() {
        let samples = vec![SensorSample::Accelerometer(Vector3::new(0.0, 9.8, 0.0))];
        let data = estimate(request(samples, "samsung"), at());
        assert_eq!(data.camera_rotation_needed, 180);
        assert_eq!(data.timestamp, at());
    }

    #[test]
    fn test_empty_samples_are_lowest_band() {
        let data = estimate(request(Vec::new(), "Google"), at());
        assert_eq!(data.device_angle_degrees, 0);
        assert!(data.accuracy_score < 0.5);
    }

    #[test]
    fn test_request_overrides_take_precedence() {
        let mut req = request(vec![SensorSample::Accelerometer(Vector3::new(0.0, 9.8, 0.0))], "samsung");
        req.corrections.push(DeviceCorrection {
            manufacturer_match: Cow::Borrowed("samsung"),
            model_match: None,
            rotation_offset_degrees: 0,
            applies_to_lens_direction: None,
        });
        assert_eq!(estimate(req, at()).camera_rotation_needed, 90);
    }

    #[test]
    fn test_request_deserializes_from_json() {
        let json = r#"{
            "samples": [
                {"sensor": "accelerometer", "x": -9.7, "y": 0.2, "z": 0.4},
                {"sensor": "gyroscope", "x": 0.0, "y": 0.01, "z": 0.0}
            ],
            "camera": {"name": "user", "lensDirection": "front", "sensorOrientation": 270},
            "device": {"manufacturer": "Xiaomi", "model": "Mi 11"}
        }"#;
        let req: EstimateRequest = serde_json::from_str(json).unwrap();
        let data = estimate(req, at());

        assert_eq!(data.device_angle_degrees, 270);
        assert_eq!(data.lens_direction, LensDirection::Front);
        // (270 + 270 + 270) mod 360 = 90, negated for the front lens
        assert_eq!(data.camera_rotation_needed, 270);
    }

    #[test]
    fn test_device_correction_lookup() {
        assert_eq!(device_correction("Samsung", "Galaxy S21", false), 90);
        assert_eq!(device_correction("Xiaomi", "Redmi Note", true), 270);
        assert_eq!(device_correction("Apple", "iPhone", false), 0);
    }
}
