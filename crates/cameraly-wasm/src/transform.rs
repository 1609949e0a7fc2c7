//! WASM bindings for decoding and quarter-turn rotation of captures.
//!
//! ```typescript
//! const result = rotate_capture(jpegBytes, estimate.cameraRotationNeeded, 92);
//! if (result.error) console.warn(result.error);
//! const upright = result.bytes();
//! ```

use crate::types::{quarter_turn, JsDecodedImage, JsRotatedCapture};
use cameraly_core::decode::decode_capture as core_decode;
use cameraly_core::transform::{
    apply_quarter_turn as core_quarter_turn, generate_thumbnail, rotate_encoded,
};
use wasm_bindgen::prelude::*;

/// Decode JPEG or PNG capture bytes without applying EXIF orientation.
#[wasm_bindgen]
pub fn decode_capture(bytes: &[u8]) -> Result<JsDecodedImage, JsValue> {
    core_decode(bytes)
        .map(JsDecodedImage::from_decoded)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Rotate encoded capture bytes clockwise by `degrees` (a multiple of 90).
///
/// Never fails on bad image data: the original bytes come back with an
/// error message attached instead.
#[wasm_bindgen]
pub fn rotate_capture(bytes: Vec<u8>, degrees: i32, quality: u8) -> Result<JsRotatedCapture, JsValue> {
    let turn = quarter_turn(degrees).map_err(|e| JsValue::from_str(&e))?;
    Ok(rotate_encoded(bytes, turn, quality).into())
}

/// Rotate a decoded image clockwise by `degrees` (a multiple of 90).
///
/// Fails when `degrees` is not a quarter turn or the pixel buffer does not
/// match the image's dimensions.
#[wasm_bindgen]
pub fn apply_quarter_turn(image: &JsDecodedImage, degrees: i32) -> Result<JsDecodedImage, JsValue> {
    let turn = quarter_turn(degrees).map_err(|e| JsValue::from_str(&e))?;
    let decoded = image
        .to_decoded()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    core_quarter_turn(&decoded, turn)
        .map(JsDecodedImage::from_decoded)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Gallery thumbnail fitting within `size x size`.
#[wasm_bindgen]
pub fn capture_thumbnail(image: &JsDecodedImage, size: u32) -> Result<JsDecodedImage, JsValue> {
    let decoded = image
        .to_decoded()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    generate_thumbnail(&decoded, size)
        .map(JsDecodedImage::from_decoded)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}
