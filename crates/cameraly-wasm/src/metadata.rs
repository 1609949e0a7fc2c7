//! EXIF embedding bindings.
//!
//! Browsers cannot replace files in place, so the host receives the new
//! bytes and stores them itself.

use cameraly_core::metadata::{read_embedded, MetadataError, MetadataWriter, PhotoMetadata};
use wasm_bindgen::prelude::*;

pub(crate) fn embed(
    jpeg: &[u8],
    metadata: &PhotoMetadata,
    pixels_rotated: bool,
    software: Option<String>,
) -> Result<Vec<u8>, MetadataError> {
    let writer = software.map(MetadataWriter::new).unwrap_or_default();
    writer.embed(jpeg, metadata, None, pixels_rotated)
}

/// Return `jpeg` with an Exif block built from `metadata`.
///
/// `metadata` uses the same camelCase shape as the `.metadata.json`
/// sidecar. Set `pixels_rotated` when the bytes came out of
/// `rotate_capture` with a non-zero turn so `Orientation` is reset.
#[wasm_bindgen]
pub fn embed_metadata(
    jpeg: &[u8],
    metadata: JsValue,
    pixels_rotated: bool,
    software: Option<String>,
) -> Result<Vec<u8>, JsValue> {
    let metadata: PhotoMetadata =
        serde_wasm_bindgen::from_value(metadata).map_err(|e| JsValue::from_str(&e.to_string()))?;
    embed(jpeg, &metadata, pixels_rotated, software).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Read back the EXIF fields written by `embed_metadata`.
#[wasm_bindgen]
pub fn read_metadata(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let embedded = read_embedded(bytes).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&embedded).map_err(|e| JsValue::from_str(&e.to_string()))
}
