//! Cameraly WASM - WebAssembly bindings for Cameraly
//!
//! Exposes the in-memory parts of the capture pipeline to a browser-hosted
//! camera surface.
//!
//! # Module Structure
//!
//! - `orientation` - rotation estimate from `DeviceMotionEvent` samples
//! - `transform` - decoding and quarter-turn rotation of captures
//! - `metadata` - EXIF embedding and read-back
//! - `types` - WASM-compatible wrapper types
//!
//! # Usage
//!
//! ```typescript
//! import init, { estimate_orientation, rotate_capture, embed_metadata } from '@cameraly/wasm';
//!
//! await init();
//!
//! const estimate = estimate_orientation({ samples, camera, device });
//! const rotated = rotate_capture(bytes, estimate.cameraRotationNeeded, 92);
//! const saved = embed_metadata(rotated.bytes(), metadata, rotated.degrees !== 0);
//! ```

use wasm_bindgen::prelude::*;

mod logger;
mod metadata;
mod orientation;
mod transform;
mod types;

pub use metadata::{embed_metadata, read_metadata};
pub use orientation::{device_correction, estimate_orientation};
pub use transform::{apply_quarter_turn, capture_thumbnail, decode_capture, rotate_capture};
pub use types::{JsDecodedImage, JsRotatedCapture};

/// Initialize the WASM module (called automatically on load).
#[wasm_bindgen(start)]
pub fn init() {
    logger::install(log::LevelFilter::Info);
}

/// Change the console log level ("error", "warn", "info", "debug", "trace"
/// or "off").
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> Result<(), JsValue> {
    let filter = logger::parse_level(level)
        .ok_or_else(|| JsValue::from_str(&format!("unknown log level: {level}")))?;
    logger::install(filter);
    Ok(())
}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    cameraly_core::VERSION.to_string()
}
