//! WASM-compatible wrapper types for capture data.

use cameraly_core::decode::{DecodeError, DecodedImage};
use cameraly_core::transform::{QuarterTurn, RotationOutcome};
use wasm_bindgen::prelude::*;

/// A decoded RGB capture held in WASM memory.
///
/// `pixels()` copies the buffer out to a `Uint8Array`; keep the image on
/// the WASM side while chaining operations.
#[wasm_bindgen]
pub struct JsDecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsDecodedImage {
    /// Create an image from RGB pixel data (3 bytes per pixel, row-major).
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> JsDecodedImage {
        JsDecodedImage {
            width,
            height,
            pixels,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// Copy of the RGB pixel data.
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }
}

impl JsDecodedImage {
    pub(crate) fn from_decoded(img: DecodedImage) -> Self {
        Self {
            width: img.width,
            height: img.height,
            pixels: img.pixels,
        }
    }

    /// Clones the pixel data. The buffer comes from JS, so its length is
    /// checked against the dimensions.
    pub(crate) fn to_decoded(&self) -> Result<DecodedImage, DecodeError> {
        DecodedImage::try_new(self.width, self.height, self.pixels.clone())
    }
}

/// Result of rotating encoded capture bytes.
///
/// When the rotation could not be applied, `bytes` are the original input,
/// `degrees` is 0 and `error` says why.
#[wasm_bindgen]
pub struct JsRotatedCapture {
    bytes: Vec<u8>,
    applied: QuarterTurn,
    error: Option<String>,
}

#[wasm_bindgen]
impl JsRotatedCapture {
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// Clockwise degrees actually applied.
    #[wasm_bindgen(getter)]
    pub fn degrees(&self) -> u16 {
        self.applied.degrees()
    }

    #[wasm_bindgen(getter)]
    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }
}

impl From<RotationOutcome> for JsRotatedCapture {
    fn from(outcome: RotationOutcome) -> Self {
        Self {
            bytes: outcome.bytes,
            applied: outcome.applied,
            error: outcome.error.map(|e| e.to_string()),
        }
    }
}

/// Parse a clockwise rotation in degrees into a quarter turn.
pub(crate) fn quarter_turn(degrees: i32) -> Result<QuarterTurn, String> {
    QuarterTurn::from_degrees(degrees)
        .ok_or_else(|| format!("rotation must be a multiple of 90 degrees, got {degrees}"))
}
