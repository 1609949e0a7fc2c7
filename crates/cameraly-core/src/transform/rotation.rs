//! Quarter-turn rotation of captured rasters.
//!
//! Captures are only ever turned in 90° steps: each output pixel is an exact
//! copy of one source pixel, so there is no interpolation, no canvas
//! expansion and no cropping.
//!
//! # Mapping
//!
//! For a source of size `w x h`, clockwise turns map `(x, y)` to:
//! ```text
//!  90°: (h - 1 - y, x)        output is h x w
//! 180°: (w - 1 - x, h - 1 - y) output is w x h
//! 270°: (y, w - 1 - x)        output is h x w
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{decode_capture, DecodeError, DecodedImage};
use crate::encode::{encode_capture, CaptureFormat, EncodeError};

/// A clockwise rotation in 90° steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QuarterTurn {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl QuarterTurn {
    /// Build a turn from any whole number of degrees.
    ///
    /// Negative values turn counter-clockwise. Returns `None` when the angle
    /// is not a multiple of 90.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        Some(match degrees.rem_euclid(360) {
            0 => QuarterTurn::None,
            90 => QuarterTurn::Cw90,
            180 => QuarterTurn::Cw180,
            _ => QuarterTurn::Cw270,
        })
    }

    /// Clockwise degrees in `0..360`.
    pub fn degrees(self) -> u16 {
        match self {
            QuarterTurn::None => 0,
            QuarterTurn::Cw90 => 90,
            QuarterTurn::Cw180 => 180,
            QuarterTurn::Cw270 => 270,
        }
    }

    /// Whether this turn swaps width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, QuarterTurn::Cw90 | QuarterTurn::Cw270)
    }

    /// The turn that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            QuarterTurn::None => QuarterTurn::None,
            QuarterTurn::Cw90 => QuarterTurn::Cw270,
            QuarterTurn::Cw180 => QuarterTurn::Cw180,
            QuarterTurn::Cw270 => QuarterTurn::Cw90,
        }
    }

    /// Apply `self` then `next`.
    pub fn then(self, next: QuarterTurn) -> Self {
        let total = i32::from(self.degrees()) + i32::from(next.degrees());
        QuarterTurn::from_degrees(total).unwrap_or_default()
    }
}

/// Errors from rotating encoded capture bytes.
#[derive(Debug, Error)]
pub enum RotationError {
    #[error("capture container is not JPEG or PNG")]
    UnsupportedContainer,

    #[error("rotation of {0}° is not a quarter turn")]
    NotQuarterTurn(u16),

    #[error("failed to decode capture: {0}")]
    Decode(#[from] DecodeError),

    #[error("failed to re-encode rotated capture: {0}")]
    Encode(#[from] EncodeError),
}

/// Result of a best-effort rotation over encoded bytes.
///
/// On failure `bytes` holds the original input unmodified and `error`
/// explains why the rotation was skipped.
#[derive(Debug)]
pub struct RotationOutcome {
    pub bytes: Vec<u8>,
    pub applied: QuarterTurn,
    pub error: Option<RotationError>,
}

impl RotationOutcome {
    fn passthrough(bytes: Vec<u8>, error: Option<RotationError>) -> Self {
        Self {
            bytes,
            applied: QuarterTurn::None,
            error,
        }
    }

    /// True when the pixels were actually turned.
    pub fn rotated(&self) -> bool {
        self.applied != QuarterTurn::None
    }
}

/// Dimensions of an image after the given turn.
pub fn rotated_dimensions(width: u32, height: u32, turn: QuarterTurn) -> (u32, u32) {
    if turn.swaps_dimensions() {
        (height, width)
    } else {
        (width, height)
    }
}

/// Rotate a decoded raster clockwise by a quarter turn.
///
/// # Errors
///
/// Returns `DecodeError::BufferMismatch` when `pixels` does not hold
/// exactly `width * height` RGB triples.
pub fn apply_quarter_turn(
    image: &DecodedImage,
    turn: QuarterTurn,
) -> Result<DecodedImage, DecodeError> {
    image.check_buffer()?;
    if turn == QuarterTurn::None || image.is_empty() {
        return Ok(image.clone());
    }

    let (w, h) = (image.width as usize, image.height as usize);
    let (dst_w, dst_h) = rotated_dimensions(image.width, image.height, turn);
    let dst_w_us = dst_w as usize;
    let mut output = vec![0u8; image.pixels.len()];

    for y in 0..h {
        for x in 0..w {
            let (dx, dy) = match turn {
                QuarterTurn::Cw90 => (h - 1 - y, x),
                QuarterTurn::Cw180 => (w - 1 - x, h - 1 - y),
                QuarterTurn::Cw270 => (y, w - 1 - x),
                QuarterTurn::None => (x, y),
            };
            let src_idx = (y * w + x) * 3;
            let dst_idx = (dy * dst_w_us + dx) * 3;
            output[dst_idx..dst_idx + 3].copy_from_slice(&image.pixels[src_idx..src_idx + 3]);
        }
    }

    Ok(DecodedImage {
        width: dst_w,
        height: dst_h,
        pixels: output,
    })
}

/// Rotate encoded capture bytes, re-encoding in the same container.
///
/// Rotation is an enrichment: any failure hands the original bytes back
/// untouched with the error attached. A zero turn returns the input without
/// re-encoding.
pub fn rotate_encoded(bytes: Vec<u8>, turn: QuarterTurn, jpeg_quality: u8) -> RotationOutcome {
    if turn == QuarterTurn::None {
        return RotationOutcome::passthrough(bytes, None);
    }

    let Some(format) = CaptureFormat::detect(&bytes) else {
        log::warn!("skipping rotation: unrecognized capture container");
        return RotationOutcome::passthrough(bytes, Some(RotationError::UnsupportedContainer));
    };

    let decoded = match decode_capture(&bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            log::warn!("skipping rotation: {e}");
            return RotationOutcome::passthrough(bytes, Some(e.into()));
        }
    };

    let rotated = match apply_quarter_turn(&decoded, turn) {
        Ok(rotated) => rotated,
        Err(e) => {
            log::warn!("skipping rotation: {e}");
            return RotationOutcome::passthrough(bytes, Some(e.into()));
        }
    };
    match encode_capture(&rotated, format, jpeg_quality) {
        Ok(encoded) => {
            log::debug!(
                "rotated {}x{} capture by {}°",
                decoded.width,
                decoded.height,
                turn.degrees()
            );
            RotationOutcome {
                bytes: encoded,
                applied: turn,
                error: None,
            }
        }
        Err(e) => {
            log::warn!("skipping rotation: {e}");
            RotationOutcome::passthrough(bytes, Some(e.into()))
        }
    }
}
