//! Core types for captured image decoding.

use thiserror::Error;

/// Error types for decoding captured image bytes.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The container format is not recognized or supported.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image bytes are corrupted or truncated.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// The pixel buffer does not match its dimensions.
    #[error("Pixel buffer mismatch: expected {expected} bytes, got {actual}")]
    BufferMismatch { expected: usize, actual: usize },
}

/// How a camera tagged its pixels, per the EXIF `Orientation` tag (1-8).
///
/// Only used to show files that were saved unrotated the right way up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Orientation {
    #[default]
    Normal,
    Mirrored,
    UpsideDown,
    MirroredUpsideDown,
    /// Mirrored, then turned 270° clockwise.
    MirroredQuarterLeft,
    QuarterRight,
    /// Mirrored, then turned 90° clockwise.
    MirroredQuarterRight,
    QuarterLeft,
}

impl Orientation {
    /// Map a raw tag value; anything outside 1-8 counts as untagged.
    pub(crate) fn from_tag(value: u32) -> Self {
        match value {
            2 => Orientation::Mirrored,
            3 => Orientation::UpsideDown,
            4 => Orientation::MirroredUpsideDown,
            5 => Orientation::MirroredQuarterLeft,
            6 => Orientation::QuarterRight,
            7 => Orientation::MirroredQuarterRight,
            8 => Orientation::QuarterLeft,
            _ => Orientation::Normal,
        }
    }
}

/// A decoded capture with RGB pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// RGB pixel data in row-major order (3 bytes per pixel).
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            expected_len(width, height),
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Like [`DecodedImage::new`], but rejects a buffer of the wrong size.
    ///
    /// Use this for pixels that come from outside the crate.
    pub fn try_new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        let image = Self {
            width,
            height,
            pixels,
        };
        image.check_buffer()?;
        Ok(image)
    }

    /// Ensure `pixels` holds exactly `width * height` RGB triples.
    pub fn check_buffer(&self) -> Result<(), DecodeError> {
        let expected = expected_len(self.width, self.height);
        if self.pixels.len() != expected {
            return Err(DecodeError::BufferMismatch {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Convert to an `image::RgbImage`; `None` when the buffer is mis-sized.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}

fn expected_len(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * 3
}
