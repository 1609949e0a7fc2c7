//! Re-encoding of rotated captures.
//!
//! A rotated raster is written back in the container it arrived in, so a JPEG
//! capture stays a JPEG and keeps its APP segments slot for the EXIF writer.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::DecodedImage;

/// Errors that can occur while re-encoding a capture.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// The underlying codec failed
    #[error("{format:?} encoding failed: {message}")]
    EncodingFailed {
        format: CaptureFormat,
        message: String,
    },
}

/// Containers the capture pipeline can write back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    Jpeg,
    Png,
}

impl CaptureFormat {
    /// Sniff the container from its leading magic bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(CaptureFormat::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(CaptureFormat::Png)
        } else {
            None
        }
    }

    /// Whether EXIF can be spliced directly into this container.
    pub fn supports_embedded_exif(self) -> bool {
        matches!(self, CaptureFormat::Jpeg)
    }
}

/// Encode RGB pixel data to JPEG bytes.
///
/// `quality` is clamped to 1-100.
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    validate(pixels, width, height)?;

    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed {
            format: CaptureFormat::Jpeg,
            message: e.to_string(),
        })?;

    Ok(buffer.into_inner())
}

/// Encode RGB pixel data to PNG bytes.
pub fn encode_png(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    validate(pixels, width, height)?;

    let mut buffer = Cursor::new(Vec::new());
    PngEncoder::new(&mut buffer)
        .write_image(pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed {
            format: CaptureFormat::Png,
            message: e.to_string(),
        })?;

    Ok(buffer.into_inner())
}

/// Encode a decoded capture into the given container.
pub fn encode_capture(
    image: &DecodedImage,
    format: CaptureFormat,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    match format {
        CaptureFormat::Jpeg => encode_jpeg(&image.pixels, image.width, image.height, quality),
        CaptureFormat::Png => encode_png(&image.pixels, image.width, image.height),
    }
}

fn validate(pixels: &[u8], width: u32, height: u32) -> Result<(), EncodeError> {
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = (width as usize) * (height as usize) * 3;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_jpeg_markers() {
        let pixels = vec![128u8; 32 * 32 * 3];
        let jpeg = encode_jpeg(&pixels, 32, 32, 90).unwrap();

        assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
        assert_eq!(CaptureFormat::detect(&jpeg), Some(CaptureFormat::Jpeg));
    }

    #[test]
    fn test_encode_png_detected() {
        let pixels = vec![10u8; 4 * 2 * 3];
        let png = encode_png(&pixels, 4, 2).unwrap();
        assert_eq!(CaptureFormat::detect(&png), Some(CaptureFormat::Png));
    }

    #[test]
    fn test_quality_is_clamped() {
        let pixels = vec![128u8; 10 * 10 * 3];
        assert!(encode_jpeg(&pixels, 10, 10, 0).is_ok());
        assert!(encode_jpeg(&pixels, 10, 10, 255).is_ok());
    }

    #[test]
    fn test_invalid_pixel_data() {
        let pixels = vec![128u8; 99 * 100 * 3];
        let result = encode_jpeg(&pixels, 100, 100, 90);
        assert!(matches!(result, Err(EncodeError::InvalidPixelData { .. })));
    }

    #[test]
    fn test_zero_dimensions() {
        assert!(matches!(
            encode_png(&[], 0, 10),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(CaptureFormat::detect(b"RIFF0000WEBP"), None);
        assert_eq!(CaptureFormat::detect(&[]), None);
        assert!(!CaptureFormat::Png.supports_embedded_exif());
    }

    #[test]
    fn test_encode_capture_dispatch() {
        let image = DecodedImage::new(3, 2, vec![50u8; 18]);
        let jpeg = encode_capture(&image, CaptureFormat::Jpeg, 85).unwrap();
        let png = encode_capture(&image, CaptureFormat::Png, 85).unwrap();
        assert_eq!(CaptureFormat::detect(&jpeg), Some(CaptureFormat::Jpeg));
        assert_eq!(CaptureFormat::detect(&png), Some(CaptureFormat::Png));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: valid input always yields a JPEG with SOI and EOI markers.
        #[test]
        fn prop_valid_input_produces_valid_jpeg(
            width in 1u32..=40,
            height in 1u32..=40,
            quality in 1u8..=100,
        ) {
            let pixels = vec![128u8; (width * height * 3) as usize];
            let jpeg = encode_jpeg(&pixels, width, height, quality).unwrap();
            let len = jpeg.len();

            prop_assert_eq!(&jpeg[0..2], &[0xFF, 0xD8]);
            prop_assert_eq!(&jpeg[len - 2..], &[0xFF, 0xD9]);
        }
    }
}
