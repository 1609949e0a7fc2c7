//! Thumbnail generation for saved captures.

use image::imageops::FilterType;

use crate::decode::{DecodeError, DecodedImage};

/// Resize an image so its longest edge is at most `max_edge`, keeping the
/// aspect ratio. Images that already fit are returned unchanged; there is
/// no upscaling.
pub fn resize_to_fit(image: &DecodedImage, max_edge: u32) -> Result<DecodedImage, DecodeError> {
    if max_edge == 0 || image.is_empty() {
        return Err(DecodeError::InvalidFormat);
    }
    image.check_buffer()?;

    if image.width <= max_edge && image.height <= max_edge {
        return Ok(image.clone());
    }

    let (width, height) = fit_dimensions(image.width, image.height, max_edge);
    let rgb = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Failed to create RgbImage".to_string()))?;

    let resized = image::imageops::resize(&rgb, width, height, FilterType::Triangle);
    Ok(DecodedImage::from_rgb_image(resized))
}

/// Generate a gallery thumbnail fitting within `size x size`.
pub fn generate_thumbnail(image: &DecodedImage, size: u32) -> Result<DecodedImage, DecodeError> {
    resize_to_fit(image, size)
}

fn fit_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    let ratio = width as f64 / height as f64;
    if width >= height {
        let h = (max_edge as f64 / ratio).round() as u32;
        (max_edge, h.max(1))
    } else {
        let w = (max_edge as f64 * ratio).round() as u32;
        (w.max(1), max_edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(width: u32, height: u32) -> DecodedImage {
        DecodedImage::new(width, height, vec![90u8; (width * height * 3) as usize])
    }

    #[test]
    fn test_landscape_thumbnail() {
        let thumb = generate_thumbnail(&gray(600, 400), 256).unwrap();
        assert_eq!((thumb.width, thumb.height), (256, 171));
    }

    #[test]
    fn test_portrait_thumbnail() {
        let thumb = generate_thumbnail(&gray(400, 600), 256).unwrap();
        assert_eq!((thumb.width, thumb.height), (171, 256));
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let thumb = generate_thumbnail(&gray(100, 50), 256).unwrap();
        assert_eq!((thumb.width, thumb.height), (100, 50));
    }

    #[test]
    fn test_zero_edge_is_error() {
        assert!(resize_to_fit(&gray(10, 10), 0).is_err());
    }

    #[test]
    fn test_mis_sized_buffer_is_error() {
        let image = DecodedImage {
            width: 10,
            height: 10,
            pixels: vec![0u8; 7],
        };
        assert!(matches!(
            generate_thumbnail(&image, 4),
            Err(DecodeError::BufferMismatch { .. })
        ));
    }

    #[test]
    fn test_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_dimensions(4000, 1, 100), (100, 1));
    }
}
