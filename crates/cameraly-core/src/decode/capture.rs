//! Decoding of captured image bytes.
//!
//! Camera surfaces hand over encoded bytes (JPEG in practice, PNG from some
//! desktop and web hosts). The raw decode keeps the sensor pixel layout so the
//! orientation estimate can be applied on top. The oriented decode honours an
//! EXIF Orientation tag left on a file saved unrotated; thumbnails use it.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageReader};

use super::{DecodeError, DecodedImage, Orientation};

/// Decode captured bytes without applying EXIF orientation.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` for empty input and
/// `DecodeError::CorruptedFile` when the container cannot be decoded.
pub fn decode_capture(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let img = decode_dynamic(bytes)?;
    Ok(DecodedImage::from_rgb_image(img.into_rgb8()))
}

/// Decode captured bytes and apply the embedded EXIF orientation.
pub fn decode_capture_oriented(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let orientation = tagged_orientation(bytes);
    let img = apply_orientation(decode_dynamic(bytes)?, orientation);
    Ok(DecodedImage::from_rgb_image(img.into_rgb8()))
}

/// EXIF orientation of encoded bytes; `Normal` when there is no usable tag.
pub(crate) fn tagged_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    match Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from_tag)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

/// Width and height from the container header, without decoding pixels.
pub fn capture_dimensions(bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
    guessed_reader(bytes)?
        .into_dimensions()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))
}

fn guessed_reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::InvalidFormat);
    }

    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }
    Ok(reader)
}

fn decode_dynamic(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
    guessed_reader(bytes)?
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::Mirrored => img.fliph(),
        Orientation::UpsideDown => img.rotate180(),
        Orientation::MirroredUpsideDown => img.flipv(),
        Orientation::MirroredQuarterLeft => img.rotate90().fliph(),
        Orientation::QuarterRight => img.rotate90(),
        Orientation::MirroredQuarterRight => img.rotate270().fliph(),
        Orientation::QuarterLeft => img.rotate270(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_jpeg;
    use crate::metadata::exif::encode_fields;
    use crate::metadata::jpeg::replace_exif_segment;
    use exif::{Field, Value};

    fn sample_jpeg(width: u32, height: u32) -> Vec<u8> {
        let pixels = vec![200u8; (width * height * 3) as usize];
        encode_jpeg(&pixels, width, height, 90).unwrap()
    }

    fn tagged_jpeg(jpeg: &[u8], orientation: u16) -> Vec<u8> {
        let tag = Field {
            tag: Tag::Orientation,
            ifd_num: In::PRIMARY,
            value: Value::Short(vec![orientation]),
        };
        let tiff = encode_fields(&[tag], &[]).unwrap();
        replace_exif_segment(jpeg, &tiff).unwrap()
    }

    #[test]
    fn test_decode_capture_dimensions() {
        let img = decode_capture(&sample_jpeg(16, 8)).unwrap();
        assert_eq!((img.width, img.height), (16, 8));
        assert_eq!(img.pixels.len(), 16 * 8 * 3);
    }

    #[test]
    fn test_header_dimensions() {
        assert_eq!(capture_dimensions(&sample_jpeg(20, 10)).unwrap(), (20, 10));
        assert!(capture_dimensions(b"plain text").is_err());
    }

    #[test]
    fn test_decode_empty_bytes() {
        assert!(matches!(decode_capture(&[]), Err(DecodeError::InvalidFormat)));
    }

    #[test]
    fn test_decode_garbage_is_error() {
        assert!(decode_capture(&[0x00, 0x01, 0x02, 0x03]).is_err());
    }

    #[test]
    fn test_decode_truncated_jpeg() {
        let jpeg = sample_jpeg(16, 16);
        assert!(decode_capture(&jpeg[..40]).is_err());
    }

    #[test]
    fn test_orientation_without_exif() {
        assert_eq!(tagged_orientation(&sample_jpeg(4, 4)), Orientation::Normal);
        assert_eq!(tagged_orientation(&[0x00, 0x01]), Orientation::Normal);
    }

    #[test]
    fn test_oriented_decode_turns_tagged_capture() {
        let jpeg = tagged_jpeg(&sample_jpeg(12, 6), 6);
        assert_eq!(tagged_orientation(&jpeg), Orientation::QuarterRight);

        let raw = decode_capture(&jpeg).unwrap();
        let oriented = decode_capture_oriented(&jpeg).unwrap();
        assert_eq!((raw.width, raw.height), (12, 6));
        assert_eq!((oriented.width, oriented.height), (6, 12));
    }

    #[test]
    fn test_oriented_decode_matches_raw_without_exif() {
        let jpeg = sample_jpeg(12, 6);
        let raw = decode_capture(&jpeg).unwrap();
        let oriented = decode_capture_oriented(&jpeg).unwrap();
        assert_eq!((raw.width, raw.height), (oriented.width, oriented.height));
    }

    #[test]
    fn test_apply_orientation_rotate90_swaps() {
        let rgb = image::RgbImage::from_raw(2, 1, vec![255, 0, 0, 0, 255, 0]).unwrap();
        let result = apply_orientation(DynamicImage::ImageRgb8(rgb), Orientation::QuarterRight);
        assert_eq!(result.into_rgb8().dimensions(), (1, 2));
    }
}
