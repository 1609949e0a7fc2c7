//! JPEG APP1 (Exif) segment replacement.
//!
//! Only the marker segments before the first scan are parsed; entropy-coded
//! data after SOS is copied through untouched.

use super::MetadataError;

const MARKER_PREFIX: u8 = 0xFF;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const TEM: u8 = 0x01;

const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

/// Largest payload a marker segment can carry, including its length field.
const MAX_SEGMENT_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy)]
struct Segment {
    marker: u8,
    /// Offset of the 0xFF byte.
    start: usize,
    /// Offset one past the segment's last byte.
    end: usize,
}

impl Segment {
    fn payload<'a>(&self, jpeg: &'a [u8]) -> &'a [u8] {
        let header = if has_length(self.marker) { 4 } else { 2 };
        &jpeg[(self.start + header).min(self.end)..self.end]
    }

    fn is_exif(&self, jpeg: &[u8]) -> bool {
        self.marker == APP1 && self.payload(jpeg).starts_with(EXIF_HEADER)
    }
}

fn has_length(marker: u8) -> bool {
    !(marker == TEM || (0xD0..=0xD7).contains(&marker) || marker == SOI || marker == EOI)
}

/// Whether `bytes` start with a JPEG SOI marker.
pub fn is_jpeg(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == MARKER_PREFIX && bytes[1] == SOI
}

/// Parse header segments up to SOS (or EOI). Returns the segments and the
/// offset where the remaining data starts.
fn parse_segments(jpeg: &[u8]) -> Result<(Vec<Segment>, usize), MetadataError> {
    if !is_jpeg(jpeg) {
        return Err(MetadataError::NotJpeg);
    }

    let mut segments = Vec::new();
    let mut pos = 2;

    loop {
        if pos >= jpeg.len() {
            return Err(MetadataError::MalformedJpeg(
                "reached end of data before start of scan".to_string(),
            ));
        }
        if jpeg[pos] != MARKER_PREFIX {
            return Err(MetadataError::MalformedJpeg(format!(
                "expected marker at offset {pos}"
            )));
        }

        let start = pos;
        // Any number of 0xFF fill bytes may precede a marker.
        while pos < jpeg.len() && jpeg[pos] == MARKER_PREFIX {
            pos += 1;
        }
        if pos >= jpeg.len() {
            return Err(MetadataError::MalformedJpeg("truncated marker".to_string()));
        }
        let marker = jpeg[pos];
        pos += 1;

        if marker == SOS || marker == EOI {
            return Ok((segments, start));
        }

        if !has_length(marker) {
            segments.push(Segment {
                marker,
                start,
                end: pos,
            });
            continue;
        }

        if pos + 2 > jpeg.len() {
            return Err(MetadataError::MalformedJpeg(format!(
                "truncated length for marker 0x{marker:02X}"
            )));
        }
        let length = u16::from_be_bytes([jpeg[pos], jpeg[pos + 1]]) as usize;
        if length < 2 || pos + length > jpeg.len() {
            return Err(MetadataError::MalformedJpeg(format!(
                "segment 0x{marker:02X} at offset {start} overruns the data"
            )));
        }
        pos += length;
        segments.push(Segment {
            marker,
            start,
            end: pos,
        });
    }
}

/// The TIFF payload of the first Exif APP1 segment, if any.
pub fn extract_exif_segment(jpeg: &[u8]) -> Result<Option<&[u8]>, MetadataError> {
    let (segments, _) = parse_segments(jpeg)?;
    Ok(segments
        .iter()
        .find(|s| s.is_exif(jpeg))
        .map(|s| &s.payload(jpeg)[EXIF_HEADER.len()..]))
}

/// Replace every Exif APP1 segment of `jpeg` with one carrying `tiff`.
///
/// The new segment goes right after SOI, or after a leading JFIF APP0 when
/// there is one. All other segments and the scan data are kept byte for
/// byte.
pub fn replace_exif_segment(jpeg: &[u8], tiff: &[u8]) -> Result<Vec<u8>, MetadataError> {
    let segment_len = 2 + EXIF_HEADER.len() + tiff.len();
    if segment_len > MAX_SEGMENT_LEN {
        return Err(MetadataError::SegmentTooLarge(segment_len));
    }

    let (segments, scan_start) = parse_segments(jpeg)?;
    let insert_after_app0 = segments.first().map(|s| s.marker == APP0).unwrap_or(false);

    let mut out = Vec::with_capacity(jpeg.len() + segment_len + 2);
    out.extend_from_slice(&[MARKER_PREFIX, SOI]);

    let mut new_segment = Vec::with_capacity(segment_len + 2);
    new_segment.extend_from_slice(&[MARKER_PREFIX, APP1]);
    new_segment.extend_from_slice(&(segment_len as u16).to_be_bytes());
    new_segment.extend_from_slice(EXIF_HEADER);
    new_segment.extend_from_slice(tiff);

    let mut inserted = false;
    for (index, segment) in segments.iter().enumerate() {
        if !inserted && !(index == 0 && insert_after_app0) {
            out.extend_from_slice(&new_segment);
            inserted = true;
        }
        if segment.is_exif(jpeg) {
            continue;
        }
        out.extend_from_slice(&jpeg[segment.start..segment.end]);
    }
    if !inserted {
        out.extend_from_slice(&new_segment);
    }

    out.extend_from_slice(&jpeg[scan_start..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn synthetic_jpeg(header_segments: &[Vec<u8>]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        for s in header_segments {
            out.extend_from_slice(s);
        }
        out.extend_from_slice(&segment(SOS, &[1, 2, 3]));
        out.extend_from_slice(&[0x12, 0xFF, 0x00, 0x34]);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    #[test]
    fn test_inserts_after_soi() {
        let dqt = segment(0xDB, &[0; 4]);
        let jpeg = synthetic_jpeg(&[dqt.clone()]);
        let out = replace_exif_segment(&jpeg, b"TIFF").unwrap();

        assert_eq!(&out[..2], &[0xFF, 0xD8]);
        assert_eq!(&out[2..4], &[0xFF, APP1]);
        assert_eq!(extract_exif_segment(&out).unwrap(), Some(&b"TIFF"[..]));
        assert!(out.ends_with(&[0x12, 0xFF, 0x00, 0x34, 0xFF, 0xD9]));
    }

    #[test]
    fn test_keeps_jfif_first() {
        let app0 = segment(APP0, b"JFIF\0\x01\x01");
        let jpeg = synthetic_jpeg(&[app0.clone()]);
        let out = replace_exif_segment(&jpeg, b"TIFF").unwrap();

        assert_eq!(&out[2..2 + app0.len()], app0.as_slice());
        assert_eq!(out[2 + app0.len() + 1], APP1);
    }

    #[test]
    fn test_replaces_existing_exif_only() {
        let old_exif = segment(APP1, b"Exif\0\0OLD");
        let xmp = segment(APP1, b"http://ns.adobe.com/xap/1.0/\0<x/>");
        let jpeg = synthetic_jpeg(&[old_exif, xmp.clone()]);
        let out = replace_exif_segment(&jpeg, b"NEW").unwrap();

        assert_eq!(extract_exif_segment(&out).unwrap(), Some(&b"NEW"[..]));
        assert!(out.windows(xmp.len()).any(|w| w == xmp.as_slice()));
        assert!(!out.windows(3).any(|w| w == b"OLD"));
    }

    #[test]
    fn test_rejects_non_jpeg() {
        let png = [0x89, b'P', b'N', b'G'];
        assert!(matches!(
            replace_exif_segment(&png, b"T"),
            Err(MetadataError::NotJpeg)
        ));
    }

    #[test]
    fn test_rejects_truncated() {
        let mut jpeg = vec![0xFF, 0xD8];
        jpeg.extend_from_slice(&[0xFF, 0xDB, 0x00, 0x40, 0x00]);
        assert!(matches!(
            replace_exif_segment(&jpeg, b"T"),
            Err(MetadataError::MalformedJpeg(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let jpeg = synthetic_jpeg(&[]);
        let tiff = vec![0u8; MAX_SEGMENT_LEN];
        assert!(matches!(
            replace_exif_segment(&jpeg, &tiff),
            Err(MetadataError::SegmentTooLarge(_))
        ));
    }

    #[test]
    fn test_no_exif_segment() {
        let jpeg = synthetic_jpeg(&[segment(0xDB, &[0; 4])]);
        assert_eq!(extract_exif_segment(&jpeg).unwrap(), None);
    }
}
