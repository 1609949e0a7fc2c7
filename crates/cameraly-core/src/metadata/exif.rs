//! EXIF field construction, encoding and read-back.
//!
//! Fields are built from a [`PhotoMetadata`], merged with whatever the
//! camera already wrote, and serialized as a TIFF structure (IFD0 with its
//! Exif and GPS sub-IFDs) using kamadak-exif's writer. Values with no
//! standard tag travel as JSON in `UserComment`.

use std::io::Cursor;

use chrono::{Datelike, Timelike, Utc};
use exif::experimental::Writer;
use exif::{Context, Exif, Field, In, Rational, Reader, Tag, Value};
use serde::{Deserialize, Serialize};

use super::types::PhotoMetadata;
use super::MetadataError;
use crate::orientation::sensor::Vector3;

/// Character code prefix for ASCII user comments.
const USER_COMMENT_ASCII: &[u8; 8] = b"ASCII\0\0\0";

/// Denominator used for GPS seconds (1/10000 arc second).
const DMS_SECONDS_SCALE: u64 = 10_000;

/// Tags describing file layout that the writer regenerates itself.
const STRUCTURAL_TAGS: &[Tag] = &[
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::MakerNote,
];

/// Tags that describe pixel geometry and go stale once pixels are rotated.
const GEOMETRY_TAGS: &[Tag] = &[Tag::Orientation, Tag::PixelXDimension, Tag::PixelYDimension];

/// JSON carried in `UserComment`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCommentPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lens: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tilt: Option<Vector3>,
    pub capture_time_millis: i64,
}

impl UserCommentPayload {
    pub fn from_metadata(metadata: &PhotoMetadata) -> Self {
        Self {
            zoom: metadata.camera.zoom,
            flash: metadata.camera.flash_mode.map(|f| f.as_str().to_string()),
            lens: metadata
                .camera
                .lens_direction
                .map(|l| l.as_str().to_string()),
            tilt: metadata.tilt,
            capture_time_millis: metadata.captured_at.timestamp_millis(),
        }
    }
}

/// Summary of the EXIF fields this crate writes, read back from a file.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedMetadata {
    pub make: Option<String>,
    pub model: Option<String>,
    pub software: Option<String>,
    pub date_time_original: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    /// km/h, as stored.
    pub speed_kmh: Option<f64>,
    pub digital_zoom: Option<f64>,
    pub orientation: Option<u32>,
    pub user_comment: Option<UserCommentPayload>,
}

/// Convert decimal degrees to EXIF degrees/minutes/seconds rationals.
pub fn decimal_to_dms(decimal: f64) -> [Rational; 3] {
    let total = (decimal.abs() * 3600.0 * DMS_SECONDS_SCALE as f64).round() as u64;
    let per_degree = 3600 * DMS_SECONDS_SCALE;
    let per_minute = 60 * DMS_SECONDS_SCALE;

    let degrees = total / per_degree;
    let remainder = total % per_degree;
    let minutes = remainder / per_minute;
    let seconds = remainder % per_minute;

    [
        Rational {
            num: degrees as u32,
            denom: 1,
        },
        Rational {
            num: minutes as u32,
            denom: 1,
        },
        Rational {
            num: seconds as u32,
            denom: DMS_SECONDS_SCALE as u32,
        },
    ]
}

/// Convert EXIF degrees/minutes/seconds rationals back to decimal degrees.
pub fn dms_to_decimal(dms: &[Rational]) -> Option<f64> {
    if dms.len() < 3 || dms.iter().take(3).any(|r| r.denom == 0) {
        return None;
    }
    Some(dms[0].to_f64() + dms[1].to_f64() / 60.0 + dms[2].to_f64() / 3600.0)
}

/// Convert a speed in m/s to km/h.
pub fn meters_per_second_to_kmh(speed: f64) -> f64 {
    speed * 3.6
}

fn rational(value: f64, denom: u32) -> Rational {
    Rational {
        num: (value.abs() * denom as f64).round() as u32,
        denom,
    }
}

fn exposure_rational(seconds: f64) -> Rational {
    if seconds > 0.0 && seconds < 1.0 {
        Rational {
            num: 1,
            denom: (1.0 / seconds).round() as u32,
        }
    } else {
        rational(seconds, 1000)
    }
}

fn field(tag: Tag, value: Value) -> Field {
    Field {
        tag,
        ifd_num: In::PRIMARY,
        value,
    }
}

fn ascii(tag: Tag, text: &str) -> Field {
    field(tag, Value::Ascii(vec![text.as_bytes().to_vec()]))
}

/// Build the fields this crate owns for `metadata`.
///
/// `Orientation` and pixel dimensions are only emitted when
/// `reset_orientation` is set, i.e. when the pixels were turned upright.
pub fn build_fields(
    metadata: &PhotoMetadata,
    software: &str,
    reset_orientation: bool,
) -> Result<Vec<Field>, MetadataError> {
    let mut fields = Vec::new();

    if !metadata.device.manufacturer.is_empty() {
        fields.push(ascii(Tag::Make, &metadata.device.manufacturer));
    }
    if !metadata.device.model.is_empty() {
        fields.push(ascii(Tag::Model, &metadata.device.model));
    }
    if !software.is_empty() {
        fields.push(ascii(Tag::Software, software));
    }

    let local = metadata.captured_at.format("%Y:%m:%d %H:%M:%S").to_string();
    fields.push(ascii(Tag::DateTime, &local));
    fields.push(ascii(Tag::DateTimeOriginal, &local));
    fields.push(ascii(Tag::DateTimeDigitized, &local));

    if reset_orientation {
        fields.push(field(Tag::Orientation, Value::Short(vec![1])));
        if let (Some(w), Some(h)) = (metadata.width, metadata.height) {
            fields.push(field(Tag::PixelXDimension, Value::Long(vec![w])));
            fields.push(field(Tag::PixelYDimension, Value::Long(vec![h])));
        }
    }

    let camera = &metadata.camera;
    if let Some(focal) = camera.focal_length_mm {
        fields.push(field(Tag::FocalLength, Value::Rational(vec![rational(focal, 100)])));
    }
    if let Some(aperture) = camera.aperture {
        fields.push(field(Tag::FNumber, Value::Rational(vec![rational(aperture, 100)])));
    }
    if let Some(exposure) = camera.exposure_time {
        fields.push(field(Tag::ExposureTime, Value::Rational(vec![exposure_rational(exposure)])));
    }
    if let Some(iso) = camera.iso {
        let iso = u16::try_from(iso).unwrap_or(u16::MAX);
        fields.push(field(Tag::PhotographicSensitivity, Value::Short(vec![iso])));
    }
    if let Some(zoom) = camera.zoom {
        fields.push(field(Tag::DigitalZoomRatio, Value::Rational(vec![rational(zoom, 100)])));
    }
    if let Some(flash) = camera.flash_mode {
        fields.push(field(Tag::Flash, Value::Short(vec![flash.exif_value()])));
    }
    if let Some(wb) = camera.white_balance {
        let value = match wb {
            super::types::WhiteBalance::Auto => 0,
            super::types::WhiteBalance::Manual => 1,
        };
        fields.push(field(Tag::WhiteBalance, Value::Short(vec![value])));
    }

    let payload = UserCommentPayload::from_metadata(metadata);
    let mut comment = USER_COMMENT_ASCII.to_vec();
    comment.extend_from_slice(&serde_json::to_vec(&payload)?);
    fields.push(field(Tag::UserComment, Value::Undefined(comment, 0)));

    if let Some(gps) = metadata.gps {
        push_gps_fields(&mut fields, &gps, metadata);
    }

    Ok(fields)
}

fn push_gps_fields(fields: &mut Vec<Field>, gps: &super::types::GpsData, metadata: &PhotoMetadata) {
    fields.push(field(Tag::GPSVersionID, Value::Byte(vec![2, 3, 0, 0])));

    if let Some(lat) = gps.latitude {
        fields.push(ascii(Tag::GPSLatitudeRef, if lat >= 0.0 { "N" } else { "S" }));
        fields.push(field(Tag::GPSLatitude, Value::Rational(decimal_to_dms(lat).to_vec())));
    }
    if let Some(lon) = gps.longitude {
        fields.push(ascii(Tag::GPSLongitudeRef, if lon >= 0.0 { "E" } else { "W" }));
        fields.push(field(Tag::GPSLongitude, Value::Rational(decimal_to_dms(lon).to_vec())));
    }
    if let Some(alt) = gps.altitude {
        let below_sea_level = u8::from(alt < 0.0);
        fields.push(field(Tag::GPSAltitudeRef, Value::Byte(vec![below_sea_level])));
        fields.push(field(Tag::GPSAltitude, Value::Rational(vec![rational(alt, 100)])));
    }
    if let Some(speed) = gps.speed {
        fields.push(ascii(Tag::GPSSpeedRef, "K"));
        let kmh = meters_per_second_to_kmh(speed.max(0.0));
        fields.push(field(Tag::GPSSpeed, Value::Rational(vec![rational(kmh, 100)])));
    }
    if let Some(heading) = gps.heading {
        fields.push(ascii(Tag::GPSImgDirectionRef, "T"));
        let heading = heading.rem_euclid(360.0);
        fields.push(field(Tag::GPSImgDirection, Value::Rational(vec![rational(heading, 100)])));
    }

    let utc = metadata.captured_at.with_timezone(&Utc);
    fields.push(field(
        Tag::GPSTimeStamp,
        Value::Rational(vec![
            Rational {
                num: utc.hour(),
                denom: 1,
            },
            Rational {
                num: utc.minute(),
                denom: 1,
            },
            Rational {
                num: utc.second(),
                denom: 1,
            },
        ]),
    ));
    let date = format!("{:04}:{:02}:{:02}", utc.year(), utc.month(), utc.day());
    fields.push(ascii(Tag::GPSDateStamp, &date));
}

/// Fields of an existing EXIF block worth keeping when it is rewritten.
///
/// Layout tags and maker notes are dropped; geometry tags are dropped when
/// the pixels were rotated.
pub fn carry_over_fields(existing: &Exif, pixels_rotated: bool) -> Vec<Field> {
    existing
        .fields()
        .filter(|f| f.ifd_num == In::PRIMARY)
        .filter(|f| matches!(f.tag.context(), Context::Tiff | Context::Exif | Context::Gps))
        .filter(|f| !STRUCTURAL_TAGS.contains(&f.tag))
        .filter(|f| !(pixels_rotated && GEOMETRY_TAGS.contains(&f.tag)))
        .filter(|f| !matches!(f.value, Value::Unknown(..)))
        .cloned()
        .collect()
}

/// Parse the EXIF block of a container, if it has one.
pub fn read_container_exif(bytes: &[u8]) -> Option<Exif> {
    Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()
}

/// Merge `ours` over `existing` and encode the result as a TIFF structure.
pub fn encode_fields(ours: &[Field], existing: &[Field]) -> Result<Vec<u8>, MetadataError> {
    let owned_tags: Vec<Tag> = ours.iter().map(|f| f.tag).collect();

    let mut writer = Writer::new();
    for f in existing.iter().filter(|f| !owned_tags.contains(&f.tag)) {
        writer.push_field(f);
    }
    for f in ours {
        writer.push_field(f);
    }

    let mut buffer = Cursor::new(Vec::new());
    writer.write(&mut buffer, false)?;
    Ok(buffer.into_inner())
}

/// Read back the fields this crate writes.
pub fn read_embedded(bytes: &[u8]) -> Result<EmbeddedMetadata, MetadataError> {
    let exif = Reader::new().read_from_container(&mut Cursor::new(bytes))?;
    Ok(summarize(&exif))
}

/// Read back from a bare TIFF structure, as produced by [`encode_fields`].
pub fn read_embedded_tiff(tiff: Vec<u8>) -> Result<EmbeddedMetadata, MetadataError> {
    let exif = Reader::new().read_raw(tiff)?;
    Ok(summarize(&exif))
}

fn summarize(exif: &Exif) -> EmbeddedMetadata {
    let text = |tag| exif.get_field(tag, In::PRIMARY).and_then(|f| ascii_value(&f.value));
    let first_rational = |tag| {
        exif.get_field(tag, In::PRIMARY).and_then(|f| match &f.value {
            Value::Rational(v) if !v.is_empty() && v[0].denom != 0 => Some(v[0].to_f64()),
            _ => None,
        })
    };
    let coordinate = |tag, ref_tag, negative: &str| {
        let value = exif.get_field(tag, In::PRIMARY).and_then(|f| match &f.value {
            Value::Rational(v) => dms_to_decimal(v),
            _ => None,
        })?;
        let reference = exif
            .get_field(ref_tag, In::PRIMARY)
            .and_then(|f| ascii_value(&f.value));
        Some(if reference.as_deref() == Some(negative) {
            -value
        } else {
            value
        })
    };

    let altitude = first_rational(Tag::GPSAltitude).map(|alt| {
        let below = exif
            .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0))
            == Some(1);
        if below {
            -alt
        } else {
            alt
        }
    });

    let user_comment = exif
        .get_field(Tag::UserComment, In::PRIMARY)
        .and_then(|f| match &f.value {
            Value::Undefined(bytes, _) if bytes.len() > USER_COMMENT_ASCII.len() => {
                serde_json::from_slice(&bytes[USER_COMMENT_ASCII.len()..]).ok()
            }
            _ => None,
        });

    EmbeddedMetadata {
        make: text(Tag::Make),
        model: text(Tag::Model),
        software: text(Tag::Software),
        date_time_original: text(Tag::DateTimeOriginal),
        latitude: coordinate(Tag::GPSLatitude, Tag::GPSLatitudeRef, "S"),
        longitude: coordinate(Tag::GPSLongitude, Tag::GPSLongitudeRef, "W"),
        altitude,
        speed_kmh: first_rational(Tag::GPSSpeed),
        digital_zoom: first_rational(Tag::DigitalZoomRatio),
        orientation: exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|f| f.value.get_uint(0)),
        user_comment,
    }
}

fn ascii_value(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_end_matches('\0').to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::types::{CameraSettings, FlashMode, GpsData};
    use crate::orientation::{DeviceInfo, LensDirection};
    use chrono::{FixedOffset, TimeZone};

    fn sample_metadata() -> PhotoMetadata {
        let at = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 7, 14, 16, 5, 30)
            .unwrap();
        PhotoMetadata::new(at, DeviceInfo::new("Samsung", "Galaxy S21"))
            .with_camera(CameraSettings {
                zoom: Some(2.5),
                flash_mode: Some(FlashMode::Auto),
                lens_direction: Some(LensDirection::Back),
                focal_length_mm: Some(5.4),
                aperture: Some(1.8),
                exposure_time: Some(0.004),
                iso: Some(100),
                ..CameraSettings::default()
            })
            .with_gps(GpsData {
                latitude: Some(-33.868_820),
                longitude: Some(151.209_296),
                altitude: Some(-12.5),
                speed: Some(10.0),
                heading: Some(275.0),
            })
            .with_tilt(Vector3::new(0.1, 9.7, 0.4))
    }

    #[test]
    fn test_dms_conversion() {
        let dms = decimal_to_dms(48.858_37);
        assert_eq!(dms[0].num, 48);
        assert_eq!(dms[1].num, 51);
        let back = dms_to_decimal(&dms).unwrap();
        assert!((back - 48.858_37).abs() < 1e-6);
    }

    #[test]
    fn test_dms_rejects_zero_denominator() {
        let bad = [
            Rational { num: 1, denom: 0 },
            Rational { num: 0, denom: 1 },
            Rational { num: 0, denom: 1 },
        ];
        assert!(dms_to_decimal(&bad).is_none());
        assert!(dms_to_decimal(&bad[..2]).is_none());
    }

    #[test]
    fn test_speed_conversion() {
        assert!((meters_per_second_to_kmh(10.0) - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_round_trip_through_tiff() {
        let fields = build_fields(&sample_metadata(), "Cameraly", true).unwrap();
        let tiff = encode_fields(&fields, &[]).unwrap();
        let read = read_embedded_tiff(tiff).unwrap();

        assert_eq!(read.make.as_deref(), Some("Samsung"));
        assert_eq!(read.model.as_deref(), Some("Galaxy S21"));
        assert_eq!(read.software.as_deref(), Some("Cameraly"));
        assert_eq!(read.date_time_original.as_deref(), Some("2024:07:14 16:05:30"));
        assert!((read.latitude.unwrap() + 33.868_820).abs() < 1e-4);
        assert!((read.longitude.unwrap() - 151.209_296).abs() < 1e-4);
        assert!((read.altitude.unwrap() + 12.5).abs() < 1e-2);
        assert!((read.speed_kmh.unwrap() - 36.0).abs() < 1e-2);
        assert!((read.digital_zoom.unwrap() - 2.5).abs() < 1e-2);
        assert_eq!(read.orientation, Some(1));

        let comment = read.user_comment.unwrap();
        assert_eq!(comment.zoom, Some(2.5));
        assert_eq!(comment.flash.as_deref(), Some("auto"));
        assert_eq!(comment.lens.as_deref(), Some("back"));
        assert_eq!(comment.capture_time_millis, sample_metadata().captured_at.timestamp_millis());
    }

    #[test]
    fn test_no_orientation_without_rotation() {
        let fields = build_fields(&sample_metadata(), "Cameraly", false).unwrap();
        assert!(!fields.iter().any(|f| f.tag == Tag::Orientation));
    }

    #[test]
    fn test_gps_timestamp_is_utc() {
        let fields = build_fields(&sample_metadata(), "", false).unwrap();
        let stamp = fields.iter().find(|f| f.tag == Tag::GPSTimeStamp).unwrap();
        match &stamp.value {
            Value::Rational(v) => assert_eq!(v[0].num, 14),
            other => panic!("unexpected value {other:?}"),
        }
        let date = fields.iter().find(|f| f.tag == Tag::GPSDateStamp).unwrap();
        assert_eq!(ascii_value(&date.value).as_deref(), Some("2024:07:14"));
        assert!(!fields.iter().any(|f| f.tag == Tag::Software));
    }

    #[test]
    fn test_ours_override_existing() {
        let existing = vec![
            ascii(Tag::Make, "OldMake"),
            ascii(Tag::Artist, "Jane Photographer"),
        ];
        let fields = build_fields(&sample_metadata(), "Cameraly", false).unwrap();
        let tiff = encode_fields(&fields, &existing).unwrap();
        let exif = Reader::new().read_raw(tiff).unwrap();

        let make = exif.get_field(Tag::Make, In::PRIMARY).unwrap();
        assert_eq!(ascii_value(&make.value).as_deref(), Some("Samsung"));
        assert!(exif.get_field(Tag::Artist, In::PRIMARY).is_some());
    }
}
