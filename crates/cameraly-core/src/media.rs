//! Saved media files and their side files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::orientation::OrientationData;
use crate::sidecar;

/// Suffix appended to a media file's stem to name its thumbnail.
pub const THUMBNAIL_SUFFIX: &str = ".thumb.jpg";

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "heif", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "3gp", "webm", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Photo,
    Video,
}

impl MediaType {
    /// Media type implied by the file extension, if recognized.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaType::Photo)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaType::Video)
        } else {
            None
        }
    }
}

/// A photo or video on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub captured_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation_info: Option<OrientationData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<PathBuf>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl MediaItem {
    pub fn photo(path: impl Into<PathBuf>, captured_at: DateTime<Utc>) -> Self {
        Self::new(path.into(), MediaType::Photo, captured_at)
    }

    pub fn video(path: impl Into<PathBuf>, captured_at: DateTime<Utc>, duration_ms: Option<u64>) -> Self {
        Self {
            video_duration_ms: duration_ms,
            ..Self::new(path.into(), MediaType::Video, captured_at)
        }
    }

    fn new(path: PathBuf, media_type: MediaType, captured_at: DateTime<Utc>) -> Self {
        Self {
            path,
            media_type,
            captured_at,
            orientation_info: None,
            thumbnail_path: None,
            video_duration_ms: None,
            file_size: None,
        }
    }

    /// Build an item for an existing file.
    ///
    /// The type comes from the extension, the capture time from the
    /// orientation sidecar when there is one and the modification time
    /// otherwise. A thumbnail is attached if one exists next to the file.
    pub fn discover(path: &Path) -> io::Result<Self> {
        let media_type = MediaType::from_path(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unrecognized media extension: {}", path.display()),
            )
        })?;
        let meta = fs::metadata(path)?;

        let orientation_info = match sidecar::read_orientation(path) {
            Ok(info) => info,
            Err(e) => {
                log::warn!("ignoring unreadable orientation sidecar for {}: {e}", path.display());
                None
            }
        };
        let captured_at = orientation_info
            .as_ref()
            .map(|o| o.timestamp)
            .or_else(|| meta.modified().ok().map(DateTime::<Utc>::from))
            .unwrap_or_else(Utc::now);

        let thumbnail = thumbnail_path_for(path);
        let mut item = Self::new(path.to_path_buf(), media_type, captured_at);
        item.orientation_info = orientation_info;
        item.thumbnail_path = thumbnail.is_file().then_some(thumbnail);
        item.file_size = Some(meta.len());
        Ok(item)
    }

    pub fn with_orientation(mut self, info: OrientationData) -> Self {
        self.orientation_info = Some(info);
        self
    }

    pub fn with_thumbnail(mut self, path: PathBuf) -> Self {
        self.thumbnail_path = Some(path);
        self
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }

    /// Delete the backing file together with its sidecars and thumbnail.
    pub fn delete(self) -> io::Result<()> {
        fs::remove_file(&self.path)?;
        sidecar::remove_all(&self.path)?;
        if let Some(thumb) = &self.thumbnail_path {
            match fs::remove_file(thumb) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        log::debug!("deleted {}", self.path.display());
        Ok(())
    }
}

/// Path of the thumbnail stored next to `media_path`.
///
/// Named after the full file name, so `IMG_1.jpg` and `IMG_1.png` never
/// share a thumbnail.
pub fn thumbnail_path_for(media_path: &Path) -> PathBuf {
    let name = media_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    media_path.with_file_name(format!("{name}{THUMBNAIL_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::LensDirection;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn orientation(at: DateTime<Utc>) -> OrientationData {
        OrientationData {
            device_angle_degrees: 90,
            camera_rotation_needed: 180,
            sensor_orientation: 90,
            accuracy_score: 0.7,
            device_manufacturer: "Google".to_string(),
            device_model: "Pixel 7".to_string(),
            lens_direction: LensDirection::Back,
            timestamp: at,
        }
    }

    #[test]
    fn test_media_type_from_extension() {
        assert_eq!(MediaType::from_path(Path::new("a/IMG.JPG")), Some(MediaType::Photo));
        assert_eq!(MediaType::from_path(Path::new("clip.mp4")), Some(MediaType::Video));
        assert_eq!(MediaType::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaType::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_thumbnail_path() {
        assert_eq!(
            thumbnail_path_for(Path::new("/dcim/IMG_1.jpg")),
            PathBuf::from("/dcim/IMG_1.jpg.thumb.jpg")
        );
    }

    #[test]
    fn test_delete_keeps_thumbnail_of_same_stem() {
        let dir = tempdir().unwrap();
        let jpg = dir.path().join("IMG_1.jpg");
        let png = dir.path().join("IMG_1.png");
        for path in [&jpg, &png] {
            fs::write(path, b"data").unwrap();
            fs::write(thumbnail_path_for(path), b"thumb").unwrap();
        }
        assert_ne!(thumbnail_path_for(&jpg), thumbnail_path_for(&png));

        MediaItem::discover(&jpg).unwrap().delete().unwrap();

        assert!(!thumbnail_path_for(&jpg).exists());
        assert!(png.is_file());
        assert!(thumbnail_path_for(&png).is_file());
    }

    #[test]
    fn test_discover_uses_sidecar_timestamp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IMG_1.jpg");
        fs::write(&path, b"jpeg").unwrap();
        fs::write(thumbnail_path_for(&path), b"thumb").unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        sidecar::write_orientation(&path, &orientation(at)).unwrap();

        let item = MediaItem::discover(&path).unwrap();
        assert_eq!(item.media_type, MediaType::Photo);
        assert_eq!(item.captured_at, at);
        assert_eq!(item.file_size, Some(4));
        assert_eq!(item.thumbnail_path, Some(thumbnail_path_for(&path)));
        assert_eq!(item.orientation_info.unwrap().camera_rotation_needed, 180);
    }

    #[test]
    fn test_discover_rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readme.txt");
        fs::write(&path, b"x").unwrap();
        let err = MediaItem::discover(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_delete_removes_side_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("IMG_2.jpg");
        fs::write(&path, b"jpeg").unwrap();
        fs::write(thumbnail_path_for(&path), b"thumb").unwrap();
        sidecar::write_orientation(&path, &orientation(Utc::now())).unwrap();

        let item = MediaItem::discover(&path).unwrap();
        item.delete().unwrap();

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_json_uses_type_key() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let item = MediaItem::video("clip.mp4", at, Some(1500));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["videoDurationMs"], 1500);
        assert!(json.get("thumbnailPath").is_none());
    }
}
