//! Writing [`PhotoMetadata`] into captures.

use std::fs;
use std::path::{Path, PathBuf};

use super::exif::{build_fields, carry_over_fields, encode_fields, read_container_exif};
use super::jpeg::{is_jpeg, replace_exif_segment};
use super::types::PhotoMetadata;
use super::MetadataError;
use crate::atomic::write_bytes_atomic;
use crate::sidecar;

/// Default value of the EXIF `Software` tag.
pub const DEFAULT_SOFTWARE: &str = "Cameraly";

/// Where metadata ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataTarget {
    /// Written into the media file's own EXIF block.
    Embedded,
    /// Written to a JSON sidecar at this path.
    Sidecar(PathBuf),
}

#[derive(Debug, Clone)]
pub struct MetadataWriter {
    software: String,
    sidecar_fallback: bool,
}

impl Default for MetadataWriter {
    fn default() -> Self {
        Self::new(DEFAULT_SOFTWARE)
    }
}

impl MetadataWriter {
    pub fn new(software: impl Into<String>) -> Self {
        Self {
            software: software.into(),
            sidecar_fallback: true,
        }
    }

    /// Whether files that cannot carry EXIF get a JSON sidecar instead.
    pub fn with_sidecar_fallback(mut self, enabled: bool) -> Self {
        self.sidecar_fallback = enabled;
        self
    }

    pub fn software(&self) -> &str {
        &self.software
    }

    /// Return `jpeg` with its Exif segment rebuilt from `metadata`.
    ///
    /// Fields found in `original` (or in `jpeg` itself when `original` is
    /// `None`) are carried over unless `metadata` sets them. When
    /// `pixels_rotated` is set, `Orientation` is reset to 1 and the pixel
    /// dimensions are rewritten.
    pub fn embed(
        &self,
        jpeg: &[u8],
        metadata: &PhotoMetadata,
        original: Option<&[u8]>,
        pixels_rotated: bool,
    ) -> Result<Vec<u8>, MetadataError> {
        if !is_jpeg(jpeg) {
            return Err(MetadataError::NotJpeg);
        }

        let existing = read_container_exif(original.unwrap_or(jpeg))
            .map(|exif| carry_over_fields(&exif, pixels_rotated))
            .unwrap_or_default();
        let ours = build_fields(metadata, &self.software, pixels_rotated)?;
        let tiff = encode_fields(&ours, &existing)?;

        log::debug!(
            "embedding {} EXIF fields ({} carried over, {} bytes)",
            ours.len(),
            existing.len(),
            tiff.len()
        );
        replace_exif_segment(jpeg, &tiff)
    }

    /// Write `metadata` into the file at `path`.
    ///
    /// JPEG files are rewritten atomically with a new Exif segment; anything
    /// else gets a `<path>.metadata.json` sidecar when fallback is enabled.
    pub fn write_to_file(
        &self,
        path: &Path,
        metadata: &PhotoMetadata,
    ) -> Result<MetadataTarget, MetadataError> {
        let bytes = fs::read(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        if !is_jpeg(&bytes) {
            if !self.sidecar_fallback {
                return Err(MetadataError::NotJpeg);
            }
            return self.write_sidecar(path, metadata).map(MetadataTarget::Sidecar);
        }

        let updated = self.embed(&bytes, metadata, None, false)?;
        write_bytes_atomic(path, &updated).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(MetadataTarget::Embedded)
    }

    /// Write `metadata` to the JSON sidecar of `media_path`.
    pub fn write_sidecar(
        &self,
        media_path: &Path,
        metadata: &PhotoMetadata,
    ) -> Result<PathBuf, MetadataError> {
        let path = sidecar::write_metadata(media_path, metadata)?;
        log::debug!("wrote metadata sidecar {}", path.display());
        Ok(path)
    }
}
