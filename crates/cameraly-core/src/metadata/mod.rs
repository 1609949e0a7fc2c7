//! Capture metadata: EXIF construction, JPEG embedding, sidecar fallback.

pub mod exif;
pub mod jpeg;
mod types;
mod writer;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::sidecar::SidecarError;

pub use self::exif::{
    decimal_to_dms, dms_to_decimal, read_embedded, EmbeddedMetadata, UserCommentPayload,
};
pub use jpeg::{extract_exif_segment, replace_exif_segment};
pub use types::{
    CameraSettings, EnvironmentReadings, FlashMode, FocusMode, GpsData, PhotoMetadata, WhiteBalance,
};
pub use writer::{MetadataTarget, MetadataWriter, DEFAULT_SOFTWARE};

/// Errors that can occur while writing capture metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("EXIF error: {0}")]
    Exif(#[from] ::exif::Error),

    #[error("not a JPEG stream")]
    NotJpeg,

    #[error("malformed JPEG: {0}")]
    MalformedJpeg(String),

    #[error("EXIF segment of {0} bytes exceeds the APP1 limit")]
    SegmentTooLarge(usize),

    #[error("metadata JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sidecar(#[from] SidecarError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MetadataError {
    /// True for failures of the filesystem rather than of the metadata.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            MetadataError::Io { .. } | MetadataError::Sidecar(SidecarError::Io { .. })
        )
    }
}
