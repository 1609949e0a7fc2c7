//! JSON sidecar files stored next to media files.
//!
//! A sidecar for `IMG_0001.jpg` lives at `IMG_0001.jpg.<suffix>`. Sidecars
//! are written atomically, like the media itself.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::atomic::write_atomic;
use crate::metadata::PhotoMetadata;
use crate::orientation::OrientationData;

/// Suffix of the orientation sidecar.
pub const ORIENTATION_SUFFIX: &str = "orientation.json";

/// Suffix of the metadata sidecar used when the container cannot carry EXIF.
pub const METADATA_SUFFIX: &str = "metadata.json";

#[derive(Debug, Error)]
pub enum SidecarError {
    #[error("sidecar JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("sidecar I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Path of the sidecar with `suffix` for `media_path`.
pub fn sidecar_path(media_path: &Path, suffix: &str) -> PathBuf {
    let mut name = media_path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Serialize `value` as pretty JSON into the sidecar.
pub fn write_json<T: Serialize>(
    media_path: &Path,
    suffix: &str,
    value: &T,
) -> Result<PathBuf, SidecarError> {
    let path = sidecar_path(media_path, suffix);
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(&path, |file| file.write_all(&json)).map_err(|source| SidecarError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Read a sidecar; `Ok(None)` when it does not exist.
pub fn read_json<T: DeserializeOwned>(
    media_path: &Path,
    suffix: &str,
) -> Result<Option<T>, SidecarError> {
    let path = sidecar_path(media_path, suffix);
    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => return Err(SidecarError::Io { path, source }),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

pub fn write_orientation(media_path: &Path, data: &OrientationData) -> Result<PathBuf, SidecarError> {
    write_json(media_path, ORIENTATION_SUFFIX, data)
}

pub fn read_orientation(media_path: &Path) -> Result<Option<OrientationData>, SidecarError> {
    read_json(media_path, ORIENTATION_SUFFIX)
}

pub fn write_metadata(media_path: &Path, metadata: &PhotoMetadata) -> Result<PathBuf, SidecarError> {
    write_json(media_path, METADATA_SUFFIX, metadata)
}

pub fn read_metadata(media_path: &Path) -> Result<Option<PhotoMetadata>, SidecarError> {
    read_json(media_path, METADATA_SUFFIX)
}

/// Remove every known sidecar of `media_path`, ignoring missing ones.
pub fn remove_all(media_path: &Path) -> io::Result<()> {
    for suffix in [ORIENTATION_SUFFIX, METADATA_SUFFIX] {
        match fs::remove_file(sidecar_path(media_path, suffix)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
