use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::metadata::MetadataError;
use crate::orientation::SensorError;
use crate::sidecar::SidecarError;
use crate::transform::RotationError;

/// Failure of one capture pipeline stage.
///
/// Only [`PipelineError::IoFailure`] on the media file itself aborts a
/// capture; every other variant is reported as a warning.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("motion sensors unavailable: {0}")]
    SensorUnavailable(#[from] SensorError),

    #[error("could not rotate image: {0}")]
    ImageDecodeFailure(#[from] RotationError),

    #[error("could not encode metadata: {0}")]
    MetadataEncodeFailure(String),

    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("capture worker failed: {0}")]
    WorkerFailed(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        PipelineError::IoFailure {
            path: path.into(),
            source,
        }
    }

    pub fn is_io(&self) -> bool {
        matches!(self, PipelineError::IoFailure { .. })
    }
}

impl From<MetadataError> for PipelineError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Io { path, source } => PipelineError::IoFailure { path, source },
            MetadataError::Sidecar(inner) => inner.into(),
            other => PipelineError::MetadataEncodeFailure(other.to_string()),
        }
    }
}

impl From<SidecarError> for PipelineError {
    fn from(err: SidecarError) -> Self {
        match err {
            SidecarError::Io { path, source } => PipelineError::IoFailure { path, source },
            SidecarError::Json(e) => PipelineError::MetadataEncodeFailure(e.to_string()),
        }
    }
}
