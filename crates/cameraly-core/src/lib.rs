//! Cameraly Core - capture orientation and metadata pipeline
//!
//! This crate turns a raw capture from a phone or browser camera into a
//! correctly oriented, metadata-rich media file: it classifies the device
//! angle from motion sensors, applies per-manufacturer corrections, rotates
//! the pixels upright, writes EXIF/GPS tags (or a JSON sidecar) and replaces
//! the destination file atomically.

pub mod atomic;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod media;
pub mod metadata;
pub mod orientation;
pub mod pipeline;
pub mod sidecar;
pub mod transform;

pub use config::{ConfigError, PipelineConfig};
pub use error::PipelineError;
pub use media::{MediaItem, MediaType};
pub use metadata::{MetadataError, MetadataTarget, MetadataWriter, PhotoMetadata};
pub use orientation::{
    CameraDescription, CorrectionTable, DeviceCorrection, DeviceInfo, LensDirection,
    OrientationData, OrientationEstimator, SensorReader, SensorReading, SensorSource,
};
pub use pipeline::{CaptureOutcome, CapturePipeline, CaptureRequest, VideoCapture};
pub use transform::{apply_quarter_turn, rotate_encoded, QuarterTurn};

/// Crate version, reported by the bindings.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
