//! One capture event, end to end.
//!
//! estimate orientation → rotate pixels → embed metadata → atomic save →
//! sidecars → thumbnail
//!
//! Each stage after the estimate is an enrichment. A failing stage is
//! logged, recorded in [`CaptureOutcome::warnings`] and skipped; the capture
//! is still saved. Only an I/O failure while replacing the media file itself
//! is returned as an error.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::atomic::write_bytes_atomic;
use crate::config::{ConfigError, PipelineConfig};
use crate::decode::{capture_dimensions, decode_capture_oriented};
use crate::encode::encode_jpeg;
use crate::error::PipelineError;
use crate::media::{thumbnail_path_for, MediaItem};
use crate::metadata::jpeg::is_jpeg;
use crate::metadata::{MetadataTarget, MetadataWriter, PhotoMetadata};
use crate::orientation::sensor::read_once;
use crate::orientation::{
    CameraDescription, DeviceInfo, OrientationData, OrientationEstimator, SensorError,
    SensorReading, SensorSource,
};
use crate::sidecar;
use crate::transform::{generate_thumbnail, rotate_encoded, QuarterTurn, RotationError};

/// Quality of saved thumbnails.
const THUMBNAIL_QUALITY: u8 = 80;

/// A still photo handed over by the camera surface.
#[derive(Debug)]
pub struct CaptureRequest {
    /// Encoded bytes as produced by the camera.
    pub bytes: Vec<u8>,
    pub camera: CameraDescription,
    pub device: DeviceInfo,
    /// Motion reading taken around the shutter press.
    pub reading: Result<SensorReading, SensorError>,
    /// Metadata collected by the host; a minimal record is built when absent.
    pub metadata: Option<PhotoMetadata>,
    pub destination: PathBuf,
    pub captured_at: DateTime<Utc>,
}

impl CaptureRequest {
    pub fn new(
        bytes: Vec<u8>,
        camera: CameraDescription,
        device: DeviceInfo,
        destination: impl Into<PathBuf>,
    ) -> Self {
        Self {
            bytes,
            camera,
            device,
            reading: Err(SensorError::Unavailable),
            metadata: None,
            destination: destination.into(),
            captured_at: Utc::now(),
        }
    }

    pub fn with_reading(mut self, reading: Result<SensorReading, SensorError>) -> Self {
        self.reading = reading;
        self
    }

    pub fn with_metadata(mut self, metadata: PhotoMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = at;
        self
    }
}

/// A finished video recording already written to `path`.
#[derive(Debug)]
pub struct VideoCapture {
    pub path: PathBuf,
    pub camera: CameraDescription,
    pub device: DeviceInfo,
    pub reading: Result<SensorReading, SensorError>,
    pub metadata: Option<PhotoMetadata>,
    pub duration_ms: Option<u64>,
    pub captured_at: DateTime<Utc>,
}

/// Result of a capture that was saved.
#[derive(Debug)]
pub struct CaptureOutcome {
    pub item: MediaItem,
    pub orientation: OrientationData,
    /// Rotation actually applied to the pixels.
    pub rotation: QuarterTurn,
    /// Where metadata went, if anywhere.
    pub metadata: Option<MetadataTarget>,
    /// Stages that degraded.
    pub warnings: Vec<PipelineError>,
}

/// Runs capture events with a fixed configuration.
///
/// Holds no mutable state; share it behind an `Arc` to run captures
/// concurrently.
#[derive(Debug, Clone)]
pub struct CapturePipeline {
    config: PipelineConfig,
    estimator: OrientationEstimator,
    writer: MetadataWriter,
}

impl Default for CapturePipeline {
    fn default() -> Self {
        Self::from_valid_config(PipelineConfig::default())
    }
}

impl CapturePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PipelineConfig) -> Self {
        let estimator = config.estimator();
        let writer = MetadataWriter::new(config.software.clone())
            .with_sidecar_fallback(config.sidecar_fallback);
        Self {
            config,
            estimator,
            writer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn estimator(&self) -> &OrientationEstimator {
        &self.estimator
    }

    /// Sample `source` for the configured window.
    pub fn read_sensors<S: SensorSource>(&self, source: S) -> Result<SensorReading, SensorError> {
        read_once(source, self.config.sampling_window())
    }

    pub fn process_photo(&self, request: CaptureRequest) -> Result<CaptureOutcome, PipelineError> {
        let CaptureRequest {
            bytes: original,
            camera,
            device,
            reading,
            metadata,
            destination,
            captured_at,
        } = request;
        let mut warnings = Vec::new();

        let reading = accept_reading(reading, &mut warnings);
        let orientation = self
            .estimator
            .estimate(reading.as_ref(), &camera, &device, captured_at);

        let needed = orientation.camera_rotation_needed;
        let turn = match QuarterTurn::from_degrees(i32::from(needed)) {
            Some(turn) if self.config.rotate_pixels => turn,
            Some(_) => QuarterTurn::None,
            None => {
                log::warn!(
                    "estimated {needed}° for camera {} (sensor at {}°); saving unrotated",
                    camera.name,
                    camera.sensor_orientation
                );
                warnings.push(RotationError::NotQuarterTurn(needed).into());
                QuarterTurn::None
            }
        };

        let mut applied = QuarterTurn::None;
        let mut rotated_bytes = None;
        if turn != QuarterTurn::None {
            let mut outcome = rotate_encoded(original.clone(), turn, self.config.jpeg_quality);
            applied = outcome.applied;
            if let Some(e) = outcome.error.take() {
                warnings.push(e.into());
            }
            if outcome.rotated() {
                rotated_bytes = Some(outcome.bytes);
            }
        }
        let pixels: &[u8] = rotated_bytes.as_deref().unwrap_or(&original);

        let metadata = self.complete_metadata(
            metadata,
            pixels,
            &camera,
            &device,
            reading.as_ref(),
            captured_at,
        );

        let mut embedded = None;
        if self.config.embed_exif && is_jpeg(pixels) {
            match self
                .writer
                .embed(pixels, &metadata, Some(&original), applied != QuarterTurn::None)
            {
                Ok(bytes) => embedded = Some(bytes),
                Err(e) => {
                    log::warn!("saving without embedded metadata: {e}");
                    warnings.push(e.into());
                }
            }
        }
        let metadata_target = embedded.as_ref().map(|_| MetadataTarget::Embedded);
        let saved: &[u8] = embedded.as_deref().unwrap_or(pixels);

        write_bytes_atomic(&destination, saved).map_err(|e| PipelineError::io(&destination, e))?;
        log::debug!("saved capture {} ({} bytes)", destination.display(), saved.len());

        let metadata_target = match metadata_target {
            Some(target) => Some(target),
            None => self.write_metadata_sidecar(&destination, &metadata, &mut warnings),
        };
        self.write_orientation_sidecar(&destination, &orientation, &mut warnings);

        let mut item = MediaItem::photo(destination.clone(), captured_at)
            .with_orientation(orientation.clone())
            .with_file_size(saved.len() as u64);
        if let Some(size) = self.config.thumbnail_size {
            match write_thumbnail(saved, &destination, size) {
                Ok(path) => item = item.with_thumbnail(path),
                Err(e) => {
                    log::warn!("no thumbnail for {}: {e}", destination.display());
                    warnings.push(e);
                }
            }
        }

        Ok(CaptureOutcome {
            item,
            orientation,
            rotation: applied,
            metadata: metadata_target,
            warnings,
        })
    }

    /// Record orientation and metadata for a finished recording.
    ///
    /// Video pixels are never rewritten; the rotation is only recorded in
    /// the orientation sidecar and metadata always goes to a JSON sidecar.
    pub fn process_video(&self, capture: VideoCapture) -> Result<CaptureOutcome, PipelineError> {
        let VideoCapture {
            path,
            camera,
            device,
            reading,
            metadata,
            duration_ms,
            captured_at,
        } = capture;
        let mut warnings = Vec::new();

        let file_size = fs::metadata(&path)
            .map_err(|e| PipelineError::io(&path, e))?
            .len();

        let reading = accept_reading(reading, &mut warnings);
        let orientation = self
            .estimator
            .estimate(reading.as_ref(), &camera, &device, captured_at);

        let mut metadata =
            metadata.unwrap_or_else(|| PhotoMetadata::new(captured_at.fixed_offset(), device.clone()));
        metadata.file_size = Some(file_size);
        if metadata.tilt.is_none() {
            metadata.tilt = reading.and_then(|r| r.accelerometer);
        }

        let metadata_target = self.write_metadata_sidecar(&path, &metadata, &mut warnings);
        self.write_orientation_sidecar(&path, &orientation, &mut warnings);

        let item = MediaItem::video(path, captured_at, duration_ms)
            .with_orientation(orientation.clone())
            .with_file_size(file_size);

        Ok(CaptureOutcome {
            item,
            orientation,
            rotation: QuarterTurn::None,
            metadata: metadata_target,
            warnings,
        })
    }

    fn complete_metadata(
        &self,
        metadata: Option<PhotoMetadata>,
        pixels: &[u8],
        camera: &CameraDescription,
        device: &DeviceInfo,
        reading: Option<&SensorReading>,
        captured_at: DateTime<Utc>,
    ) -> PhotoMetadata {
        let mut metadata =
            metadata.unwrap_or_else(|| PhotoMetadata::new(captured_at.fixed_offset(), device.clone()));
        if metadata.camera.lens_direction.is_none() {
            metadata.camera.lens_direction = Some(camera.lens_direction);
        }
        if metadata.tilt.is_none() {
            metadata.tilt = reading.and_then(|r| r.accelerometer);
        }
        match capture_dimensions(pixels) {
            Ok((width, height)) => metadata = metadata.with_dimensions(width, height),
            Err(e) => log::debug!("capture dimensions unavailable: {e}"),
        }
        metadata
    }

    fn write_metadata_sidecar(
        &self,
        media_path: &Path,
        metadata: &PhotoMetadata,
        warnings: &mut Vec<PipelineError>,
    ) -> Option<MetadataTarget> {
        if !self.config.sidecar_fallback {
            return None;
        }
        match self.writer.write_sidecar(media_path, metadata) {
            Ok(path) => Some(MetadataTarget::Sidecar(path)),
            Err(e) => {
                log::warn!("metadata sidecar failed for {}: {e}", media_path.display());
                warnings.push(e.into());
                None
            }
        }
    }

    fn write_orientation_sidecar(
        &self,
        media_path: &Path,
        orientation: &OrientationData,
        warnings: &mut Vec<PipelineError>,
    ) {
        if !self.config.write_orientation_sidecar {
            return;
        }
        if let Err(e) = sidecar::write_orientation(media_path, orientation) {
            log::warn!("orientation sidecar failed for {}: {e}", media_path.display());
            warnings.push(e.into());
        }
    }
}

#[cfg(feature = "runtime")]
impl CapturePipeline {
    /// [`Self::process_photo`] on tokio's blocking pool.
    pub async fn process_photo_async(
        self: std::sync::Arc<Self>,
        request: CaptureRequest,
    ) -> Result<CaptureOutcome, PipelineError> {
        tokio::task::spawn_blocking(move || self.process_photo(request))
            .await
            .map_err(|e| PipelineError::WorkerFailed(e.to_string()))?
    }

    /// [`Self::process_video`] on tokio's blocking pool.
    pub async fn process_video_async(
        self: std::sync::Arc<Self>,
        capture: VideoCapture,
    ) -> Result<CaptureOutcome, PipelineError> {
        tokio::task::spawn_blocking(move || self.process_video(capture))
            .await
            .map_err(|e| PipelineError::WorkerFailed(e.to_string()))?
    }
}

fn accept_reading(
    reading: Result<SensorReading, SensorError>,
    warnings: &mut Vec<PipelineError>,
) -> Option<SensorReading> {
    match reading {
        Ok(reading) => Some(reading),
        Err(e) => {
            log::warn!("estimating orientation without sensors: {e}");
            warnings.push(e.into());
            None
        }
    }
}

fn write_thumbnail(bytes: &[u8], media_path: &Path, size: u32) -> Result<PathBuf, PipelineError> {
    let decoded = decode_capture_oriented(bytes).map_err(RotationError::from)?;
    let thumbnail = generate_thumbnail(&decoded, size).map_err(RotationError::from)?;
    let encoded = encode_jpeg(&thumbnail.pixels, thumbnail.width, thumbnail.height, THUMBNAIL_QUALITY)
        .map_err(RotationError::from)?;

    let path = thumbnail_path_for(media_path);
    write_bytes_atomic(&path, &encoded).map_err(|e| PipelineError::io(&path, e))?;
    Ok(path)
}
