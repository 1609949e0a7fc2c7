//! Motion sensor sampling and device-angle classification.
//!
//! A [`SensorSource`] is an explicitly owned subscription to the device's
//! accelerometer and gyroscope. [`SensorReader`] drives its lifecycle
//! (`init` once, `read` any number of times, `dispose` once) and aggregates
//! the samples of one sampling window into a [`SensorReading`].
//!
//! # Axis convention
//!
//! Accelerometer values are in m/s² in the device frame: `+y` points to the
//! top edge of the screen, `+x` to the right edge. Holding the device upright
//! in portrait gives `y ≈ +9.8`.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gravity component (m/s²) an axis must exceed to count as a clear reading.
pub const GRAVITY_AXIS_THRESHOLD: f64 = 7.0;

/// Mean angular speed (rad/s) at which a device is considered fully unsteady.
pub const UNSTEADY_ANGULAR_SPEED: f64 = 1.0;

/// Default sampling window.
pub const DEFAULT_SAMPLING_WINDOW: Duration = Duration::from_millis(300);

/// Errors from the sensor subscription.
#[derive(Debug, Error)]
pub enum SensorError {
    /// The device exposes neither an accelerometer nor a gyroscope.
    #[error("no accelerometer or gyroscope available")]
    Unavailable,

    /// `read` was called before `init` or after `dispose`.
    #[error("sensor reader is not active")]
    NotActive,

    /// The platform subscription failed.
    #[error("sensor subscription failed: {0}")]
    Subscription(String),
}

/// A three-axis reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// One sample delivered by a sensor source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "sensor", rename_all = "lowercase")]
pub enum SensorSample {
    /// Acceleration including gravity, m/s².
    Accelerometer(Vector3),
    /// Angular velocity, rad/s.
    Gyroscope(Vector3),
}

/// Which sensors a source can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SensorCapabilities {
    pub accelerometer: bool,
    pub gyroscope: bool,
}

impl SensorCapabilities {
    pub const ALL: Self = Self {
        accelerometer: true,
        gyroscope: true,
    };

    pub const ACCELEROMETER_ONLY: Self = Self {
        accelerometer: true,
        gyroscope: false,
    };

    pub fn any(&self) -> bool {
        self.accelerometer || self.gyroscope
    }
}

/// A subscription to device motion sensors.
pub trait SensorSource: Send {
    /// Sensors this source can deliver.
    fn capabilities(&self) -> SensorCapabilities;

    /// Subscribe to the platform sensors.
    fn start(&mut self) -> Result<(), SensorError>;

    /// Wait up to `timeout` for the next sample.
    ///
    /// Returns `None` on timeout or when the source is stopped.
    fn poll(&mut self, timeout: Duration) -> Option<SensorSample>;

    /// Unsubscribe. Must be idempotent.
    fn stop(&mut self);
}

/// Handle a host uses to push samples into a [`ChannelSensorSource`].
#[derive(Debug, Clone)]
pub struct SensorFeed {
    sender: Sender<SensorSample>,
}

impl SensorFeed {
    /// Push a sample. Returns false once the source has been dropped.
    pub fn push(&self, sample: SensorSample) -> bool {
        self.sender.send(sample).is_ok()
    }
}

/// A sensor source fed over a channel, for hosts whose platform callbacks
/// arrive on their own thread.
///
/// Samples pushed while the source is stopped are discarded at the next
/// `start`, so a reading never mixes in stale motion.
#[derive(Debug)]
pub struct ChannelSensorSource {
    receiver: Receiver<SensorSample>,
    capabilities: SensorCapabilities,
    active: bool,
}

impl ChannelSensorSource {
    pub fn new(capabilities: SensorCapabilities) -> (Self, SensorFeed) {
        let (sender, receiver) = mpsc::channel();
        let source = Self {
            receiver,
            capabilities,
            active: false,
        };
        (source, SensorFeed { sender })
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl SensorSource for ChannelSensorSource {
    fn capabilities(&self) -> SensorCapabilities {
        self.capabilities
    }

    fn start(&mut self) -> Result<(), SensorError> {
        if !self.capabilities.any() {
            return Err(SensorError::Unavailable);
        }
        while self.receiver.try_recv().is_ok() {}
        self.active = true;
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> Option<SensorSample> {
        if !self.active {
            return None;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(sample) => Some(sample),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    fn stop(&mut self) {
        self.active = false;
    }
}

/// Samples of one window, aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    /// Mean accelerometer vector, if any accelerometer sample arrived.
    pub accelerometer: Option<Vector3>,
    pub accelerometer_samples: usize,
    /// Mean angular speed in rad/s, if any gyroscope sample arrived.
    pub mean_angular_speed: Option<f64>,
    pub gyroscope_samples: usize,
}

impl SensorReading {
    /// Aggregate raw samples into a reading.
    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = SensorSample>,
    {
        let mut accel_sum = Vector3::default();
        let mut accel_count = 0usize;
        let mut gyro_sum = 0.0;
        let mut gyro_count = 0usize;

        for sample in samples {
            match sample {
                SensorSample::Accelerometer(v) => {
                    accel_sum.x += v.x;
                    accel_sum.y += v.y;
                    accel_sum.z += v.z;
                    accel_count += 1;
                }
                SensorSample::Gyroscope(v) => {
                    gyro_sum += v.magnitude();
                    gyro_count += 1;
                }
            }
        }

        let accelerometer = (accel_count > 0).then(|| {
            let n = accel_count as f64;
            Vector3::new(accel_sum.x / n, accel_sum.y / n, accel_sum.z / n)
        });
        let mean_angular_speed = (gyro_count > 0).then(|| gyro_sum / gyro_count as f64);

        Self {
            accelerometer,
            accelerometer_samples: accel_count,
            mean_angular_speed,
            gyroscope_samples: gyro_count,
        }
    }

    pub fn has_accelerometer(&self) -> bool {
        self.accelerometer.is_some()
    }

    pub fn has_gyroscope(&self) -> bool {
        self.mean_angular_speed.is_some()
    }

    /// How steady the device was, 1.0 for perfectly still.
    ///
    /// `None` without gyroscope samples.
    pub fn stability(&self) -> Option<f64> {
        self.mean_angular_speed
            .map(|speed| 1.0 - (speed / UNSTEADY_ANGULAR_SPEED).clamp(0.0, 1.0))
    }

    /// Classify the mean accelerometer vector.
    pub fn classify(&self, threshold: f64) -> Option<Classification> {
        self.accelerometer.map(|v| Classification::from_gravity(v, threshold))
    }
}

/// One of the four cardinal device angles, clockwise from portrait-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceAngle {
    #[default]
    PortraitUp,
    LandscapeLeft,
    PortraitDown,
    LandscapeRight,
}

impl DeviceAngle {
    pub const ALL: [DeviceAngle; 4] = [
        DeviceAngle::PortraitUp,
        DeviceAngle::LandscapeLeft,
        DeviceAngle::PortraitDown,
        DeviceAngle::LandscapeRight,
    ];

    pub fn degrees(self) -> u16 {
        match self {
            DeviceAngle::PortraitUp => 0,
            DeviceAngle::LandscapeLeft => 90,
            DeviceAngle::PortraitDown => 180,
            DeviceAngle::LandscapeRight => 270,
        }
    }

    /// Snap an angle in degrees to the nearest bucket.
    pub fn nearest(degrees: f64) -> Self {
        let bucket = (degrees.rem_euclid(360.0) / 90.0).round() as u32 % 4;
        DeviceAngle::ALL[bucket as usize]
    }
}

/// Device angle classified from a gravity vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub angle: DeviceAngle,
    /// Whether an in-plane axis exceeded the gravity threshold.
    pub clear: bool,
    /// 1.0 when the gravity vector points straight at a bucket centre,
    /// 0.0 on a bucket boundary.
    pub clarity: f64,
}

impl Classification {
    /// Classify a mean gravity vector by axis thresholds.
    ///
    /// `y > t` → 0°, `x > t` → 90°, `y < -t` → 180°, `x < -t` → 270°; when
    /// no in-plane axis exceeds `t` the device is lying flat or tumbling and
    /// the angle defaults to portrait-up.
    pub fn from_gravity(gravity: Vector3, threshold: f64) -> Self {
        let planar_angle = gravity.x.atan2(gravity.y).to_degrees().rem_euclid(360.0);
        let nearest = DeviceAngle::nearest(planar_angle);

        let mut deviation = (planar_angle - f64::from(nearest.degrees())).abs();
        if deviation > 180.0 {
            deviation = 360.0 - deviation;
        }
        let clarity = (1.0 - deviation / 45.0).clamp(0.0, 1.0);

        let clear = gravity.x.abs() > threshold || gravity.y.abs() > threshold;
        let angle = if clear { nearest } else { DeviceAngle::PortraitUp };

        Self {
            angle,
            clear,
            clarity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Idle,
    Active,
    Disposed,
}

/// Owns a sensor source and samples it in fixed windows.
pub struct SensorReader<S: SensorSource> {
    source: S,
    state: ReaderState,
}

impl<S: SensorSource> SensorReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            state: ReaderState::Idle,
        }
    }

    /// Subscribe to the source. Calling `init` on an active reader is a no-op.
    pub fn init(&mut self) -> Result<(), SensorError> {
        match self.state {
            ReaderState::Active => Ok(()),
            ReaderState::Disposed => Err(SensorError::NotActive),
            ReaderState::Idle => {
                if !self.source.capabilities().any() {
                    return Err(SensorError::Unavailable);
                }
                self.source.start()?;
                self.state = ReaderState::Active;
                log::debug!("sensor reader subscribed");
                Ok(())
            }
        }
    }

    /// Collect samples for `window` and aggregate them.
    ///
    /// A window in which nothing arrives yields an empty reading rather than
    /// an error; the estimator scores it in the lowest band.
    pub fn read(&mut self, window: Duration) -> Result<SensorReading, SensorError> {
        if self.state != ReaderState::Active {
            return Err(SensorError::NotActive);
        }

        let deadline = Instant::now() + window;
        let mut samples = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.source.poll(remaining) {
                Some(sample) => samples.push(sample),
                None => break,
            }
        }

        let reading = SensorReading::from_samples(samples);
        if !reading.has_accelerometer() {
            log::warn!("no accelerometer samples within {window:?}");
        }
        Ok(reading)
    }

    /// Unsubscribe from the source. Further reads fail.
    pub fn dispose(&mut self) {
        if self.state == ReaderState::Active {
            self.source.stop();
            log::debug!("sensor reader unsubscribed");
        }
        self.state = ReaderState::Disposed;
    }

    pub fn is_active(&self) -> bool {
        self.state == ReaderState::Active
    }

    pub fn capabilities(&self) -> SensorCapabilities {
        self.source.capabilities()
    }
}

impl<S: SensorSource> Drop for SensorReader<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Subscribe, read one window, and unsubscribe.
pub fn read_once<S: SensorSource>(source: S, window: Duration) -> Result<SensorReading, SensorError> {
    let mut reader = SensorReader::new(source);
    reader.init()?;
    let reading = reader.read(window);
    reader.dispose();
    reading
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct TrackingSource {
        stopped: Arc<AtomicBool>,
    }

    impl SensorSource for TrackingSource {
        fn capabilities(&self) -> SensorCapabilities {
            SensorCapabilities::ALL
        }
        fn start(&mut self) -> Result<(), SensorError> {
            Ok(())
        }
        fn poll(&mut self, _timeout: Duration) -> Option<SensorSample> {
            None
        }
        fn stop(&mut self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_classify_cardinal_axes() {
        let cases = [
            (Vector3::new(0.0, 9.8, 0.0), DeviceAngle::PortraitUp),
            (Vector3::new(9.8, 0.0, 0.0), DeviceAngle::LandscapeLeft),
            (Vector3::new(0.0, -9.8, 0.0), DeviceAngle::PortraitDown),
            (Vector3::new(-9.8, 0.0, 0.0), DeviceAngle::LandscapeRight),
        ];
        for (gravity, expected) in cases {
            let c = Classification::from_gravity(gravity, GRAVITY_AXIS_THRESHOLD);
            assert_eq!(c.angle, expected);
            assert!(c.clear);
            assert!((c.clarity - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_classify_flat_device_is_ambiguous() {
        let c = Classification::from_gravity(Vector3::new(0.3, 0.2, 9.8), GRAVITY_AXIS_THRESHOLD);
        assert!(!c.clear);
        assert_eq!(c.angle, DeviceAngle::PortraitUp);
    }

    #[test]
    fn test_classify_diagonal_has_zero_clarity() {
        let c = Classification::from_gravity(Vector3::new(5.0, 5.0, 6.0), GRAVITY_AXIS_THRESHOLD);
        assert!(!c.clear);
        assert!(c.clarity < 1e-9);
    }

    #[test]
    fn test_classify_tilted_landscape_reduces_clarity() {
        let c = Classification::from_gravity(Vector3::new(8.5, 3.0, 0.0), GRAVITY_AXIS_THRESHOLD);
        assert_eq!(c.angle, DeviceAngle::LandscapeLeft);
        assert!(c.clear);
        assert!(c.clarity > 0.5 && c.clarity < 1.0);
    }

    #[test]
    fn test_nearest_wraps() {
        assert_eq!(DeviceAngle::nearest(350.0), DeviceAngle::PortraitUp);
        assert_eq!(DeviceAngle::nearest(-80.0), DeviceAngle::LandscapeRight);
        assert_eq!(DeviceAngle::nearest(181.0), DeviceAngle::PortraitDown);
    }

    #[test]
    fn test_reading_aggregates_means() {
        let reading = SensorReading::from_samples([
            SensorSample::Accelerometer(Vector3::new(0.0, 9.0, 1.0)),
            SensorSample::Accelerometer(Vector3::new(0.0, 10.0, 1.0)),
            SensorSample::Gyroscope(Vector3::new(0.0, 0.0, 0.2)),
        ]);
        let accel = reading.accelerometer.unwrap();
        assert!((accel.y - 9.5).abs() < 1e-9);
        assert_eq!(reading.accelerometer_samples, 2);
        assert_eq!(reading.gyroscope_samples, 1);
        assert!((reading.stability().unwrap() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_empty_reading() {
        let reading = SensorReading::from_samples([]);
        assert!(!reading.has_accelerometer());
        assert!(reading.stability().is_none());
        assert!(reading.classify(GRAVITY_AXIS_THRESHOLD).is_none());
    }

    #[test]
    fn test_reader_collects_pushed_samples() {
        let (source, feed) = ChannelSensorSource::new(SensorCapabilities::ALL);
        let mut reader = SensorReader::new(source);
        reader.init().unwrap();

        assert!(feed.push(SensorSample::Accelerometer(Vector3::new(9.8, 0.0, 0.0))));
        assert!(feed.push(SensorSample::Gyroscope(Vector3::new(0.0, 0.0, 0.0))));

        let reading = reader.read(Duration::from_millis(50)).unwrap();
        assert_eq!(reading.accelerometer_samples, 1);
        assert_eq!(reading.gyroscope_samples, 1);
    }

    #[test]
    fn test_stale_samples_discarded_on_start() {
        let (source, feed) = ChannelSensorSource::new(SensorCapabilities::ALL);
        feed.push(SensorSample::Accelerometer(Vector3::new(0.0, -9.8, 0.0)));

        let mut reader = SensorReader::new(source);
        reader.init().unwrap();
        let reading = reader.read(Duration::from_millis(20)).unwrap();
        assert_eq!(reading.accelerometer_samples, 0);
    }

    #[test]
    fn test_timeout_without_samples_is_empty() {
        let (source, _feed) = ChannelSensorSource::new(SensorCapabilities::ACCELEROMETER_ONLY);
        let reading = read_once(source, Duration::from_millis(10)).unwrap();
        assert!(!reading.has_accelerometer());
    }

    #[test]
    fn test_read_requires_init() {
        let (source, _feed) = ChannelSensorSource::new(SensorCapabilities::ALL);
        let mut reader = SensorReader::new(source);
        assert!(matches!(
            reader.read(Duration::from_millis(1)),
            Err(SensorError::NotActive)
        ));
    }

    #[test]
    fn test_no_sensors_is_unavailable() {
        let (source, _feed) = ChannelSensorSource::new(SensorCapabilities::default());
        let mut reader = SensorReader::new(source);
        assert!(matches!(reader.init(), Err(SensorError::Unavailable)));
    }

    #[test]
    fn test_dispose_is_final() {
        let (source, _feed) = ChannelSensorSource::new(SensorCapabilities::ALL);
        let mut reader = SensorReader::new(source);
        reader.init().unwrap();
        reader.dispose();
        assert!(!reader.is_active());
        assert!(matches!(reader.init(), Err(SensorError::NotActive)));
    }

    #[test]
    fn test_drop_unsubscribes() {
        let stopped = Arc::new(AtomicBool::new(false));
        {
            let mut reader = SensorReader::new(TrackingSource {
                stopped: Arc::clone(&stopped),
            });
            reader.init().unwrap();
        }
        assert!(stopped.load(Ordering::SeqCst));
    }
}
