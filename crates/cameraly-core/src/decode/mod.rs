//! Decoding of captured image bytes.
//!
//! The capture pipeline only needs a raster in the sensor's native layout:
//! the orientation estimate decides how far it is turned. EXIF-oriented
//! decoding is available for thumbnails of files that were saved unrotated.

mod capture;
mod types;

pub use capture::{capture_dimensions, decode_capture, decode_capture_oriented};
pub use types::{DecodeError, DecodedImage};

pub(crate) use types::Orientation;
