//! Re-encoding of rotated captures (JPEG and PNG).

mod capture;

pub use capture::{encode_capture, encode_jpeg, encode_png, CaptureFormat, EncodeError};
