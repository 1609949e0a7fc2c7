//! Pixel transforms applied to captures before they are saved.
//!
//! # Coordinate System
//!
//! - Rotations are clockwise, in 90° steps only
//! - Origin is the top-left corner, rows are stored top to bottom

mod rotation;
mod thumbnail;

pub use rotation::{
    apply_quarter_turn, rotate_encoded, rotated_dimensions, QuarterTurn, RotationError,
    RotationOutcome,
};
pub use thumbnail::{generate_thumbnail, resize_to_fit};
