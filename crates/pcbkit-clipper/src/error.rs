//! Boolean engine errors.

use thiserror::Error;

/// Errors raised by a boolean engine.
///
/// These are never recovered inside the pipeline; callers fall back to
/// unfused geometry and report the message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClipperError {
    /// An input ring has too few vertices to enclose an area
    #[error("Degenerate ring with {points} points")]
    Degenerate {
        /// Number of vertices in the offending ring.
        points: usize,
    },

    /// A coordinate exceeds the engine's exact-arithmetic range
    #[error("Coordinate ({x}, {y}) exceeds the fixed-point range")]
    CoordinateOverflow {
        /// Scaled X value.
        x: i64,
        /// Scaled Y value.
        y: i64,
    },

    /// The fixed-point scale is zero, negative or not finite
    #[error("Invalid fixed-point scale {scale}")]
    InvalidScale {
        /// The rejected scale.
        scale: f64,
    },
}
