//! Error handling for PCBKit
//!
//! Provides the error types shared by the pipeline crates:
//! - Geometry errors (invalid or incomplete primitives)
//! - A crate-wide `Error` that wraps them together with I/O and generic failures
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Geometry error type
///
/// Raised when a primitive cannot be used by the pipeline. These are recovered
/// locally by dropping the offending primitive, never by aborting a run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A coordinate or dimension is NaN or infinite
    #[error("Non-finite value in {field} of {kind} primitive")]
    NonFinite {
        /// Primitive kind (circle, arc, ...).
        kind: String,
        /// The offending field.
        field: String,
    },

    /// A required dimension is missing, zero or negative
    #[error("Missing geometry for {kind} primitive: {reason}")]
    MissingGeometry {
        /// Primitive kind (circle, arc, ...).
        kind: String,
        /// Why the geometry is unusable.
        reason: String,
    },

    /// A contour does not have enough vertices to enclose an area
    #[error("Degenerate contour with {points} points")]
    DegenerateContour {
        /// Number of vertices found.
        points: usize,
    },
}

/// Main error type for PCBKit
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Error::Geometry(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_error_display() {
        let err = GeometryError::NonFinite {
            kind: "circle".to_string(),
            field: "radius".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Non-finite value in radius of circle primitive"
        );

        let err = GeometryError::DegenerateContour { points: 2 };
        assert_eq!(err.to_string(), "Degenerate contour with 2 points");
    }

    #[test]
    fn test_error_conversion() {
        let geo = GeometryError::MissingGeometry {
            kind: "rectangle".to_string(),
            reason: "zero width".to_string(),
        };
        let err: Error = geo.into();
        assert!(err.is_geometry_error());
        assert_eq!(
            err.to_string(),
            "Missing geometry for rectangle primitive: zero width"
        );
    }
}
