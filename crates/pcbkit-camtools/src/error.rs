//! Error types for the CAM tools crate.
//!
//! This module provides structured error types for fusion, offsetting,
//! background pipeline runs and parameter validation.

use thiserror::Error;

use pcbkit_clipper::ClipperError;

/// Errors that can occur during CAM tool operations.
#[derive(Error, Debug)]
pub enum CamToolError {
    /// The boolean engine rejected the fused geometry.
    #[error("Boolean operation failed: {0}")]
    Boolean(#[from] ClipperError),

    /// A background pipeline task could not be joined.
    #[error("Pipeline task failed: {0}")]
    TaskFailed(String),

    /// A parameter validation error occurred.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),
}

impl CamToolError {
    /// True for failures the user should see as a status message.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, CamToolError::Boolean(_))
    }
}

/// Errors related to CAM tool parameter validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A parameter value is out of the valid range.
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A parameter value is invalid.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },
}

impl ParameterError {
    /// Rejects values that are not finite and strictly positive.
    pub fn require_positive(name: &str, value: f64) -> ParameterResult<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ParameterError::InvalidValue {
                name: name.to_string(),
                reason: format!("must be positive, got {value}"),
            })
        }
    }

    /// Rejects values outside `min..max` (upper bound exclusive).
    pub fn require_range(name: &str, value: f64, min: f64, max: f64) -> ParameterResult<()> {
        if value.is_finite() && value >= min && value < max {
            Ok(())
        } else {
            Err(ParameterError::OutOfRange {
                name: name.to_string(),
                value,
                min,
                max,
            })
        }
    }
}

/// Result type alias for CAM tool operations.
pub type CamToolResult<T> = Result<T, CamToolError>;

/// Result type alias for parameter validation.
pub type ParameterResult<T> = Result<T, ParameterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cam_tool_error_display() {
        let err = CamToolError::TaskFailed("task 7 panicked".to_string());
        assert_eq!(err.to_string(), "Pipeline task failed: task 7 panicked");
        assert!(!err.is_user_visible());

        let err: CamToolError = ClipperError::Degenerate { points: 2 }.into();
        assert_eq!(
            err.to_string(),
            "Boolean operation failed: Degenerate ring with 2 points"
        );
        assert!(err.is_user_visible());
    }

    #[test]
    fn test_parameter_error_display() {
        let err = ParameterError::OutOfRange {
            name: "overlap_percent".to_string(),
            value: 120.0,
            min: 0.0,
            max: 100.0,
        };
        assert_eq!(
            err.to_string(),
            "Parameter 'overlap_percent' out of range: 120 (valid: 0..100)"
        );
    }

    #[test]
    fn test_parameter_helpers() {
        assert!(ParameterError::require_positive("tool_diameter", 0.2).is_ok());
        assert!(ParameterError::require_positive("tool_diameter", 0.0).is_err());
        assert!(ParameterError::require_positive("tool_diameter", f64::NAN).is_err());
        assert!(ParameterError::require_range("overlap", 50.0, 0.0, 100.0).is_ok());
        assert!(ParameterError::require_range("overlap", 100.0, 0.0, 100.0).is_err());
    }

    #[test]
    fn test_error_conversion() {
        let param_err = ParameterError::InvalidValue {
            name: "tab_width".to_string(),
            reason: "zero width".to_string(),
        };
        let cam_err: CamToolError = param_err.into();
        assert!(matches!(cam_err, CamToolError::Parameter(_)));
        assert!(!cam_err.is_user_visible());
    }
}
