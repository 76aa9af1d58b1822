//! Conversion between millimetre coordinates and engine fixed-point units.

use pcbkit_core::constants::DEFAULT_SCALE;
use pcbkit_core::TaggedPoint;

use crate::{ClipperError, EnginePath, IntPoint};

/// Largest absolute coordinate the engine accepts.
///
/// Keeps every intermediate product of the crossing computation inside `i128`.
pub const MAX_COORD: i64 = 1 << 40;

/// Millimetre to fixed-point converter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaler {
    scale: f64,
}

impl Default for Scaler {
    fn default() -> Self {
        Self {
            scale: DEFAULT_SCALE,
        }
    }
}

impl Scaler {
    pub fn new(scale: f64) -> Result<Self, ClipperError> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ClipperError::InvalidScale { scale });
        }
        Ok(Self { scale })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Scales a point and packs its tag into `z`.
    pub fn to_int(&self, p: &TaggedPoint) -> Result<IntPoint, ClipperError> {
        let x = (p.x * self.scale).round();
        let y = (p.y * self.scale).round();
        let limit = MAX_COORD as f64;
        if !x.is_finite() || !y.is_finite() || x.abs() > limit || y.abs() > limit {
            return Err(ClipperError::CoordinateOverflow {
                x: x as i64,
                y: y as i64,
            });
        }
        Ok(IntPoint::with_z(x as i64, y as i64, p.pack_tag()))
    }

    pub fn path_to_int(&self, points: &[TaggedPoint]) -> Result<EnginePath, ClipperError> {
        points.iter().map(|p| self.to_int(p)).collect()
    }

    /// Unscales a point and unpacks its tag.
    pub fn from_int(&self, p: &IntPoint) -> TaggedPoint {
        TaggedPoint::with_packed_tag(p.x as f64 / self.scale, p.y as f64 / self.scale, p.z)
    }

    pub fn path_from_int(&self, path: &[IntPoint]) -> Vec<TaggedPoint> {
        path.iter().map(|p| self.from_int(p)).collect()
    }

    pub fn distance_to_int(&self, distance: f64) -> i64 {
        (distance * self.scale).round() as i64
    }
}
