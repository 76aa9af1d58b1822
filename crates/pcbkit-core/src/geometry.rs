//! Planar points, tagged points and ring helpers.

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::constants::NO_CURVE;

/// Anything with planar X/Y coordinates in millimetres.
pub trait Planar {
    fn xy(&self) -> (f64, f64);
}

/// Represents a 2D point with X and Y coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    /// Creates a new point with the given X and Y coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculates the distance to another point.
    pub fn distance_to(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Angle of this point about `center`, in `[0, 2π)`.
    pub fn angle_about(&self, center: &Point2) -> f64 {
        normalize_angle((self.y - center.y).atan2(self.x - center.x))
    }

    /// Point at `angle` on the circle of `radius` around `self`.
    pub fn polar(&self, radius: f64, angle: f64) -> Point2 {
        Point2::new(self.x + radius * angle.cos(), self.y + radius * angle.sin())
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn lerp(&self, other: &Point2, t: f64) -> Point2 {
        Point2::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

impl Planar for Point2 {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// A vertex carrying curve metadata through tessellation and boolean operations.
///
/// `segment_index` increases along the curve's original tessellation order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TaggedPoint {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub curve_id: u32,
    #[serde(default)]
    pub segment_index: u32,
}

impl TaggedPoint {
    /// Creates an untagged point.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            curve_id: NO_CURVE,
            segment_index: 0,
        }
    }

    /// Creates a point that belongs to a registered curve.
    pub fn tagged(x: f64, y: f64, curve_id: u32, segment_index: u32) -> Self {
        Self {
            x,
            y,
            curve_id,
            segment_index,
        }
    }

    pub fn from_point(p: Point2, curve_id: u32, segment_index: u32) -> Self {
        Self::tagged(p.x, p.y, curve_id, segment_index)
    }

    pub fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }

    pub fn is_tagged(&self) -> bool {
        self.curve_id != NO_CURVE
    }

    /// Packs `curve_id << 32 | segment_index` into the engine's spare channel.
    pub fn pack_tag(&self) -> i64 {
        ((self.curve_id as i64) << 32) | self.segment_index as i64
    }

    /// Splits a packed tag back into `(curve_id, segment_index)`.
    pub fn unpack_tag(tag: i64) -> (u32, u32) {
        (((tag >> 32) & 0xFFFF_FFFF) as u32, (tag & 0xFFFF_FFFF) as u32)
    }

    /// Rebuilds a tagged point from engine output.
    pub fn with_packed_tag(x: f64, y: f64, tag: i64) -> Self {
        let (curve_id, segment_index) = Self::unpack_tag(tag);
        Self::tagged(x, y, curve_id, segment_index)
    }
}

impl Planar for TaggedPoint {
    fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// Wraps an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Shoelace area of a closed ring; positive for counter-clockwise rings.
pub fn signed_area<P: Planar>(ring: &[P]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let (x1, y1) = ring[i].xy();
        let (x2, y2) = ring[(i + 1) % n].xy();
        twice += x1 * y2 - x2 * y1;
    }
    twice / 2.0
}

pub fn is_clockwise<P: Planar>(ring: &[P]) -> bool {
    signed_area(ring) < 0.0
}

/// Even-odd point containment test against a closed ring.
pub fn point_in_ring<P: Planar>(point: Point2, ring: &[P]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i].xy();
        let (xj, yj) = ring[j].xy();
        if (yi > point.y) != (yj > point.y) {
            let x_cross = xi + (point.y - yi) * (xj - xi) / (yj - yi);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// An inverted box that any point will expand.
    pub fn empty() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn from_points<'a, P: Planar + 'a>(points: impl IntoIterator<Item = &'a P>) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            let (x, y) = p.xy();
            bbox.include(x, y);
        }
        bbox
    }

    pub fn include(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.include(other.min_x, other.min_y);
        self.include(other.max_x, other.max_y);
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn diagonal(&self) -> f64 {
        (self.width().powi(2) + self.height().powi(2)).sqrt()
    }
}
