//! # PCBKit Clipper
//!
//! Polygon boolean operations on fixed-point integer coordinates.
//!
//! Every vertex carries one spare `i64` channel (`z`) that survives splitting
//! and reordering. The pipeline packs `curve_id << 32 | segment_index` into it
//! so tessellated circles and arcs can be recognised again after a union or
//! difference. New vertices created where two edges cross get their `z` from
//! an [`IntersectionCallback`]; the default keeps the lowest curve id.
//!
//! [`BooleanEngine`] is the seam the rest of the pipeline talks to;
//! [`FixedPointEngine`] is the bundled exact implementation.

pub mod engine;
pub mod error;
mod intersect;
mod rings;
pub mod scale;

pub use engine::FixedPointEngine;
pub use error::ClipperError;
pub use scale::{Scaler, MAX_COORD};

use pcbkit_core::TaggedPoint;

/// A fixed-point vertex with its metadata channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntPoint {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl IntPoint {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y, z: 0 }
    }

    pub fn with_z(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    pub(crate) fn pos(&self) -> (i64, i64) {
        (self.x, self.y)
    }
}

/// One closed ring of engine input or output. The closing edge is implicit.
pub type EnginePath = Vec<IntPoint>;

/// An output ring with its outer/hole classification.
///
/// Outer rings are counter-clockwise and holes clockwise; the filled region
/// is always on the left of travel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRing {
    pub points: EnginePath,
    pub is_hole: bool,
}

/// Rule deciding which winding numbers count as "inside".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    #[default]
    NonZero,
    EvenOdd,
}

impl FillRule {
    pub(crate) fn is_inside(self, winding: i32) -> bool {
        match self {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }
}

/// The two edges meeting at a newly created vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZIntersection {
    pub e1_start: IntPoint,
    pub e1_end: IntPoint,
    pub e2_start: IntPoint,
    pub e2_end: IntPoint,
    /// Location of the new vertex; `z` is zero.
    pub point: IntPoint,
}

/// Chooses the metadata stored on a new intersection vertex.
pub type IntersectionCallback = Box<dyn Fn(&ZIntersection) -> i64 + Send + Sync>;

fn curve_of(z: i64) -> u32 {
    TaggedPoint::unpack_tag(z).0
}

/// Tag of the endpoint on the lower non-zero curve, or zero.
fn edge_tag(a: &IntPoint, b: &IntPoint) -> i64 {
    match (curve_of(a.z), curve_of(b.z)) {
        (0, 0) => 0,
        (0, _) => b.z,
        (_, 0) => a.z,
        (ca, cb) => {
            if ca <= cb {
                a.z
            } else {
                b.z
            }
        }
    }
}

/// Default intersection rule: the lower (first registered) curve id wins.
pub fn prefer_lower_curve_id(ix: &ZIntersection) -> i64 {
    let t1 = edge_tag(&ix.e1_start, &ix.e1_end);
    let t2 = edge_tag(&ix.e2_start, &ix.e2_end);
    match (curve_of(t1), curve_of(t2)) {
        (0, _) => t2,
        (_, 0) => t1,
        (c1, c2) => {
            if c1 <= c2 {
                t1
            } else {
                t2
            }
        }
    }
}

/// Polygon boolean operations.
///
/// Subject and clip are sets of closed rings; orientation matters under
/// [`FillRule::NonZero`]. With `preserve_collinear` set, vertices lying on a
/// straight run are kept so their metadata survives.
pub trait BooleanEngine: Send + Sync {
    fn union(
        &self,
        subject: &[EnginePath],
        clip: &[EnginePath],
        fill_rule: FillRule,
        preserve_collinear: bool,
    ) -> Result<Vec<ResultRing>, ClipperError>;

    fn difference(
        &self,
        subject: &[EnginePath],
        clip: &[EnginePath],
        fill_rule: FillRule,
        preserve_collinear: bool,
    ) -> Result<Vec<ResultRing>, ClipperError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(curve: u32, seg: u32) -> i64 {
        TaggedPoint::tagged(0.0, 0.0, curve, seg).pack_tag()
    }

    #[test]
    fn test_prefer_lower_curve_id() {
        let ix = ZIntersection {
            e1_start: IntPoint::with_z(0, 0, tag(3, 1)),
            e1_end: IntPoint::with_z(10, 0, tag(3, 2)),
            e2_start: IntPoint::with_z(5, -5, tag(2, 7)),
            e2_end: IntPoint::with_z(5, 5, 0),
            point: IntPoint::new(5, 0),
        };
        assert_eq!(prefer_lower_curve_id(&ix), tag(2, 7));
    }

    #[test]
    fn test_untagged_edges_yield_zero() {
        let ix = ZIntersection {
            e1_start: IntPoint::new(0, 0),
            e1_end: IntPoint::new(10, 0),
            e2_start: IntPoint::new(5, -5),
            e2_end: IntPoint::new(5, 5),
            point: IntPoint::new(5, 0),
        };
        assert_eq!(prefer_lower_curve_id(&ix), 0);

        let mixed = ZIntersection {
            e2_end: IntPoint::with_z(5, 5, tag(9, 0)),
            ..ix
        };
        assert_eq!(prefer_lower_curve_id(&mixed), tag(9, 0));
    }

    #[test]
    fn test_fill_rules() {
        assert!(FillRule::NonZero.is_inside(-1));
        assert!(FillRule::NonZero.is_inside(2));
        assert!(!FillRule::EvenOdd.is_inside(2));
        assert!(FillRule::EvenOdd.is_inside(-1));
    }
}
