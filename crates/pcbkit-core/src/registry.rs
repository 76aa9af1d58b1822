//! Curve registry.
//!
//! Every circle or arc tessellated by the standardizer is registered here
//! before its points are tagged. Registration is idempotent: the same
//! parameters (after rounding to [`CURVE_HASH_PRECISION`] decimals) always
//! yield the same id within one registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::constants::{CURVE_HASH_PRECISION, NO_CURVE};
use crate::geometry::{normalize_angle, Point2};
use crate::primitive::SourceRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveKind {
    Circle,
    Arc,
}

/// Analytic description of a registered curve.
///
/// Fields are optional so a descriptor built from incomplete input can be
/// rejected by [`CurveRegistry::register`] instead of panicking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveDescriptor {
    /// Assigned by the registry; zero until registered.
    #[serde(default)]
    pub id: u32,
    pub kind: CurveKind,
    pub center: Option<Point2>,
    pub radius: Option<f64>,
    #[serde(default)]
    pub start_angle: Option<f64>,
    #[serde(default)]
    pub end_angle: Option<f64>,
    #[serde(default)]
    pub clockwise: Option<bool>,
    #[serde(default)]
    pub source: SourceRef,
    /// Points emitted when the curve was tessellated.
    #[serde(default)]
    pub original_point_count: usize,
}

impl CurveDescriptor {
    pub fn circle(center: Point2, radius: f64) -> Self {
        Self {
            id: NO_CURVE,
            kind: CurveKind::Circle,
            center: Some(center),
            radius: Some(radius),
            start_angle: None,
            end_angle: None,
            clockwise: None,
            source: SourceRef::default(),
            original_point_count: 0,
        }
    }

    pub fn arc(center: Point2, radius: f64, start_angle: f64, end_angle: f64, clockwise: bool) -> Self {
        Self {
            id: NO_CURVE,
            kind: CurveKind::Arc,
            center: Some(center),
            radius: Some(radius),
            start_angle: Some(start_angle),
            end_angle: Some(end_angle),
            clockwise: Some(clockwise),
            source: SourceRef::default(),
            original_point_count: 0,
        }
    }

    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.source = source;
        self
    }

    pub fn with_point_count(mut self, count: usize) -> Self {
        self.original_point_count = count;
        self
    }

    /// Center and radius when both are present, finite and the radius positive.
    pub fn center_radius(&self) -> Option<(Point2, f64)> {
        let center = self.center?;
        let radius = self.radius?;
        if center.is_finite() && radius.is_finite() && radius > 0.0 {
            Some((center, radius))
        } else {
            None
        }
    }

    pub fn is_circle(&self) -> bool {
        self.kind == CurveKind::Circle
    }
}

/// Hash key of rounded curve parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CurveKey {
    kind: CurveKind,
    cx: i64,
    cy: i64,
    radius: i64,
    start: i64,
    end: i64,
    clockwise: bool,
}

fn quantize(value: f64) -> i64 {
    (value * 10f64.powi(CURVE_HASH_PRECISION)).round() as i64
}

impl CurveKey {
    fn from_descriptor(desc: &CurveDescriptor, center: Point2, radius: f64) -> Self {
        let (start, end, clockwise) = match desc.kind {
            CurveKind::Circle => (0, 0, false),
            CurveKind::Arc => (
                quantize(normalize_angle(desc.start_angle.unwrap_or(0.0))),
                quantize(normalize_angle(desc.end_angle.unwrap_or(0.0))),
                desc.clockwise.unwrap_or(false),
            ),
        };
        Self {
            kind: desc.kind,
            cx: quantize(center.x),
            cy: quantize(center.y),
            radius: quantize(radius),
            start,
            end,
            clockwise,
        }
    }
}

/// Assigns stable ids to circles and arcs and stores their descriptors.
///
/// Ids start at 1; id 0 means "no curve". A registry lives for one fusion
/// run and is cleared at the start of the next.
#[derive(Debug, Default, Clone)]
pub struct CurveRegistry {
    curves: Vec<CurveDescriptor>,
    index: HashMap<CurveKey, u32>,
}

impl CurveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a curve, returning its id.
    ///
    /// Returns `None` when the center or radius is missing, non-finite or the
    /// radius is not positive. Registering parameters that round to an
    /// existing entry returns the existing id and leaves the stored
    /// descriptor untouched.
    pub fn register(&mut self, descriptor: CurveDescriptor) -> Option<u32> {
        let Some((center, radius)) = descriptor.center_radius() else {
            debug!(kind = ?descriptor.kind, "Skipping curve registration: incomplete geometry");
            return None;
        };

        let key = CurveKey::from_descriptor(&descriptor, center, radius);
        if let Some(&id) = self.index.get(&key) {
            return Some(id);
        }

        let id = u32::try_from(self.curves.len() + 1).ok()?;
        let mut stored = descriptor;
        stored.id = id;
        self.curves.push(stored);
        self.index.insert(key, id);
        Some(id)
    }

    pub fn get(&self, id: u32) -> Option<&CurveDescriptor> {
        if id == NO_CURVE {
            return None;
        }
        self.curves.get(id as usize - 1)
    }

    pub fn clear(&mut self) {
        self.curves.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CurveDescriptor> {
        self.curves.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut reg = CurveRegistry::new();
        let a = reg.register(CurveDescriptor::circle(Point2::new(0.0, 0.0), 1.0));
        let b = reg.register(CurveDescriptor::circle(Point2::new(5.0, 0.0), 1.0));
        assert_eq!(a, Some(1));
        assert_eq!(b, Some(2));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get(2).map(|c| c.id), Some(2));
        assert!(reg.get(0).is_none());
    }

    #[test]
    fn test_register_rounds_parameters() {
        let mut reg = CurveRegistry::new();
        let a = reg.register(CurveDescriptor::circle(Point2::new(1.0, 1.0), 2.0));
        let b = reg.register(CurveDescriptor::circle(Point2::new(1.0001, 0.9999), 2.0002));
        assert_eq!(a, b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_arc_and_circle_do_not_collide() {
        let mut reg = CurveRegistry::new();
        let c = reg.register(CurveDescriptor::circle(Point2::default(), 1.0));
        let a = reg.register(CurveDescriptor::arc(Point2::default(), 1.0, 0.0, 1.0, false));
        let a_cw = reg.register(CurveDescriptor::arc(Point2::default(), 1.0, 0.0, 1.0, true));
        assert_ne!(c, a);
        assert_ne!(a, a_cw);
    }

    #[test]
    fn test_register_rejects_incomplete() {
        let mut reg = CurveRegistry::new();
        let mut desc = CurveDescriptor::circle(Point2::default(), 1.0);
        desc.radius = None;
        assert_eq!(reg.register(desc), None);
        assert_eq!(
            reg.register(CurveDescriptor::circle(Point2::default(), 0.0)),
            None
        );
        assert_eq!(
            reg.register(CurveDescriptor::circle(Point2::new(f64::NAN, 0.0), 1.0)),
            None
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn test_clear_restarts_ids() {
        let mut reg = CurveRegistry::new();
        reg.register(CurveDescriptor::circle(Point2::default(), 1.0));
        reg.register(CurveDescriptor::circle(Point2::new(3.0, 0.0), 1.0));
        reg.clear();
        assert!(reg.is_empty());
        assert_eq!(
            reg.register(CurveDescriptor::circle(Point2::new(3.0, 0.0), 1.0)),
            Some(1)
        );
    }
}
