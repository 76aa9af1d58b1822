//! Conversion between contours and `cavalier_contours` polylines.
//!
//! Reconstructed arcs become bulge vertices so that offsets of arcs stay
//! arcs. Offset results come back as contours whose `segments` carry the
//! exact lines and arcs, with `points` holding a dense approximation.

use std::f64::consts::{FRAC_PI_2, PI};
use std::panic;

use cavalier_contours::polyline::{
    PlineOffsetOptions, PlineOrientation, PlineSource, PlineSourceMut, PlineVertex, Polyline,
};
use tracing::{debug, warn};

use pcbkit_core::{
    Arc, Contour, ContourSegment, CurveRegistry, Point2, Primitive, ReconstructedArc, Shape,
    SourceRef, TaggedPoint,
};

use crate::standardize::{standardize, TessellationSettings};

/// Largest angle between densified vertices of an offset arc.
const ARC_DENSIFY_STEP: f64 = PI / 32.0;

pub fn clean_polyline(mut pline: Polyline<f64>) -> Polyline<f64> {
    pline.remove_repeat_pos(1e-5);
    if pline.is_closed() && pline.vertex_count() > 1 {
        if let (Some(first), Some(last)) = (pline.get(0), pline.get(pline.vertex_count() - 1)) {
            if (first.x - last.x).abs() < 1e-5 && (first.y - last.y).abs() < 1e-5 {
                pline.remove(pline.vertex_count() - 1);
            }
        }
    }
    pline
}

/// Offset distance for `pline` that moves `abs` towards (`inside`) or away
/// from its enclosed area.
pub fn signed_offset_for(pline: &Polyline<f64>, abs: f64, inside: bool) -> f64 {
    match pline.orientation() {
        // Interior on the left; positive offsets go left.
        PlineOrientation::CounterClockwise | PlineOrientation::Open => {
            if inside {
                abs
            } else {
                -abs
            }
        }
        PlineOrientation::Clockwise => {
            if inside {
                -abs
            } else {
                abs
            }
        }
    }
}

fn push_arc(pline: &mut Polyline<f64>, arc: &Arc) {
    let sweep = arc.sweep();
    let pieces = (sweep.abs() / PI - 1e-9).ceil().max(1.0) as usize;
    let step = sweep / pieces as f64;
    let bulge = (step / 4.0).tan();
    for k in 0..pieces {
        let p = arc.point_at(arc.start_angle + step * k as f64);
        pline.add(p.x, p.y, bulge);
    }
}

/// Closed polyline for a contour, or `None` when too little remains after
/// cleaning.
pub fn contour_to_polyline(contour: &Contour) -> Option<Polyline<f64>> {
    let mut pline = Polyline::new_closed();
    if contour.segments.is_empty() {
        for p in &contour.points {
            pline.add(p.x, p.y, 0.0);
        }
    } else {
        for segment in &contour.segments {
            match segment {
                ContourSegment::Line { start, .. } => pline.add(start.x, start.y, 0.0),
                ContourSegment::Arc(rec) => push_arc(&mut pline, &rec.arc),
            }
        }
    }
    let pline = clean_polyline(pline);
    let has_arc = pline.iter_vertexes().any(|v| v.bulge.abs() > 1e-9);
    let min_vertices = if has_arc { 2 } else { 3 };
    (pline.vertex_count() >= min_vertices).then_some(pline)
}

/// Counter-clockwise two-vertex polyline for a full circle.
pub fn circle_polyline(center: Point2, radius: f64) -> Polyline<f64> {
    let mut pline = Polyline::new_closed();
    pline.add(center.x + radius, center.y, 1.0);
    pline.add(center.x - radius, center.y, 1.0);
    pline
}

/// Polylines of a primitive paired with their hole flag.
///
/// Shapes other than circles and paths are standardized first, against a
/// throwaway registry.
pub fn primitive_polylines(primitive: &Primitive) -> Vec<(Polyline<f64>, bool)> {
    match &primitive.shape {
        Shape::Circle(c) => vec![(circle_polyline(c.center, c.radius), false)],
        Shape::Path(path) => path
            .contours
            .iter()
            .filter_map(|c| contour_to_polyline(c).map(|pl| (pl, c.is_hole)))
            .collect(),
        other => {
            debug!(kind = other.kind_name(), "Standardizing unfused offset input");
            let mut registry = CurveRegistry::new();
            standardize(primitive, &mut registry, &TessellationSettings::default())
                .map(|path| primitive_polylines(&path))
                .unwrap_or_default()
        }
    }
}

/// Arc described by the bulge segment from `v1` to `v2`.
pub fn bulge_arc(v1: PlineVertex<f64>, v2: PlineVertex<f64>) -> Option<Arc> {
    if v1.bulge.abs() <= 1e-9 {
        return None;
    }
    let theta = 4.0 * v1.bulge.atan();
    let dx = v2.x - v1.x;
    let dy = v2.y - v1.y;
    let chord_len = (dx * dx + dy * dy).sqrt();
    if chord_len < 1e-9 {
        return None;
    }
    let radius = chord_len / (2.0 * (theta / 2.0).sin()).abs();
    // Signed distance from chord midpoint to centre along the left normal.
    let dist_to_center = radius * (FRAC_PI_2 - theta.abs() / 2.0).sin();
    let sign = if v1.bulge > 0.0 { 1.0 } else { -1.0 };
    let nx = -dy / chord_len;
    let ny = dx / chord_len;
    let center = Point2::new(
        (v1.x + v2.x) / 2.0 + nx * dist_to_center * sign,
        (v1.y + v2.y) / 2.0 + ny * dist_to_center * sign,
    );
    let start = Point2::new(v1.x, v1.y).angle_about(&center);
    let end = Point2::new(v2.x, v2.y).angle_about(&center);
    Some(Arc::new(center, radius, start, end, v1.bulge < 0.0))
}

/// Contour for an offset result, with exact segments and densified points.
pub fn polyline_to_contour(pline: &Polyline<f64>, is_hole: bool, source: &SourceRef) -> Contour {
    let n = pline.vertex_count();
    let closed = pline.is_closed();
    let seg_count = if closed { n } else { n.saturating_sub(1) };
    let mut points = Vec::new();
    let mut segments = Vec::new();

    for i in 0..seg_count {
        let v1 = pline.at(i);
        let v2 = pline.at((i + 1) % n);
        let start = Point2::new(v1.x, v1.y);
        points.push(TaggedPoint::new(v1.x, v1.y));
        match bulge_arc(v1, v2) {
            Some(arc) => {
                let sweep = arc.sweep();
                let steps = (sweep.abs() / ARC_DENSIFY_STEP).ceil().max(1.0) as usize;
                for k in 1..steps {
                    let p = arc.point_at(arc.start_angle + sweep * k as f64 / steps as f64);
                    points.push(TaggedPoint::new(p.x, p.y));
                }
                segments.push(ContourSegment::Arc(ReconstructedArc {
                    arc,
                    curve_id: 0,
                    full_circle: false,
                    coverage: 1.0,
                    point_count: 0,
                    source: source.clone(),
                }));
            }
            None => segments.push(ContourSegment::Line {
                start,
                end: Point2::new(v2.x, v2.y),
            }),
        }
    }
    if !closed && n > 0 {
        let last = pline.at(n - 1);
        points.push(TaggedPoint::new(last.x, last.y));
    }

    let mut contour = Contour::new(points, is_hole);
    contour.segments = segments;
    contour
}

/// Offsets one polyline, turning a panic inside the offset library into an
/// empty result.
pub fn offset_polyline(pline: &Polyline<f64>, distance: f64) -> Vec<Polyline<f64>> {
    let opts = PlineOffsetOptions {
        handle_self_intersects: true,
        ..Default::default()
    };
    match panic::catch_unwind(panic::AssertUnwindSafe(|| {
        pline.parallel_offset_opt(distance, &opts)
    })) {
        Ok(offsets) => offsets.into_iter().map(clean_polyline).collect(),
        Err(_) => {
            warn!(
                vertices = pline.vertex_count(),
                distance, "Panic during parallel offset; skipping polygon"
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Contour {
        Contour::from_points(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(size, 0.0),
                Point2::new(size, size),
                Point2::new(0.0, size),
            ],
            false,
        )
    }

    #[test]
    fn test_rectangle_and_obround_become_polylines() {
        let rect = primitive_polylines(&Primitive::rectangle(Point2::default(), 50.0, 30.0));
        assert_eq!(rect.len(), 1);
        assert_eq!(rect[0].0.vertex_count(), 4);
        assert!(!rect[0].1);
        assert!((rect[0].0.area().abs() - 1500.0).abs() < 1e-9);

        let slot = primitive_polylines(&Primitive::obround(Point2::default(), 4.0, 2.0));
        assert_eq!(slot.len(), 1);
        assert!((slot[0].0.area().abs() - (4.0 + PI)).abs() < 0.01);
    }

    #[test]
    fn test_clean_polyline_drops_closing_duplicate() {
        let mut pline = Polyline::new_closed();
        pline.add(0.0, 0.0, 0.0);
        pline.add(1.0, 0.0, 0.0);
        pline.add(1.0, 1.0, 0.0);
        pline.add(0.0, 0.0, 0.0);
        assert_eq!(clean_polyline(pline).vertex_count(), 3);
    }

    #[test]
    fn test_signed_offset_direction() {
        let pline = contour_to_polyline(&square(10.0)).unwrap();
        assert_eq!(pline.orientation(), PlineOrientation::CounterClockwise);
        let grown = offset_polyline(&pline, signed_offset_for(&pline, 1.0, false));
        assert_eq!(grown.len(), 1);
        // 10x10 square grown by 1 with rounded corners.
        let area = grown[0].area().abs();
        assert!((area - (100.0 + 40.0 + PI)).abs() < 1e-6);
    }

    #[test]
    fn test_bulge_arc_quarter() {
        let v1 = PlineVertex::new(1.0, 0.0, (PI / 8.0).tan());
        let v2 = PlineVertex::new(0.0, 1.0, 0.0);
        let arc = bulge_arc(v1, v2).unwrap();
        assert!(arc.center.distance_to(&Point2::new(0.0, 0.0)) < 1e-9);
        assert!((arc.radius - 1.0).abs() < 1e-9);
        assert!((arc.sweep() - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_bulge_arc_major_clockwise() {
        // 270 degree clockwise arc from (1, 0) to (0, 1) around the origin.
        let v1 = PlineVertex::new(1.0, 0.0, -(3.0 * PI / 8.0).tan());
        let v2 = PlineVertex::new(0.0, 1.0, 0.0);
        let arc = bulge_arc(v1, v2).unwrap();
        assert!(arc.center.distance_to(&Point2::new(0.0, 0.0)) < 1e-9);
        assert!(arc.clockwise);
        assert!((arc.sweep() + 1.5 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_reconstructed_circle_round_trips_as_bulges() {
        let mut contour = Contour::new(Vec::new(), false);
        contour.segments.push(ContourSegment::Arc(ReconstructedArc {
            arc: Arc::new(Point2::new(0.0, 0.0), 2.0, 0.0, 0.0, false),
            curve_id: 1,
            full_circle: true,
            coverage: 1.0,
            point_count: 128,
            source: SourceRef::default(),
        }));
        let pline = contour_to_polyline(&contour).unwrap();
        assert_eq!(pline.vertex_count(), 2);
        assert!((pline.area() - PI * 4.0).abs() < 1e-9);

        let back = polyline_to_contour(&pline, false, &SourceRef::default());
        assert_eq!(back.segments.len(), 2);
        assert!(back.points.len() > 32);
        assert!(!back.is_clockwise());
    }
}
