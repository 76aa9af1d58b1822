//! Primitive standardizer.
//!
//! Converts every primitive variant into a closed, filled `Path` whose curve
//! vertices carry `(curve_id, segment_index)` tags. Each circle or arc met on
//! the way is registered in the run's [`CurveRegistry`]; composite shapes are
//! decomposed so every arc gets its own id.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};
use tracing::{debug, warn};

use pcbkit_core::constants::{MIN_CURVE_SEGMENTS, POINT_EPSILON, SEGMENTS_PER_HALF_TURN};
use pcbkit_core::{
    Arc, Contour, ContourSegment, CurveDescriptor, CurveRegistry, GeometryError, PathShape,
    Point2, Primitive, Properties, Shape, SourceRef, TaggedPoint,
};

/// Controls how finely curves are tessellated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationSettings {
    /// Lower bound on segments for any curve.
    pub min_segments: usize,
    /// Segments spent on 180 degrees of curve.
    pub segments_per_half_turn: usize,
}

impl Default for TessellationSettings {
    fn default() -> Self {
        Self {
            min_segments: MIN_CURVE_SEGMENTS,
            segments_per_half_turn: SEGMENTS_PER_HALF_TURN,
        }
    }
}

impl TessellationSettings {
    /// Segment count for an angular span in radians.
    pub fn segments_for_span(&self, span: f64) -> usize {
        let scaled = (self.segments_per_half_turn as f64 * span.abs() / PI).ceil() as usize;
        scaled.max(self.min_segments).max(1)
    }
}

/// Tessellates and registers curves on behalf of one fusion run.
struct Standardizer<'r> {
    registry: &'r mut CurveRegistry,
    settings: &'r TessellationSettings,
    source: SourceRef,
}

impl Standardizer<'_> {
    /// Full circle as `n` distinct counter-clockwise vertices.
    fn circle_points(&mut self, center: Point2, radius: f64) -> Vec<TaggedPoint> {
        let n = self.settings.segments_for_span(TAU);
        let id = self.registry.register(
            CurveDescriptor::circle(center, radius)
                .with_source(self.source.clone())
                .with_point_count(n),
        );
        (0..n)
            .map(|k| {
                let p = center.polar(radius, TAU * k as f64 / n as f64);
                tag(p, id, k)
            })
            .collect()
    }

    /// Arc vertices from start to end inclusive, following the arc's direction.
    fn arc_points(&mut self, arc: &Arc) -> Vec<TaggedPoint> {
        let sweep = arc.sweep();
        let n = self.settings.segments_for_span(sweep);
        let id = self.registry.register(
            CurveDescriptor::arc(
                arc.center,
                arc.radius,
                arc.start_angle,
                arc.start_angle + sweep,
                arc.clockwise,
            )
            .with_source(self.source.clone())
            .with_point_count(n + 1),
        );
        (0..=n)
            .map(|k| {
                let p = arc.point_at(arc.start_angle + sweep * k as f64 / n as f64);
                tag(p, id, k)
            })
            .collect()
    }

    fn disc(&mut self, center: Point2, radius: f64) -> Contour {
        Contour::new(self.circle_points(center, radius), false)
    }

    /// Rectangle covering one stroke segment, without caps.
    fn segment_body(p1: Point2, p2: Point2, half_width: f64) -> Option<Contour> {
        let len = p1.distance_to(&p2);
        if len < POINT_EPSILON {
            return None;
        }
        let nx = -(p2.y - p1.y) / len * half_width;
        let ny = (p2.x - p1.x) / len * half_width;
        let corners = [
            Point2::new(p1.x - nx, p1.y - ny),
            Point2::new(p2.x - nx, p2.y - ny),
            Point2::new(p2.x + nx, p2.y + ny),
            Point2::new(p1.x + nx, p1.y + ny),
        ];
        Some(Contour::from_points(&corners, false))
    }

    /// Buffers a polyline into overlapping outer contours: one body per segment
    /// and one round cap or join per vertex.
    fn stroke_polyline(&mut self, points: &[Point2], closed: bool, width: f64) -> Vec<Contour> {
        let half = width / 2.0;
        let mut contours = Vec::new();
        let count = points.len();
        let edges = if closed { count } else { count - 1 };
        for k in 0..edges {
            let p1 = points[k];
            let p2 = points[(k + 1) % count];
            if let Some(body) = Self::segment_body(p1, p2, half) {
                contours.push(body);
            }
        }
        let mut placed: Vec<Point2> = Vec::new();
        for p in points {
            if placed.iter().any(|q| q.distance_to(p) < POINT_EPSILON) {
                continue;
            }
            placed.push(*p);
            contours.push(self.disc(*p, half));
        }
        contours
    }

    /// Annular sector with round end caps; collapses to a pie when the inner
    /// radius vanishes.
    fn stroke_arc(&mut self, arc: &Arc, width: f64) -> Vec<Contour> {
        let half = width / 2.0;
        let sweep = arc.sweep();
        let outer = Arc::new(
            arc.center,
            arc.radius + half,
            arc.start_angle,
            arc.start_angle + sweep,
            arc.clockwise,
        );
        let mut ring = self.arc_points(&outer);

        let inner_radius = arc.radius - half;
        if inner_radius > POINT_EPSILON {
            let inner = Arc::new(
                arc.center,
                inner_radius,
                arc.start_angle + sweep,
                arc.start_angle,
                !arc.clockwise,
            );
            ring.extend(self.arc_points(&inner));
        } else {
            ring.push(TaggedPoint::from_point(arc.center, 0, 0));
        }

        let mut contours = vec![Contour::new(ring, false)];
        contours.push(self.disc(arc.start_point(), half));
        contours.push(self.disc(arc.end_point(), half));
        contours
    }

    /// Strokes an already segmented outline piece by piece so arc pieces keep
    /// their analytic edges.
    fn stroke_segments(&mut self, segments: &[ContourSegment], width: f64) -> Vec<Contour> {
        let mut contours = Vec::new();
        for segment in segments {
            match segment {
                ContourSegment::Line { start, end } => {
                    contours.extend(self.stroke_polyline(&[*start, *end], false, width));
                }
                ContourSegment::Arc(rec) => contours.extend(self.stroke_arc(&rec.arc, width)),
            }
        }
        contours
    }

    /// Ring vertices of a contour, re-tessellating and registering any arc
    /// segments it carries.
    fn expand_segments(&mut self, contour: &Contour) -> Vec<TaggedPoint> {
        if contour.segments.is_empty() {
            return contour.points.clone();
        }
        let mut points = Vec::new();
        for segment in &contour.segments {
            match segment {
                ContourSegment::Line { start, .. } => {
                    points.push(TaggedPoint::new(start.x, start.y));
                }
                ContourSegment::Arc(rec) => points.extend(self.arc_points(&rec.arc)),
            }
        }
        if let Some(ContourSegment::Line { end, .. }) = contour.segments.last() {
            points.push(TaggedPoint::new(end.x, end.y));
        }
        points
    }

    fn pie(&mut self, arc: &Arc) -> Contour {
        let mut ring = self.arc_points(arc);
        if (arc.span() - TAU).abs() > 1e-9 {
            ring.push(TaggedPoint::from_point(arc.center, 0, 0));
        } else {
            ring.pop();
        }
        Contour::new(ring, false)
    }

    /// Two straight edges and two independently registered semicircles.
    fn obround(&mut self, origin: Point2, width: f64, height: f64) -> Contour {
        if (width - height).abs() < POINT_EPSILON {
            let r = width / 2.0;
            return self.disc(Point2::new(origin.x + r, origin.y + r), r);
        }
        let (first, second) = if width > height {
            let r = height / 2.0;
            let right = Point2::new(origin.x + width - r, origin.y + r);
            let left = Point2::new(origin.x + r, origin.y + r);
            (
                Arc::new(right, r, -FRAC_PI_2, FRAC_PI_2, false),
                Arc::new(left, r, FRAC_PI_2, 3.0 * FRAC_PI_2, false),
            )
        } else {
            let r = width / 2.0;
            let bottom = Point2::new(origin.x + r, origin.y + r);
            let top = Point2::new(origin.x + r, origin.y + height - r);
            (
                Arc::new(bottom, r, PI, TAU, false),
                Arc::new(top, r, 0.0, PI, false),
            )
        };
        let mut ring = self.arc_points(&first);
        ring.extend(self.arc_points(&second));
        Contour::new(ring, false)
    }
}

fn tag(p: Point2, id: Option<u32>, index: usize) -> TaggedPoint {
    match id {
        Some(id) => TaggedPoint::from_point(p, id, index as u32),
        None => TaggedPoint::new(p.x, p.y),
    }
}

fn finish(contours: Vec<Contour>, properties: &Properties) -> Option<Primitive> {
    let mut contours: Vec<Contour> = contours
        .into_iter()
        .filter(|c| c.points.len() >= 3)
        .collect();
    if contours.is_empty() {
        return None;
    }
    let mut curve_ids = Vec::new();
    for c in &mut contours {
        c.refresh_curve_ids();
        curve_ids.extend_from_slice(&c.curve_ids);
    }
    curve_ids.sort_unstable();
    curve_ids.dedup();

    let mut props = properties.clone();
    props.stroke_width = 0.0;
    props.fill = true;
    props.curve_ids = curve_ids;
    Some(Primitive::new(
        Shape::Path(PathShape {
            contours,
            closed: true,
        }),
        props,
    ))
}

fn dropped(err: GeometryError) -> Option<Primitive> {
    warn!(error = %err, "Dropping primitive");
    None
}

fn missing(kind: &str, reason: &str) -> Option<Primitive> {
    dropped(GeometryError::MissingGeometry {
        kind: kind.to_string(),
        reason: reason.to_string(),
    })
}

/// Converts one primitive into a closed filled path with tagged curve points.
///
/// Returns `None` (after logging a warning) when the primitive has no usable
/// geometry; the caller drops it and carries on.
pub fn standardize(
    primitive: &Primitive,
    registry: &mut CurveRegistry,
    settings: &TessellationSettings,
) -> Option<Primitive> {
    let props = &primitive.properties;
    let stroke = props.stroke_width;
    let mut tess = Standardizer {
        registry,
        settings,
        source: props.source.clone(),
    };

    let contours = match &primitive.shape {
        Shape::Circle(c) => {
            if c.radius <= 0.0 {
                return missing("circle", "non-positive radius");
            }
            if props.is_stroke() {
                let outer = tess.disc(c.center, c.radius + stroke / 2.0);
                let inner_radius = c.radius - stroke / 2.0;
                if inner_radius > POINT_EPSILON {
                    let hole = Contour::new(tess.circle_points(c.center, inner_radius), true);
                    vec![outer, hole]
                } else {
                    vec![outer]
                }
            } else {
                vec![tess.disc(c.center, c.radius)]
            }
        }
        Shape::Arc(a) => {
            if a.radius <= 0.0 {
                return missing("arc", "non-positive radius");
            }
            if stroke > 0.0 {
                tess.stroke_arc(a, stroke)
            } else {
                vec![tess.pie(a)]
            }
        }
        Shape::Rectangle(r) => {
            if r.width <= 0.0 || r.height <= 0.0 {
                return missing("rectangle", "zero size");
            }
            if props.is_stroke() {
                tess.stroke_polyline(&r.corners(), true, stroke)
            } else {
                vec![Contour::from_points(&r.corners(), false)]
            }
        }
        Shape::Obround(o) => {
            if o.width <= 0.0 || o.height <= 0.0 {
                return missing("obround", "zero size");
            }
            vec![tess.obround(o.origin, o.width, o.height)]
        }
        Shape::Path(p) => {
            let Some(outline) = p.contours.first() else {
                return missing("path", "no contours");
            };
            if outline.points.len() < 2 && outline.segments.is_empty() {
                return missing("path", "fewer than 2 points");
            }
            if props.is_stroke() {
                if outline.segments.is_empty() {
                    tess.stroke_polyline(&outline.positions(), p.closed, stroke)
                } else {
                    tess.stroke_segments(&outline.segments, stroke)
                }
            } else if p.closed || props.fill {
                let mut contours = Vec::with_capacity(p.contours.len());
                for (k, c) in p.contours.iter().enumerate() {
                    let mut ring = Contour::new(tess.expand_segments(c), c.is_hole && k > 0);
                    ring.parent_id = ring.is_hole.then_some(0);
                    ring.dedup_points();
                    if k == 0 && ring.points.len() < 3 {
                        return dropped(GeometryError::DegenerateContour {
                            points: ring.points.len(),
                        });
                    }
                    contours.push(ring);
                }
                contours
            } else {
                return missing("path", "open path without stroke width");
            }
        }
    };

    debug!(
        kind = primitive.shape.kind_name(),
        contours = contours.len(),
        "Standardized primitive"
    );
    finish(contours, props)
}

/// Standardizes a batch, dropping primitives that fail validation or have no
/// usable geometry.
pub fn standardize_all(
    primitives: &[Primitive],
    registry: &mut CurveRegistry,
    settings: &TessellationSettings,
) -> Vec<Primitive> {
    primitives
        .iter()
        .filter(|p| match p.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Dropping invalid primitive");
                false
            }
        })
        .filter_map(|p| standardize(p, registry, settings))
        .collect()
}
