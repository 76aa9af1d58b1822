//! Primitive data model.
//!
//! A [`Primitive`] is a closed sum of shape variants plus the [`Properties`]
//! every stage of the pipeline reads (polarity, stroke width, provenance and
//! curve metadata).

use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use crate::constants::{NO_CURVE, POINT_EPSILON};
use crate::error::GeometryError;
use crate::geometry::{
    is_clockwise, normalize_angle, signed_area, BoundingBox, Point2, TaggedPoint,
};

/// Whether a primitive adds (`Dark`) or removes (`Clear`) copper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Dark,
    Clear,
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Dark => write!(f, "dark"),
            Polarity::Clear => write!(f, "clear"),
        }
    }
}

/// Back-reference to the import operation that produced a primitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceRef {
    pub operation_id: String,
    pub layer: Option<String>,
}

impl SourceRef {
    pub fn new(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            layer: None,
        }
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }
}

/// Diagnostics attached to a primitive rebuilt from tagged boolean output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionInfo {
    pub curve_id: u32,
    /// Surviving points divided by the curve's original tessellation count.
    pub coverage: f64,
    pub full_circle: bool,
}

/// Per-primitive attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Properties {
    pub polarity: Polarity,
    /// Stroke width in mm; zero for filled regions.
    pub stroke_width: f64,
    pub fill: bool,
    pub source: SourceRef,
    pub curve_ids: Vec<u32>,
    pub reconstructed: bool,
    pub reconstruction: Option<ReconstructionInfo>,
}

impl Properties {
    pub fn dark() -> Self {
        Self {
            fill: true,
            ..Default::default()
        }
    }

    pub fn clear() -> Self {
        Self {
            polarity: Polarity::Clear,
            fill: true,
            ..Default::default()
        }
    }

    /// An unfilled stroke of the given width.
    pub fn stroke(width: f64) -> Self {
        Self {
            stroke_width: width,
            fill: false,
            ..Default::default()
        }
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.source = source;
        self
    }

    /// A stroke must be buffered into a filled polygon before boolean operations.
    pub fn is_stroke(&self) -> bool {
        self.stroke_width > 0.0 && !self.fill
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        bbox.include(self.center.x - self.radius, self.center.y - self.radius);
        bbox.include(self.center.x + self.radius, self.center.y + self.radius);
        bbox
    }
}

/// Circular arc. Angles are radians; `clockwise` gives the sweep direction
/// from `start_angle` to `end_angle`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point2,
    pub radius: f64,
    pub start_angle: f64,
    pub end_angle: f64,
    pub clockwise: bool,
}

impl Arc {
    pub fn new(center: Point2, radius: f64, start_angle: f64, end_angle: f64, clockwise: bool) -> Self {
        Self {
            center,
            radius,
            start_angle,
            end_angle,
            clockwise,
        }
    }

    /// Signed sweep in radians, positive counter-clockwise.
    ///
    /// Equal start and end angles describe a full turn.
    pub fn sweep(&self) -> f64 {
        let raw = self.end_angle - self.start_angle;
        if self.clockwise {
            let mut s = raw.rem_euclid(TAU) - TAU;
            if s <= -TAU {
                s = -TAU;
            }
            if s.abs() < 1e-12 {
                -TAU
            } else {
                s
            }
        } else {
            let s = raw.rem_euclid(TAU);
            if s < 1e-12 {
                TAU
            } else {
                s
            }
        }
    }

    /// Absolute angular span in radians.
    pub fn span(&self) -> f64 {
        self.sweep().abs()
    }

    pub fn point_at(&self, angle: f64) -> Point2 {
        self.center.polar(self.radius, angle)
    }

    pub fn start_point(&self) -> Point2 {
        self.point_at(self.start_angle)
    }

    pub fn end_point(&self) -> Point2 {
        self.point_at(self.start_angle + self.sweep())
    }

    pub fn length(&self) -> f64 {
        self.radius * self.span()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        let steps = 64;
        let sweep = self.sweep();
        for i in 0..=steps {
            let p = self.point_at(self.start_angle + sweep * i as f64 / steps as f64);
            bbox.include(p.x, p.y);
        }
        bbox
    }
}

/// Axis-aligned rectangle anchored at its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub origin: Point2,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn new(origin: Point2, width: f64, height: f64) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }

    pub fn corners(&self) -> [Point2; 4] {
        let Point2 { x, y } = self.origin;
        [
            Point2::new(x, y),
            Point2::new(x + self.width, y),
            Point2::new(x + self.width, y + self.height),
            Point2::new(x, y + self.height),
        ]
    }
}

/// Stadium shape (rectangle with semicircular ends on its short sides),
/// anchored at its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obround {
    pub origin: Point2,
    pub width: f64,
    pub height: f64,
}

impl Obround {
    pub fn new(origin: Point2, width: f64, height: f64) -> Self {
        Self {
            origin,
            width,
            height,
        }
    }
}

/// A reconstructed circle or arc standing in for a run of tessellated points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructedArc {
    pub arc: Arc,
    pub curve_id: u32,
    pub full_circle: bool,
    pub coverage: f64,
    /// Number of tagged points the arc replaces.
    pub point_count: usize,
    pub source: SourceRef,
}

/// One piece of a reconstructed contour outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContourSegment {
    Line { start: Point2, end: Point2 },
    Arc(ReconstructedArc),
}

impl ContourSegment {
    pub fn start(&self) -> Point2 {
        match self {
            ContourSegment::Line { start, .. } => *start,
            ContourSegment::Arc(a) => a.arc.start_point(),
        }
    }

    pub fn end(&self) -> Point2 {
        match self {
            ContourSegment::Line { end, .. } => *end,
            ContourSegment::Arc(a) => a.arc.end_point(),
        }
    }

    /// Swaps start and end, keeping the same geometry.
    pub fn reverse(&mut self) {
        match self {
            ContourSegment::Line { start, end } => std::mem::swap(start, end),
            ContourSegment::Arc(a) => {
                let end = normalize_angle(a.arc.start_angle + a.arc.sweep());
                a.arc.end_angle = a.arc.start_angle;
                a.arc.start_angle = end;
                a.arc.clockwise = !a.arc.clockwise;
            }
        }
    }
}

/// One ring of a polygon.
///
/// Outer rings run counter-clockwise and holes clockwise once the fusion
/// stage has normalised them. `segments` stays empty until arc
/// reconstruction replaces point runs with analytic pieces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contour {
    pub points: Vec<TaggedPoint>,
    pub is_hole: bool,
    pub nesting_level: usize,
    pub parent_id: Option<usize>,
    pub curve_ids: Vec<u32>,
    pub segments: Vec<ContourSegment>,
}

impl Contour {
    pub fn new(points: Vec<TaggedPoint>, is_hole: bool) -> Self {
        let mut contour = Self {
            points,
            is_hole,
            nesting_level: usize::from(is_hole),
            ..Default::default()
        };
        contour.refresh_curve_ids();
        contour
    }

    pub fn from_points(points: &[Point2], is_hole: bool) -> Self {
        Self::new(
            points.iter().map(|p| TaggedPoint::new(p.x, p.y)).collect(),
            is_hole,
        )
    }

    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn is_clockwise(&self) -> bool {
        is_clockwise(&self.points)
    }

    /// Reverses travel direction in place, including any segments.
    pub fn reverse(&mut self) {
        self.points.reverse();
        self.segments.reverse();
        for segment in &mut self.segments {
            segment.reverse();
        }
    }

    /// Reverses the ring if its orientation disagrees with `is_hole`.
    /// Returns true when a reversal happened.
    pub fn normalize_winding(&mut self) -> bool {
        if self.is_clockwise() != self.is_hole {
            self.reverse();
            true
        } else {
            false
        }
    }

    /// Forces the ring to the requested orientation. Returns true when reversed.
    pub fn orient(&mut self, clockwise: bool) -> bool {
        if self.is_clockwise() != clockwise {
            self.reverse();
            true
        } else {
            false
        }
    }

    /// Recomputes the sorted, de-duplicated list of curve ids on this ring.
    pub fn refresh_curve_ids(&mut self) {
        let mut ids: Vec<u32> = self
            .points
            .iter()
            .map(|p| p.curve_id)
            .filter(|id| *id != NO_CURVE)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        self.curve_ids = ids;
    }

    pub fn positions(&self) -> Vec<Point2> {
        self.points.iter().map(TaggedPoint::position).collect()
    }

    /// Drops consecutive duplicate points, including a closing duplicate.
    pub fn dedup_points(&mut self) {
        self.points
            .dedup_by(|a, b| a.position().distance_to(&b.position()) < POINT_EPSILON);
        while self.points.len() > 1 {
            let first = self.points[0].position();
            let last = self.points[self.points.len() - 1].position();
            if first.distance_to(&last) < POINT_EPSILON {
                self.points.pop();
            } else {
                break;
            }
        }
    }
}

/// A polyline or polygon; the first contour is the outline, later contours
/// are holes (for filled paths) or further outlines (for fused output).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathShape {
    pub contours: Vec<Contour>,
    pub closed: bool,
}

impl PathShape {
    /// A single-outline path.
    pub fn from_points(points: &[Point2], closed: bool) -> Self {
        Self {
            contours: vec![Contour::from_points(points, false)],
            closed,
        }
    }

    /// A closed outline with holes.
    pub fn with_holes(outline: &[Point2], holes: &[Vec<Point2>]) -> Self {
        let mut contours = vec![Contour::from_points(outline, false)];
        for hole in holes {
            let mut c = Contour::from_points(hole, true);
            c.parent_id = Some(0);
            contours.push(c);
        }
        Self {
            contours,
            closed: true,
        }
    }

    pub fn outer(&self) -> Option<&Contour> {
        self.contours.iter().find(|c| !c.is_hole)
    }

    pub fn holes(&self) -> impl Iterator<Item = &Contour> {
        self.contours.iter().filter(|c| c.is_hole)
    }

    /// Net area (outers minus holes).
    pub fn area(&self) -> f64 {
        self.contours
            .iter()
            .map(|c| if c.is_hole { -c.area() } else { c.area() })
            .sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for c in &self.contours {
            bbox.merge(&BoundingBox::from_points(&c.points));
        }
        bbox
    }
}

/// Shape variants understood by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Circle(Circle),
    Arc(Arc),
    Rectangle(Rectangle),
    Obround(Obround),
    Path(PathShape),
}

impl Shape {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Circle(_) => "circle",
            Shape::Arc(_) => "arc",
            Shape::Rectangle(_) => "rectangle",
            Shape::Obround(_) => "obround",
            Shape::Path(_) => "path",
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        match self {
            Shape::Circle(c) => c.bounding_box(),
            Shape::Arc(a) => a.bounding_box(),
            Shape::Rectangle(r) => BoundingBox::from_points(&r.corners()),
            Shape::Obround(o) => {
                BoundingBox::from_points(&Rectangle::new(o.origin, o.width, o.height).corners())
            }
            Shape::Path(p) => p.bounding_box(),
        }
    }
}

/// A geometric primitive with its properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub shape: Shape,
    #[serde(default)]
    pub properties: Properties,
}

impl Primitive {
    pub fn new(shape: Shape, properties: Properties) -> Self {
        Self { shape, properties }
    }

    pub fn circle(center: Point2, radius: f64) -> Self {
        Self::new(Shape::Circle(Circle::new(center, radius)), Properties::dark())
    }

    pub fn rectangle(origin: Point2, width: f64, height: f64) -> Self {
        Self::new(
            Shape::Rectangle(Rectangle::new(origin, width, height)),
            Properties::dark(),
        )
    }

    pub fn obround(origin: Point2, width: f64, height: f64) -> Self {
        Self::new(
            Shape::Obround(Obround::new(origin, width, height)),
            Properties::dark(),
        )
    }

    /// A filled closed polygon.
    pub fn polygon(points: &[Point2]) -> Self {
        Self::new(
            Shape::Path(PathShape::from_points(points, true)),
            Properties::dark(),
        )
    }

    /// An open polyline drawn with a round aperture of `width`.
    pub fn stroke(points: &[Point2], width: f64) -> Self {
        Self::new(
            Shape::Path(PathShape::from_points(points, false)),
            Properties::stroke(width),
        )
    }

    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.properties.polarity = polarity;
        self
    }

    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.properties.source = source;
        self
    }

    pub fn polarity(&self) -> Polarity {
        self.properties.polarity
    }

    pub fn as_path(&self) -> Option<&PathShape> {
        match &self.shape {
            Shape::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_path_mut(&mut self) -> Option<&mut PathShape> {
        match &mut self.shape {
            Shape::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Rejects primitives carrying NaN or infinite values.
    ///
    /// Dimension checks (zero radius and the like) belong to the standardizer,
    /// which drops such primitives on its own.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let kind = self.shape.kind_name();
        let non_finite = |field: &str| GeometryError::NonFinite {
            kind: kind.to_string(),
            field: field.to_string(),
        };

        if !self.properties.stroke_width.is_finite() {
            return Err(non_finite("stroke_width"));
        }

        match &self.shape {
            Shape::Circle(c) => {
                if !c.center.is_finite() {
                    return Err(non_finite("center"));
                }
                if !c.radius.is_finite() {
                    return Err(non_finite("radius"));
                }
            }
            Shape::Arc(a) => {
                if !a.center.is_finite() {
                    return Err(non_finite("center"));
                }
                if !a.radius.is_finite() {
                    return Err(non_finite("radius"));
                }
                if !a.start_angle.is_finite() || !a.end_angle.is_finite() {
                    return Err(non_finite("angles"));
                }
            }
            Shape::Rectangle(Rectangle {
                origin,
                width,
                height,
            })
            | Shape::Obround(Obround {
                origin,
                width,
                height,
            }) => {
                if !origin.is_finite() {
                    return Err(non_finite("origin"));
                }
                if !width.is_finite() || !height.is_finite() {
                    return Err(non_finite("size"));
                }
            }
            Shape::Path(p) => {
                let bad = p
                    .contours
                    .iter()
                    .flat_map(|c| c.points.iter())
                    .any(|pt| !pt.x.is_finite() || !pt.y.is_finite());
                if bad {
                    return Err(non_finite("points"));
                }
            }
        }
        Ok(())
    }
}
