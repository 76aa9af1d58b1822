use tracing::debug;

use pcbkit_clipper::{BooleanEngine, FillRule, Scaler};
use pcbkit_core::{BoundingBox, Contour, PathShape, Point2, Primitive, Properties, Shape};

use super::polyline::{contour_to_polyline, polyline_to_contour};
use super::{stepover, ClearingSettings, OffsetPass, OperationKind};
use crate::error::CamToolResult;
use crate::fusion::split_rings;

/// Raster clearing of the union of `area`.
///
/// Parallel lines one stepover apart sweep the boundary's bounding diagonal
/// at `angle_degrees`; each line is cut at its boundary crossings and the
/// inside spans (even-odd) become open two-point paths.
pub fn clearing_passes<E: BooleanEngine>(
    area: &[Primitive],
    settings: &ClearingSettings,
    engine: &E,
    scaler: &Scaler,
) -> CamToolResult<Vec<OffsetPass>> {
    settings.validate()?;

    let mut paths = Vec::new();
    for prim in area {
        let contours: Vec<Contour> = match &prim.shape {
            Shape::Path(p) => p.contours.iter().map(dense_contour).collect(),
            Shape::Circle(c) => {
                let pline = super::polyline::circle_polyline(c.center, c.radius);
                vec![polyline_to_contour(&pline, false, &prim.properties.source)]
            }
            _ => Vec::new(),
        };
        for mut contour in contours {
            if contour.points.len() < 3 {
                continue;
            }
            contour.orient(contour.is_hole);
            paths.push(scaler.path_to_int(&contour.points)?);
        }
    }
    if paths.is_empty() {
        return Ok(Vec::new());
    }
    let rings = engine.union(&paths, &[], FillRule::NonZero, false)?;
    let (outers, holes) = split_rings(rings, scaler);
    let boundary: Vec<Vec<Point2>> = outers
        .iter()
        .chain(holes.iter())
        .map(Contour::positions)
        .collect();

    let mut bbox = BoundingBox::empty();
    for ring in &boundary {
        bbox.merge(&BoundingBox::from_points(ring));
    }

    let step = stepover(settings.tool_diameter, settings.overlap_percent);
    let angle = settings.angle_degrees.to_radians();
    let dir = Point2::new(angle.cos(), angle.sin());
    let normal = Point2::new(-dir.y, dir.x);
    let center = bbox.center();
    let half = bbox.diagonal() / 2.0;
    let lines = ((2.0 * half) / step).floor() as i64;

    let mut primitives = Vec::new();
    for k in 0..=lines {
        let offset = -half + step / 2.0 + k as f64 * step;
        if offset > half {
            break;
        }
        let origin = Point2::new(center.x + normal.x * offset, center.y + normal.y * offset);
        for (t0, t1) in inside_spans(origin, dir, &boundary) {
            let a = Point2::new(origin.x + dir.x * t0, origin.y + dir.y * t0);
            let b = Point2::new(origin.x + dir.x * t1, origin.y + dir.y * t1);
            primitives.push(Primitive::new(
                Shape::Path(PathShape::from_points(&[a, b], false)),
                Properties::default(),
            ));
        }
    }
    debug!(lines = primitives.len(), step, "Clearing raster");

    Ok(vec![OffsetPass {
        pass_index: 0,
        distance: 0.0,
        combined: true,
        kind: OperationKind::Clearing,
        tool_diameter: settings.tool_diameter,
        primitives,
    }])
}

/// Contour with any arc segments densified into points.
fn dense_contour(contour: &Contour) -> Contour {
    if contour.segments.is_empty() {
        return contour.clone();
    }
    match contour_to_polyline(contour) {
        Some(pline) => polyline_to_contour(&pline, contour.is_hole, &Default::default()),
        None => contour.clone(),
    }
}

/// Parameter intervals of the line `origin + t * dir` lying inside the rings.
fn inside_spans(origin: Point2, dir: Point2, rings: &[Vec<Point2>]) -> Vec<(f64, f64)> {
    let mut hits = Vec::new();
    for ring in rings {
        let n = ring.len();
        for i in 0..n {
            let p = ring[i];
            let q = ring[(i + 1) % n];
            // Signed side of each endpoint relative to the line.
            let sp = (p.x - origin.x) * dir.y - (p.y - origin.y) * dir.x;
            let sq = (q.x - origin.x) * dir.y - (q.y - origin.y) * dir.x;
            // Half-open test so a vertex on the line counts once.
            if (sp > 0.0) == (sq > 0.0) {
                continue;
            }
            let u = sp / (sp - sq);
            let x = p.x + (q.x - p.x) * u;
            let y = p.y + (q.y - p.y) * u;
            hits.push((x - origin.x) * dir.x + (y - origin.y) * dir.y);
        }
    }
    hits.sort_by(|a, b| a.total_cmp(b));
    hits.chunks_exact(2)
        .filter(|pair| pair[1] - pair[0] > 1e-9)
        .map(|pair| (pair[0], pair[1]))
        .collect()
}
