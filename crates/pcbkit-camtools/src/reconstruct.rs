//! Arc reconstruction.
//!
//! Walks the tagged vertices of fused contours, groups consecutive vertices
//! carrying the same curve id, checks them against the registered circle and
//! replaces verified runs with analytic arcs. Runs that fail verification or
//! reference an unknown curve stay as straight segments.
//!
//! Partial arcs are recovered from the largest angular gap between surviving
//! vertices: that gap is the part of the curve the boolean operation removed.
//! When a run also jumps across other large gaps (a curve clipped in several
//! places) it is split there and each piece becomes its own arc.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::{PI, TAU};
use tracing::{debug, warn};

use pcbkit_core::constants::{DEFAULT_RECONSTRUCTION_TOLERANCE, NO_CURVE, POINT_EPSILON};
use pcbkit_core::{
    normalize_angle, Arc, Circle, Contour, ContourSegment, CurveDescriptor, CurveKind,
    CurveRegistry, Point2, Primitive, ReconstructedArc, ReconstructionInfo, Shape, SourceRef,
    TaggedPoint,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionSettings {
    /// Maximum radial deviation (mm) of a vertex from its registered curve.
    pub tolerance: f64,
    /// A second gap at least this fraction of the largest one marks a curve
    /// clipped in several places.
    pub multi_gap_ratio: f64,
    /// Gaps wider than this many nominal tessellation steps count as removed
    /// regions.
    pub gap_step_factor: f64,
}

impl Default for ReconstructionSettings {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_RECONSTRUCTION_TOLERANCE,
            multi_gap_ratio: 0.5,
            gap_step_factor: 3.0,
        }
    }
}

/// Diagnostics for one reconstruction pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionStats {
    pub curves_registered: usize,
    /// Distinct curve ids that produced at least one arc.
    pub curves_reconstructed: usize,
    pub full_circles: usize,
    pub partial_arcs: usize,
    /// Runs left straight because a vertex was off the curve.
    pub rejected_runs: usize,
    /// Runs whose curve id had no descriptor.
    pub lookup_misses: usize,
    /// Runs split because the curve was clipped in several places.
    pub multi_gap_splits: usize,
    pub average_coverage: f64,
}

/// Wraps an angle difference into `[-π, π)`.
fn wrapped_delta(from: f64, to: f64) -> f64 {
    normalize_angle(to - from + PI) - PI
}

/// Circular gaps between sorted angles, returned with the index of the
/// angle each gap follows.
fn circular_gaps(sorted: &[f64]) -> Vec<(usize, f64)> {
    let m = sorted.len();
    (0..m)
        .map(|i| {
            let next = if i + 1 < m {
                sorted[i + 1]
            } else {
                sorted[0] + TAU
            };
            (i, next - sorted[i])
        })
        .collect()
}

/// Angular distance between neighbouring vertices of the original tessellation.
fn nominal_step(desc: &CurveDescriptor, center: Point2, radius: f64) -> f64 {
    let count = desc.original_point_count.max(2) as f64;
    match desc.kind {
        CurveKind::Circle => TAU / count,
        CurveKind::Arc => {
            let span = Arc::new(
                center,
                radius,
                desc.start_angle.unwrap_or(0.0),
                desc.end_angle.unwrap_or(TAU),
                desc.clockwise.unwrap_or(false),
            )
            .span();
            span / (count - 1.0)
        }
    }
}

/// One piece of a contour in traversal order.
enum Piece {
    Straight(Vec<Point2>),
    Curve {
        arc: ReconstructedArc,
        first: Point2,
        last: Point2,
    },
}

/// Maximal run of consecutive vertices sharing a curve id.
struct Run {
    curve_id: u32,
    points: Vec<TaggedPoint>,
}

/// Splits a closed contour into runs, merging a run that wraps past the first
/// vertex. Returns `true` alongside when one run covers the whole contour.
fn split_runs(points: &[TaggedPoint]) -> (Vec<Run>, bool) {
    let n = points.len();
    let start = (0..n).find(|&i| points[i].curve_id != points[(i + n - 1) % n].curve_id);
    let Some(start) = start else {
        let curve_id = points.first().map(|p| p.curve_id).unwrap_or(NO_CURVE);
        return (
            vec![Run {
                curve_id,
                points: points.to_vec(),
            }],
            true,
        );
    };

    let mut runs: Vec<Run> = Vec::new();
    for k in 0..n {
        let p = points[(start + k) % n];
        match runs.last_mut() {
            Some(run) if run.curve_id == p.curve_id => run.points.push(p),
            _ => runs.push(Run {
                curve_id: p.curve_id,
                points: vec![p],
            }),
        }
    }
    (runs, false)
}

/// Recovers circles and arcs from tagged boundary vertices.
#[derive(Debug, Clone, Default)]
pub struct ArcReconstructor {
    settings: ReconstructionSettings,
}

/// Per-pass bookkeeping shared across contours.
#[derive(Default)]
struct Tally {
    stats: ReconstructionStats,
    coverage_sum: f64,
    reconstructed_ids: HashSet<u32>,
}

impl Tally {
    fn record(&mut self, arc: &ReconstructedArc) {
        if arc.full_circle {
            self.stats.full_circles += 1;
        } else {
            self.stats.partial_arcs += 1;
        }
        self.coverage_sum += arc.coverage;
        self.reconstructed_ids.insert(arc.curve_id);
    }

    fn finish(mut self, registered: usize) -> ReconstructionStats {
        let arcs = self.stats.full_circles + self.stats.partial_arcs;
        self.stats.curves_registered = registered;
        self.stats.curves_reconstructed = self.reconstructed_ids.len();
        self.stats.average_coverage = if arcs > 0 {
            self.coverage_sum / arcs as f64
        } else {
            0.0
        };
        self.stats
    }
}

impl ArcReconstructor {
    pub fn new(settings: ReconstructionSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ReconstructionSettings {
        &self.settings
    }

    /// Replaces tagged vertex runs with arcs.
    ///
    /// A path made of a single contour that is one complete circle becomes a
    /// `Shape::Circle`; other paths keep their points and gain `segments`.
    /// Non-path primitives pass through unchanged.
    pub fn reconstruct(
        &self,
        registry: &CurveRegistry,
        paths: &[Primitive],
    ) -> (Vec<Primitive>, ReconstructionStats) {
        let mut tally = Tally::default();
        let mut out = Vec::with_capacity(paths.len());

        for prim in paths {
            let Some(path) = prim.as_path() else {
                out.push(prim.clone());
                continue;
            };
            let source = &prim.properties.source;

            let mut contours = path.contours.clone();
            let mut found_arc = false;
            let mut sole_circle: Option<ReconstructedArc> = None;
            for contour in &mut contours {
                let pieces = self.contour_pieces(contour, registry, source, &mut tally);
                if !pieces.iter().any(|p| matches!(p, Piece::Curve { .. })) {
                    contour.segments.clear();
                    continue;
                }
                found_arc = true;
                if let [Piece::Curve { arc, .. }] = pieces.as_slice() {
                    if arc.full_circle && path.contours.len() == 1 {
                        sole_circle = Some(arc.clone());
                    }
                }
                contour.segments = assemble(pieces);
            }

            let mut props = prim.properties.clone();
            props.reconstructed = found_arc;
            match sole_circle {
                Some(arc) => {
                    props.curve_ids = vec![arc.curve_id];
                    props.reconstruction = Some(ReconstructionInfo {
                        curve_id: arc.curve_id,
                        coverage: arc.coverage,
                        full_circle: true,
                    });
                    out.push(Primitive::new(
                        Shape::Circle(Circle::new(arc.arc.center, arc.arc.radius)),
                        props,
                    ));
                }
                None => {
                    let mut shape = path.clone();
                    shape.contours = contours;
                    out.push(Primitive::new(Shape::Path(shape), props));
                }
            }
        }

        let stats = tally.finish(registry.len());
        debug!(
            full_circles = stats.full_circles,
            partial_arcs = stats.partial_arcs,
            rejected = stats.rejected_runs,
            misses = stats.lookup_misses,
            coverage = stats.average_coverage,
            "Arc reconstruction complete"
        );
        (out, stats)
    }

    fn contour_pieces(
        &self,
        contour: &Contour,
        registry: &CurveRegistry,
        source: &SourceRef,
        tally: &mut Tally,
    ) -> Vec<Piece> {
        if contour.points.len() < 2 {
            return Vec::new();
        }
        let (runs, closed_loop) = split_runs(&contour.points);
        let mut pieces = Vec::new();
        for run in runs {
            self.run_pieces(run, closed_loop, registry, source, tally, &mut pieces);
        }
        pieces
    }

    fn run_pieces(
        &self,
        run: Run,
        closed_loop: bool,
        registry: &CurveRegistry,
        source: &SourceRef,
        tally: &mut Tally,
        pieces: &mut Vec<Piece>,
    ) {
        let straight = |run: &Run| Piece::Straight(run.points.iter().map(|p| p.position()).collect());
        if run.curve_id == NO_CURVE || run.points.len() < 2 {
            pieces.push(straight(&run));
            return;
        }
        let Some((desc, center, radius)) = registry
            .get(run.curve_id)
            .and_then(|d| d.center_radius().map(|(c, r)| (d, c, r)))
        else {
            warn!(
                curve_id = run.curve_id,
                points = run.points.len(),
                "Curve id has no registered descriptor; keeping straight segments"
            );
            tally.stats.lookup_misses += 1;
            pieces.push(straight(&run));
            return;
        };

        let tolerance = self.settings.tolerance;
        let fits = |p: &TaggedPoint| (p.position().distance_to(&center) - radius).abs() <= tolerance;
        let original = desc.original_point_count;
        let mut points = run.points.clone();

        if closed_loop {
            if points.iter().all(fits) && points.len() + 1 >= original {
                let angles: Vec<f64> = points.iter().map(|p| p.position().angle_about(&center)).collect();
                let turning: f64 = (0..angles.len())
                    .map(|k| wrapped_delta(angles[k], angles[(k + 1) % angles.len()]))
                    .sum();
                let start = angles[0];
                let arc = ReconstructedArc {
                    arc: Arc::new(center, radius, start, start, turning < 0.0),
                    curve_id: run.curve_id,
                    full_circle: true,
                    coverage: (points.len() as f64 / original.max(1) as f64).min(1.0),
                    point_count: points.len(),
                    source: source.clone(),
                };
                tally.record(&arc);
                let first = points[0].position();
                pieces.push(Piece::Curve {
                    arc,
                    first,
                    last: first,
                });
                return;
            }
            // Make the widest jump the closing edge so the rest reads as an open run.
            let m = points.len();
            let widest = (0..m)
                .max_by(|&a, &b| {
                    let da = wrapped_delta(
                        points[a].position().angle_about(&center),
                        points[(a + 1) % m].position().angle_about(&center),
                    )
                    .abs();
                    let db = wrapped_delta(
                        points[b].position().angle_about(&center),
                        points[(b + 1) % m].position().angle_about(&center),
                    )
                    .abs();
                    da.total_cmp(&db)
                })
                .unwrap_or(m - 1);
            points.rotate_left((widest + 1) % m);
        }

        // Vertices created where the curve met other geometry sit on a chord,
        // so only the run's ends may miss the curve.
        let lead = points.iter().take_while(|p| !fits(*p)).count();
        let trail = points.iter().rev().take_while(|p| !fits(*p)).count();
        if lead == points.len() || points[lead..points.len() - trail].iter().any(|p| !fits(p)) {
            debug!(
                curve_id = run.curve_id,
                points = points.len(),
                "Run does not fit its registered curve; keeping straight segments"
            );
            tally.stats.rejected_runs += 1;
            pieces.push(straight(&run));
            return;
        }

        if lead > 0 {
            pieces.push(Piece::Straight(points[..lead].iter().map(|p| p.position()).collect()));
        }
        let core = &points[lead..points.len() - trail];
        let step = nominal_step(desc, center, radius);
        self.fit_arcs(core, run.curve_id, original, center, radius, step, source, tally, pieces);
        if trail > 0 {
            pieces.push(Piece::Straight(
                points[points.len() - trail..].iter().map(|p| p.position()).collect(),
            ));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn fit_arcs(
        &self,
        core: &[TaggedPoint],
        curve_id: u32,
        original: usize,
        center: Point2,
        radius: f64,
        step: f64,
        source: &SourceRef,
        tally: &mut Tally,
        pieces: &mut Vec<Piece>,
    ) {
        let angles: Vec<f64> = core.iter().map(|p| p.position().angle_about(&center)).collect();
        let threshold = self.settings.gap_step_factor * step;

        let mut sorted = angles.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mut gaps: Vec<f64> = circular_gaps(&sorted).into_iter().map(|(_, g)| g).collect();
        gaps.sort_by(|a, b| b.total_cmp(a));
        let significant = gaps.iter().filter(|g| **g > threshold).count();
        let comparable =
            significant >= 2 && gaps[1] >= self.settings.multi_gap_ratio * gaps[0];

        let mut groups: Vec<Vec<usize>> = vec![vec![0]];
        for k in 1..core.len() {
            if wrapped_delta(angles[k - 1], angles[k]).abs() > threshold {
                groups.push(Vec::new());
            }
            if let Some(group) = groups.last_mut() {
                group.push(k);
            }
        }
        if groups.len() > 1 {
            tally.stats.multi_gap_splits += 1;
            if comparable {
                warn!(
                    curve_id,
                    gaps = significant,
                    pieces = groups.len(),
                    "Curve clipped in several places; emitting one arc per surviving piece"
                );
            } else {
                debug!(curve_id, pieces = groups.len(), "Splitting run at internal gap");
            }
        }

        for group in groups {
            let group_angles: Vec<f64> = group.iter().map(|&k| angles[k]).collect();
            let arc = if group.len() >= 2 {
                arc_from_angles(&group_angles, center, radius)
            } else {
                None
            };
            match arc {
                Some(arc) => {
                    let rec = ReconstructedArc {
                        arc,
                        curve_id,
                        full_circle: false,
                        coverage: (group.len() as f64 / original.max(1) as f64).min(1.0),
                        point_count: group.len(),
                        source: source.clone(),
                    };
                    tally.record(&rec);
                    pieces.push(Piece::Curve {
                        arc: rec,
                        first: core[group[0]].position(),
                        last: core[group[group.len() - 1]].position(),
                    });
                }
                None => pieces.push(Piece::Straight(
                    group.iter().map(|&k| core[k].position()).collect(),
                )),
            }
        }
    }
}

/// Arc through vertices at `angles` (traversal order) on a known circle.
///
/// The largest circular gap between the sorted angles is taken as the removed
/// part of the curve; the direction follows the traversal.
fn arc_from_angles(angles: &[f64], center: Point2, radius: f64) -> Option<Arc> {
    let turning: f64 = angles.windows(2).map(|w| wrapped_delta(w[0], w[1])).sum();
    let mut sorted = angles.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let (i, gap) = circular_gaps(&sorted)
        .into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    let span = TAU - gap;
    if span < 1e-9 {
        return None;
    }
    let m = sorted.len();
    Some(if turning >= 0.0 {
        let start = sorted[(i + 1) % m];
        Arc::new(center, radius, start, normalize_angle(start + span), false)
    } else {
        let start = sorted[i];
        Arc::new(center, radius, start, normalize_angle(start - span), true)
    })
}

/// Joins pieces into a closed chain of segments, bridging pieces with lines.
fn assemble(pieces: Vec<Piece>) -> Vec<ContourSegment> {
    let mut segments = Vec::new();
    let mut first: Option<Point2> = None;
    let mut cursor: Option<Point2> = None;

    let mut line_to = |segments: &mut Vec<ContourSegment>, cursor: &mut Option<Point2>, p: Point2| {
        match cursor {
            Some(c) if c.distance_to(&p) > POINT_EPSILON => {
                segments.push(ContourSegment::Line { start: *c, end: p });
            }
            Some(_) => {}
            None => first = Some(p),
        }
        *cursor = Some(p);
    };

    for piece in pieces {
        match piece {
            Piece::Straight(points) => {
                for p in points {
                    line_to(&mut segments, &mut cursor, p);
                }
            }
            Piece::Curve { arc, first: a, last } => {
                line_to(&mut segments, &mut cursor, a);
                segments.push(ContourSegment::Arc(arc));
                cursor = Some(last);
            }
        }
    }

    if let (Some(c), Some(f)) = (cursor, first) {
        if c.distance_to(&f) > POINT_EPSILON {
            segments.push(ContourSegment::Line { start: c, end: f });
        }
    }
    segments
}
