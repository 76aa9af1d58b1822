//! Exact fixed-point boolean engine.
//!
//! All predicates run on `i64` coordinates with `i128` products; floating
//! point is never used inside the solver. The pipeline is:
//!
//! 1. collect the edges of every subject and clip ring,
//! 2. split edges where they meet so fragments only touch at endpoints,
//! 3. merge coincident fragments and count how often each ring runs along them,
//! 4. compute subject and clip winding numbers on both sides of each fragment,
//! 5. keep fragments separating inside from outside and link them into rings.

use std::collections::HashMap;
use tracing::debug;

use crate::intersect::{cross, Owner, Pos, Segment, Splitter};
use crate::rings::{link_rings, remove_collinear, twice_area};
use crate::{
    prefer_lower_curve_id, BooleanEngine, ClipperError, EnginePath, FillRule, IntPoint,
    IntersectionCallback, ResultRing, ZIntersection, MAX_COORD,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClipOp {
    Union,
    Difference,
}

impl ClipOp {
    fn is_inside(self, fill_rule: FillRule, subject: i32, clip: i32) -> bool {
        let s = fill_rule.is_inside(subject);
        let c = fill_rule.is_inside(clip);
        match self {
            ClipOp::Union => s || c,
            ClipOp::Difference => s && !c,
        }
    }
}

/// Coincident fragments merged into one undirected edge `lo -> hi`
/// (`lo < hi` lexicographically), with signed multiplicities per operand.
#[derive(Debug, Clone, Copy)]
struct EdgeGroup {
    lo: Pos,
    hi: Pos,
    subject: i32,
    clip: i32,
}

impl EdgeGroup {
    fn is_horizontal(&self) -> bool {
        self.lo.1 == self.hi.1
    }
}

/// Buckets edge indices by the range of one coordinate.
struct BandIndex {
    min: i64,
    height: i64,
    bands: Vec<Vec<usize>>,
}

impl BandIndex {
    fn build(ranges: &[(i64, i64)]) -> Self {
        let min = ranges.iter().map(|r| r.0).min().unwrap_or(0);
        let max = ranges.iter().map(|r| r.1).max().unwrap_or(0);
        let count = ((ranges.len() as f64).sqrt() as usize).clamp(1, 4096);
        let span = (max - min + 1).max(1);
        let height = (span + count as i64 - 1) / count as i64;
        let mut bands = vec![Vec::new(); count];
        for (k, &(lo, hi)) in ranges.iter().enumerate() {
            let first = ((lo - min) / height) as usize;
            let last = (((hi - min) / height) as usize).min(count - 1);
            for band in &mut bands[first..=last] {
                band.push(k);
            }
        }
        Self { min, height, bands }
    }

    fn query(&self, value: i64) -> &[usize] {
        if value < self.min {
            return &[];
        }
        let idx = ((value - self.min) / self.height) as usize;
        self.bands.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Signed crossing of the `+x` ray from `p` with edge `u -> v`, using the
/// half-open rule on `y`.
fn ray_crossing(u: (i128, i128), v: (i128, i128), p: (i128, i128)) -> i32 {
    let side = cross(v.0 - u.0, v.1 - u.1, p.0 - u.0, p.1 - u.1);
    if u.1 <= p.1 && p.1 < v.1 {
        i32::from(side > 0)
    } else if v.1 <= p.1 && p.1 < u.1 {
        -i32::from(side < 0)
    } else {
        0
    }
}

/// Winding numbers just beside each edge group, computed in doubled
/// coordinates so fragment midpoints stay on the integer grid.
struct WindingSolver<'g> {
    groups: &'g [EdgeGroup],
    by_y: BandIndex,
    by_x: BandIndex,
}

impl<'g> WindingSolver<'g> {
    fn new(groups: &'g [EdgeGroup]) -> Self {
        let y_ranges: Vec<(i64, i64)> = groups
            .iter()
            .map(|g| (2 * g.lo.1.min(g.hi.1), 2 * g.lo.1.max(g.hi.1)))
            .collect();
        let x_ranges: Vec<(i64, i64)> = groups.iter().map(|g| (2 * g.lo.0, 2 * g.hi.0)).collect();
        Self {
            groups,
            by_y: BandIndex::build(&y_ranges),
            by_x: BandIndex::build(&x_ranges),
        }
    }

    /// Returns `(subject, clip)` winding on the left and on the right of `group`.
    fn sides(&self, group: &EdgeGroup) -> ((i32, i32), (i32, i32)) {
        let mid = (
            group.lo.0 as i128 + group.hi.0 as i128,
            group.lo.1 as i128 + group.hi.1 as i128,
        );
        let double = |p: Pos| (2 * p.0 as i128, 2 * p.1 as i128);
        let mut ws = 0;
        let mut wc = 0;

        let measured_left = if group.is_horizontal() {
            // Rotate (x, y) -> (y, -x) so the +x ray points up the original y axis.
            let rot = |p: (i128, i128)| (p.1, -p.0);
            let p = rot(mid);
            for &k in self.by_x.query(mid.0 as i64) {
                let g = &self.groups[k];
                let c = ray_crossing(rot(double(g.lo)), rot(double(g.hi)), p);
                ws += c * g.subject;
                wc += c * g.clip;
            }
            true
        } else {
            for &k in self.by_y.query(mid.1 as i64) {
                let g = &self.groups[k];
                let c = ray_crossing(double(g.lo), double(g.hi), mid);
                ws += c * g.subject;
                wc += c * g.clip;
            }
            group.hi.1 < group.lo.1
        };

        if measured_left {
            ((ws, wc), (ws - group.subject, wc - group.clip))
        } else {
            ((ws + group.subject, wc + group.clip), (ws, wc))
        }
    }
}

/// Exact polygon boolean engine over `i64` coordinates.
///
/// Each vertex's `z` is carried through: output vertices that existed in the
/// input keep their tag (coincident inputs resolve to the lower curve id),
/// new crossing vertices get the intersection callback's choice.
pub struct FixedPointEngine {
    callback: IntersectionCallback,
}

impl std::fmt::Debug for FixedPointEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedPointEngine").finish_non_exhaustive()
    }
}

impl Default for FixedPointEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedPointEngine {
    pub fn new() -> Self {
        Self {
            callback: Box::new(prefer_lower_curve_id),
        }
    }

    /// Replaces the rule that tags newly created intersection vertices.
    pub fn with_intersection_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ZIntersection) -> i64 + Send + Sync + 'static,
    {
        self.callback = Box::new(callback);
        self
    }

    fn collect_segments(
        paths: &[EnginePath],
        owner: Owner,
        out: &mut Vec<Segment>,
    ) -> Result<(), ClipperError> {
        for path in paths {
            if path.is_empty() {
                continue;
            }
            if path.len() < 3 {
                return Err(ClipperError::Degenerate { points: path.len() });
            }
            if let Some(p) = path
                .iter()
                .find(|p| p.x.abs() > MAX_COORD || p.y.abs() > MAX_COORD)
            {
                return Err(ClipperError::CoordinateOverflow { x: p.x, y: p.y });
            }
            let n = path.len();
            for k in 0..n {
                let a = path[k];
                let b = path[(k + 1) % n];
                if a.pos() != b.pos() {
                    out.push(Segment { a, b, owner });
                }
            }
        }
        Ok(())
    }

    fn execute(
        &self,
        op: ClipOp,
        subject: &[EnginePath],
        clip: &[EnginePath],
        fill_rule: FillRule,
        preserve_collinear: bool,
    ) -> Result<Vec<ResultRing>, ClipperError> {
        let mut segments = Vec::new();
        Self::collect_segments(subject, Owner::Subject, &mut segments)?;
        Self::collect_segments(clip, Owner::Clip, &mut segments)?;
        if segments.is_empty() {
            return Ok(Vec::new());
        }
        let input_edges = segments.len();

        let mut splitter = Splitter::new(&segments, &*self.callback);
        let fragments = splitter.split_all(segments);

        let mut merged: HashMap<(Pos, Pos), (i32, i32)> = HashMap::new();
        for frag in &fragments {
            let (a, b) = (frag.a.pos(), frag.b.pos());
            let (key, sign) = if a < b { ((a, b), 1) } else { ((b, a), -1) };
            let entry = merged.entry(key).or_insert((0, 0));
            match frag.owner {
                Owner::Subject => entry.0 += sign,
                Owner::Clip => entry.1 += sign,
            }
        }
        let mut groups: Vec<EdgeGroup> = merged
            .into_iter()
            .filter(|(_, (s, c))| *s != 0 || *c != 0)
            .map(|((lo, hi), (subject, clip))| EdgeGroup {
                lo,
                hi,
                subject,
                clip,
            })
            .collect();
        groups.sort_by_key(|g| (g.lo, g.hi));

        let solver = WindingSolver::new(&groups);
        let mut kept: Vec<(Pos, Pos)> = Vec::new();
        for group in &groups {
            let ((ls, lc), (rs, rc)) = solver.sides(group);
            let left_in = op.is_inside(fill_rule, ls, lc);
            let right_in = op.is_inside(fill_rule, rs, rc);
            if left_in == right_in {
                continue;
            }
            if left_in {
                kept.push((group.lo, group.hi));
            } else {
                kept.push((group.hi, group.lo));
            }
        }
        kept.sort_unstable();

        let mut result = Vec::new();
        for mut ring in link_rings(&kept) {
            if !preserve_collinear {
                remove_collinear(&mut ring);
            }
            if ring.len() < 3 {
                continue;
            }
            let area = twice_area(&ring);
            if area == 0 {
                continue;
            }
            result.push(ResultRing {
                points: ring
                    .iter()
                    .map(|&p| IntPoint::with_z(p.0, p.1, splitter.tag_at(p)))
                    .collect(),
                is_hole: area < 0,
            });
        }

        debug!(
            op = ?op,
            input_edges,
            fragments = fragments.len(),
            crossings = splitter.crossing_count(),
            boundary_edges = kept.len(),
            rings = result.len(),
            "Boolean operation complete"
        );
        Ok(result)
    }
}

impl BooleanEngine for FixedPointEngine {
    fn union(
        &self,
        subject: &[EnginePath],
        clip: &[EnginePath],
        fill_rule: FillRule,
        preserve_collinear: bool,
    ) -> Result<Vec<ResultRing>, ClipperError> {
        self.execute(ClipOp::Union, subject, clip, fill_rule, preserve_collinear)
    }

    fn difference(
        &self,
        subject: &[EnginePath],
        clip: &[EnginePath],
        fill_rule: FillRule,
        preserve_collinear: bool,
    ) -> Result<Vec<ResultRing>, ClipperError> {
        self.execute(ClipOp::Difference, subject, clip, fill_rule, preserve_collinear)
    }
}
