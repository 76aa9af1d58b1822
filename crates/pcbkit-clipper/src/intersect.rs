//! Edge splitting.
//!
//! Cuts every input edge at every point where it meets another edge so the
//! resulting fragments only touch at endpoints. Crossing points are rounded to
//! the integer grid, which can create fresh crossings, so splitting repeats
//! until a pass changes nothing.

use std::collections::HashMap;
use tracing::warn;

use pcbkit_core::TaggedPoint;

use crate::{IntPoint, ZIntersection};

pub(crate) type Pos = (i64, i64);

const MAX_SPLIT_PASSES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Owner {
    Subject,
    Clip,
}

/// A directed edge from one input ring.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Segment {
    pub a: IntPoint,
    pub b: IntPoint,
    pub owner: Owner,
}

impl Segment {
    fn x_range(&self) -> (i64, i64) {
        (self.a.x.min(self.b.x), self.a.x.max(self.b.x))
    }

    fn y_range(&self) -> (i64, i64) {
        (self.a.y.min(self.b.y), self.a.y.max(self.b.y))
    }
}

pub(crate) fn cross(ax: i128, ay: i128, bx: i128, by: i128) -> i128 {
    ax * by - ay * bx
}

/// Rounded `n / d` for `d > 0`, halves away from negative infinity.
fn div_round(n: i128, d: i128) -> i64 {
    (2 * n + d).div_euclid(2 * d) as i64
}

/// Keeps the tag on the lower non-zero curve id, then the lower segment index.
fn merge_tag(a: i64, b: i64) -> i64 {
    let (ca, sa) = TaggedPoint::unpack_tag(a);
    let (cb, sb) = TaggedPoint::unpack_tag(b);
    match (ca, cb) {
        (0, _) => b,
        (_, 0) => a,
        _ => {
            if (ca, sa) <= (cb, sb) {
                a
            } else {
                b
            }
        }
    }
}

/// Splits edges and remembers the metadata of every vertex it sees.
pub(crate) struct Splitter<'a> {
    originals: HashMap<Pos, i64>,
    crossings: HashMap<Pos, i64>,
    callback: &'a (dyn Fn(&ZIntersection) -> i64 + Send + Sync),
}

impl<'a> Splitter<'a> {
    pub fn new(
        segments: &[Segment],
        callback: &'a (dyn Fn(&ZIntersection) -> i64 + Send + Sync),
    ) -> Self {
        let mut originals: HashMap<Pos, i64> = HashMap::new();
        for seg in segments {
            for p in [seg.a, seg.b] {
                originals
                    .entry(p.pos())
                    .and_modify(|z| *z = merge_tag(*z, p.z))
                    .or_insert(p.z);
            }
        }
        Self {
            originals,
            crossings: HashMap::new(),
            callback,
        }
    }

    /// Metadata for a vertex: input vertices first, then crossings, else zero.
    pub fn tag_at(&self, pos: Pos) -> i64 {
        self.originals
            .get(&pos)
            .or_else(|| self.crossings.get(&pos))
            .copied()
            .unwrap_or(0)
    }

    pub fn crossing_count(&self) -> usize {
        self.crossings.len()
    }

    pub fn split_all(&mut self, mut segments: Vec<Segment>) -> Vec<Segment> {
        for _ in 0..MAX_SPLIT_PASSES {
            let (next, changed) = self.split_pass(&segments);
            segments = next;
            if !changed {
                return segments;
            }
        }
        warn!(
            passes = MAX_SPLIT_PASSES,
            segments = segments.len(),
            "Edge splitting did not settle; result may contain touching edges"
        );
        segments
    }

    fn split_pass(&mut self, segments: &[Segment]) -> (Vec<Segment>, bool) {
        let n = segments.len();
        let mut cuts: Vec<Vec<Pos>> = vec![Vec::new(); n];

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| segments[i].x_range().0);

        for (k, &i) in order.iter().enumerate() {
            let si = &segments[i];
            let (_, max_x) = si.x_range();
            let (iy0, iy1) = si.y_range();
            for &j in &order[k + 1..] {
                let sj = &segments[j];
                if sj.x_range().0 > max_x {
                    break;
                }
                let (jy0, jy1) = sj.y_range();
                if jy0 > iy1 || jy1 < iy0 {
                    continue;
                }
                self.intersect_pair(si, sj, i, j, &mut cuts);
            }
        }

        let mut changed = false;
        let mut out = Vec::with_capacity(n);
        for (seg, mut pts) in segments.iter().zip(cuts) {
            let a = seg.a.pos();
            let b = seg.b.pos();
            pts.retain(|p| *p != a && *p != b);
            if pts.is_empty() {
                out.push(*seg);
                continue;
            }
            changed = true;

            let dx = (b.0 - a.0) as i128;
            let dy = (b.1 - a.1) as i128;
            pts.sort_by_key(|p| {
                let t = (p.0 - a.0) as i128 * dx + (p.1 - a.1) as i128 * dy;
                (t, p.0, p.1)
            });
            pts.dedup();

            let mut prev = seg.a;
            for p in pts {
                let ip = IntPoint::with_z(p.0, p.1, self.tag_at(p));
                out.push(Segment {
                    a: prev,
                    b: ip,
                    owner: seg.owner,
                });
                prev = ip;
            }
            out.push(Segment {
                a: prev,
                b: seg.b,
                owner: seg.owner,
            });
        }
        (out, changed)
    }

    fn intersect_pair(
        &mut self,
        si: &Segment,
        sj: &Segment,
        i: usize,
        j: usize,
        cuts: &mut [Vec<Pos>],
    ) {
        let (a1x, a1y) = (si.a.x as i128, si.a.y as i128);
        let (rx, ry) = ((si.b.x - si.a.x) as i128, (si.b.y - si.a.y) as i128);
        let (a2x, a2y) = (sj.a.x as i128, sj.a.y as i128);
        let (sx, sy) = ((sj.b.x - sj.a.x) as i128, (sj.b.y - sj.a.y) as i128);
        let (qx, qy) = (a2x - a1x, a2y - a1y);

        let denom = cross(rx, ry, sx, sy);
        if denom == 0 {
            if cross(qx, qy, rx, ry) != 0 {
                return;
            }
            // Collinear: each edge is cut where the other's endpoints fall strictly inside it.
            let rr = rx * rx + ry * ry;
            for p in [sj.a, sj.b] {
                let t = (p.x as i128 - a1x) * rx + (p.y as i128 - a1y) * ry;
                if t > 0 && t < rr {
                    cuts[i].push(p.pos());
                }
            }
            let ss = sx * sx + sy * sy;
            for p in [si.a, si.b] {
                let u = (p.x as i128 - a2x) * sx + (p.y as i128 - a2y) * sy;
                if u > 0 && u < ss {
                    cuts[j].push(p.pos());
                }
            }
            return;
        }

        let mut t = cross(qx, qy, sx, sy);
        let mut u = cross(qx, qy, rx, ry);
        let mut d = denom;
        if d < 0 {
            t = -t;
            u = -u;
            d = -d;
        }
        if t < 0 || t > d || u < 0 || u > d {
            return;
        }

        let point = if t == 0 {
            si.a.pos()
        } else if t == d {
            si.b.pos()
        } else if u == 0 {
            sj.a.pos()
        } else if u == d {
            sj.b.pos()
        } else {
            let p = (
                si.a.x + div_round(rx * t, d),
                si.a.y + div_round(ry * t, d),
            );
            if !self.originals.contains_key(&p) && !self.crossings.contains_key(&p) {
                let ix = ZIntersection {
                    e1_start: si.a,
                    e1_end: si.b,
                    e2_start: sj.a,
                    e2_end: sj.b,
                    point: IntPoint::new(p.0, p.1),
                };
                let z = (self.callback)(&ix);
                self.crossings.insert(p, z);
            }
            p
        };

        cuts[i].push(point);
        cuts[j].push(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefer_lower_curve_id;

    fn seg(ax: i64, ay: i64, bx: i64, by: i64) -> Segment {
        Segment {
            a: IntPoint::new(ax, ay),
            b: IntPoint::new(bx, by),
            owner: Owner::Subject,
        }
    }

    #[test]
    fn test_div_round() {
        assert_eq!(div_round(7, 2), 4);
        assert_eq!(div_round(5, 3), 2);
        assert_eq!(div_round(-7, 2), -3);
        assert_eq!(div_round(-5, 3), -2);
    }

    #[test]
    fn test_proper_crossing_splits_both() {
        let segs = vec![seg(0, 0, 10, 10), seg(0, 10, 10, 0)];
        let mut splitter = Splitter::new(&segs, &prefer_lower_curve_id);
        let out = splitter.split_all(segs);
        assert_eq!(out.len(), 4);
        assert!(out.iter().any(|s| s.b.pos() == (5, 5)));
        assert_eq!(splitter.crossing_count(), 1);
    }

    #[test]
    fn test_t_junction_and_overlap() {
        // Second edge starts on the first; third overlaps the first.
        let mut overlap = seg(6, 0, 20, 0);
        overlap.owner = Owner::Clip;
        let segs = vec![seg(0, 0, 10, 0), seg(4, 0, 4, 5), overlap];
        let mut splitter = Splitter::new(&segs, &prefer_lower_curve_id);
        let out = splitter.split_all(segs);
        let mut first: Vec<_> = out
            .iter()
            .filter(|s| s.owner == Owner::Subject && s.a.y == 0 && s.b.y == 0)
            .map(|s| (s.a.x, s.b.x))
            .collect();
        first.sort();
        assert_eq!(first, vec![(0, 4), (4, 6), (6, 10)]);
        assert!(out
            .iter()
            .any(|s| s.owner == Owner::Clip && s.a.x == 10 && s.b.x == 20));
        assert_eq!(splitter.crossing_count(), 0);
    }

    #[test]
    fn test_merge_tag_prefers_lower_curve() {
        let t = |c, s| TaggedPoint::tagged(0.0, 0.0, c, s).pack_tag();
        assert_eq!(merge_tag(t(3, 0), t(2, 9)), t(2, 9));
        assert_eq!(merge_tag(0, t(5, 1)), t(5, 1));
        assert_eq!(merge_tag(t(2, 4), t(2, 1)), t(2, 1));
    }
}
