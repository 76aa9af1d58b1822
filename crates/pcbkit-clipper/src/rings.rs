//! Linking kept boundary edges into closed rings.

use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::warn;

use crate::intersect::{cross, Pos};

fn dir(from: Pos, to: Pos) -> (i128, i128) {
    ((to.0 - from.0) as i128, (to.1 - from.1) as i128)
}

/// Orders `a` and `b` by counter-clockwise angle measured from `reference`.
fn ccw_cmp(reference: (i128, i128), a: (i128, i128), b: (i128, i128)) -> Ordering {
    let half = |v: (i128, i128)| {
        let c = cross(reference.0, reference.1, v.0, v.1);
        let d = reference.0 * v.0 + reference.1 * v.1;
        if c > 0 || (c == 0 && d > 0) {
            0u8
        } else {
            1u8
        }
    };
    half(a).cmp(&half(b)).then_with(|| {
        let c = cross(a.0, a.1, b.0, b.1);
        0.cmp(&c)
    })
}

/// Follows directed edges into closed rings, keeping the filled region on
/// the left.
///
/// At a vertex with several outgoing edges the walk takes the first one
/// clockwise from the edge it arrived on, so rings touching at a single
/// vertex come out as separate rings. A walk that dead-ends is dropped.
pub(crate) fn link_rings(edges: &[(Pos, Pos)]) -> Vec<Vec<Pos>> {
    let mut outgoing: HashMap<Pos, Vec<usize>> = HashMap::new();
    for (k, (from, _)) in edges.iter().enumerate() {
        outgoing.entry(*from).or_default().push(k);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut ring = vec![edges[start].0];
        let mut current = start;

        let closed = loop {
            let (from, at) = edges[current];
            let back = dir(at, from);
            let next = outgoing.get(&at).and_then(|candidates| {
                candidates
                    .iter()
                    .copied()
                    .filter(|&k| k == start || !used[k])
                    .max_by(|&x, &y| {
                        ccw_cmp(back, dir(edges[x].0, edges[x].1), dir(edges[y].0, edges[y].1))
                    })
            });
            match next {
                None => break false,
                Some(k) if k == start => break true,
                Some(k) => {
                    used[k] = true;
                    ring.push(at);
                    current = k;
                }
            }
        };

        if closed {
            rings.push(ring);
        } else {
            warn!(
                vertices = ring.len(),
                start = ?edges[start].0,
                "Dropping boundary walk that did not close"
            );
        }
    }
    rings
}

/// Removes vertices lying on a straight line between their neighbours,
/// including zero-width spikes.
pub(crate) fn remove_collinear(ring: &mut Vec<Pos>) {
    let mut i = 0;
    let mut stale = 0;
    while ring.len() >= 3 && stale < ring.len() {
        let n = ring.len();
        let idx = i % n;
        let prev = ring[(idx + n - 1) % n];
        let cur = ring[idx];
        let next = ring[(idx + 1) % n];
        let (ax, ay) = dir(prev, cur);
        let (bx, by) = dir(cur, next);
        if cross(ax, ay, bx, by) == 0 {
            ring.remove(idx);
            stale = 0;
            i = idx;
        } else {
            i = idx + 1;
            stale += 1;
        }
    }
}

/// Twice the signed area; positive for counter-clockwise rings.
pub(crate) fn twice_area(ring: &[Pos]) -> i128 {
    let n = ring.len();
    let mut sum = 0i128;
    for k in 0..n {
        let (x1, y1) = ring[k];
        let (x2, y2) = ring[(k + 1) % n];
        sum += x1 as i128 * y2 as i128 - x2 as i128 * y1 as i128;
    }
    sum
}
