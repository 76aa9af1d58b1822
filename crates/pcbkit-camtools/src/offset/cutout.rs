use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use pcbkit_core::{PathShape, Point2, Primitive, Properties, Shape};

use super::polyline::{offset_polyline, polyline_to_contour, primitive_polylines, signed_offset_for};
use super::{CutoutSettings, OffsetPass, OperationKind};
use crate::error::CamToolResult;

/// A holding tab, as arc-length positions along the closed path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TabSpan {
    pub start: f64,
    pub end: f64,
}

/// A closed path broken into cut pieces around its tabs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabbedPath {
    /// Open polylines the tool cuts, in path order.
    pub cuts: Vec<Vec<Point2>>,
    pub tabs: Vec<TabSpan>,
    pub length: f64,
}

fn perimeter(ring: &[Point2]) -> f64 {
    let n = ring.len();
    (0..n).map(|i| ring[i].distance_to(&ring[(i + 1) % n])).sum()
}

/// Points of the closed `ring` between arc lengths `from` and `to`
/// (`from <= to`, both may exceed one lap).
fn slice(ring: &[Point2], cumulative: &[f64], length: f64, from: f64, to: f64) -> Vec<Point2> {
    let n = ring.len();
    let at = |s: f64| -> Point2 {
        let lap = (s / length).floor();
        let local = s - lap * length;
        let i = cumulative.partition_point(|c| *c <= local).saturating_sub(1).min(n - 1);
        let seg = cumulative[i + 1] - cumulative[i];
        let t = if seg > 0.0 { (local - cumulative[i]) / seg } else { 0.0 };
        ring[i].lerp(&ring[(i + 1) % n], t)
    };

    let mut out = vec![at(from)];
    // Vertices strictly between the two ends, walking laps as needed.
    let mut lap = (from / length).floor();
    loop {
        for (i, c) in cumulative.iter().enumerate().take(n) {
            let s = lap * length + c;
            if s > from && s < to {
                out.push(ring[i]);
            }
        }
        lap += 1.0;
        if lap * length >= to {
            break;
        }
    }
    out.push(at(to));
    out
}

/// Breaks a closed ring into cut pieces separated by `tabs` tabs of
/// `tab_width` each.
///
/// Tab `k` starts at arc length `(k + 1) * L / tabs` (wrapping past the start)
/// and spans exactly `tab_width`. With no tabs, or when the tabs would not
/// fit, the whole ring is one closed cut.
pub fn insert_tabs(ring: &[Point2], tabs: usize, tab_width: f64) -> TabbedPath {
    let n = ring.len();
    if n < 2 {
        return TabbedPath::default();
    }
    let length = perimeter(ring);
    let mut cumulative = Vec::with_capacity(n + 1);
    let mut acc = 0.0;
    cumulative.push(0.0);
    for i in 0..n {
        acc += ring[i].distance_to(&ring[(i + 1) % n]);
        cumulative.push(acc);
    }

    let whole = || {
        let mut closed = ring.to_vec();
        closed.push(ring[0]);
        TabbedPath {
            cuts: vec![closed],
            tabs: Vec::new(),
            length,
        }
    };
    if tabs == 0 {
        return whole();
    }
    if tab_width * tabs as f64 >= length {
        warn!(tabs, tab_width, length, "Tabs do not fit on the path; cutting without tabs");
        return whole();
    }

    let spacing = length / tabs as f64;
    let spans: Vec<TabSpan> = (0..tabs)
        .map(|k| {
            let start = (k + 1) as f64 * spacing;
            TabSpan {
                start,
                end: start + tab_width,
            }
        })
        .collect();

    let cuts = (0..tabs)
        .map(|k| {
            let from = spans[k].end;
            let to = if k + 1 < tabs {
                spans[k + 1].start
            } else {
                spans[0].start + length
            };
            slice(ring, &cumulative, length, from, to)
        })
        .collect();

    TabbedPath {
        cuts,
        tabs: spans,
        length,
    }
}

/// Board cutout: every outline ring offset into its own interior by the tool
/// radius, then split around holding tabs.
pub fn cutout_passes(outline: &[Primitive], settings: &CutoutSettings) -> CamToolResult<Vec<OffsetPass>> {
    settings.validate()?;
    let radius = settings.tool_diameter / 2.0;

    let mut primitives = Vec::new();
    for prim in outline {
        for (pline, is_hole) in primitive_polylines(prim) {
            let offsets = offset_polyline(&pline, signed_offset_for(&pline, radius, true));
            if offsets.is_empty() {
                warn!(radius, "Cutout offset produced no geometry; skipping contour");
            }
            for off in offsets {
                let ring = polyline_to_contour(&off, is_hole, &prim.properties.source).positions();
                let tabbed = insert_tabs(&ring, settings.tabs, settings.tab_width);
                debug!(cuts = tabbed.cuts.len(), length = tabbed.length, "Cutout path");
                primitives.extend(tabbed.cuts.into_iter().map(|cut| {
                    Primitive::new(
                        Shape::Path(PathShape::from_points(&cut, false)),
                        Properties::default().with_source(prim.properties.source.clone()),
                    )
                }));
            }
        }
    }

    Ok(vec![OffsetPass {
        pass_index: 0,
        distance: -radius,
        combined: false,
        kind: OperationKind::Cutout,
        tool_diameter: settings.tool_diameter,
        primitives,
    }])
}
