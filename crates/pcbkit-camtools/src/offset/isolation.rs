use tracing::{debug, warn};

use pcbkit_clipper::{BooleanEngine, FillRule, Scaler};
use pcbkit_core::{Contour, PathShape, Primitive, Properties, Shape};

use super::polyline::{offset_polyline, polyline_to_contour, primitive_polylines, signed_offset_for};
use super::{IsolationSettings, OffsetPass, OperationKind};
use crate::error::CamToolResult;
use crate::fusion::{nest, split_rings};

/// Isolation rings around fused copper.
///
/// Pass `p` runs at `tool_radius + p * stepover` outside the copper edge,
/// each measured from the original boundary. Holes in the copper are offset
/// into the hole.
pub fn isolation_passes<E: BooleanEngine>(
    fused: &[Primitive],
    settings: &IsolationSettings,
    engine: &E,
    scaler: &Scaler,
) -> CamToolResult<Vec<OffsetPass>> {
    settings.validate()?;
    let sources: Vec<_> = fused
        .iter()
        .map(|p| (primitive_polylines(p), p.properties.source.clone()))
        .collect();

    let mut passes = Vec::with_capacity(settings.passes);
    for index in 0..settings.passes {
        let distance = settings.pass_distance(index);
        let mut contours: Vec<Contour> = Vec::new();
        for (plines, source) in &sources {
            for (pline, is_hole) in plines {
                let offsets = offset_polyline(pline, signed_offset_for(pline, distance, *is_hole));
                if offsets.is_empty() {
                    warn!(pass = index, distance, "Offset produced no geometry; skipping contour");
                }
                for off in offsets {
                    let mut contour = polyline_to_contour(&off, *is_hole, source);
                    contour.orient(*is_hole);
                    contours.push(contour);
                }
            }
        }

        let primitives = if settings.combine {
            combine_rings(contours, engine, scaler)?
        } else {
            contours
                .into_iter()
                .map(|c| {
                    Primitive::new(
                        Shape::Path(PathShape {
                            contours: vec![c],
                            closed: true,
                        }),
                        Properties::dark(),
                    )
                })
                .collect()
        };
        debug!(pass = index, distance, paths = primitives.len(), "Isolation pass");
        passes.push(OffsetPass {
            pass_index: index,
            distance,
            combined: settings.combine,
            kind: OperationKind::Isolation,
            tool_diameter: settings.tool_diameter,
            primitives,
        });
    }
    Ok(passes)
}

/// Unions the rings of one pass so overlapping isolation paths merge.
fn combine_rings<E: BooleanEngine>(
    contours: Vec<Contour>,
    engine: &E,
    scaler: &Scaler,
) -> CamToolResult<Vec<Primitive>> {
    if contours.is_empty() {
        return Ok(Vec::new());
    }
    let paths = contours
        .iter()
        .map(|c| scaler.path_to_int(&c.points))
        .collect::<Result<Vec<_>, _>>()?;
    let rings = engine.union(&paths, &[], FillRule::NonZero, false)?;
    let (outers, holes) = split_rings(rings, scaler);
    let (primitives, orphans) = nest(outers, holes);
    if orphans > 0 {
        warn!(orphans, "Combined isolation left holes outside any ring");
    }
    Ok(primitives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbkit_clipper::FixedPointEngine;
    use pcbkit_core::Point2;

    fn square(x: f64, size: f64) -> Primitive {
        Primitive::polygon(&[
            Point2::new(x, 0.0),
            Point2::new(x + size, 0.0),
            Point2::new(x + size, size),
            Point2::new(x, size),
        ])
    }

    #[test]
    fn test_single_pass_grows_square() {
        let settings = IsolationSettings {
            tool_diameter: 1.0,
            passes: 1,
            overlap_percent: 0.0,
            combine: false,
        };
        let passes = isolation_passes(
            &[square(0.0, 10.0)],
            &settings,
            &FixedPointEngine::new(),
            &Scaler::default(),
        )
        .unwrap();
        assert_eq!(passes.len(), 1);
        assert!((passes[0].distance - 0.5).abs() < 1e-12);
        let bbox = passes[0].primitives[0].shape.bounding_box();
        assert!((bbox.min_x + 0.5).abs() < 1e-6);
        assert!((bbox.max_x - 10.5).abs() < 1e-6);
    }

    #[test]
    fn test_combined_rings_merge() {
        let settings = IsolationSettings {
            tool_diameter: 2.0,
            passes: 1,
            overlap_percent: 0.0,
            combine: true,
        };
        // Squares 1 mm apart; 1 mm growth on each side makes them overlap.
        let passes = isolation_passes(
            &[square(0.0, 5.0), square(6.0, 5.0)],
            &settings,
            &FixedPointEngine::new(),
            &Scaler::default(),
        )
        .unwrap();
        assert_eq!(passes[0].primitives.len(), 1);
        assert!(passes[0].combined);
    }
}
