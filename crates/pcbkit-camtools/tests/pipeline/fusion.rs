use pcbkit_camtools::{FusionOptions, GeometryProcessor};
use pcbkit_core::{is_clockwise, Point2, Polarity, Primitive, Shape};
use proptest::prelude::*;

fn no_reconstruction() -> FusionOptions {
    FusionOptions {
        enable_arc_reconstruction: false,
    }
}

#[test]
fn test_noop_fusion_keeps_polygon() {
    let outline = [
        Point2::new(0.0, 0.0),
        Point2::new(12.0, 0.0),
        Point2::new(12.0, 3.0),
        Point2::new(5.0, 3.0),
        Point2::new(5.0, 8.0),
        Point2::new(0.0, 8.0),
    ];
    let mut processor = GeometryProcessor::new();
    let out = processor
        .fuse(&[Primitive::polygon(&outline)], &no_reconstruction())
        .unwrap();
    assert_eq!(out.primitives.len(), 1);

    let path = out.primitives[0].as_path().unwrap();
    let fused = path.contours[0].positions();
    assert!((path.area() - (36.0 + 25.0)).abs() < 1e-9);
    assert_eq!(fused.len(), outline.len());
    for p in &outline {
        assert!(
            fused.iter().any(|q| q.distance_to(p) < 1e-9),
            "vertex {p:?} missing after fusion"
        );
    }
}

#[test]
fn test_pad_with_drill_hole() {
    let pad = Primitive::circle(Point2::new(0.0, 0.0), 1.0);
    let hole = Primitive::circle(Point2::new(0.0, 0.0), 0.4).with_polarity(Polarity::Clear);
    let mut processor = GeometryProcessor::new();
    let out = processor
        .fuse(&[pad, hole], &FusionOptions::default())
        .unwrap();
    assert_eq!(out.primitives.len(), 1);
    let path = out.primitives[0].as_path().unwrap();
    assert_eq!(path.contours.len(), 2);
    let stats = out.stats.reconstruction.unwrap();
    // Pad outline and drill hole are both complete circles.
    assert_eq!(stats.full_circles, 2);
    assert!(path.contours.iter().all(|c| c.segments.len() == 1));
    assert!(out.primitives[0].properties.reconstructed);
}

#[test]
fn test_stroked_trace_joins_pad() {
    let trace = Primitive::stroke(&[Point2::new(0.0, 0.0), Point2::new(10.0, 0.0)], 0.5);
    let pad = Primitive::rectangle(Point2::new(9.0, -1.0), 2.0, 2.0);
    let mut processor = GeometryProcessor::new();
    let out = processor
        .fuse(&[trace, pad], &FusionOptions::default())
        .unwrap();
    assert_eq!(out.primitives.len(), 1);
    assert!(matches!(out.primitives[0].shape, Shape::Path(_)));
}

proptest! {
    #[test]
    fn winding_matches_hole_flag(
        xs in prop::collection::vec((-20.0f64..20.0, -20.0f64..20.0, 0.5f64..6.0, any::<bool>()), 1..6)
    ) {
        let prims: Vec<Primitive> = xs
            .iter()
            .map(|(x, y, size, clear)| {
                let p = Primitive::rectangle(Point2::new(*x, *y), *size, *size * 0.7);
                if *clear { p.with_polarity(Polarity::Clear) } else { p }
            })
            .collect();
        let mut processor = GeometryProcessor::new();
        let out = processor.fuse(&prims, &no_reconstruction()).unwrap();
        for prim in &out.primitives {
            let path = prim.as_path().unwrap();
            prop_assert!(!path.contours[0].is_hole);
            for contour in &path.contours {
                prop_assert_eq!(is_clockwise(&contour.points), contour.is_hole);
            }
        }
    }
}
