use pcbkit_camtools::{FusionOptions, GeometryProcessor};
use pcbkit_core::{ContourSegment, Point2, Polarity, Primitive, ReconstructedArc, Shape};

fn arcs(prim: &Primitive) -> Vec<ReconstructedArc> {
    prim.as_path()
        .map(|p| {
            p.contours
                .iter()
                .flat_map(|c| c.segments.iter())
                .filter_map(|s| match s {
                    ContourSegment::Arc(a) => Some(a.clone()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn test_circle_union_itself_round_trips() {
    let circle = Primitive::circle(Point2::new(3.0, -2.0), 10.0);
    let mut processor = GeometryProcessor::new();
    let out = processor
        .fuse(&[circle.clone(), circle], &FusionOptions::default())
        .unwrap();

    assert_eq!(processor.registry().len(), 1);
    assert_eq!(out.primitives.len(), 1);
    let prim = &out.primitives[0];
    let Shape::Circle(c) = &prim.shape else {
        panic!("expected a circle, got {:?}", prim.shape.kind_name());
    };
    assert!(c.center.distance_to(&Point2::new(3.0, -2.0)) < 1e-3);
    assert!((c.radius - 10.0).abs() < 1e-3);

    let info = prim.properties.reconstruction.unwrap();
    assert!(info.full_circle);
    assert!((info.coverage - 1.0).abs() < 1e-9);
    assert!(prim.properties.reconstructed);
}

#[test]
fn test_quarter_removed_gives_three_quarter_arc() {
    let circle = Primitive::circle(Point2::new(0.0, 0.0), 10.0);
    let notch = Primitive::rectangle(Point2::new(0.0, 0.0), 20.0, 20.0).with_polarity(Polarity::Clear);
    let mut processor = GeometryProcessor::new();
    let out = processor
        .fuse(&[circle, notch], &FusionOptions::default())
        .unwrap();

    assert_eq!(out.primitives.len(), 1);
    let found = arcs(&out.primitives[0]);
    assert_eq!(found.len(), 1);
    let arc = &found[0];
    assert!(!arc.full_circle);
    assert!((arc.arc.span().to_degrees() - 270.0).abs() < 1.0);
    assert!((arc.coverage - 0.75).abs() < 0.02);
    assert!((arc.arc.radius - 10.0).abs() < 1e-3);
    // Outer contour runs counter-clockwise, from 90 degrees round to 0.
    assert!(!arc.arc.clockwise);
    assert!((arc.arc.start_angle.to_degrees() - 90.0).abs() < 1.0);

    let stats = out.stats.reconstruction.unwrap();
    assert_eq!(stats.partial_arcs, 1);
    assert_eq!(stats.full_circles, 0);
}

#[test]
fn test_two_chords_split_into_two_arcs() {
    let circle = Primitive::circle(Point2::new(0.0, 0.0), 10.0);
    let right = Primitive::rectangle(Point2::new(8.0, -20.0), 20.0, 40.0).with_polarity(Polarity::Clear);
    let left = Primitive::rectangle(Point2::new(-28.0, -20.0), 20.0, 40.0).with_polarity(Polarity::Clear);
    let mut processor = GeometryProcessor::new();
    let out = processor
        .fuse(&[circle, right, left], &FusionOptions::default())
        .unwrap();

    let found = arcs(&out.primitives[0]);
    assert_eq!(found.len(), 2);
    for arc in &found {
        // Each side keeps the span between the chords at x = -8 and x = 8.
        let expected = 180.0 - 2.0 * (8.0f64 / 10.0).acos().to_degrees();
        assert!((arc.arc.span().to_degrees() - expected).abs() < 2.0);
    }
    let stats = out.stats.reconstruction.unwrap();
    assert_eq!(stats.multi_gap_splits, 1);
}

#[test]
fn test_reconstruction_can_be_disabled() {
    let circle = Primitive::circle(Point2::new(0.0, 0.0), 2.0);
    let mut processor = GeometryProcessor::new();
    let out = processor
        .fuse(
            &[circle],
            &FusionOptions {
                enable_arc_reconstruction: false,
            },
        )
        .unwrap();
    assert!(out.stats.reconstruction.is_none());
    let path = out.primitives[0].as_path().unwrap();
    assert!(path.contours[0].segments.is_empty());
    assert!(path.contours[0].points.iter().all(|p| p.curve_id == 1));
}
