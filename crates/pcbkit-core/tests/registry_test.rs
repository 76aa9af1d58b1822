use pcbkit_core::{CurveDescriptor, CurveRegistry, Point2, SourceRef};
use proptest::prelude::*;

proptest! {
    #[test]
    fn register_is_idempotent(
        cx in -500.0f64..500.0,
        cy in -500.0f64..500.0,
        r in 0.01f64..100.0,
    ) {
        let mut registry = CurveRegistry::new();
        let first = registry.register(CurveDescriptor::circle(Point2::new(cx, cy), r));
        let second = registry.register(CurveDescriptor::circle(Point2::new(cx, cy), r));
        prop_assert!(first.is_some());
        prop_assert_eq!(first, second);
        prop_assert_eq!(registry.len(), 1);
    }

    #[test]
    fn arc_registration_is_idempotent(
        cx in -100.0f64..100.0,
        cy in -100.0f64..100.0,
        r in 0.05f64..50.0,
        start in 0.0f64..6.0,
        span in 0.1f64..3.0,
        clockwise in any::<bool>(),
    ) {
        let mut registry = CurveRegistry::new();
        let make = || CurveDescriptor::arc(Point2::new(cx, cy), r, start, start + span, clockwise);
        let a = registry.register(make());
        let b = registry.register(make().with_source(SourceRef::new("op-2")));
        prop_assert_eq!(a, b);
    }
}

#[test]
fn test_reregistration_keeps_first_descriptor() {
    let mut registry = CurveRegistry::new();
    let first = CurveDescriptor::circle(Point2::new(1.0, 1.0), 2.0)
        .with_source(SourceRef::new("pad-1"))
        .with_point_count(64);
    let id = registry.register(first).unwrap();
    let stored = registry.get(id).unwrap().clone();

    let again = registry.register(
        CurveDescriptor::circle(Point2::new(1.0, 1.0), 2.0)
            .with_source(SourceRef::new("pad-2"))
            .with_point_count(128),
    );
    assert_eq!(again, Some(id));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.get(id), Some(&stored));
    assert_eq!(stored.original_point_count, 64);
}

#[test]
fn test_angles_wrap_before_hashing() {
    let mut registry = CurveRegistry::new();
    let a = registry.register(CurveDescriptor::arc(
        Point2::default(),
        1.0,
        -std::f64::consts::FRAC_PI_2,
        0.0,
        false,
    ));
    let b = registry.register(CurveDescriptor::arc(
        Point2::default(),
        1.0,
        1.5 * std::f64::consts::PI,
        0.0,
        false,
    ));
    assert_eq!(a, b);
}
