use pcbkit_camtools::{
    cutout_passes, insert_tabs, isolation_passes, CutoutSettings, FusionOptions,
    GeometryProcessor, IsolationSettings, MotionKind, OperationKind, ToolpathPlanner,
};
use pcbkit_clipper::{FixedPointEngine, Scaler};
use pcbkit_core::{Point2, Primitive};

fn square(size: f64) -> Vec<Point2> {
    vec![
        Point2::new(0.0, 0.0),
        Point2::new(size, 0.0),
        Point2::new(size, size),
        Point2::new(0.0, size),
    ]
}

#[test]
fn test_isolation_pass_spacing() {
    let mut processor = GeometryProcessor::new();
    let fused = processor
        .fuse(&[Primitive::polygon(&square(10.0))], &FusionOptions::default())
        .unwrap();

    let settings = IsolationSettings {
        tool_diameter: 0.2,
        passes: 3,
        overlap_percent: 50.0,
        combine: false,
    };
    let passes = isolation_passes(
        &fused.primitives,
        &settings,
        &FixedPointEngine::new(),
        &Scaler::default(),
    )
    .unwrap();

    assert_eq!(passes.len(), 3);
    for (pass, expected) in passes.iter().zip([0.1, 0.2, 0.3]) {
        assert_eq!(pass.kind, OperationKind::Isolation);
        assert!((pass.distance - expected).abs() < 1e-12);
        // Each ring sits `expected` outside every straight edge of the square.
        let bbox = pass.primitives[0].shape.bounding_box();
        assert!((bbox.min_x + expected).abs() < 1e-6);
        assert!((bbox.max_y - (10.0 + expected)).abs() < 1e-6);
    }
}

#[test]
fn test_isolation_of_reconstructed_circle_stays_circular() {
    let mut processor = GeometryProcessor::new();
    let fused = processor
        .fuse(
            &[Primitive::circle(Point2::new(0.0, 0.0), 1.0)],
            &FusionOptions::default(),
        )
        .unwrap();
    let passes = isolation_passes(
        &fused.primitives,
        &IsolationSettings {
            tool_diameter: 0.4,
            passes: 1,
            overlap_percent: 0.0,
            combine: false,
        },
        &FixedPointEngine::new(),
        &Scaler::default(),
    )
    .unwrap();

    let plan = ToolpathPlanner::default().plan(&passes[0]);
    let arc_moves = plan
        .commands
        .iter()
        .filter(|c| matches!(c.kind, MotionKind::ArcCw | MotionKind::ArcCcw))
        .count();
    assert!(arc_moves >= 1);
    assert!(!plan.commands.iter().any(|c| c.kind == MotionKind::Linear));
    let circumference = 2.0 * std::f64::consts::PI * 1.2;
    assert!((plan.cut_length() - circumference).abs() < 1e-6);
}

#[test]
fn test_tabs_on_hundred_mm_perimeter() {
    let tabbed = insert_tabs(&square(25.0), 4, 2.0);
    assert!((tabbed.length - 100.0).abs() < 1e-12);
    let starts: Vec<f64> = tabbed.tabs.iter().map(|t| t.start).collect();
    assert_eq!(starts, vec![25.0, 50.0, 75.0, 100.0]);
    for tab in &tabbed.tabs {
        assert!((tab.end - tab.start - 2.0).abs() < 1e-12);
    }
    assert_eq!(tabbed.cuts.len(), 4);
    let cut_total: f64 = tabbed
        .cuts
        .iter()
        .map(|c| c.windows(2).map(|w| w[0].distance_to(&w[1])).sum::<f64>())
        .sum();
    assert!((cut_total - 92.0).abs() < 1e-9);
}

#[test]
fn test_cutout_with_tabs_plans_separate_cuts() {
    let outline = Primitive::polygon(&square(50.0));
    let passes = cutout_passes(
        &[outline],
        &CutoutSettings {
            tool_diameter: 2.0,
            tabs: 4,
            tab_width: 3.0,
        },
    )
    .unwrap();
    assert_eq!(passes[0].primitives.len(), 4);
    let plan = ToolpathPlanner::default().plan(&passes[0]);
    let plunges = plan
        .commands
        .iter()
        .filter(|c| c.kind == MotionKind::Plunge)
        .count();
    assert_eq!(plunges, 4);
    // Inner perimeter 4 * 48 minus four 3 mm tabs.
    assert!((plan.cut_length() - (192.0 - 12.0)).abs() < 1e-6);
}

#[test]
fn test_rectangle_outline_cutout() {
    let passes = cutout_passes(
        &[Primitive::rectangle(Point2::new(0.0, 0.0), 50.0, 30.0)],
        &CutoutSettings::default(),
    )
    .unwrap();
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0].kind, OperationKind::Cutout);
    assert!(!passes[0].primitives.is_empty());
    let plan = ToolpathPlanner::default().plan(&passes[0]);
    let untabbed = cutout_passes(
        &[Primitive::polygon(&[
            Point2::new(0.0, 0.0),
            Point2::new(50.0, 0.0),
            Point2::new(50.0, 30.0),
            Point2::new(0.0, 30.0),
        ])],
        &CutoutSettings::default(),
    )
    .unwrap();
    let expected = ToolpathPlanner::default().plan(&untabbed[0]).cut_length();
    assert!(plan.cut_length() > 0.0);
    assert!((plan.cut_length() - expected).abs() < 1e-6);
}
