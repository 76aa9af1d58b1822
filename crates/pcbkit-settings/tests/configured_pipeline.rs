use pcbkit_camtools::{cutout_passes, isolation_passes, Pipeline};
use pcbkit_clipper::{FixedPointEngine, Scaler};
use pcbkit_core::{Point2, Polarity, Primitive};
use pcbkit_settings::Config;
use tempfile::TempDir;

fn board() -> Vec<Primitive> {
    vec![
        Primitive::circle(Point2::new(2.0, 2.0), 0.8),
        Primitive::stroke(&[Point2::new(2.0, 2.0), Point2::new(12.0, 2.0)], 0.3),
        Primitive::circle(Point2::new(12.0, 2.0), 0.8),
        Primitive::circle(Point2::new(2.0, 2.0), 0.3).with_polarity(Polarity::Clear),
        Primitive::circle(Point2::new(12.0, 2.0), 0.3).with_polarity(Polarity::Clear),
    ]
}

#[test]
fn test_primitives_json_to_toolpaths() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("pcbkit.toml");
    let mut config = Config::default();
    config.isolation.passes = 2;
    config.save_to_file(&config_path).unwrap();
    let config = Config::load_from_file(&config_path).unwrap();

    let input = serde_json::to_string(&board()).unwrap();
    let primitives: Vec<Primitive> = serde_json::from_str(&input).unwrap();

    let result = Pipeline::run(&primitives, &config.pipeline_options());
    assert!(result.fused);
    assert_eq!(result.primitives.len(), 1);
    let stats = result.stats.as_ref().unwrap();
    assert_eq!(stats.hole_contours, 2);

    let passes = isolation_passes(
        &result.primitives,
        &config.isolation,
        &FixedPointEngine::new(),
        &Scaler::default(),
    )
    .unwrap();
    assert_eq!(passes.len(), 2);
    let plans = config.machine.plan_all(&passes);
    assert!(plans.iter().all(|p| p.cut_length() > 0.0));
}

#[test]
fn test_board_outline_cutout() {
    let outline = Primitive::rectangle(Point2::new(0.0, 0.0), 20.0, 10.0);
    let config = Config::default();
    let passes = cutout_passes(&[outline], &config.cutout).unwrap();
    let plan = config.machine.plan(&passes[0]);
    // Inward offset by 1 mm leaves an 18 x 8 rectangle; four 3 mm tabs remain uncut.
    assert!((plan.cut_length() - (52.0 - 12.0)).abs() < 1e-6);
}
