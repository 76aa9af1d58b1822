use pcbkit_camtools::{FusionOptions, PipelineOptions, PipelineScheduler, PipelineStatus};
use pcbkit_core::{Point2, Primitive};

fn options(reconstruct: bool) -> PipelineOptions {
    PipelineOptions {
        fusion: FusionOptions {
            enable_arc_reconstruction: reconstruct,
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_burst_of_requests_coalesces() {
    let scheduler = PipelineScheduler::new(vec![
        Primitive::circle(Point2::new(0.0, 0.0), 1.0),
        Primitive::rectangle(Point2::new(0.5, -0.25), 3.0, 0.5),
    ]);

    // The current-thread runtime does not start the first run until we await,
    // so every request after the first lands in the single queued slot.
    for _ in 0..4 {
        scheduler.request(options(true));
    }
    scheduler.request(options(false));
    scheduler.wait_idle().await;

    assert_eq!(scheduler.runs_started(), 2);
    let status = scheduler.status();
    let PipelineStatus::Completed { result } = status else {
        panic!("expected a completed run, got {status:?}");
    };
    assert!(result.fused);
    assert_eq!(result.primitives.len(), 1);
    // The queued run used the last options given.
    assert!(result.stats.as_ref().unwrap().reconstruction.is_none());
}

#[tokio::test]
async fn test_new_primitives_apply_to_next_run() {
    let scheduler = PipelineScheduler::new(vec![Primitive::rectangle(
        Point2::new(0.0, 0.0),
        1.0,
        1.0,
    )]);
    scheduler.request(PipelineOptions::default());
    scheduler.wait_idle().await;

    scheduler.set_primitives(vec![
        Primitive::rectangle(Point2::new(0.0, 0.0), 1.0, 1.0),
        Primitive::rectangle(Point2::new(5.0, 0.0), 1.0, 1.0),
    ]);
    scheduler.request(PipelineOptions::default());
    scheduler.wait_idle().await;

    assert_eq!(scheduler.runs_started(), 2);
    let result = scheduler.status().result().cloned().unwrap();
    assert_eq!(result.primitives.len(), 2);
}

#[tokio::test]
async fn test_overflow_reports_fallback() {
    let scheduler = PipelineScheduler::new(vec![Primitive::circle(Point2::new(1.0e12, 0.0), 1.0)]);
    let mut rx = scheduler.subscribe();
    scheduler.request(PipelineOptions::default());
    scheduler.wait_idle().await;

    let status = rx.borrow_and_update().clone();
    match status {
        PipelineStatus::Fallback { message, result } => {
            assert!(message.contains("Fusion failed"));
            assert!(!result.fused);
        }
        other => panic!("expected fallback, got {other:?}"),
    }
}
