//! Fusion pipeline and its background scheduler.
//!
//! [`Pipeline::run`] executes standardize, fuse and reconstruct synchronously
//! against a fresh registry. [`PipelineScheduler`] runs it off the caller's
//! thread: one run in flight, at most one queued, and bursts of requests
//! coalesce into the latest options.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use pcbkit_clipper::Scaler;
use pcbkit_core::Primitive;

use crate::error::CamToolError;
use crate::fusion::{FusionOptions, FusionStats, GeometryProcessor};
use crate::reconstruct::ReconstructionSettings;
use crate::standardize::TessellationSettings;

/// Everything that shapes one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub fusion: FusionOptions,
    pub tessellation: TessellationSettings,
    pub reconstruction: ReconstructionSettings,
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub primitives: Vec<Primitive>,
    /// False when fusion failed and `primitives` are the unfused inputs.
    pub fused: bool,
    pub stats: Option<FusionStats>,
    /// Status text for the user when the run fell back.
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Pipeline;

impl Pipeline {
    pub fn run(primitives: &[Primitive], options: &PipelineOptions) -> PipelineResult {
        Self::run_with_id(Uuid::new_v4(), primitives, options)
    }

    pub fn run_with_id(run_id: Uuid, primitives: &[Primitive], options: &PipelineOptions) -> PipelineResult {
        let started_at = Utc::now();
        let mut processor = GeometryProcessor::new()
            .with_scaler(Scaler::default())
            .with_tessellation(options.tessellation)
            .with_reconstruction(options.reconstruction);

        match processor.fuse(primitives, &options.fusion) {
            Ok(output) => {
                info!(%run_id, primitives = output.primitives.len(), "Pipeline run complete");
                PipelineResult {
                    run_id,
                    primitives: output.primitives,
                    fused: true,
                    stats: Some(output.stats),
                    message: None,
                    started_at,
                    finished_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!(%run_id, error = %e, "Fusion failed; falling back to unfused geometry");
                let message = if e.is_user_visible() {
                    format!("Fusion failed, showing unfused geometry: {e}")
                } else {
                    format!("Pipeline error: {e}")
                };
                PipelineResult {
                    run_id,
                    primitives: processor.standardize(primitives),
                    fused: false,
                    stats: None,
                    message: Some(message),
                    started_at,
                    finished_at: Utc::now(),
                }
            }
        }
    }
}

/// Published state of the scheduler.
#[derive(Debug, Clone, Default)]
pub enum PipelineStatus {
    #[default]
    Idle,
    Running {
        run_id: Uuid,
    },
    Completed {
        result: Arc<PipelineResult>,
    },
    Fallback {
        message: String,
        result: Arc<PipelineResult>,
    },
    Failed {
        run_id: Uuid,
        message: String,
    },
}

impl PipelineStatus {
    /// The result of the last finished run, fused or not.
    pub fn result(&self) -> Option<&Arc<PipelineResult>> {
        match self {
            PipelineStatus::Completed { result } | PipelineStatus::Fallback { result, .. } => {
                Some(result)
            }
            _ => None,
        }
    }
}

#[derive(Default)]
struct QueueState {
    running: bool,
    pending: Option<PipelineOptions>,
}

struct Shared {
    primitives: RwLock<Arc<Vec<Primitive>>>,
    queue: Mutex<QueueState>,
    status: watch::Sender<PipelineStatus>,
    busy: watch::Sender<bool>,
    runs: AtomicUsize,
}

/// Coalescing background runner for [`Pipeline`].
///
/// `request` must be called from within a tokio runtime.
#[derive(Clone)]
pub struct PipelineScheduler {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for PipelineScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.shared.queue.lock();
        f.debug_struct("PipelineScheduler")
            .field("running", &queue.running)
            .field("pending", &queue.pending.is_some())
            .field("runs", &self.shared.runs.load(Ordering::Relaxed))
            .finish()
    }
}

impl PipelineScheduler {
    pub fn new(primitives: Vec<Primitive>) -> Self {
        let (status, _) = watch::channel(PipelineStatus::Idle);
        let (busy, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                primitives: RwLock::new(Arc::new(primitives)),
                queue: Mutex::new(QueueState::default()),
                status,
                busy,
                runs: AtomicUsize::new(0),
            }),
        }
    }

    /// Replaces the input primitives; takes effect on the next run.
    pub fn set_primitives(&self, primitives: Vec<Primitive>) {
        *self.shared.primitives.write() = Arc::new(primitives);
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineStatus> {
        self.shared.status.subscribe()
    }

    pub fn status(&self) -> PipelineStatus {
        self.shared.status.borrow().clone()
    }

    /// Number of runs started so far.
    pub fn runs_started(&self) -> usize {
        self.shared.runs.load(Ordering::SeqCst)
    }

    /// Asks for a run with `options`. While a run is in flight the request
    /// replaces any queued one.
    pub fn request(&self, options: PipelineOptions) {
        {
            let mut queue = self.shared.queue.lock();
            if queue.running {
                if queue.pending.replace(options).is_some() {
                    debug!("Coalesced pipeline request into queued run");
                }
                return;
            }
            queue.running = true;
            self.shared.busy.send_replace(true);
        }
        let shared = Arc::clone(&self.shared);
        tokio::spawn(drive(shared, options));
    }

    /// Resolves once no run is in flight or queued.
    pub async fn wait_idle(&self) {
        let mut busy = self.shared.busy.subscribe();
        // The sender lives in `shared`, so the channel cannot close here.
        let _ = busy.wait_for(|running| !*running).await;
    }
}

/// Status for a finished blocking run.
fn settle(run_id: Uuid, joined: Result<PipelineResult, JoinError>) -> PipelineStatus {
    match joined {
        Ok(result) => match result.message.clone() {
            Some(message) if !result.fused => PipelineStatus::Fallback {
                message,
                result: Arc::new(result),
            },
            _ => PipelineStatus::Completed {
                result: Arc::new(result),
            },
        },
        Err(e) => {
            let err = CamToolError::TaskFailed(e.to_string());
            warn!(%run_id, error = %err, "Pipeline task failed");
            PipelineStatus::Failed {
                run_id,
                message: err.to_string(),
            }
        }
    }
}

async fn drive(shared: Arc<Shared>, first: PipelineOptions) {
    let mut next = Some(first);
    while let Some(options) = next.take() {
        let run_id = Uuid::new_v4();
        shared.runs.fetch_add(1, Ordering::SeqCst);
        shared.status.send_replace(PipelineStatus::Running { run_id });
        let primitives = Arc::clone(&*shared.primitives.read());

        let joined = tokio::task::spawn_blocking(move || {
            Pipeline::run_with_id(run_id, &primitives, &options)
        })
        .await;

        let status = settle(run_id, joined);
        shared.status.send_replace(status);

        let mut queue = shared.queue.lock();
        next = queue.pending.take();
        if next.is_none() {
            queue.running = false;
            shared.busy.send_replace(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbkit_core::Point2;

    #[test]
    fn test_run_reports_stats() {
        let prims = vec![Primitive::circle(Point2::new(0.0, 0.0), 2.0)];
        let result = Pipeline::run(&prims, &PipelineOptions::default());
        assert!(result.fused);
        assert!(result.message.is_none());
        let stats = result.stats.unwrap();
        assert_eq!(stats.input_primitives, 1);
        assert_eq!(stats.reconstruction.unwrap().full_circles, 1);
        assert!(result.finished_at >= result.started_at);
    }

    #[test]
    fn test_run_falls_back_on_overflow() {
        // Far beyond the engine's coordinate range at the default scale.
        let prims = vec![Primitive::circle(Point2::new(1.0e12, 0.0), 1.0)];
        let result = Pipeline::run(&prims, &PipelineOptions::default());
        assert!(!result.fused);
        assert_eq!(result.primitives.len(), 1);
        assert!(result.message.unwrap().contains("Fusion failed"));
    }

    #[tokio::test]
    async fn test_panicked_run_reports_failure() {
        let handle: tokio::task::JoinHandle<()> =
            tokio::spawn(async { panic!("tessellation blew up") });
        let joined = handle
            .await
            .map(|()| Pipeline::run(&[], &PipelineOptions::default()));
        let run_id = Uuid::new_v4();
        match settle(run_id, joined) {
            PipelineStatus::Failed { run_id: id, message } => {
                assert_eq!(id, run_id);
                assert!(message.starts_with("Pipeline task failed"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_reaches_completed() {
        let scheduler = PipelineScheduler::new(vec![Primitive::rectangle(
            Point2::new(0.0, 0.0),
            1.0,
            1.0,
        )]);
        let mut rx = scheduler.subscribe();
        scheduler.request(PipelineOptions::default());
        scheduler.wait_idle().await;
        assert!(rx.has_changed().unwrap());
        let status = rx.borrow_and_update().clone();
        assert!(matches!(status, PipelineStatus::Completed { .. }));
        assert_eq!(scheduler.runs_started(), 1);
    }
}
