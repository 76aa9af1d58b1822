//! # PCBKit
//!
//! A PCB CAM geometry pipeline that keeps circles and arcs intact through
//! polygon booleans:
//! - Standardize pads, traces and regions into tagged closed paths
//! - Fuse them by polarity with a fixed-point boolean engine
//! - Reconstruct circles and arcs from the vertex tags that survive clipping
//! - Offset the result into isolation, clearing, cutout and drill passes
//! - Plan machine motion for each pass
//!
//! ## Architecture
//!
//! PCBKit is organized as a workspace with multiple crates:
//!
//! 1. **pcbkit-core** - Primitive model, tagged points, curve registry, errors
//! 2. **pcbkit-clipper** - Fixed-point boolean engine with a metadata channel
//! 3. **pcbkit-camtools** - Standardizer, fusion, reconstruction, offsets, toolpaths, scheduler
//! 4. **pcbkit-settings** - Configuration files and validation
//! 5. **pcbkit** - Command-line binary that integrates all crates

pub use pcbkit_core::{
    CurveDescriptor, CurveKind, CurveRegistry, Error, GeometryError, Point2, Polarity, Primitive,
    Properties, Result, Shape,
};

pub use pcbkit_clipper::{BooleanEngine, FixedPointEngine, Scaler};

pub use pcbkit_camtools::{
    clearing_passes, cutout_passes, drill_passes, isolation_passes, ArcReconstructor,
    FusionOptions, FusionStats, GeometryProcessor, OffsetPass, OperationKind, Pipeline,
    PipelineOptions, PipelineResult, PipelineScheduler, PipelineStatus, ToolpathPlan,
    ToolpathPlanner,
};

pub use pcbkit_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging on stderr with:
/// - Pretty or JSON formatting
/// - RUST_LOG environment variable support (default level INFO)
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string()));

    if json {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .json();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_line_number(true)
            .pretty();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
