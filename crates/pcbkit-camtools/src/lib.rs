//! # PCBKit CAM Tools
//!
//! This crate turns the primitives of a PCB layer into fused copper geometry
//! and machine toolpaths.
//!
//! ## Geometry Pipeline
//!
//! - **Standardizer**: Tessellates circles, arcs, obrounds and strokes into closed tagged paths
//! - **Fusion**: Polarity-aware union/difference through the fixed-point boolean engine
//! - **Arc Reconstruction**: Recovers circles and arcs from tagged vertices after fusion
//! - **Pipeline**: Synchronous runs plus a coalescing tokio scheduler
//!
//! ## Toolpaths
//!
//! - **Isolation**: Multi-pass outward offsets around copper
//! - **Clearing**: Raster clearing of an area
//! - **Cutout**: Inward board cutout with holding tabs
//! - **Drill**: Hole positions
//! - **Toolpath Plan**: Rapid/plunge/cut/retract motion for each pass

pub mod error;
pub mod fusion;
pub mod offset;
pub mod pipeline;
pub mod reconstruct;
pub mod standardize;
pub mod toolpath;

pub use error::{CamToolError, CamToolResult, ParameterError, ParameterResult};
pub use fusion::{FusionOptions, FusionOutput, FusionStats, GeometryProcessor};
pub use offset::{
    clearing_passes, cutout_passes, drill_passes, insert_tabs, isolation_passes,
    ClearingSettings, CutoutSettings, DrillSettings, IsolationSettings, OffsetPass,
    OperationKind, TabSpan, TabbedPath,
};
pub use pipeline::{Pipeline, PipelineOptions, PipelineResult, PipelineScheduler, PipelineStatus};
pub use reconstruct::{ArcReconstructor, ReconstructionSettings, ReconstructionStats};
pub use standardize::{standardize, standardize_all, TessellationSettings};
pub use toolpath::{MotionCommand, MotionKind, ToolpathPlan, ToolpathPlanner};
