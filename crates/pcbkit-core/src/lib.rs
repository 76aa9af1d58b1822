//! # PCBKit Core
//!
//! Core types and utilities shared by every stage of the PCBKit pipeline.
//! Provides the primitive data model, metadata-tagged points, winding helpers
//! and the curve registry that lets tessellated circles and arcs be recovered
//! after polygon boolean operations.

pub mod constants;
pub mod error;
pub mod geometry;
pub mod primitive;
pub mod registry;

pub use error::{Error, GeometryError, Result};

pub use geometry::{
    is_clockwise, normalize_angle, point_in_ring, signed_area, BoundingBox, Planar, Point2,
    TaggedPoint,
};

pub use primitive::{
    Arc, Circle, Contour, ContourSegment, Obround, PathShape, Polarity, Primitive, Properties,
    ReconstructedArc, ReconstructionInfo, Rectangle, Shape, SourceRef,
};

pub use registry::{CurveDescriptor, CurveKind, CurveRegistry};
