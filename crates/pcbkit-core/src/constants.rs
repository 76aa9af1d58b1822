//! Shared numeric constants.

/// Fixed-point units per millimetre handed to the boolean engine.
pub const DEFAULT_SCALE: f64 = 10_000.0;

/// Decimal places used when hashing curve parameters in the registry.
///
/// Must stay a compile-time constant so curve ids are reproducible run to run.
pub const CURVE_HASH_PRECISION: i32 = 3;

/// Curve id carried by points that do not belong to any registered curve.
pub const NO_CURVE: u32 = 0;

/// Lower bound on tessellation segments for any circle or arc.
pub const MIN_CURVE_SEGMENTS: usize = 32;

/// Tessellation segments spent on a half turn (180 degrees) of curve.
pub const SEGMENTS_PER_HALF_TURN: usize = 64;

/// Default radial tolerance (mm) when verifying points against a registered curve.
pub const DEFAULT_RECONSTRUCTION_TOLERANCE: f64 = 0.01;

/// Distance (mm) below which two points are treated as coincident.
pub const POINT_EPSILON: f64 = 1e-6;
