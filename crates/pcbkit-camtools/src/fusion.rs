//! Polarity-aware fusion of a layer's primitives.
//!
//! Every primitive is standardized into tagged closed paths, dark paths are
//! unioned and clear paths subtracted in one boolean call, and the resulting
//! rings are normalised (outers counter-clockwise, holes clockwise) and nested
//! under the outer that contains them.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use pcbkit_clipper::{BooleanEngine, EnginePath, FillRule, FixedPointEngine, ResultRing, Scaler};
use pcbkit_core::{
    point_in_ring, Contour, CurveRegistry, PathShape, Polarity, Primitive, Properties, Shape,
};

use crate::error::CamToolResult;
use crate::reconstruct::{ArcReconstructor, ReconstructionSettings, ReconstructionStats};
use crate::standardize::{standardize_all, TessellationSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionOptions {
    /// Replace tagged point runs with analytic arcs after fusion.
    pub enable_arc_reconstruction: bool,
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self {
            enable_arc_reconstruction: true,
        }
    }
}

/// Counters for one fusion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionStats {
    pub input_primitives: usize,
    pub standardized: usize,
    /// Inputs without usable geometry.
    pub dropped: usize,
    pub dark_contours: usize,
    pub clear_contours: usize,
    pub outer_contours: usize,
    pub hole_contours: usize,
    /// Holes no outer contained; they are discarded.
    pub orphan_holes: usize,
    pub reconstruction: Option<ReconstructionStats>,
}

/// Fused layer geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FusionOutput {
    pub primitives: Vec<Primitive>,
    pub stats: FusionStats,
}

/// Owns the curve registry and boolean engine for a layer.
///
/// The registry is cleared at the start of every [`fuse`](Self::fuse) call,
/// so curve ids in the output refer to that call's registry only.
pub struct GeometryProcessor<E: BooleanEngine = FixedPointEngine> {
    engine: E,
    registry: CurveRegistry,
    scaler: Scaler,
    tessellation: TessellationSettings,
    reconstructor: ArcReconstructor,
}

impl<E: BooleanEngine> std::fmt::Debug for GeometryProcessor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryProcessor")
            .field("curves", &self.registry.len())
            .field("scaler", &self.scaler)
            .field("tessellation", &self.tessellation)
            .finish()
    }
}

impl Default for GeometryProcessor<FixedPointEngine> {
    fn default() -> Self {
        Self::new()
    }
}

impl GeometryProcessor<FixedPointEngine> {
    pub fn new() -> Self {
        Self::with_engine(FixedPointEngine::new())
    }
}

impl<E: BooleanEngine> GeometryProcessor<E> {
    pub fn with_engine(engine: E) -> Self {
        Self {
            engine,
            registry: CurveRegistry::new(),
            scaler: Scaler::default(),
            tessellation: TessellationSettings::default(),
            reconstructor: ArcReconstructor::default(),
        }
    }

    pub fn with_scaler(mut self, scaler: Scaler) -> Self {
        self.scaler = scaler;
        self
    }

    pub fn with_tessellation(mut self, tessellation: TessellationSettings) -> Self {
        self.tessellation = tessellation;
        self
    }

    pub fn with_reconstruction(mut self, settings: ReconstructionSettings) -> Self {
        self.reconstructor = ArcReconstructor::new(settings);
        self
    }

    pub fn registry(&self) -> &CurveRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn scaler(&self) -> Scaler {
        self.scaler
    }

    /// Standardizes primitives against a fresh registry without fusing them.
    pub fn standardize(&mut self, primitives: &[Primitive]) -> Vec<Primitive> {
        self.registry.clear();
        standardize_all(primitives, &mut self.registry, &self.tessellation)
    }

    /// Fuses a layer: union of dark geometry minus clear geometry.
    pub fn fuse(
        &mut self,
        primitives: &[Primitive],
        options: &FusionOptions,
    ) -> CamToolResult<FusionOutput> {
        let standardized = self.standardize(primitives);
        let mut stats = FusionStats {
            input_primitives: primitives.len(),
            standardized: standardized.len(),
            dropped: primitives.len().saturating_sub(standardized.len()),
            ..Default::default()
        };

        let mut subject: Vec<EnginePath> = Vec::new();
        let mut clip: Vec<EnginePath> = Vec::new();
        for prim in &standardized {
            let Some(path) = prim.as_path() else {
                continue;
            };
            let clear = prim.polarity() == Polarity::Clear;
            for contour in &path.contours {
                if contour.points.len() < 3 {
                    continue;
                }
                let mut contour = contour.clone();
                // Clear geometry is wound opposite to dark so the difference
                // sees consistent orientations on both sides.
                contour.orient(contour.is_hole != clear);
                let ring = self.scaler.path_to_int(&contour.points)?;
                if clear {
                    clip.push(ring);
                } else {
                    subject.push(ring);
                }
            }
        }
        stats.dark_contours = subject.len();
        stats.clear_contours = clip.len();

        if subject.is_empty() {
            debug!(clear = clip.len(), "No dark geometry to fuse");
            return Ok(FusionOutput {
                primitives: Vec::new(),
                stats,
            });
        }

        let rings = self
            .engine
            .difference(&subject, &clip, FillRule::NonZero, true)?;

        let (outers, holes) = split_rings(rings, &self.scaler);
        stats.outer_contours = outers.len();
        stats.hole_contours = holes.len();

        let (mut fused, orphans) = nest(outers, holes);
        stats.orphan_holes = orphans;

        if options.enable_arc_reconstruction {
            let (rebuilt, rstats) = self.reconstructor.reconstruct(&self.registry, &fused);
            fused = rebuilt;
            stats.reconstruction = Some(rstats);
        }

        info!(
            inputs = stats.input_primitives,
            dropped = stats.dropped,
            outers = stats.outer_contours,
            holes = stats.hole_contours,
            curves = self.registry.len(),
            "Fused layer geometry"
        );
        Ok(FusionOutput {
            primitives: fused,
            stats,
        })
    }
}

/// Converts engine rings back to millimetre contours with `is_clockwise() ==
/// is_hole`, separated into outers and holes.
pub(crate) fn split_rings(rings: Vec<ResultRing>, scaler: &Scaler) -> (Vec<Contour>, Vec<Contour>) {
    let mut outers = Vec::new();
    let mut holes = Vec::new();
    for ring in rings {
        let mut contour = Contour::new(scaler.path_from_int(&ring.points), ring.is_hole);
        contour.dedup_points();
        if contour.points.len() < 3 {
            continue;
        }
        contour.normalize_winding();
        if contour.is_hole {
            holes.push(contour);
        } else {
            outers.push(contour);
        }
    }
    (outers, holes)
}

/// Groups holes under the smallest outer that contains most of their vertices
/// and emits one path primitive per outer. Also returns the number of holes
/// that fit no outer.
pub(crate) fn nest(outers: Vec<Contour>, holes: Vec<Contour>) -> (Vec<Primitive>, usize) {
    let mut order: Vec<usize> = (0..outers.len()).collect();
    order.sort_by(|&a, &b| outers[a].area().total_cmp(&outers[b].area()));

    let mut children: Vec<Vec<Contour>> = vec![Vec::new(); outers.len()];
    let mut orphans = 0;
    for mut hole in holes {
        let parent = order.iter().copied().find(|&k| {
            let inside = hole
                .points
                .iter()
                .filter(|p| point_in_ring(p.position(), &outers[k].points))
                .count();
            inside * 2 > hole.points.len()
        });
        match parent {
            Some(k) => {
                hole.parent_id = Some(0);
                hole.nesting_level = 1;
                children[k].push(hole);
            }
            None => {
                warn!(points = hole.points.len(), "Hole outside every outer contour; dropping");
                orphans += 1;
            }
        }
    }

    let primitives = outers
        .into_iter()
        .zip(children)
        .map(|(mut outer, holes)| {
            outer.parent_id = None;
            outer.nesting_level = 0;
            let mut contours = vec![outer];
            contours.extend(holes);

            let mut curve_ids: Vec<u32> = contours
                .iter()
                .flat_map(|c| c.curve_ids.iter().copied())
                .collect();
            curve_ids.sort_unstable();
            curve_ids.dedup();

            let props = Properties {
                curve_ids,
                ..Properties::dark()
            };
            Primitive::new(
                Shape::Path(PathShape {
                    contours,
                    closed: true,
                }),
                props,
            )
        })
        .collect();
    (primitives, orphans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbkit_core::Point2;

    fn square(x: f64, y: f64, size: f64) -> Primitive {
        Primitive::rectangle(Point2::new(x, y), size, size)
    }

    #[test]
    fn test_empty_input() {
        let mut processor = GeometryProcessor::new();
        let out = processor.fuse(&[], &FusionOptions::default()).unwrap();
        assert!(out.primitives.is_empty());
        assert_eq!(out.stats.input_primitives, 0);
    }

    #[test]
    fn test_overlapping_squares_merge() {
        let mut processor = GeometryProcessor::new();
        let out = processor
            .fuse(
                &[square(0.0, 0.0, 10.0), square(5.0, 5.0, 10.0)],
                &FusionOptions::default(),
            )
            .unwrap();
        assert_eq!(out.primitives.len(), 1);
        let path = out.primitives[0].as_path().unwrap();
        assert!((path.area() - 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_clear_square_cuts_hole() {
        let mut processor = GeometryProcessor::new();
        let out = processor
            .fuse(
                &[
                    square(0.0, 0.0, 10.0),
                    square(3.0, 3.0, 4.0).with_polarity(Polarity::Clear),
                ],
                &FusionOptions::default(),
            )
            .unwrap();
        assert_eq!(out.primitives.len(), 1);
        let path = out.primitives[0].as_path().unwrap();
        assert_eq!(path.contours.len(), 2);
        let hole = &path.contours[1];
        assert!(hole.is_hole);
        assert!(hole.is_clockwise());
        assert_eq!(hole.parent_id, Some(0));
        assert!(!path.contours[0].is_clockwise());
        assert!((path.area() - 84.0).abs() < 1e-6);
    }

    #[test]
    fn test_only_clear_geometry_gives_nothing() {
        let mut processor = GeometryProcessor::new();
        let out = processor
            .fuse(
                &[square(0.0, 0.0, 10.0).with_polarity(Polarity::Clear)],
                &FusionOptions::default(),
            )
            .unwrap();
        assert!(out.primitives.is_empty());
        assert_eq!(out.stats.clear_contours, 1);
    }

    #[test]
    fn test_registry_cleared_between_runs() {
        let mut processor = GeometryProcessor::new();
        let circles = [Primitive::circle(Point2::new(0.0, 0.0), 1.0)];
        processor.fuse(&circles, &FusionOptions::default()).unwrap();
        processor.fuse(&circles, &FusionOptions::default()).unwrap();
        assert_eq!(processor.registry().len(), 1);
    }

    #[test]
    fn test_clockwise_input_is_reoriented() {
        let mut processor = GeometryProcessor::new();
        let cw = [
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 5.0),
            Point2::new(5.0, 5.0),
            Point2::new(5.0, 0.0),
        ];
        let out = processor
            .fuse(&[Primitive::polygon(&cw)], &FusionOptions::default())
            .unwrap();
        let path = out.primitives[0].as_path().unwrap();
        assert!(!path.contours[0].is_clockwise());
        assert!((path.area() - 25.0).abs() < 1e-6);
    }
}
