//! Machine motion plans for offset passes.
//!
//! Each path is cut as retract, rapid to start, plunge, cutting moves and a
//! final retract. Arc segments become circular interpolation moves with
//! centre offsets relative to the arc start. Drill passes peck each hole
//! with an optional dwell.

use serde::{Deserialize, Serialize};
use tracing::debug;

use pcbkit_core::{Contour, ContourSegment, Point2, Shape};

use crate::error::{ParameterError, ParameterResult};
use crate::offset::{OffsetPass, OperationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionKind {
    Rapid,
    Linear,
    ArcCw,
    ArcCcw,
    Plunge,
    Retract,
    Dwell,
}

/// One motion. Unset axes keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    pub kind: MotionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    /// Arc centre X relative to the arc start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i: Option<f64>,
    /// Arc centre Y relative to the arc start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub j: Option<f64>,
    /// Feed rate in mm/min.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub f: Option<f64>,
    /// Dwell in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<f64>,
}

impl MotionCommand {
    fn new(kind: MotionKind) -> Self {
        Self {
            kind,
            x: None,
            y: None,
            z: None,
            i: None,
            j: None,
            f: None,
            p: None,
        }
    }

    pub fn rapid(to: Point2) -> Self {
        Self {
            x: Some(to.x),
            y: Some(to.y),
            ..Self::new(MotionKind::Rapid)
        }
    }

    pub fn linear(to: Point2, feed: f64) -> Self {
        Self {
            x: Some(to.x),
            y: Some(to.y),
            f: Some(feed),
            ..Self::new(MotionKind::Linear)
        }
    }

    pub fn arc(clockwise: bool, from: Point2, to: Point2, center: Point2, feed: f64) -> Self {
        let kind = if clockwise {
            MotionKind::ArcCw
        } else {
            MotionKind::ArcCcw
        };
        Self {
            x: Some(to.x),
            y: Some(to.y),
            i: Some(center.x - from.x),
            j: Some(center.y - from.y),
            f: Some(feed),
            ..Self::new(kind)
        }
    }

    pub fn plunge(z: f64, feed: f64) -> Self {
        Self {
            z: Some(z),
            f: Some(feed),
            ..Self::new(MotionKind::Plunge)
        }
    }

    pub fn retract(z: f64) -> Self {
        Self {
            z: Some(z),
            ..Self::new(MotionKind::Retract)
        }
    }

    pub fn dwell(seconds: f64) -> Self {
        Self {
            p: Some(seconds),
            ..Self::new(MotionKind::Dwell)
        }
    }

    pub fn is_cutting(&self) -> bool {
        matches!(
            self.kind,
            MotionKind::Linear | MotionKind::ArcCw | MotionKind::ArcCcw
        )
    }
}

/// Motion for one offset pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolpathPlan {
    pub operation: OperationKind,
    pub pass_index: usize,
    pub tool_diameter: f64,
    pub commands: Vec<MotionCommand>,
}

impl ToolpathPlan {
    /// Length of cutting moves in the XY plane.
    pub fn cut_length(&self) -> f64 {
        let mut length = 0.0;
        let mut at: Option<Point2> = None;
        for cmd in &self.commands {
            let (Some(x), Some(y)) = (cmd.x, cmd.y) else {
                continue;
            };
            let to = Point2::new(x, y);
            if let (true, Some(from)) = (cmd.is_cutting(), at) {
                length += match (cmd.i, cmd.j) {
                    (Some(i), Some(j)) => {
                        let center = Point2::new(from.x + i, from.y + j);
                        let r = center.distance_to(&from);
                        let a0 = from.angle_about(&center);
                        let a1 = to.angle_about(&center);
                        let mut sweep = if cmd.kind == MotionKind::ArcCw {
                            (a0 - a1).rem_euclid(std::f64::consts::TAU)
                        } else {
                            (a1 - a0).rem_euclid(std::f64::consts::TAU)
                        };
                        if sweep < 1e-12 {
                            sweep = std::f64::consts::TAU;
                        }
                        r * sweep
                    }
                    _ => from.distance_to(&to),
                };
            }
            at = Some(to);
        }
        length
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolpathPlanner {
    pub safe_z: f64,
    /// Cutting depth; negative below the stock surface.
    pub cut_depth: f64,
    pub feed_rate: f64,
    pub plunge_rate: f64,
    /// Seconds to dwell at the bottom of each drill hit.
    pub dwell: f64,
}

impl Default for ToolpathPlanner {
    fn default() -> Self {
        Self {
            safe_z: 5.0,
            cut_depth: -0.1,
            feed_rate: 200.0,
            plunge_rate: 100.0,
            dwell: 0.0,
        }
    }
}

impl ToolpathPlanner {
    pub fn validate(&self) -> ParameterResult<()> {
        ParameterError::require_positive("feed_rate", self.feed_rate)?;
        ParameterError::require_positive("plunge_rate", self.plunge_rate)?;
        if self.safe_z <= self.cut_depth {
            return Err(ParameterError::InvalidValue {
                name: "safe_z".to_string(),
                reason: format!("must be above cut depth {}", self.cut_depth),
            });
        }
        Ok(())
    }

    pub fn plan(&self, pass: &OffsetPass) -> ToolpathPlan {
        let mut commands = Vec::new();
        for prim in &pass.primitives {
            match (&prim.shape, pass.kind) {
                (Shape::Circle(c), OperationKind::Drill) => self.drill_hit(c.center, &mut commands),
                (Shape::Circle(c), _) => {
                    let start = c.center.polar(c.radius, 0.0);
                    self.begin(start, &mut commands);
                    commands.push(MotionCommand::arc(false, start, start, c.center, self.feed_rate));
                    commands.push(MotionCommand::retract(self.safe_z));
                }
                (Shape::Path(path), _) => {
                    for contour in &path.contours {
                        self.contour(contour, path.closed, &mut commands);
                    }
                }
                _ => {}
            }
        }
        debug!(
            operation = %pass.kind,
            pass = pass.pass_index,
            commands = commands.len(),
            "Planned toolpath"
        );
        ToolpathPlan {
            operation: pass.kind,
            pass_index: pass.pass_index,
            tool_diameter: pass.tool_diameter,
            commands,
        }
    }

    pub fn plan_all(&self, passes: &[OffsetPass]) -> Vec<ToolpathPlan> {
        passes.iter().map(|p| self.plan(p)).collect()
    }

    fn begin(&self, start: Point2, commands: &mut Vec<MotionCommand>) {
        commands.push(MotionCommand::retract(self.safe_z));
        commands.push(MotionCommand::rapid(start));
        commands.push(MotionCommand::plunge(self.cut_depth, self.plunge_rate));
    }

    fn drill_hit(&self, at: Point2, commands: &mut Vec<MotionCommand>) {
        self.begin(at, commands);
        if self.dwell > 0.0 {
            commands.push(MotionCommand::dwell(self.dwell));
        }
        commands.push(MotionCommand::retract(self.safe_z));
    }

    fn contour(&self, contour: &Contour, closed: bool, commands: &mut Vec<MotionCommand>) {
        if !contour.segments.is_empty() {
            let start = contour.segments[0].start();
            self.begin(start, commands);
            for segment in &contour.segments {
                match segment {
                    ContourSegment::Line { end, .. } => {
                        commands.push(MotionCommand::linear(*end, self.feed_rate));
                    }
                    ContourSegment::Arc(rec) => {
                        let arc = &rec.arc;
                        commands.push(MotionCommand::arc(
                            arc.clockwise,
                            arc.start_point(),
                            arc.end_point(),
                            arc.center,
                            self.feed_rate,
                        ));
                    }
                }
            }
        } else {
            let points = contour.positions();
            let Some(&start) = points.first() else {
                return;
            };
            if points.len() < 2 {
                return;
            }
            self.begin(start, commands);
            for p in &points[1..] {
                commands.push(MotionCommand::linear(*p, self.feed_rate));
            }
            if closed && points.last() != Some(&start) {
                commands.push(MotionCommand::linear(start, self.feed_rate));
            }
        }
        commands.push(MotionCommand::retract(self.safe_z));
    }
}
