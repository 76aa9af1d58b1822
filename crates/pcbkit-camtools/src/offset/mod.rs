//! Offset toolpath generation.
//!
//! Turns fused layer geometry into tool-centre paths: isolation rings around
//! copper, raster clearing of an area, board cutout with holding tabs, and
//! drill positions. Each operation returns a list of [`OffsetPass`]es.

mod clearing;
mod cutout;
mod drill;
mod isolation;
pub mod polyline;

use serde::{Deserialize, Serialize};

use pcbkit_core::Primitive;

use crate::error::{ParameterError, ParameterResult};

pub use clearing::clearing_passes;
pub use cutout::{cutout_passes, insert_tabs, TabSpan, TabbedPath};
pub use drill::drill_passes;
pub use isolation::isolation_passes;

/// Kind of machining operation a pass belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Isolation,
    Clearing,
    Cutout,
    Drill,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Isolation => write!(f, "isolation"),
            OperationKind::Clearing => write!(f, "clearing"),
            OperationKind::Cutout => write!(f, "cutout"),
            OperationKind::Drill => write!(f, "drill"),
        }
    }
}

/// One set of tool-centre paths cut at the same offset distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetPass {
    pub pass_index: usize,
    /// Signed distance from the source boundary in mm; negative is inward.
    pub distance: f64,
    /// Whether the pass geometry was unioned across primitives.
    pub combined: bool,
    pub kind: OperationKind,
    pub tool_diameter: f64,
    pub primitives: Vec<Primitive>,
}

impl OffsetPass {
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}

fn check_overlap(overlap_percent: f64) -> ParameterResult<()> {
    ParameterError::require_range("overlap_percent", overlap_percent, 0.0, 100.0)
}

/// Distance between neighbouring passes for a tool and overlap.
pub fn stepover(tool_diameter: f64, overlap_percent: f64) -> f64 {
    tool_diameter * (1.0 - overlap_percent / 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationSettings {
    pub tool_diameter: f64,
    pub passes: usize,
    pub overlap_percent: f64,
    /// Union the offsets of each pass so neighbouring rings merge.
    pub combine: bool,
}

impl Default for IsolationSettings {
    fn default() -> Self {
        Self {
            tool_diameter: 0.2,
            passes: 1,
            overlap_percent: 50.0,
            combine: true,
        }
    }
}

impl IsolationSettings {
    pub fn validate(&self) -> ParameterResult<()> {
        ParameterError::require_positive("tool_diameter", self.tool_diameter)?;
        if self.passes == 0 {
            return Err(ParameterError::InvalidValue {
                name: "passes".to_string(),
                reason: "at least one pass is required".to_string(),
            });
        }
        check_overlap(self.overlap_percent)
    }

    /// Distance of pass `index` from the copper edge.
    pub fn pass_distance(&self, index: usize) -> f64 {
        self.tool_diameter / 2.0
            + index as f64 * stepover(self.tool_diameter, self.overlap_percent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClearingSettings {
    pub tool_diameter: f64,
    pub overlap_percent: f64,
    /// Raster direction, counter-clockwise from the X axis.
    pub angle_degrees: f64,
}

impl Default for ClearingSettings {
    fn default() -> Self {
        Self {
            tool_diameter: 0.8,
            overlap_percent: 20.0,
            angle_degrees: 0.0,
        }
    }
}

impl ClearingSettings {
    pub fn validate(&self) -> ParameterResult<()> {
        ParameterError::require_positive("tool_diameter", self.tool_diameter)?;
        check_overlap(self.overlap_percent)?;
        if !self.angle_degrees.is_finite() {
            return Err(ParameterError::InvalidValue {
                name: "angle_degrees".to_string(),
                reason: "must be finite".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutoutSettings {
    pub tool_diameter: f64,
    pub tabs: usize,
    pub tab_width: f64,
}

impl Default for CutoutSettings {
    fn default() -> Self {
        Self {
            tool_diameter: 2.0,
            tabs: 4,
            tab_width: 3.0,
        }
    }
}

impl CutoutSettings {
    pub fn validate(&self) -> ParameterResult<()> {
        ParameterError::require_positive("tool_diameter", self.tool_diameter)?;
        if self.tabs > 0 {
            ParameterError::require_positive("tab_width", self.tab_width)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrillSettings {
    pub tool_diameter: f64,
}

impl Default for DrillSettings {
    fn default() -> Self {
        Self { tool_diameter: 0.8 }
    }
}

impl DrillSettings {
    pub fn validate(&self) -> ParameterResult<()> {
        ParameterError::require_positive("tool_diameter", self.tool_diameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_pass_distances() {
        let settings = IsolationSettings {
            tool_diameter: 0.2,
            passes: 3,
            overlap_percent: 50.0,
            combine: false,
        };
        let d: Vec<f64> = (0..3).map(|p| settings.pass_distance(p)).collect();
        for (got, want) in d.iter().zip([0.1, 0.2, 0.3]) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn test_settings_validation() {
        assert!(IsolationSettings::default().validate().is_ok());
        let bad = IsolationSettings {
            overlap_percent: 100.0,
            ..Default::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(ParameterError::OutOfRange { .. })
        ));
        let bad = CutoutSettings {
            tab_width: 0.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let no_tabs = CutoutSettings {
            tabs: 0,
            tab_width: 0.0,
            ..Default::default()
        };
        assert!(no_tabs.validate().is_ok());
        assert!(DrillSettings { tool_diameter: -1.0 }.validate().is_err());
    }

    #[test]
    fn test_operation_kind_serde() {
        let json = serde_json::to_string(&OperationKind::Cutout).unwrap();
        assert_eq!(json, "\"cutout\"");
        assert_eq!(OperationKind::Drill.to_string(), "drill");
    }
}
