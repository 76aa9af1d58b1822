//! Configuration for the PCBKit pipeline
//!
//! Provides configuration file handling and validation. Supports JSON and
//! TOML file formats; the default location is in the platform config
//! directory.
//!
//! Configuration is organized into sections:
//! - Curve tessellation and arc reconstruction tuning
//! - Fusion switches
//! - Tool settings for isolation, clearing, cutout and drilling
//! - Machine motion (safe height, depth, feeds)

use pcbkit_camtools::{
    ClearingSettings, CutoutSettings, DrillSettings, FusionOptions, IsolationSettings,
    ParameterResult, PipelineOptions, ReconstructionSettings, TessellationSettings,
    ToolpathPlanner,
};
use pcbkit_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name used inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub tessellation: TessellationSettings,
    pub fusion: FusionOptions,
    pub reconstruction: ReconstructionSettings,
    pub isolation: IsolationSettings,
    pub clearing: ClearingSettings,
    pub cutout: CutoutSettings,
    pub drill: DrillSettings,
    /// Motion parameters for toolpath planning
    pub machine: ToolpathPlanner,
}

enum Format {
    Json,
    Toml,
}

fn section(name: &str, result: ParameterResult<()>) -> Result<()> {
    result.map_err(|e| Error::other(format!("Invalid {} settings: {}", name, e)))
}

fn format_for(path: &Path) -> Result<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        _ => Err(Error::other("Config file must be .json or .toml")),
    }
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config location, e.g. `~/.config/pcbkit/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pcbkit").join(CONFIG_FILE_NAME))
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let format = format_for(path)?;
        let content = std::fs::read_to_string(path)?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)
                .map_err(|e| Error::other(format!("Invalid TOML config: {}", e)))?,
        };

        config.validate()?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise return defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(path = %path.display(), "No config file; using defaults");
            Ok(Self::default())
        }
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        self.validate()?;

        let content = match format_for(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)
                .map_err(|e| Error::other(format!("Failed to serialize config: {}", e)))?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.tessellation.min_segments == 0 || self.tessellation.segments_per_half_turn == 0 {
            return Err(Error::other("Tessellation segment counts must be > 0"));
        }

        let r = &self.reconstruction;
        if !(r.tolerance.is_finite() && r.tolerance > 0.0) {
            return Err(Error::other("Reconstruction tolerance must be > 0"));
        }
        if !(r.multi_gap_ratio > 0.0 && r.multi_gap_ratio <= 1.0) {
            return Err(Error::other("Multi-gap ratio must be in (0, 1]"));
        }
        if !(r.gap_step_factor.is_finite() && r.gap_step_factor >= 1.0) {
            return Err(Error::other("Gap step factor must be >= 1"));
        }

        section("isolation", self.isolation.validate())?;
        section("clearing", self.clearing.validate())?;
        section("cutout", self.cutout.validate())?;
        section("drill", self.drill.validate())?;
        section("machine", self.machine.validate())?;

        Ok(())
    }

    /// Options for a fusion pipeline run
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            fusion: self.fusion,
            tessellation: self.tessellation,
            reconstruction: self.reconstruction,
        }
    }
}
