//! PCBKit Settings Crate
//!
//! Handles pipeline configuration: tessellation, fusion and reconstruction
//! tuning, per-operation tool settings and machine motion parameters.

pub mod config;

pub use config::{Config, CONFIG_FILE_NAME};
