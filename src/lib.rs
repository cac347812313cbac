//! Support tools for lidar photon classification workflows.
//!
//! This crate provides tools for:
//! - Splitting a set of granule files into reproducible cross-validation folds
//! - Filtering photon CSV files to an elevation window
//! - Rendering per-fold score tables and bar charts
//! - Rendering along-track scatter views of classified photons
//! - Scoring classifier predictions against reference labels
//!
//! # Example
//!
//! ```no_run
//! use bathy_tools::processors::folds::{copy_commands, FoldParams};
//! use std::path::Path;
//!
//! let files = bathy_tools::core::loaders::expand_glob("granules/*.csv").unwrap();
//! let params = FoldParams { fold: 0, folds: 5, random_seed: 123 };
//! for command in copy_commands(&files, &params, Path::new("train"), Path::new("test")).unwrap() {
//!     println!("{}", command);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod visualization;

pub use config::{
    ElevationConfig, FoldConfig, PlotConfig, ScoringConfig, ToolsConfig, ViewerConfig,
};
pub use core::loaders::{LabeledPhoton, ScoreRow};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
