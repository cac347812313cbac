//! Photon filtering by elevation window.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use thiserror::Error;

use crate::config::ElevationConfig;
use crate::core::writers::{self, WriteError};

/// Errors that can occur during filtering operations.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Failed to read CSV file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse CSV file: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Column '{column}' not found in {path}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("Invalid elevation '{value}' at data row {row} of {path}")]
    ElevationParseError {
        value: String,
        row: usize,
        path: PathBuf,
    },

    #[error("Invalid elevation window: min {min} must be less than max {max}")]
    InvalidWindow { min: f64, max: f64 },

    #[error(transparent)]
    WriteError(#[from] WriteError),
}

/// Elevation window with exclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationWindow {
    pub min: f64,
    pub max: f64,
}

impl ElevationWindow {
    /// Create a window, rejecting empty or inverted bounds.
    pub fn new(min: f64, max: f64) -> Result<Self, FilterError> {
        if !(min < max) {
            return Err(FilterError::InvalidWindow { min, max });
        }
        Ok(Self { min, max })
    }

    /// True when `h` lies strictly inside the window.
    #[inline]
    pub fn contains(&self, h: f64) -> bool {
        h > self.min && h < self.max
    }
}

/// Counts reported by [`filter_by_elevation`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Photons read from the input.
    pub total: usize,
    /// Photons at or below the minimum.
    pub below: usize,
    /// Photons at or above the maximum.
    pub above: usize,
    /// Photons written to the output.
    pub kept: usize,
}

impl FilterStats {
    /// Photons removed by either bound.
    #[inline]
    pub fn removed(&self) -> usize {
        self.below + self.above
    }
}

/// Find the index of `column` in a CSV header.
fn column_index(headers: &StringRecord, column: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == column)
}

/// Keep the records whose elevation lies inside `window`.
///
/// Returns the surviving records together with the filter counts.
pub fn filter_records(
    path: &Path,
    column: &str,
    window: &ElevationWindow,
) -> Result<(StringRecord, Vec<StringRecord>, FilterStats), FilterError> {
    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers = reader.headers()?.clone();
    let col = column_index(&headers, column).ok_or_else(|| FilterError::MissingColumn {
        column: column.to_string(),
        path: path.to_path_buf(),
    })?;

    let mut stats = FilterStats::default();
    let mut kept = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = result?;
        stats.total += 1;

        let raw = record.get(col).unwrap_or("").trim();
        let h: f64 = raw.parse().map_err(|_| FilterError::ElevationParseError {
            value: raw.to_string(),
            row: i + 1,
            path: path.to_path_buf(),
        })?;

        if h <= window.min {
            stats.below += 1;
        } else if h >= window.max {
            stats.above += 1;
        } else {
            kept.push(record);
        }
    }

    stats.kept = kept.len();

    Ok((headers, kept, stats))
}

/// Filter a photon CSV by elevation and write the survivors.
///
/// All columns are copied through unchanged; only rows whose elevation lies
/// strictly between the configured bounds are kept.
///
/// # Arguments
///
/// * `input` - Path to the photon CSV file
/// * `output` - Path to the filtered CSV file (parent directories are created)
/// * `config` - Elevation column and bounds
///
/// # Returns
///
/// Counts of photons read, removed below/above the window, and written.
pub fn filter_by_elevation(
    input: &Path,
    output: &Path,
    config: &ElevationConfig,
) -> Result<FilterStats, FilterError> {
    let window = ElevationWindow::new(config.min_elevation, config.max_elevation)?;

    info!("Reading {}", input.display());
    let (headers, kept, stats) = filter_records(input, &config.column, &window)?;

    info!("Read {} photons", stats.total);
    debug!(
        "Filtered {} photons at or below {}",
        stats.below, window.min
    );
    debug!(
        "Filtered {} photons at or above {}",
        stats.above, window.max
    );
    info!("Filtered {} photons", stats.removed());

    info!("Writing {} to {}", stats.kept, output.display());
    writers::write_csv_records(output, &headers, &kept)?;

    Ok(stats)
}
