//! Data loaders for metric summaries, labeled photons and glob file sets.
//!
//! This module provides parsers for:
//! - Per-fold (or per-dataset) score CSV files (`Fold, Acc, F1, ...`)
//! - Labeled photon CSV files (along-track distance, elevation, class label)
//! - Label/prediction pairs of classified photon CSV files
//! - File sets enumerated from a filesystem glob pattern

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use glob::MatchOptions;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur during file loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to read glob match: {0}")]
    GlobMatch(#[from] glob::GlobError),

    #[error("Invalid class label {value} in {path} at row {row}")]
    InvalidLabel { value: f64, row: usize, path: PathBuf },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// The score columns of a fold summary, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Accuracy,
    F1,
    F1Calibrated,
    WeightedF1,
    WeightedF1Calibrated,
    BalancedAccuracy,
}

impl Metric {
    /// All metrics in table column order.
    pub const ALL: [Metric; 6] = [
        Metric::Accuracy,
        Metric::F1,
        Metric::F1Calibrated,
        Metric::WeightedF1,
        Metric::WeightedF1Calibrated,
        Metric::BalancedAccuracy,
    ];

    /// CSV column name.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Accuracy => "Acc",
            Metric::F1 => "F1",
            Metric::F1Calibrated => "F1_r0",
            Metric::WeightedF1 => "Wght_F1",
            Metric::WeightedF1Calibrated => "Wght_F1_r0",
            Metric::BalancedAccuracy => "BA",
        }
    }

    /// Human readable name used in legends and table headers.
    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Accuracy => "Accuracy",
            Metric::F1 => "F1",
            Metric::F1Calibrated => "F1 calibrated",
            Metric::WeightedF1 => "Weighted F1",
            Metric::WeightedF1Calibrated => "Weighted F1 calibrated",
            Metric::BalancedAccuracy => "Balanced Accuracy",
        }
    }
}

/// One row of a score summary CSV.
///
/// `fold` is absent for per-dataset files, where the row index identifies
/// the dataset instead.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoreRow {
    #[serde(rename = "Fold", default)]
    pub fold: Option<f64>,
    #[serde(rename = "Acc")]
    pub acc: f64,
    #[serde(rename = "F1")]
    pub f1: f64,
    #[serde(rename = "F1_r0")]
    pub f1_r0: f64,
    #[serde(rename = "Wght_F1")]
    pub wght_f1: f64,
    #[serde(rename = "Wght_F1_r0")]
    pub wght_f1_r0: f64,
    #[serde(rename = "BA")]
    pub ba: f64,
}

impl ScoreRow {
    /// Returns the value of one metric.
    #[inline]
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Accuracy => self.acc,
            Metric::F1 => self.f1,
            Metric::F1Calibrated => self.f1_r0,
            Metric::WeightedF1 => self.wght_f1,
            Metric::WeightedF1Calibrated => self.wght_f1_r0,
            Metric::BalancedAccuracy => self.ba,
        }
    }
}

/// A single classified photon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabeledPhoton {
    /// Along-track distance in meters.
    pub along_track_dist: f64,
    /// Orthometric height in meters.
    pub elevation: f64,
    /// Class label (0 other, 40 bathymetry, 41 sea surface, 45 water column).
    pub label: i64,
}

#[derive(Debug, Deserialize)]
struct LabeledPhotonRecord {
    along_track_dist: f64,
    egm08_orthometric_height: f64,
    manual_label: f64,
}

fn open_csv(path: &Path) -> Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file)))
}

/// Load a score summary CSV.
///
/// Columns are matched by header name; extra columns are ignored and the
/// `Fold` column is optional.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a score is missing or not
/// numeric, or the file has no data rows.
pub fn load_score_rows<P: AsRef<Path>>(path: P) -> Result<Vec<ScoreRow>> {
    let path = path.as_ref();
    let mut reader = open_csv(path)?;

    let rows = reader
        .deserialize::<ScoreRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(rows)
}

/// Load labeled photons from a classified photon CSV.
///
/// Requires the columns `along_track_dist`, `egm08_orthometric_height` and
/// `manual_label`. Labels written as floats (`40.0`) are accepted; NaN or
/// infinite labels are rejected.
pub fn load_labeled_photons<P: AsRef<Path>>(path: P) -> Result<Vec<LabeledPhoton>> {
    let path = path.as_ref();
    let mut reader = open_csv(path)?;

    // Pre-allocate (estimate ~100k photons per granule)
    let mut photons = Vec::with_capacity(100_000);

    for (i, result) in reader.deserialize::<LabeledPhotonRecord>().enumerate() {
        let record = result?;
        photons.push(LabeledPhoton {
            along_track_dist: record.along_track_dist,
            elevation: record.egm08_orthometric_height,
            label: finite_label(record.manual_label, i + 1, path)?,
        });
    }

    if photons.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(photons)
}

/// Reference label and classifier prediction of one photon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub label: i64,
    pub prediction: i64,
}

#[derive(Debug, Deserialize)]
struct PredictionRecord {
    manual_label: f64,
    prediction: f64,
}

fn finite_label(value: f64, row: usize, path: &Path) -> Result<i64> {
    if !value.is_finite() {
        return Err(LoaderError::InvalidLabel {
            value,
            row,
            path: path.to_path_buf(),
        });
    }
    Ok(value.round() as i64)
}

/// Load `manual_label` / `prediction` pairs from a classified photon CSV.
///
/// Other columns are ignored. Both values may be written as floats.
pub fn load_predictions<P: AsRef<Path>>(path: P) -> Result<Vec<Prediction>> {
    let path = path.as_ref();
    let mut reader = open_csv(path)?;

    let mut predictions = Vec::new();
    for (i, result) in reader.deserialize::<PredictionRecord>().enumerate() {
        let record = result?;
        predictions.push(Prediction {
            label: finite_label(record.manual_label, i + 1, path)?,
            prediction: finite_label(record.prediction, i + 1, path)?,
        });
    }

    if predictions.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    Ok(predictions)
}

/// Expand a glob pattern into the list of matching file paths.
///
/// Paths are returned in the order the glob facility yields them
/// (alphabetical within each directory). Directories are skipped, and
/// wildcards do not match a leading `.`, as in shell globbing.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::default()
    };
    let entries = glob::glob_with(pattern, options).map_err(|e| LoaderError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?;
        if path.is_file() {
            files.push(path);
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_load_score_rows() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Fold,Acc,F1,F1_r0,Wght_F1,Wght_F1_r0,BA").unwrap();
        writeln!(file, "0,0.91,0.80,0.82,0.88,0.89,0.75").unwrap();
        writeln!(file, "1,0.93,0.81,0.83,0.90,0.91,0.77").unwrap();
        file.flush().unwrap();

        let rows = load_score_rows(file.path())?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fold, Some(0.0));
        assert_eq!(rows[1].get(Metric::BalancedAccuracy), 0.77);
        assert_eq!(rows[1].get(Metric::F1Calibrated), 0.83);

        Ok(())
    }

    #[test]
    fn test_load_score_rows_without_fold_column() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Acc,F1,F1_r0,Wght_F1,Wght_F1_r0,BA,Extra").unwrap();
        writeln!(file, "0.5,0.6,0.7,0.8,0.9,0.4,ignored").unwrap();
        file.flush().unwrap();

        let rows = load_score_rows(file.path())?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].fold, None);
        assert_eq!(rows[0].get(Metric::WeightedF1), 0.8);

        Ok(())
    }

    #[test]
    fn test_load_score_rows_empty() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Fold,Acc,F1,F1_r0,Wght_F1,Wght_F1_r0,BA").unwrap();
        file.flush().unwrap();

        let result = load_score_rows(file.path());
        assert!(matches!(result, Err(LoaderError::EmptyFile(_))));
    }

    #[test]
    fn test_load_score_rows_missing_metric() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Fold,Acc,F1").unwrap();
        writeln!(file, "0,0.9,0.8").unwrap();
        file.flush().unwrap();

        assert!(matches!(load_score_rows(file.path()), Err(LoaderError::Csv(_))));
    }

    #[test]
    fn test_load_labeled_photons() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "index_ph,along_track_dist,egm08_orthometric_height,manual_label").unwrap();
        writeln!(file, "0,10.5,-3.25,40").unwrap();
        writeln!(file, "1,11.0,0.1,41.0").unwrap();
        file.flush().unwrap();

        let photons = load_labeled_photons(file.path())?;
        assert_eq!(photons.len(), 2);
        assert_eq!(photons[0].along_track_dist, 10.5);
        assert_eq!(photons[0].elevation, -3.25);
        assert_eq!(photons[0].label, 40);
        assert_eq!(photons[1].label, 41);

        Ok(())
    }

    #[test]
    fn test_expand_glob_skips_directories() -> Result<()> {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("b.csv")).unwrap();
        File::create(dir.path().join("a.csv")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        std::fs::create_dir(dir.path().join("sub.csv")).unwrap();

        let pattern = format!("{}/*.csv", dir.path().display());
        let files = expand_glob(&pattern)?;

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.csv"));
        assert!(files[1].ends_with("b.csv"));

        Ok(())
    }

    #[test]
    fn test_expand_glob_skips_hidden_files() -> Result<()> {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a.csv")).unwrap();
        File::create(dir.path().join(".hidden.csv")).unwrap();
        File::create(dir.path().join("._b.csv")).unwrap();

        let files = expand_glob(&format!("{}/*.csv", dir.path().display()))?;
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("a.csv"));

        // Naming the dot explicitly still matches
        let hidden = expand_glob(&format!("{}/.*.csv", dir.path().display()))?;
        assert_eq!(hidden.len(), 2);

        Ok(())
    }

    #[test]
    fn test_load_labeled_photons_rejects_nan_label() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "along_track_dist,egm08_orthometric_height,manual_label").unwrap();
        writeln!(file, "10.0,-1.0,40").unwrap();
        writeln!(file, "11.0,-1.5,NaN").unwrap();
        file.flush().unwrap();

        let result = load_labeled_photons(file.path());
        assert!(matches!(result, Err(LoaderError::InvalidLabel { row: 2, .. })));
    }

    #[test]
    fn test_load_predictions() -> Result<()> {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ph_index,manual_label,prediction,geoid_corrected_h").unwrap();
        writeln!(file, "0,40,40.0,-5.0").unwrap();
        writeln!(file, "1,41.0,0,0.3").unwrap();
        file.flush().unwrap();

        let predictions = load_predictions(file.path())?;
        assert_eq!(
            predictions,
            vec![
                Prediction { label: 40, prediction: 40 },
                Prediction { label: 41, prediction: 0 },
            ]
        );

        Ok(())
    }

    #[test]
    fn test_load_predictions_requires_prediction_column() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "manual_label").unwrap();
        writeln!(file, "40").unwrap();
        file.flush().unwrap();

        assert!(matches!(load_predictions(file.path()), Err(LoaderError::Csv(_))));
    }

    #[test]
    fn test_expand_glob_invalid_pattern() {
        let result = expand_glob("data/***.csv");
        assert!(matches!(result, Err(LoaderError::InvalidPattern { .. })));
    }
}
