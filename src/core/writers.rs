//! Data writers for copy instructions, text tables and CSV records.
//!
//! This module provides functions for writing tool output:
//! - `cp <source> <destination>` shell instructions for fold splits
//! - Aligned plain-text tables of formatted scores
//! - Tab-separated classification score reports
//! - CSV files built from a header and string records

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::processors::folds::CopyInstruction;
use crate::processors::scoring::ScoreReport;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to a file or stream.
    #[error("failed to write to '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// A table row does not have one cell per header.
    #[error("table row {row} has {cells} cells, expected {expected}")]
    RowWidthMismatch {
        row: usize,
        cells: usize,
        expected: usize,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
pub(crate) fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Write one `cp` line per instruction, in the given order.
///
/// `target` names the stream in error messages (e.g. `<stdout>`).
pub fn write_copy_commands<W: Write>(
    out: &mut W,
    instructions: &[CopyInstruction],
    target: &str,
) -> Result<()> {
    for instruction in instructions {
        writeln!(out, "{}", instruction).map_err(|e| WriteError::WriteFile {
            path: target.to_string(),
            source: e,
        })?;
    }

    out.flush().map_err(|e| WriteError::WriteFile {
        path: target.to_string(),
        source: e,
    })?;

    Ok(())
}

/// Write a plain-text table with columns padded to their widest cell.
///
/// Columns are separated by two spaces; a dashed rule follows the header.
pub fn write_text_table<W: Write>(
    out: &mut W,
    headers: &[&str],
    rows: &[Vec<String>],
    target: &str,
) -> Result<()> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();

    for (i, row) in rows.iter().enumerate() {
        if row.len() != headers.len() {
            return Err(WriteError::RowWidthMismatch {
                row: i,
                cells: row.len(),
                expected: headers.len(),
            });
        }
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let header_line = render_row(headers.iter().copied(), &widths);
    let rule = "-".repeat(header_line.chars().count());

    let map_err = |e| WriteError::WriteFile {
        path: target.to_string(),
        source: e,
    };

    writeln!(out, "{}", header_line).map_err(map_err)?;
    writeln!(out, "{}", rule).map_err(map_err)?;
    for row in rows {
        writeln!(out, "{}", render_row(row.iter().map(String::as_str), &widths)).map_err(map_err)?;
    }

    out.flush().map_err(map_err)?;

    Ok(())
}

fn render_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &w)| format!("{:>w$}", cell, w = w))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Write a score report as tab-separated per-class rows followed by the
/// weighted scores. Scores have three decimals; undefined scores print `NaN`.
pub fn write_score_report<W: Write>(out: &mut W, report: &ScoreReport, target: &str) -> Result<()> {
    let map_err = |e| WriteError::WriteFile {
        path: target.to_string(),
        source: e,
    };

    writeln!(out, "cls\tacc\tF1\tbal_acc\ttp\ttn\tfp\tfn\tsupport\ttotal").map_err(map_err)?;
    for (class, cm) in &report.matrices {
        writeln!(
            out,
            "{}\t{:.3}\t{:.3}\t{:.3}\t{}\t{}\t{}\t{}\t{}\t{}",
            class,
            cm.accuracy(),
            cm.f1(),
            cm.balanced_accuracy(),
            cm.true_positives,
            cm.true_negatives,
            cm.false_positives,
            cm.false_negatives,
            cm.support(),
            cm.total()
        )
        .map_err(map_err)?;
    }
    writeln!(out, "weighted_accuracy = {:.3}", report.weighted_accuracy).map_err(map_err)?;
    writeln!(out, "weighted_F1 = {:.3}", report.weighted_f1).map_err(map_err)?;
    writeln!(out, "weighted_bal_acc = {:.3}", report.weighted_balanced_accuracy).map_err(map_err)?;

    out.flush().map_err(map_err)?;

    Ok(())
}

/// Write a CSV file from a header record and data records.
///
/// Parent directories are created if needed.
pub fn write_csv_records(
    path: &Path,
    headers: &csv::StringRecord,
    records: &[csv::StringRecord],
) -> Result<()> {
    ensure_parent_dirs(path)?;

    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));

    let path_str = path.display().to_string();

    csv_writer
        .write_record(headers)
        .map_err(|e| WriteError::CsvError {
            path: path_str.clone(),
            source: e,
        })?;

    for record in records {
        csv_writer
            .write_record(record)
            .map_err(|e| WriteError::CsvError {
                path: path_str.clone(),
                source: e,
            })?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str,
        source: e,
    })?;

    Ok(())
}
