//! Cross-validation score summaries.
//!
//! Turns per-fold (or per-dataset) score rows into formatted table cells,
//! grouped bar series, and per-metric sorted series with their means.

use thiserror::Error;

use crate::core::loaders::{Metric, ScoreRow};

/// Errors that can occur while summarizing scores.
#[derive(Debug, Error, PartialEq)]
pub enum SummaryError {
    #[error("No score rows to summarize")]
    Empty,

    #[error("Row {row} has no Fold value")]
    MissingFold { row: usize },
}

/// Metrics drawn in the grouped fold bar chart, in legend order.
pub const CHART_METRICS: [Metric; 5] = [
    Metric::F1,
    Metric::F1Calibrated,
    Metric::WeightedF1,
    Metric::WeightedF1Calibrated,
    Metric::BalancedAccuracy,
];

/// Metrics drawn in the per-dataset panel grid, row-major.
pub const PANEL_METRICS: [Metric; 6] = [
    Metric::F1,
    Metric::F1Calibrated,
    Metric::WeightedF1,
    Metric::WeightedF1Calibrated,
    Metric::BalancedAccuracy,
    Metric::Accuracy,
];

/// A formatted score table ready for printing or rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

/// Format a score with three decimals.
#[inline]
pub fn format_score(value: f64) -> String {
    format!("{:.3}", value)
}

/// Format a fold number with no decimals.
#[inline]
pub fn format_fold(value: f64) -> String {
    format!("{:.0}", value)
}

/// Build the display table: fold number followed by every metric.
///
/// # Errors
///
/// Fails on an empty input or a row without a `Fold` value.
pub fn build_score_table(rows: &[ScoreRow]) -> Result<ScoreTable, SummaryError> {
    if rows.is_empty() {
        return Err(SummaryError::Empty);
    }

    let mut headers = Vec::with_capacity(Metric::ALL.len() + 1);
    headers.push("Fold");
    headers.extend(Metric::ALL.iter().map(|m| m.display_name()));

    let mut table_rows = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let fold = row.fold.ok_or(SummaryError::MissingFold { row: i })?;

        let mut cells = Vec::with_capacity(headers.len());
        cells.push(format_fold(fold));
        cells.extend(Metric::ALL.iter().map(|&m| format_score(row.get(m))));
        table_rows.push(cells);
    }

    Ok(ScoreTable {
        headers,
        rows: table_rows,
    })
}

/// One group of bars in the fold chart.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldBars {
    pub label: String,
    pub values: Vec<f64>,
}

/// Group the chart metrics by fold, in input order.
pub fn fold_bar_groups(rows: &[ScoreRow]) -> Result<Vec<FoldBars>, SummaryError> {
    if rows.is_empty() {
        return Err(SummaryError::Empty);
    }

    rows.iter()
        .enumerate()
        .map(|(i, row)| -> Result<FoldBars, SummaryError> {
            let fold = row.fold.ok_or(SummaryError::MissingFold { row: i })?;
            Ok(FoldBars {
                label: format_fold(fold),
                values: CHART_METRICS.iter().map(|&m| row.get(m)).collect(),
            })
        })
        .collect()
}

/// One metric across all datasets, sorted ascending, with its mean.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPanel {
    pub metric: Metric,
    /// `(dataset index, value)` sorted by value.
    pub values: Vec<(usize, f64)>,
    pub mean: f64,
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Build one sorted panel per metric in [`PANEL_METRICS`].
///
/// Datasets are identified by their row index in the input.
pub fn metric_panels(rows: &[ScoreRow]) -> Result<Vec<MetricPanel>, SummaryError> {
    if rows.is_empty() {
        return Err(SummaryError::Empty);
    }

    let panels = PANEL_METRICS
        .iter()
        .map(|&metric| {
            let raw: Vec<f64> = rows.iter().map(|r| r.get(metric)).collect();
            let mut values: Vec<(usize, f64)> = raw.iter().copied().enumerate().collect();
            values.sort_by(|a, b| a.1.total_cmp(&b.1));

            MetricPanel {
                metric,
                values,
                mean: mean(&raw).unwrap_or(0.0),
            }
        })
        .collect();

    Ok(panels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(fold: Option<f64>, base: f64) -> ScoreRow {
        ScoreRow {
            fold,
            acc: base,
            f1: base + 0.01,
            f1_r0: base + 0.02,
            wght_f1: base + 0.03,
            wght_f1_r0: base + 0.04,
            ba: base + 0.05,
        }
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(0.91234), "0.912");
        assert_eq!(format_score(1.0), "1.000");
        assert_eq!(format_fold(3.0), "3");
    }

    #[test]
    fn test_build_score_table() {
        let rows = vec![row(Some(0.0), 0.5), row(Some(1.0), 0.6)];
        let table = build_score_table(&rows).unwrap();

        assert_eq!(table.headers.len(), 7);
        assert_eq!(table.headers[0], "Fold");
        assert_eq!(table.headers[6], "Balanced Accuracy");
        assert_eq!(
            table.rows[1],
            vec!["1", "0.600", "0.610", "0.620", "0.630", "0.640", "0.650"]
        );
    }

    #[test]
    fn test_build_score_table_requires_fold() {
        let rows = vec![row(Some(0.0), 0.5), row(None, 0.6)];
        assert_eq!(
            build_score_table(&rows),
            Err(SummaryError::MissingFold { row: 1 })
        );
        assert_eq!(build_score_table(&[]), Err(SummaryError::Empty));
    }

    #[test]
    fn test_fold_bar_groups() {
        let rows = vec![row(Some(4.0), 0.2)];
        let groups = fold_bar_groups(&rows).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "4");
        assert_eq!(groups[0].values.len(), CHART_METRICS.len());
        assert!((groups[0].values[0] - 0.21).abs() < 1e-12);
        assert!((groups[0].values[4] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[0.5, 1.0, 0.0]), Some(0.5));
    }

    #[test]
    fn test_metric_panels_sorted_with_mean() {
        let rows = vec![row(None, 0.9), row(None, 0.1), row(None, 0.5)];
        let panels = metric_panels(&rows).unwrap();

        assert_eq!(panels.len(), 6);
        assert_eq!(panels[5].metric, Metric::Accuracy);

        let acc = &panels[5];
        let order: Vec<usize> = acc.values.iter().map(|(i, _)| *i).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert!((acc.mean - 0.5).abs() < 1e-12);
    }
}
