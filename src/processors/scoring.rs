//! One-vs-rest scoring of photon classifications.
//!
//! Every photon is reduced to "the scored class" or "not the scored class"
//! (class 0) on both the reference and the predicted side. A confusion matrix
//! is kept for class 0 and for the scored class; the weighted scores average
//! the per-class values by support.

use std::collections::BTreeMap;

use log::debug;
use thiserror::Error;

use crate::core::loaders::Prediction;

/// Errors that can occur while scoring predictions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error("No predictions to score")]
    Empty,
}

/// Binary confusion matrix of one class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_positives: u64,
    pub true_negatives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
}

impl ConfusionMatrix {
    /// Record one observation.
    pub fn update(&mut self, is_present: bool, is_predicted: bool) {
        match (is_present, is_predicted) {
            (true, true) => self.true_positives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_positives += 1,
            (true, false) => self.false_negatives += 1,
        }
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Observations where the class is actually present.
    #[inline]
    pub fn support(&self) -> u64 {
        self.true_positives + self.false_negatives
    }

    /// `(tp + tn) / total`, NaN when empty.
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// `2 tp / (2 tp + fp + fn)`, NaN when the class is neither present
    /// nor predicted.
    pub fn f1(&self) -> f64 {
        ratio(
            2 * self.true_positives,
            2 * self.true_positives + self.false_positives + self.false_negatives,
        )
    }

    /// Mean of the true positive and true negative rates.
    ///
    /// NaN when either rate is undefined.
    pub fn balanced_accuracy(&self) -> f64 {
        let tpr = ratio(self.true_positives, self.support());
        let tnr = ratio(
            self.true_negatives,
            self.true_negatives + self.false_positives,
        );
        (tpr + tnr) / 2.0
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        f64::NAN
    } else {
        num as f64 / den as f64
    }
}

/// Per-class matrices and support-weighted scores.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    /// The class scored against everything else.
    pub class: i64,
    /// Matrices for class 0 and `class`, ordered by class.
    pub matrices: BTreeMap<i64, ConfusionMatrix>,
    pub weighted_accuracy: f64,
    pub weighted_f1: f64,
    pub weighted_balanced_accuracy: f64,
}

/// Collapse a label onto `class` or 0.
#[inline]
fn one_vs_rest(label: i64, class: i64) -> i64 {
    if label == class {
        class
    } else {
        0
    }
}

/// Support-weighted sum of a score over all matrices, skipping NaN scores.
fn weighted(
    matrices: &BTreeMap<i64, ConfusionMatrix>,
    score: impl Fn(&ConfusionMatrix) -> f64,
) -> f64 {
    matrices
        .values()
        .filter_map(|cm| {
            let value = score(cm);
            if value.is_nan() || cm.total() == 0 {
                None
            } else {
                Some(value * cm.support() as f64 / cm.total() as f64)
            }
        })
        .sum()
}

/// Score predictions of `class` against everything else.
///
/// Matrices are kept for class 0 and `class` even if neither occurs.
///
/// # Errors
///
/// Fails on an empty input.
pub fn score_predictions(
    predictions: &[Prediction],
    class: i64,
) -> Result<ScoreReport, ScoringError> {
    if predictions.is_empty() {
        return Err(ScoringError::Empty);
    }

    let mut matrices = BTreeMap::new();
    matrices.insert(0, ConfusionMatrix::default());
    matrices.insert(class, ConfusionMatrix::default());

    for p in predictions {
        let actual = one_vs_rest(p.label, class);
        let predicted = one_vs_rest(p.prediction, class);
        for (&key, cm) in matrices.iter_mut() {
            cm.update(actual == key, predicted == key);
        }
    }
    debug!("scored {} photons for class {}", predictions.len(), class);

    Ok(ScoreReport {
        class,
        weighted_accuracy: weighted(&matrices, ConfusionMatrix::accuracy),
        weighted_f1: weighted(&matrices, ConfusionMatrix::f1),
        weighted_balanced_accuracy: weighted(&matrices, ConfusionMatrix::balanced_accuracy),
        matrices,
    })
}
