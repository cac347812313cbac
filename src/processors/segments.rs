//! Along-track segmentation of labeled photons.
//!
//! A granule is cut into fixed-length windows of along-track distance
//! starting at the smallest distance present. Window `s` spans
//! `(min + s * size, min + (s + 1) * size)`, both ends exclusive.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::core::loaders::LabeledPhoton;

/// Errors that can occur during segmentation.
#[derive(Debug, Error, PartialEq)]
pub enum SegmentError {
    #[error("Segment size must be positive")]
    ZeroSegmentSize,

    #[error("No photons to segment")]
    NoPhotons,

    #[error("Segment {segment} out of range (0..{total})")]
    OutOfRange { segment: usize, total: usize },
}

/// Along-track layout of a photon set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentLayout {
    pub min_x: f64,
    pub max_x: f64,
    pub segment_size: u64,
    pub total_segments: usize,
}

impl SegmentLayout {
    /// Compute the layout for a photon set.
    ///
    /// `total_segments = floor(max_x - min_x) / segment_size + 1`.
    pub fn from_photons(
        photons: &[LabeledPhoton],
        segment_size: u64,
    ) -> Result<Self, SegmentError> {
        if segment_size == 0 {
            return Err(SegmentError::ZeroSegmentSize);
        }
        if photons.is_empty() {
            return Err(SegmentError::NoPhotons);
        }

        let (min_x, max_x) = photons.iter().fold((f64::MAX, f64::MIN), |(lo, hi), p| {
            (lo.min(p.along_track_dist), hi.max(p.along_track_dist))
        });

        let length = (max_x - min_x) as u64;
        let total_segments = (length / segment_size) as usize + 1;

        Ok(Self {
            min_x,
            max_x,
            segment_size,
            total_segments,
        })
    }

    /// Exclusive along-track bounds of segment `segment`.
    pub fn bounds(&self, segment: usize) -> Result<(f64, f64), SegmentError> {
        if segment >= self.total_segments {
            return Err(SegmentError::OutOfRange {
                segment,
                total: self.total_segments,
            });
        }
        let size = self.segment_size as f64;
        let x1 = self.min_x + segment as f64 * size;
        let x2 = self.min_x + (segment + 1) as f64 * size;
        Ok((x1, x2))
    }

    /// Segment strictly containing `x`, if any.
    pub fn segment_of(&self, x: f64) -> Option<usize> {
        let offset = (x - self.min_x) / self.segment_size as f64;
        if !offset.is_finite() || offset < 0.0 {
            return None;
        }
        let guess = offset.floor() as usize;

        // Rounding in the division can land one off near a boundary
        let candidates = [guess.checked_sub(1), Some(guess), guess.checked_add(1)];
        candidates.into_iter().flatten().find(|&s| {
            self.bounds(s)
                .map(|(x1, x2)| x > x1 && x < x2)
                .unwrap_or(false)
        })
    }
}

/// Photons strictly inside segment `segment`.
///
/// Photons exactly on a boundary (including the very first photon at
/// `min_x`) belong to no segment.
pub fn select_segment(
    photons: &[LabeledPhoton],
    layout: &SegmentLayout,
    segment: usize,
) -> Result<Vec<LabeledPhoton>, SegmentError> {
    let (x1, x2) = layout.bounds(segment)?;
    Ok(photons
        .iter()
        .filter(|p| p.along_track_dist > x1 && p.along_track_dist < x2)
        .copied()
        .collect())
}

/// Distribute photons over every segment in a single pass.
///
/// Equivalent to calling [`select_segment`] for each segment; photons keep
/// their input order within a segment.
pub fn bucket_segments(
    photons: &[LabeledPhoton],
    layout: &SegmentLayout,
) -> Vec<Vec<LabeledPhoton>> {
    let mut buckets = vec![Vec::new(); layout.total_segments];
    for p in photons {
        if let Some(s) = layout.segment_of(p.along_track_dist) {
            buckets[s].push(*p);
        }
    }
    buckets
}

/// Count photons per class label.
pub fn label_counts(photons: &[LabeledPhoton]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for p in photons {
        *counts.entry(p.label).or_insert(0) += 1;
    }
    counts
}
