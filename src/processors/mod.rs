//! Data processing modules.

pub mod filtering;
pub mod folds;
pub mod scoring;
pub mod segments;
pub mod summary;

// Re-export key types for convenience
pub use filtering::{filter_by_elevation, filter_records, ElevationWindow, FilterError, FilterStats};
pub use folds::{
    assign_folds, copy_commands, files_per_fold, generator_seed, partition, shuffle_files,
    ConfigurationError, CopyInstruction, FoldParams, FoldSplit,
};
pub use scoring::{score_predictions, ConfusionMatrix, ScoreReport, ScoringError};
pub use segments::{
    bucket_segments, label_counts, select_segment, SegmentError, SegmentLayout,
};
pub use summary::{
    build_score_table, fold_bar_groups, metric_panels, FoldBars, MetricPanel, ScoreTable,
    SummaryError,
};
