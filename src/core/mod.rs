//! Core data types and I/O operations.

pub mod loaders;
pub mod writers;

pub use loaders::{LabeledPhoton, Metric, Prediction, ScoreRow};
pub use writers::{
    write_copy_commands, write_csv_records, write_score_report, write_text_table, WriteError,
};
