//! Deterministic k-fold partitioning of file sets.
//!
//! Files are shuffled with a ChaCha12 generator seeded from the caller's
//! seed, cut into consecutive chunks of `ceil(N / folds)` files, and the chunk whose
//! index equals the held-out fold becomes the testing group.
//!
//! # Example
//!
//! ```
//! use bathy_tools::processors::folds::{partition, FoldParams};
//! use std::path::PathBuf;
//!
//! let files: Vec<PathBuf> = ["a", "b", "c", "d"].iter().map(PathBuf::from).collect();
//! let params = FoldParams { fold: 1, folds: 2, random_seed: 123 };
//! let split = partition(&files, &params).unwrap();
//! assert_eq!(split.testing.len(), 2);
//! assert_eq!(split.training.len(), 2);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use thiserror::Error;

/// Invalid combination of fold index, fold count and file count.
///
/// Always fatal: no instructions are produced once one of these is raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("'folds' cannot be 0")]
    ZeroFolds,

    #[error("'fold' must be less than 'folds' (fold = {fold}, folds = {folds})")]
    FoldOutOfRange { fold: usize, folds: usize },

    #[error("insufficient files for requested fold count: {files} files, {folds} folds")]
    InsufficientFiles { files: usize, folds: usize },
}

/// Fold selection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldParams {
    /// Held-out fold index.
    pub fold: usize,
    /// Total number of folds.
    pub folds: usize,
    /// Seed for the shuffle. Negative seeds are valid.
    pub random_seed: i64,
}

impl FoldParams {
    /// Check the fold index against the fold count.
    ///
    /// This does not need the file set, so callers can run it before
    /// enumerating any files.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.folds == 0 {
            return Err(ConfigurationError::ZeroFolds);
        }
        if self.fold >= self.folds {
            return Err(ConfigurationError::FoldOutOfRange {
                fold: self.fold,
                folds: self.folds,
            });
        }
        Ok(())
    }

    /// Check the parameters against a file count.
    pub fn validate_for(&self, file_count: usize) -> Result<(), ConfigurationError> {
        self.validate()?;
        if file_count < self.folds {
            return Err(ConfigurationError::InsufficientFiles {
                files: file_count,
                folds: self.folds,
            });
        }
        Ok(())
    }
}

/// Number of files placed in each fold: `ceil(total / folds)`.
///
/// `folds` must be non-zero.
#[inline]
pub fn files_per_fold(total: usize, folds: usize) -> usize {
    total.div_ceil(folds)
}

/// Generator seed for a signed seed: the two's complement bit pattern.
#[inline]
pub fn generator_seed(seed: i64) -> u64 {
    seed as u64
}

/// Shuffle a file set in place with a generator seeded from `seed`.
///
/// The generator is local to the call; the same seed and input order always
/// give the same permutation.
pub fn shuffle_files(files: &mut [PathBuf], seed: i64) {
    let mut rng = ChaCha12Rng::seed_from_u64(generator_seed(seed));
    files.shuffle(&mut rng);
}

/// Fold index of every file, in shuffled order.
///
/// Trailing folds may receive no files when the count does not divide
/// evenly; e.g. 5 files in 4 folds gives chunks of 2, 2, 1 and fold 3 is
/// empty.
pub fn assign_folds(total: usize, folds: usize) -> Vec<usize> {
    let per_fold = files_per_fold(total, folds);
    (0..total).map(|i| i / per_fold).collect()
}

/// A training/testing split in shuffled traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldSplit {
    pub training: Vec<PathBuf>,
    pub testing: Vec<PathBuf>,
    /// Files per fold used for the cut.
    pub files_per_fold: usize,
    /// Every file with its fold index, in shuffled order.
    pub shuffled: Vec<(PathBuf, usize)>,
}

impl FoldSplit {
    /// Total number of files in the split.
    #[inline]
    pub fn len(&self) -> usize {
        self.shuffled.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shuffled.is_empty()
    }

    /// Copy instructions for every file in shuffled order.
    pub fn copy_instructions(
        &self,
        held_out_fold: usize,
        training_dir: &Path,
        testing_dir: &Path,
    ) -> Vec<CopyInstruction> {
        self.shuffled
            .iter()
            .map(|(source, fold)| CopyInstruction {
                source: source.clone(),
                destination: if *fold == held_out_fold {
                    testing_dir.to_path_buf()
                } else {
                    training_dir.to_path_buf()
                },
            })
            .collect()
    }
}

/// Partition a file set into training and testing groups.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] when `folds` is zero, `fold >= folds`,
/// or there are fewer files than folds.
pub fn partition(files: &[PathBuf], params: &FoldParams) -> Result<FoldSplit, ConfigurationError> {
    params.validate_for(files.len())?;

    let mut shuffled = files.to_vec();
    shuffle_files(&mut shuffled, params.random_seed);

    let per_fold = files_per_fold(shuffled.len(), params.folds);
    let assignment = assign_folds(shuffled.len(), params.folds);
    debug!(
        "{} files, {} per fold, held-out fold {}",
        shuffled.len(),
        per_fold,
        params.fold
    );

    let mut split = FoldSplit {
        files_per_fold: per_fold,
        shuffled: Vec::with_capacity(shuffled.len()),
        ..FoldSplit::default()
    };

    for (path, fold) in shuffled.into_iter().zip(assignment) {
        if fold == params.fold {
            split.testing.push(path.clone());
        } else {
            split.training.push(path.clone());
        }
        split.shuffled.push((path, fold));
    }

    Ok(split)
}

/// A single file copy: `cp <source> <destination>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyInstruction {
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl fmt::Display for CopyInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cp {} {}", self.source.display(), self.destination.display())
    }
}

/// Partition `files` and build the copy instructions for the held-out fold.
pub fn copy_commands(
    files: &[PathBuf],
    params: &FoldParams,
    training_dir: &Path,
    testing_dir: &Path,
) -> Result<Vec<CopyInstruction>, ConfigurationError> {
    let split = partition(files, params)?;
    Ok(split.copy_instructions(params.fold, training_dir, testing_dir))
}
