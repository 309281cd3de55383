//! Augmentation of raw source votes into the label model's indicator features.
//!
//! Every source owns a block of `num_classes` columns. A hard vote sets one column of
//! its block to 1, a soft vote copies its probabilities, and an abstain leaves the
//! block at zero.

use ndarray::{Array1, Array2, ArrayViewMut1, s};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AugmentError {
    #[error("Row {row} has {actual} votes (expected {expected})")]
    VoteCount {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Row {row}, source {source_idx}: class {class} is out of range ({num_classes} classes)")]
    ClassOutOfRange {
        row: usize,
        source_idx: usize,
        class: usize,
        num_classes: usize,
    },
    #[error("Row {row}, source {source_idx}: {actual} probabilities (expected {expected})")]
    ProbabilityCount {
        row: usize,
        source_idx: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Row {row}, source {source_idx}: probabilities must be finite and within [0, 1]")]
    InvalidProbability { row: usize, source_idx: usize },
}

/// A single source's output for one example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceVote {
    /// The source did not vote.
    Abstain,
    /// Hard vote for a 0-based class index.
    Class(usize),
    /// Soft vote with one probability per class.
    Probabilities(Vec<f32>),
}

/// Builds augmented label rows for a fixed set of sources and classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelMatrixBuilder {
    num_sources: usize,
    num_classes: usize,
}

impl LabelMatrixBuilder {
    pub fn new(num_sources: usize, num_classes: usize) -> Self {
        Self {
            num_sources,
            num_classes,
        }
    }

    pub fn num_sources(&self) -> usize {
        self.num_sources
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Number of augmented columns (`num_sources · num_classes`).
    pub fn width(&self) -> usize {
        self.num_sources * self.num_classes
    }

    /// Augment a single row; `row_idx` is only used for error messages.
    pub fn augment_row(
        &self,
        row_idx: usize,
        votes: &[SourceVote],
    ) -> Result<Array1<f32>, AugmentError> {
        let mut out = Array1::<f32>::zeros(self.width());
        self.fill_row(row_idx, votes, out.view_mut())?;
        Ok(out)
    }

    /// Augment a batch of rows into an `n x width` matrix.
    pub fn augment<R: AsRef<[SourceVote]>>(&self, rows: &[R]) -> Result<Array2<f32>, AugmentError> {
        let mut out = Array2::<f32>::zeros((rows.len(), self.width()));
        for (row_idx, (votes, dest)) in rows.iter().zip(out.rows_mut()).enumerate() {
            self.fill_row(row_idx, votes.as_ref(), dest)?;
        }
        Ok(out)
    }

    fn fill_row(
        &self,
        row: usize,
        votes: &[SourceVote],
        mut dest: ArrayViewMut1<'_, f32>,
    ) -> Result<(), AugmentError> {
        if votes.len() != self.num_sources {
            return Err(AugmentError::VoteCount {
                row,
                expected: self.num_sources,
                actual: votes.len(),
            });
        }
        let c = self.num_classes;
        for (source_idx, vote) in votes.iter().enumerate() {
            let mut block = dest.slice_mut(s![source_idx * c..(source_idx + 1) * c]);
            match vote {
                SourceVote::Abstain => {}
                SourceVote::Class(class) => {
                    if *class >= c {
                        return Err(AugmentError::ClassOutOfRange {
                            row,
                            source_idx,
                            class: *class,
                            num_classes: c,
                        });
                    }
                    block[*class] = 1.0;
                }
                SourceVote::Probabilities(probs) => {
                    if probs.len() != c {
                        return Err(AugmentError::ProbabilityCount {
                            row,
                            source_idx,
                            expected: c,
                            actual: probs.len(),
                        });
                    }
                    if probs.iter().any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0) {
                        return Err(AugmentError::InvalidProbability { row, source_idx });
                    }
                    for (dst, p) in block.iter_mut().zip(probs) {
                        *dst = *p;
                    }
                }
            }
        }
        Ok(())
    }
}
