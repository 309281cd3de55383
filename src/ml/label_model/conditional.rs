//! Per-source conditional probability tables derived from `mu`.

use ndarray::{Array2, ArrayView2, s};
use serde::Serialize;

use super::error::LabelModelError;
use super::loss::{MU_CLIP_MAX, MU_CLIP_MIN};

/// `P(source = value | label)` for every source, with value `0` reserved for abstains.
#[derive(Debug, Clone)]
pub struct ConditionalProbabilities {
    num_classes: usize,
    /// One `(c + 1) x c` table per source; row 0 is the abstain row.
    tables: Vec<Array2<f32>>,
}

impl ConditionalProbabilities {
    /// Split `mu` (`num_sources·c x c`) into per-source tables; needs at least two sources.
    ///
    /// The abstain probability follows from the law of total probability as one minus
    /// the mass of the source's class rows.
    pub fn from_mu(mu: ArrayView2<'_, f32>) -> Result<Self, LabelModelError> {
        let (k, c) = mu.dim();
        if c < 2 {
            return Err(LabelModelError::invalid(
                "ConditionalProbabilities",
                format!("mu needs at least 2 class columns (got {c})"),
            ));
        }
        if k <= c || k % c != 0 {
            return Err(LabelModelError::shape(
                "ConditionalProbabilities: mu rows",
                format!("a multiple of {c} covering at least 2 sources"),
                k,
            ));
        }
        let tables = (0..k / c)
            .map(|source| {
                let block = mu.slice(s![source * c..(source + 1) * c, ..]);
                let mut table = Array2::<f32>::zeros((c + 1, c));
                table.slice_mut(s![1.., ..]).assign(&block);
                let mass = block.sum_axis(ndarray::Axis(0));
                table.row_mut(0).assign(&mass.mapv(|m| 1.0 - m));
                table
            })
            .collect();
        Ok(Self {
            num_classes: c,
            tables,
        })
    }

    pub fn num_sources(&self) -> usize {
        self.tables.len()
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// `P(source = value | label)`, clipped like `mu` during inference.
    ///
    /// `value` is 0 for an abstain and `1..=c` for a vote on class `value - 1`; `label`
    /// is the 0-based latent class. Returns `None` when an index is out of range.
    pub fn get(&self, source: usize, value: usize, label: usize) -> Option<f32> {
        let table = self.tables.get(source)?;
        table
            .get((value, label))
            .map(|p| p.clamp(MU_CLIP_MIN, MU_CLIP_MAX))
    }

    /// Flatten into rows of `(source, latent label, [abstain, class_0, ..])`.
    pub fn rows(&self) -> Vec<ConditionalRow> {
        let mut rows = Vec::with_capacity(self.num_sources() * self.num_classes);
        for source in 0..self.num_sources() {
            for label in 0..self.num_classes {
                let probabilities = (0..=self.num_classes)
                    .filter_map(|value| self.get(source, value, label))
                    .collect();
                rows.push(ConditionalRow {
                    source,
                    label,
                    probabilities,
                });
            }
        }
        rows
    }
}

/// One row of the flattened statistics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionalRow {
    pub source: usize,
    pub label: usize,
    /// Abstain first, then one entry per class.
    pub probabilities: Vec<f32>,
}
