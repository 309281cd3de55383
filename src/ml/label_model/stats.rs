//! Empirical second moments of augmented label matrices.

use ndarray::{Array2, ArrayView1, ArrayView2};

use super::error::{LabelModelError, dims};

/// Compute `O = Lᵀ·L / n` for a batch of augmented label rows.
pub fn second_moment(l_aug: ArrayView2<'_, f32>) -> Result<Array2<f32>, LabelModelError> {
    let (n, k) = l_aug.dim();
    if n == 0 {
        return Err(LabelModelError::shape(
            "second_moment",
            "at least one row",
            dims(n, k),
        ));
    }
    if !l_aug.iter().all(|v| v.is_finite()) {
        return Err(LabelModelError::NumericInstability {
            context: "second_moment",
        });
    }
    let mut o = l_aug.t().dot(&l_aug);
    o.mapv_inplace(|v| v / n as f32);
    Ok(o)
}

/// Streaming variant of [`second_moment`] that consumes one augmented row at a time.
///
/// Sums are kept in `f64` so long streams do not drift; the result matches the batch
/// computation up to `f32` rounding.
#[derive(Debug, Clone)]
pub struct SecondMomentAccumulator {
    width: usize,
    sums: Array2<f64>,
    rows: u64,
}

impl SecondMomentAccumulator {
    pub fn new(width: usize) -> Self {
        Self {
            width,
            sums: Array2::zeros((width, width)),
            rows: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows consumed so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Add the outer product of `row` with itself.
    pub fn push(&mut self, row: ArrayView1<'_, f32>) -> Result<(), LabelModelError> {
        if row.len() != self.width {
            return Err(LabelModelError::shape(
                "SecondMomentAccumulator::push",
                self.width,
                row.len(),
            ));
        }
        if !row.iter().all(|v| v.is_finite()) {
            return Err(LabelModelError::NumericInstability {
                context: "SecondMomentAccumulator::push",
            });
        }
        for (i, &a) in row.iter().enumerate() {
            if a == 0.0 {
                continue;
            }
            // Upper triangle only; mirrored in finish().
            for j in i..self.width {
                let b = row[j];
                if b != 0.0 {
                    self.sums[[i, j]] += f64::from(a) * f64::from(b);
                }
            }
        }
        self.rows += 1;
        Ok(())
    }

    /// Normalize the accumulated sums into `O`.
    pub fn finish(&self) -> Result<Array2<f32>, LabelModelError> {
        if self.rows == 0 {
            return Err(LabelModelError::shape(
                "SecondMomentAccumulator::finish",
                "at least one row",
                "0 rows",
            ));
        }
        let n = self.rows as f64;
        let k = self.width;
        Ok(Array2::from_shape_fn((k, k), |(i, j)| {
            let (lo, hi) = if i <= j { (i, j) } else { (j, i) };
            (self.sums[[lo, hi]] / n) as f32
        }))
    }
}
