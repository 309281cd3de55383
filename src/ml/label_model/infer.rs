//! Posterior class probabilities from a fitted label model.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::error::{LabelModelError, dims};
use super::loss::proba_mu;

/// Compute `P(y | votes)` for every row of `l_aug`.
///
/// Scores are `L'·(diag(jtm)·log(clip(mu))) + log(diag(P))`, normalized row-wise. The
/// dependency weights `jtm` are all ones: sources are treated as conditionally
/// independent, so the weighting reduces to the identity. Rows are shifted by their
/// maximum score before exponentiation, which leaves the distribution unchanged.
pub fn infer(
    mu: ArrayView2<'_, f32>,
    class_balance: ArrayView1<'_, f32>,
    l_aug: ArrayView2<'_, f32>,
) -> Result<Array2<f32>, LabelModelError> {
    let (k, c) = mu.dim();
    if class_balance.len() != c {
        return Err(LabelModelError::shape(
            "infer: P vs mu columns",
            c,
            class_balance.len(),
        ));
    }
    let (n, width) = l_aug.dim();
    if width != k {
        return Err(LabelModelError::shape(
            "infer: L' width vs mu rows",
            dims(n, k),
            dims(n, width),
        ));
    }
    if !l_aug.iter().all(|v| v.is_finite()) {
        return Err(LabelModelError::NumericInstability { context: "infer" });
    }

    let jtm = Array1::<f32>::ones(width);
    let log_mu = proba_mu(mu).mapv(f32::ln);
    let weighted = &log_mu * &jtm.insert_axis(Axis(1));
    let log_prior = class_balance.mapv(f32::ln);
    let mut scores = l_aug.dot(&weighted) + &log_prior;

    for mut row in scores.rows_mut() {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if !max.is_finite() {
            return Err(LabelModelError::NumericInstability { context: "infer" });
        }
        row.mapv_inplace(|v| (v - max).exp());
        let z: f32 = row.sum();
        row.mapv_inplace(|v| v / z);
    }
    Ok(scores)
}

/// Index of the most probable class per row.
pub fn predict_class_indices(probabilities: ArrayView2<'_, f32>) -> Vec<usize> {
    probabilities
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0usize;
            let mut best_val = f32::NEG_INFINITY;
            for (idx, &p) in row.iter().enumerate() {
                if p > best_val {
                    best_val = p;
                    best = idx;
                }
            }
            best
        })
        .collect()
}
