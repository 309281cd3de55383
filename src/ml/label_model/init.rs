//! Starting values for training.

use ndarray::{Array1, Array2, ArrayView1};

use super::error::LabelModelError;

/// Precision assumed for every source before training.
pub const DEFAULT_INITIAL_PRECISION: f32 = 0.7;

/// Class balance with equal mass on every class.
pub fn uniform_class_balance(num_classes: usize) -> Array1<f32> {
    Array1::from_elem(num_classes, 1.0 / num_classes.max(1) as f32)
}

/// Moment-based starting point for `mu`.
///
/// For source `j` and class `y` the diagonal entry `mu[j·c + y][y]` is set to
/// `diag(O)[j·c + y] · precision[j] / p[y]`, clipped to `[0, 1]`; every other entry
/// starts at zero.
pub fn initial_mu(
    o_diag: ArrayView1<'_, f32>,
    precisions: ArrayView1<'_, f32>,
    class_balance: ArrayView1<'_, f32>,
) -> Result<Array2<f32>, LabelModelError> {
    let c = class_balance.len();
    let s = precisions.len();
    if c == 0 {
        return Err(LabelModelError::shape("initial_mu", "at least one class", 0));
    }
    if o_diag.len() != s * c {
        return Err(LabelModelError::shape(
            "initial_mu: diag(O) vs sources x classes",
            s * c,
            o_diag.len(),
        ));
    }
    if class_balance.iter().any(|p| !p.is_finite() || *p <= 0.0) {
        return Err(LabelModelError::invalid(
            "initial_mu",
            "class balance entries must be finite and > 0",
        ));
    }
    if !o_diag.iter().chain(precisions.iter()).all(|v| v.is_finite()) {
        return Err(LabelModelError::NumericInstability {
            context: "initial_mu",
        });
    }

    let mut mu = Array2::<f32>::zeros((s * c, c));
    for j in 0..s {
        for y in 0..c {
            let idx = j * c + y;
            mu[[idx, y]] = (o_diag[idx] * precisions[j] / class_balance[y]).clamp(0.0, 1.0);
        }
    }
    Ok(mu)
}
