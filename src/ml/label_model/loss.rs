//! Masked matrix-completion loss and its gradient with respect to `mu`.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Zip};

use super::error::{LabelModelError, dims};

/// Lower clamp applied to `mu` before taking logs.
pub const MU_CLIP_MIN: f32 = 0.01;
/// Upper clamp applied to `mu` before taking logs.
pub const MU_CLIP_MAX: f32 = 0.99;

/// Clip `mu` into `[MU_CLIP_MIN, MU_CLIP_MAX]`.
pub fn proba_mu(mu: ArrayView2<'_, f32>) -> Array2<f32> {
    mu.mapv(|v| v.clamp(MU_CLIP_MIN, MU_CLIP_MAX))
}

/// The two loss terms, reported separately so callers can see which one dominates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossTerms {
    /// `‖(O − mu·P·muᵀ)[mask]‖²`.
    pub masked: f32,
    /// `‖rowsum(mu·P) − diag(O)‖²`.
    pub marginal: f32,
}

impl LossTerms {
    pub fn total(&self) -> f32 {
        self.masked + self.marginal
    }
}

/// Borrowed view over everything the loss depends on.
#[derive(Debug, Clone, Copy)]
pub struct LossInputs<'a> {
    pub mu: ArrayView2<'a, f32>,
    pub class_balance: ArrayView1<'a, f32>,
    pub second_moment: ArrayView2<'a, f32>,
    pub mask: ArrayView2<'a, bool>,
}

impl LossInputs<'_> {
    /// Check the cross-parameter shape invariants.
    pub fn validate(&self) -> Result<(), LabelModelError> {
        let (k, c) = self.mu.dim();
        if self.class_balance.len() != c {
            return Err(LabelModelError::shape(
                "loss: P vs mu columns",
                c,
                self.class_balance.len(),
            ));
        }
        if self.second_moment.dim() != (k, k) {
            let (rows, cols) = self.second_moment.dim();
            return Err(LabelModelError::shape(
                "loss: O vs mu rows",
                dims(k, k),
                dims(rows, cols),
            ));
        }
        if self.mask.dim() != (k, k) {
            let (rows, cols) = self.mask.dim();
            return Err(LabelModelError::shape(
                "loss: mask vs O",
                dims(k, k),
                dims(rows, cols),
            ));
        }
        Ok(())
    }
}

/// Intermediate quantities shared by the loss value and its gradient.
struct Residuals {
    /// `mask ∘ (O − mu·P·muᵀ)`.
    masked: Array2<f32>,
    /// `rowsum(mu·P) − diag(O)`.
    marginal: Array1<f32>,
}

fn residuals(inputs: &LossInputs<'_>) -> Residuals {
    let mu_p = scale_columns(inputs.mu, inputs.class_balance);
    let implied = mu_p.dot(&inputs.mu.t());
    let mut masked = &inputs.second_moment - &implied;
    Zip::from(&mut masked)
        .and(&inputs.mask)
        .for_each(|r, &keep| {
            if !keep {
                *r = 0.0;
            }
        });
    let marginal = mu_p.sum_axis(ndarray::Axis(1)) - &inputs.second_moment.diag();
    Residuals { masked, marginal }
}

/// `mu · diag(p)` without materializing the diagonal matrix.
fn scale_columns(mu: ArrayView2<'_, f32>, p: ArrayView1<'_, f32>) -> Array2<f32> {
    &mu * &p
}

/// Evaluate both loss terms.
pub fn loss(inputs: &LossInputs<'_>) -> Result<LossTerms, LabelModelError> {
    inputs.validate()?;
    let res = residuals(inputs);
    Ok(terms(&res))
}

fn terms(res: &Residuals) -> LossTerms {
    LossTerms {
        masked: res.masked.iter().map(|v| v * v).sum(),
        marginal: res.marginal.iter().map(|v| v * v).sum(),
    }
}

/// Evaluate the loss together with `∂loss/∂mu`.
///
/// With `W = mask ∘ residual` and `r = rowsum(mu·P) − diag(O)`:
/// `∂loss/∂mu = −2 (W + Wᵀ)·mu·P + 2 r ⊗ diag(P)`.
pub fn loss_and_gradient(
    inputs: &LossInputs<'_>,
) -> Result<(LossTerms, Array2<f32>), LabelModelError> {
    inputs.validate()?;
    let res = residuals(inputs);
    let terms = terms(&res);

    let sym = &res.masked + &res.masked.t();
    let mut grad = scale_columns(sym.dot(&inputs.mu).view(), inputs.class_balance);
    grad.mapv_inplace(|v| -2.0 * v);
    let (k, c) = inputs.mu.dim();
    for a in 0..k {
        let r = res.marginal[a];
        for b in 0..c {
            grad[[a, b]] += 2.0 * r * inputs.class_balance[b];
        }
    }
    Ok((terms, grad))
}
