//! Shape-flexible parameter storage for the label model.
//!
//! Each tensor lives in a [`Slot`] that stays unbound until its first assignment. An
//! assignment replaces both value and shape; validation always happens before the
//! slot is touched, so failed assignments never leave a half-written tensor behind.

use ndarray::{Array1, Array2, ArrayView2};

use super::error::{LabelModelError, Parameter};
use super::stats::second_moment;

/// Learning rate used until `set_learning_rate` is called.
pub const DEFAULT_LEARNING_RATE: f32 = 0.01;

/// Optional-value cell that is materialized on first assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot<T> {
    parameter: Parameter,
    value: Option<T>,
}

impl<T> Slot<T> {
    fn unbound(parameter: Parameter) -> Self {
        Self {
            parameter,
            value: None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.value.is_some()
    }

    pub fn get(&self) -> Result<&T, LabelModelError> {
        self.value
            .as_ref()
            .ok_or(LabelModelError::Unbound(self.parameter))
    }

    pub(crate) fn get_mut(&mut self) -> Result<&mut T, LabelModelError> {
        self.value
            .as_mut()
            .ok_or(LabelModelError::Unbound(self.parameter))
    }

    pub fn as_option(&self) -> Option<&T> {
        self.value.as_ref()
    }

    fn bind(&mut self, value: T) {
        self.value = Some(value);
    }
}

/// Lifecycle of the store, derived from which slots are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    PartiallyBound,
    /// `mu`, `P`, `O` and the mask are bound.
    Trainable,
}

/// Holds every tensor that defines the label model.
///
/// The store performs no locking. `&mut` access for assignments and training steps
/// keeps it single-writer; hosts sharing a model across threads wrap it in a lock.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    mu: Slot<Array2<f32>>,
    class_balance: Slot<Array1<f32>>,
    mask: Slot<Array2<bool>>,
    second_moment: Slot<Array2<f32>>,
    learning_rate: f32,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        Self {
            mu: Slot::unbound(Parameter::Mu),
            class_balance: Slot::unbound(Parameter::ClassBalance),
            mask: Slot::unbound(Parameter::Mask),
            second_moment: Slot::unbound(Parameter::SecondMoment),
            learning_rate: DEFAULT_LEARNING_RATE,
        }
    }

    pub fn state(&self) -> StoreState {
        let bound = [
            self.mu.is_bound(),
            self.class_balance.is_bound(),
            self.mask.is_bound(),
            self.second_moment.is_bound(),
        ];
        if bound.iter().all(|b| *b) {
            StoreState::Trainable
        } else if bound.iter().any(|b| *b) {
            StoreState::PartiallyBound
        } else {
            StoreState::Uninitialized
        }
    }

    /// Bind `mu`, replacing any prior value and shape.
    pub fn init_mu(&mut self, value: Array2<f32>) -> Result<(), LabelModelError> {
        validate_mu(&value)?;
        self.mu.bind(value);
        Ok(())
    }

    /// Bind the class balance from the diagonal entries of `P`.
    pub fn init_p(&mut self, diag: Array1<f32>) -> Result<(), LabelModelError> {
        validate_class_balance(&diag)?;
        self.class_balance.bind(diag);
        Ok(())
    }

    pub fn init_mask(&mut self, mask: Array2<bool>) -> Result<(), LabelModelError> {
        validate_mask(&mask)?;
        self.mask.bind(mask);
        Ok(())
    }

    /// Compute `O` from a batch of augmented rows and bind it.
    pub fn init_o_from_batch(&mut self, l_aug: ArrayView2<'_, f32>) -> Result<(), LabelModelError> {
        let o = second_moment(l_aug)?;
        self.second_moment.bind(o);
        Ok(())
    }

    /// Bind `O` from an externally computed matrix.
    pub fn set_o(&mut self, value: Array2<f32>) -> Result<(), LabelModelError> {
        validate_second_moment(&value)?;
        self.second_moment.bind(value);
        Ok(())
    }

    pub fn set_learning_rate(&mut self, value: f32) -> Result<(), LabelModelError> {
        validate_learning_rate(value)?;
        self.learning_rate = value;
        Ok(())
    }

    pub fn mu(&self) -> Result<&Array2<f32>, LabelModelError> {
        self.mu.get()
    }

    pub(crate) fn mu_mut(&mut self) -> Result<&mut Array2<f32>, LabelModelError> {
        self.mu.get_mut()
    }

    /// Diagonal of `P`.
    pub fn class_balance(&self) -> Result<&Array1<f32>, LabelModelError> {
        self.class_balance.get()
    }

    /// Dense `c x c` class-balance matrix; off-diagonal entries are always zero.
    pub fn class_balance_matrix(&self) -> Result<Array2<f32>, LabelModelError> {
        Ok(Array2::from_diag(self.class_balance.get()?))
    }

    pub fn mask(&self) -> Result<&Array2<bool>, LabelModelError> {
        self.mask.get()
    }

    pub fn second_moment(&self) -> Result<&Array2<f32>, LabelModelError> {
        self.second_moment.get()
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub(crate) fn mu_slot(&self) -> &Slot<Array2<f32>> {
        &self.mu
    }

    pub(crate) fn class_balance_slot(&self) -> &Slot<Array1<f32>> {
        &self.class_balance
    }

    pub(crate) fn mask_slot(&self) -> &Slot<Array2<bool>> {
        &self.mask
    }

    pub(crate) fn second_moment_slot(&self) -> &Slot<Array2<f32>> {
        &self.second_moment
    }
}

pub(crate) fn validate_mu(value: &Array2<f32>) -> Result<(), LabelModelError> {
    if value.is_empty() {
        return Err(LabelModelError::shape("init_mu", "non-empty matrix", "0 entries"));
    }
    if !value.iter().all(|v| v.is_finite()) {
        return Err(LabelModelError::NumericInstability { context: "init_mu" });
    }
    Ok(())
}

pub(crate) fn validate_class_balance(diag: &Array1<f32>) -> Result<(), LabelModelError> {
    if diag.is_empty() {
        return Err(LabelModelError::shape("init_p", "at least one class", "0 classes"));
    }
    if !diag.iter().all(|v| v.is_finite()) {
        return Err(LabelModelError::NumericInstability { context: "init_p" });
    }
    if diag.iter().any(|v| *v < 0.0) {
        return Err(LabelModelError::invalid(
            "init_p",
            "class balance entries must be >= 0",
        ));
    }
    if !diag.iter().any(|v| *v > 0.0) {
        return Err(LabelModelError::invalid(
            "init_p",
            "at least one class balance entry must be > 0",
        ));
    }
    Ok(())
}

pub(crate) fn validate_mask(mask: &Array2<bool>) -> Result<(), LabelModelError> {
    if mask.is_empty() {
        return Err(LabelModelError::shape("init_mask", "non-empty matrix", "0 entries"));
    }
    Ok(())
}

pub(crate) fn validate_second_moment(value: &Array2<f32>) -> Result<(), LabelModelError> {
    let (rows, cols) = value.dim();
    if rows != cols || rows == 0 {
        return Err(LabelModelError::shape(
            "set_o",
            "non-empty square matrix",
            super::error::dims(rows, cols),
        ));
    }
    if !value.iter().all(|v| v.is_finite()) {
        return Err(LabelModelError::NumericInstability { context: "set_o" });
    }
    Ok(())
}

pub(crate) fn validate_learning_rate(value: f32) -> Result<(), LabelModelError> {
    if !value.is_finite() {
        return Err(LabelModelError::NumericInstability {
            context: "set_learning_rate",
        });
    }
    if value <= 0.0 {
        return Err(LabelModelError::invalid(
            "set_learning_rate",
            format!("learning rate must be > 0 (got {value})"),
        ));
    }
    Ok(())
}
