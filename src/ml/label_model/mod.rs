//! Generative label model for combining weak label sources.
//!
//! Estimates each source's class-conditional accuracies `mu` without ground truth by
//! matching the model-implied second moments `mu·P·muᵀ` to the observed ones
//! `O = Lᵀ·L / n`, then combines votes into per-example class distributions.
//!
//! The model is driven eagerly: every named operation is a method on [`LabelModel`]
//! that either fully applies or returns a [`LabelModelError`] without touching state.
//! Iteration count and convergence checks belong to the caller; see [`train::fit`] for
//! the standard driver.

mod conditional;
mod error;
mod infer;
mod init;
mod loss;
mod mask;
mod optim;
pub mod persist;
mod stats;
mod store;
pub mod train;

use ndarray::{Array1, Array2, ArrayView2};
use tracing::debug;

pub use conditional::{ConditionalProbabilities, ConditionalRow};
pub use error::{LabelModelError, Parameter};
pub use infer::predict_class_indices;
pub use init::{DEFAULT_INITIAL_PRECISION, initial_mu, uniform_class_balance};
pub use loss::{LossTerms, MU_CLIP_MAX, MU_CLIP_MIN, proba_mu};
pub use mask::independent_sources_mask;
pub use stats::{SecondMomentAccumulator, second_moment};
pub use store::{DEFAULT_LEARNING_RATE, ParameterStore, StoreState};

/// Identifier written into persisted model bundles.
pub const LABEL_MODEL_ID: &str = "label_model_v1";

/// Label model state plus the named operations that act on it.
///
/// Training steps take `&mut self` and inference takes `&self`, so a model shared across
/// threads needs an external lock (an `RwLock` lets inference calls run concurrently).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelModel {
    store: ParameterStore,
}

impl LabelModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_store(store: ParameterStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ParameterStore {
        &self.store
    }

    pub fn state(&self) -> StoreState {
        self.store.state()
    }

    pub fn init_mu(&mut self, value: Array2<f32>) -> Result<(), LabelModelError> {
        self.store.init_mu(value)
    }

    /// Bind the class balance; `diag` holds the diagonal entries of `P`.
    pub fn init_p(&mut self, diag: Array1<f32>) -> Result<(), LabelModelError> {
        self.store.init_p(diag)
    }

    pub fn init_mask(&mut self, mask: Array2<bool>) -> Result<(), LabelModelError> {
        self.store.init_mask(mask)
    }

    pub fn init_o_from_batch(&mut self, l_aug: ArrayView2<'_, f32>) -> Result<(), LabelModelError> {
        self.store.init_o_from_batch(l_aug)
    }

    pub fn set_o(&mut self, value: Array2<f32>) -> Result<(), LabelModelError> {
        self.store.set_o(value)
    }

    pub fn set_learning_rate(&mut self, value: f32) -> Result<(), LabelModelError> {
        self.store.set_learning_rate(value)
    }

    /// Bind every training input at once, starting `mu` from the moment-based guess.
    ///
    /// All inputs are validated before anything is bound.
    pub fn initialize(
        &mut self,
        second_moment: Array2<f32>,
        mask: Array2<bool>,
        class_balance: Array1<f32>,
        precisions: Array1<f32>,
        learning_rate: f32,
    ) -> Result<(), LabelModelError> {
        store::validate_second_moment(&second_moment)?;
        store::validate_mask(&mask)?;
        store::validate_class_balance(&class_balance)?;
        store::validate_learning_rate(learning_rate)?;
        let mu = initial_mu(
            second_moment.diag(),
            precisions.view(),
            class_balance.view(),
        )?;
        store::validate_mu(&mu)?;

        let mut next = self.store.clone();
        next.init_p(class_balance)?;
        next.init_mask(mask)?;
        next.set_learning_rate(learning_rate)?;
        next.set_o(second_moment)?;
        next.init_mu(mu)?;
        optim::loss_inputs(&next)?.validate()?;
        self.store = next;
        debug!(
            features = self.store.mu()?.nrows(),
            classes = self.store.mu()?.ncols(),
            learning_rate,
            "Label model initialized"
        );
        Ok(())
    }

    /// One gradient-descent step on `mu`; returns the loss before the update.
    pub fn train_step(&mut self) -> Result<f32, LabelModelError> {
        optim::train_step(&mut self.store).map(|terms| terms.total())
    }

    /// Current loss terms without updating `mu`.
    pub fn loss(&self) -> Result<LossTerms, LabelModelError> {
        loss::loss(&optim::loss_inputs(&self.store)?)
    }

    /// Class probabilities for each row of an augmented label matrix.
    pub fn infer(&self, l_aug: ArrayView2<'_, f32>) -> Result<Array2<f32>, LabelModelError> {
        infer::infer(
            self.store.mu()?.view(),
            self.store.class_balance()?.view(),
            l_aug,
        )
    }

    /// Diagonal of the observed second-moment matrix.
    pub fn diag_o(&self) -> Result<Array1<f32>, LabelModelError> {
        Ok(self.store.second_moment()?.diag().to_owned())
    }

    pub fn mu(&self) -> Result<&Array2<f32>, LabelModelError> {
        self.store.mu()
    }

    pub fn class_balance(&self) -> Result<&Array1<f32>, LabelModelError> {
        self.store.class_balance()
    }

    pub fn learning_rate(&self) -> f32 {
        self.store.learning_rate()
    }

    pub fn conditional_probabilities(&self) -> Result<ConditionalProbabilities, LabelModelError> {
        ConditionalProbabilities::from_mu(self.store.mu()?.view())
    }
}
