//! Plain gradient descent on `mu`.

use super::error::LabelModelError;
use super::loss::{LossInputs, LossTerms, loss_and_gradient};
use super::store::ParameterStore;

/// Borrow the bound parameters as loss inputs.
pub(crate) fn loss_inputs(store: &ParameterStore) -> Result<LossInputs<'_>, LabelModelError> {
    Ok(LossInputs {
        mu: store.mu()?.view(),
        class_balance: store.class_balance()?.view(),
        second_moment: store.second_moment()?.view(),
        mask: store.mask()?.view(),
    })
}

/// Run one step `mu ← mu − lr · ∂loss/∂mu` and return the loss before the update.
///
/// Only `mu` changes. When the loss or gradient is not finite the step is rejected and
/// `mu` keeps its previous value.
pub fn train_step(store: &mut ParameterStore) -> Result<LossTerms, LabelModelError> {
    let lr = store.learning_rate();
    let (terms, grad) = loss_and_gradient(&loss_inputs(store)?)?;
    if !terms.total().is_finite() || !grad.iter().all(|g| g.is_finite()) {
        return Err(LabelModelError::NumericInstability {
            context: "train_step",
        });
    }
    store.mu_mut()?.scaled_add(-lr, &grad);
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::label_model::error::Parameter;
    use ndarray::{Array2, array};

    fn trainable_store() -> ParameterStore {
        let mut store = ParameterStore::new();
        store.init_mu(array![[0.6, 0.3], [0.3, 0.6], [0.7, 0.2], [0.2, 0.7]]).unwrap();
        store.init_p(array![0.5, 0.5]).unwrap();
        store
            .set_o(array![
                [0.45, 0.0, 0.40, 0.05],
                [0.0, 0.45, 0.05, 0.40],
                [0.40, 0.05, 0.45, 0.0],
                [0.05, 0.40, 0.0, 0.45]
            ])
            .unwrap();
        store
            .init_mask(array![
                [false, false, true, true],
                [false, false, true, true],
                [true, true, false, false],
                [true, true, false, false]
            ])
            .unwrap();
        store.set_learning_rate(0.05).unwrap();
        store
    }

    #[test]
    fn step_reduces_loss_from_generic_start() {
        let mut store = trainable_store();
        let first = train_step(&mut store).unwrap().total();
        let second = train_step(&mut store).unwrap().total();
        assert!(second < first, "loss did not decrease: {first} -> {second}");
    }

    #[test]
    fn step_only_touches_mu() {
        let mut store = trainable_store();
        let before = store.clone();
        train_step(&mut store).unwrap();
        assert_ne!(store.mu().unwrap(), before.mu().unwrap());
        assert_eq!(store.class_balance().unwrap(), before.class_balance().unwrap());
        assert_eq!(store.second_moment().unwrap(), before.second_moment().unwrap());
        assert_eq!(store.mask().unwrap(), before.mask().unwrap());
        assert_eq!(store.learning_rate(), before.learning_rate());
    }

    #[test]
    fn step_returns_pre_update_loss() {
        let mut store = trainable_store();
        let expected = crate::ml::label_model::loss::loss(&loss_inputs(&store).unwrap())
            .unwrap()
            .total();
        let reported = train_step(&mut store).unwrap().total();
        assert_eq!(reported, expected);
    }

    #[test]
    fn step_requires_bound_parameters() {
        let mut store = ParameterStore::new();
        store.init_mu(Array2::zeros((2, 2))).unwrap();
        assert_eq!(
            train_step(&mut store).unwrap_err(),
            LabelModelError::Unbound(Parameter::ClassBalance)
        );
    }

    #[test]
    fn diverging_step_leaves_mu_untouched() {
        let mut store = trainable_store();
        store.init_mu(Array2::from_elem((4, 2), 1e20)).unwrap();
        let before = store.mu().unwrap().clone();
        let err = train_step(&mut store).unwrap_err();
        assert!(matches!(err, LabelModelError::NumericInstability { .. }));
        assert_eq!(store.mu().unwrap(), &before);
    }
}
