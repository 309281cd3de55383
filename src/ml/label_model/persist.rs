//! Save/restore of the complete label model state as a JSON bundle.

use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::error::{LabelModelError, Parameter};
use super::store::ParameterStore;
use super::{LABEL_MODEL_ID, LabelModel};

/// Current bundle format version.
pub const STATE_FORMAT_VERSION: i64 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to read model bundle {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write model bundle {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported model_id {found} (expected {expected})")]
    UnsupportedModelId { found: String, expected: String },
    #[error("Unsupported format_version {0} (expected {expected})", expected = STATE_FORMAT_VERSION)]
    UnsupportedVersion(i64),
    #[error("Invalid snapshot for {parameter}: {reason}")]
    InvalidTensor { parameter: Parameter, reason: String },
    #[error(transparent)]
    Model(#[from] LabelModelError),
}

/// Row-major dense tensor together with its bound shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorSnapshot<T> {
    pub shape: [usize; 2],
    pub data: Vec<T>,
}

impl<T: Clone> TensorSnapshot<T> {
    fn capture(array: &Array2<T>) -> Self {
        let (rows, cols) = array.dim();
        Self {
            shape: [rows, cols],
            data: array.iter().cloned().collect(),
        }
    }

    fn restore(&self, parameter: Parameter) -> Result<Array2<T>, PersistError> {
        let [rows, cols] = self.shape;
        Array2::from_shape_vec((rows, cols), self.data.clone()).map_err(|err| {
            PersistError::InvalidTensor {
                parameter,
                reason: err.to_string(),
            }
        })
    }
}

/// Every parameter slot of a [`LabelModel`] plus the metadata needed to interpret it.
///
/// Unbound slots are stored as `null` and restored unbound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelModelState {
    pub model_id: String,
    pub format_version: i64,
    /// Class names in column order of `mu`.
    #[serde(default)]
    pub classes: Vec<String>,
    /// Source names in block order of the augmented features.
    #[serde(default)]
    pub sources: Vec<String>,
    pub mu: Option<TensorSnapshot<f32>>,
    #[serde(rename = "P")]
    pub class_balance: Option<Vec<f32>>,
    pub mask: Option<TensorSnapshot<bool>>,
    #[serde(rename = "O")]
    pub second_moment: Option<TensorSnapshot<f32>>,
    pub learning_rate: f32,
}

impl LabelModel {
    /// Capture the full parameter state.
    pub fn snapshot(&self) -> LabelModelState {
        let store = self.store();
        LabelModelState {
            model_id: LABEL_MODEL_ID.to_string(),
            format_version: STATE_FORMAT_VERSION,
            classes: Vec::new(),
            sources: Vec::new(),
            mu: store.mu_slot().as_option().map(TensorSnapshot::capture),
            class_balance: store
                .class_balance_slot()
                .as_option()
                .map(|diag| diag.to_vec()),
            mask: store.mask_slot().as_option().map(TensorSnapshot::capture),
            second_moment: store
                .second_moment_slot()
                .as_option()
                .map(TensorSnapshot::capture),
            learning_rate: store.learning_rate(),
        }
    }

    /// Rebuild a model from a snapshot; nothing is returned unless every slot restores.
    pub fn restore(state: &LabelModelState) -> Result<Self, PersistError> {
        if state.model_id != LABEL_MODEL_ID {
            return Err(PersistError::UnsupportedModelId {
                found: state.model_id.clone(),
                expected: LABEL_MODEL_ID.to_string(),
            });
        }
        if state.format_version != STATE_FORMAT_VERSION {
            return Err(PersistError::UnsupportedVersion(state.format_version));
        }
        let mut store = ParameterStore::new();
        if let Some(mu) = &state.mu {
            store.init_mu(mu.restore(Parameter::Mu)?)?;
        }
        if let Some(diag) = &state.class_balance {
            store.init_p(Array1::from_vec(diag.clone()))?;
        }
        if let Some(mask) = &state.mask {
            store.init_mask(mask.restore(Parameter::Mask)?)?;
        }
        if let Some(o) = &state.second_moment {
            store.set_o(o.restore(Parameter::SecondMoment)?)?;
        }
        store.set_learning_rate(state.learning_rate)?;
        Ok(LabelModel::from_store(store))
    }
}

/// Atomically write a state bundle as pretty JSON, creating parent directories as needed.
pub fn save_state(path: &Path, state: &LabelModelState) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|source| PersistError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let bytes = serde_json::to_vec_pretty(state)?;
    crate::atomic_file::write_atomic(path, &bytes).map_err(|source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Saved label model bundle to {}", path.display());
    Ok(())
}

/// Read a state bundle written by [`save_state`].
pub fn load_state(path: &Path) -> Result<LabelModelState, PersistError> {
    let bytes = std::fs::read(path).map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::label_model::{independent_sources_mask, uniform_class_balance};
    use ndarray::array;
    use tempfile::tempdir;

    fn trained_model() -> LabelModel {
        let mut model = LabelModel::new();
        model
            .initialize(
                array![
                    [0.45, 0.0, 0.40, 0.05],
                    [0.0, 0.45, 0.05, 0.40],
                    [0.40, 0.05, 0.45, 0.0],
                    [0.05, 0.40, 0.0, 0.45]
                ],
                independent_sources_mask(2, 2),
                uniform_class_balance(2),
                array![0.7, 0.7],
                0.05,
            )
            .unwrap();
        for _ in 0..10 {
            model.train_step().unwrap();
        }
        model
    }

    #[test]
    fn snapshot_restore_reproduces_model() {
        let model = trained_model();
        let restored = LabelModel::restore(&model.snapshot()).unwrap();
        assert_eq!(restored, model);
        let l = array![[1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]];
        assert_eq!(restored.infer(l.view()).unwrap(), model.infer(l.view()).unwrap());
    }

    #[test]
    fn unbound_slots_round_trip_as_null() {
        let mut model = LabelModel::new();
        model.init_p(array![0.3, 0.7]).unwrap();
        let state = model.snapshot();
        assert!(state.mu.is_none());
        let json = serde_json::to_value(&state).unwrap();
        assert!(json["O"].is_null());
        assert_eq!(json["model_id"], LABEL_MODEL_ID);
        let restored = LabelModel::restore(&state).unwrap();
        assert_eq!(restored, model);
    }

    #[test]
    fn restore_rejects_corrupted_bundle() {
        let mut state = trained_model().snapshot();
        if let Some(mu) = state.mu.as_mut() {
            mu.data.pop();
        }
        let err = LabelModel::restore(&state).unwrap_err();
        assert!(matches!(
            err,
            PersistError::InvalidTensor {
                parameter: Parameter::Mu,
                ..
            }
        ));

        let mut state = trained_model().snapshot();
        state.model_id = "something_else".to_string();
        assert!(matches!(
            LabelModel::restore(&state),
            Err(PersistError::UnsupportedModelId { .. })
        ));

        let mut state = trained_model().snapshot();
        state.learning_rate = -1.0;
        assert!(matches!(
            LabelModel::restore(&state),
            Err(PersistError::Model(LabelModelError::InvalidArgument { .. }))
        ));
    }

    #[test]
    fn save_and_load_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");
        let mut state = trained_model().snapshot();
        state.classes = vec!["spam".into(), "ham".into()];
        state.sources = vec!["keyword".into(), "regex".into()];
        save_state(&path, &state).unwrap();
        let loaded = load_state(&path).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn load_missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = load_state(&path).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }
}
