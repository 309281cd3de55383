//! Training defaults stored in `label_model.toml` under the application directory.
//!
//! ```toml
//! [training]
//! epochs = 100
//! learning_rate = 0.01
//! initial_precision = 0.7
//! tolerance = 1e-7
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs;
use crate::ml::label_model::train::TrainOptions;
use crate::ml::label_model::{DEFAULT_INITIAL_PRECISION, DEFAULT_LEARNING_RATE};

/// Filename of the training config inside the app directory.
pub const CONFIG_FILE_NAME: &str = "label_model.toml";

const MIN_LEARNING_RATE: f32 = 1e-6;
const MAX_LEARNING_RATE: f32 = 1.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No suitable config directory available")]
    NoConfigDir,
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelModelConfig {
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f32,
    pub initial_precision: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f32>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            learning_rate: DEFAULT_LEARNING_RATE,
            initial_precision: DEFAULT_INITIAL_PRECISION,
            tolerance: None,
        }
    }
}

impl LabelModelConfig {
    /// Clamp values into their usable ranges; non-finite numbers fall back to defaults.
    pub fn normalized(mut self) -> Self {
        let defaults = TrainingConfig::default();
        let training = &mut self.training;
        training.epochs = training.epochs.max(1);
        training.learning_rate = if training.learning_rate.is_finite() {
            training
                .learning_rate
                .clamp(MIN_LEARNING_RATE, MAX_LEARNING_RATE)
        } else {
            defaults.learning_rate
        };
        training.initial_precision = if training.initial_precision.is_finite() {
            training.initial_precision.clamp(0.0, 1.0)
        } else {
            defaults.initial_precision
        };
        training.tolerance = training
            .tolerance
            .filter(|tol| tol.is_finite() && *tol >= 0.0);
        self
    }

    pub fn train_options(&self) -> TrainOptions {
        TrainOptions {
            epochs: self.training.epochs,
            learning_rate: self.training.learning_rate,
            initial_precision: self.training.initial_precision,
            tolerance: self.training.tolerance,
        }
    }
}

/// Resolve the config file path, ensuring the app directory exists.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    let dir = app_dirs::app_root_dir().map_err(map_app_dir_error)?;
    Ok(dir.join(CONFIG_FILE_NAME))
}

/// Load the config from the app directory, returning defaults if the file is missing.
pub fn load_or_default() -> Result<LabelModelConfig, ConfigError> {
    load_from_path(&config_path()?)
}

pub fn load_from_path(path: &Path) -> Result<LabelModelConfig, ConfigError> {
    if !path.exists() {
        return Ok(LabelModelConfig::default());
    }
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<LabelModelConfig>(&text)
        .map(LabelModelConfig::normalized)
        .map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
}

/// Write the config atomically, creating parent directories as needed.
pub fn save_to_path(config: &LabelModelConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let data = toml::to_string_pretty(config).map_err(|source| ConfigError::SerializeToml {
        path: path.to_path_buf(),
        source,
    })?;
    crate::atomic_file::write_atomic(path, data.as_bytes()).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
