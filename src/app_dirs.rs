//! Where the label model tools keep their config and logs.
//!
//! Everything lives in a `.labelmodel` folder under the OS config directory (e.g.,
//! `%APPDATA%` on Windows) unless `LABELMODEL_CONFIG_HOME` names another base.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use thiserror::Error;

/// Name of the application directory that lives under the config base.
pub const APP_DIR_NAME: &str = ".labelmodel";
/// Environment variable that replaces the OS config base.
pub const CONFIG_HOME_ENV: &str = "LABELMODEL_CONFIG_HOME";

#[derive(Debug, Error)]
pub enum AppDirError {
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// The `.labelmodel` directory, created if needed.
pub fn app_root_dir() -> Result<PathBuf, AppDirError> {
    let base = resolve_base(std::env::var_os(CONFIG_HOME_ENV)).ok_or(AppDirError::NoBaseDir)?;
    ensure_dir(base.join(APP_DIR_NAME))
}

/// `logs/` inside the app directory, created if needed.
pub fn logs_dir() -> Result<PathBuf, AppDirError> {
    ensure_dir(app_root_dir()?.join("logs"))
}

/// An empty override counts as unset.
fn resolve_base(override_base: Option<OsString>) -> Option<PathBuf> {
    match override_base {
        Some(value) if !value.is_empty() => Some(PathBuf::from(value)),
        _ => BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()),
    }
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf, AppDirError> {
    create(&path)?;
    Ok(path)
}

fn create(path: &Path) -> Result<(), AppDirError> {
    std::fs::create_dir_all(path).map_err(|source| AppDirError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}
