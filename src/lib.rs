//! Library exports for the label model tools, benchmarks and tests.
/// Application directory resolution.
pub mod app_dirs;
/// Crash-safe file writes.
mod atomic_file;
/// Training defaults loaded from TOML.
pub mod config;
/// Weak-label vote encoding and votes files.
pub mod labeling;
/// Logging setup for the command-line tools.
pub mod logging;
/// Label model estimation and inference.
pub mod ml;
