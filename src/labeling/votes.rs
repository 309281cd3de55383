//! JSON votes files consumed by the command-line tools.
//!
//! ```json
//! { "classes": ["spam", "ham"], "sources": ["keyword", "regex"],
//!   "rows": [["spam", null], [[0.2, 0.8], "ham"]] }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::augment::{LabelMatrixBuilder, SourceVote};

#[derive(Debug, Error)]
pub enum VotesError {
    #[error("Failed to read votes file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse votes file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Votes file needs at least 2 classes (got {0})")]
    TooFewClasses(usize),
    #[error("Votes file needs at least 1 source")]
    NoSources,
    #[error("Duplicate class name {0:?}")]
    DuplicateClass(String),
    #[error("Row {row}, source {source_idx}: unknown class {name:?}")]
    UnknownClass {
        row: usize,
        source_idx: usize,
        name: String,
    },
}

/// A non-abstain vote as written in the file; abstains are `null`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawVote {
    Class(String),
    Probabilities(Vec<f32>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VotesFile {
    pub classes: Vec<String>,
    pub sources: Vec<String>,
    pub rows: Vec<Vec<Option<RawVote>>>,
}

impl VotesFile {
    pub fn load(path: &Path) -> Result<Self, VotesError> {
        let bytes = std::fs::read(path).map_err(|source| VotesError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: VotesFile =
            serde_json::from_slice(&bytes).map_err(|source| VotesError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        file.validate()?;
        Ok(file)
    }

    fn validate(&self) -> Result<(), VotesError> {
        if self.classes.len() < 2 {
            return Err(VotesError::TooFewClasses(self.classes.len()));
        }
        if self.sources.is_empty() {
            return Err(VotesError::NoSources);
        }
        let mut seen = HashMap::new();
        for (idx, name) in self.classes.iter().enumerate() {
            if seen.insert(name.as_str(), idx).is_some() {
                return Err(VotesError::DuplicateClass(name.clone()));
            }
        }
        Ok(())
    }

    pub fn builder(&self) -> LabelMatrixBuilder {
        LabelMatrixBuilder::new(self.sources.len(), self.classes.len())
    }

    /// Resolve class names into indexed votes. Row lengths are checked later by the
    /// [`LabelMatrixBuilder`].
    pub fn source_votes(&self) -> Result<Vec<Vec<SourceVote>>, VotesError> {
        let index: HashMap<&str, usize> = self
            .classes
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();
        self.rows
            .iter()
            .enumerate()
            .map(|(row, votes)| {
                votes
                    .iter()
                    .enumerate()
                    .map(|(source_idx, vote)| match vote {
                        None => Ok(SourceVote::Abstain),
                        Some(RawVote::Class(name)) => index
                            .get(name.as_str())
                            .map(|idx| SourceVote::Class(*idx))
                            .ok_or_else(|| VotesError::UnknownClass {
                                row,
                                source_idx,
                                name: name.clone(),
                            }),
                        Some(RawVote::Probabilities(probs)) => {
                            Ok(SourceVote::Probabilities(probs.clone()))
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
