//! Locating and reading the incident file.

use std::path::{Path, PathBuf};

use crate::error::IncidentError;

/// Ordered list of candidate incident files. The first existing one wins.
#[derive(Debug, Clone)]
pub struct IncidentSource {
    candidates: Vec<PathBuf>,
}

/// Full contents of the resolved incident file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub path: PathBuf,
    pub contents: String,
}

impl IncidentSource {
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    /// The first candidate that exists, checked in list order.
    pub fn resolve(&self) -> Result<&Path, IncidentError> {
        self.candidates
            .iter()
            .find(|path| path.exists())
            .map(PathBuf::as_path)
            .ok_or_else(|| IncidentError::SourceNotFound {
                candidates: self.candidates.clone(),
            })
    }

    /// Resolve the source and read it in full as UTF-8 text.
    pub fn read(&self) -> Result<SourceText, IncidentError> {
        let path = self.resolve()?;
        let contents = std::fs::read_to_string(path).map_err(|source| IncidentError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(SourceText {
            path: path.to_path_buf(),
            contents,
        })
    }
}
