use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CorpusManifestSchemaVersion {
    V1,
}

/// Small persisted record identifying a corpus and whether it has been
/// anchor-compiled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusManifest {
    pub schema_version: CorpusManifestSchemaVersion,
    pub name: String,
    /// The `savedir` argument the corpus was created with.
    pub savedir: PathBuf,
    #[serde(default)]
    pub compiled: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("corpus name is empty")]
    EmptyName,
    #[error("corpus name contains a path separator: {0:?}")]
    InvalidName(String),
}

impl CorpusManifest {
    pub fn new(name: impl Into<String>, savedir: impl Into<PathBuf>) -> Self {
        Self {
            schema_version: CorpusManifestSchemaVersion::V1,
            name: name.into(),
            savedir: savedir.into(),
            compiled: false,
        }
    }

    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::EmptyName);
        }
        if self.name.contains('/') || self.name.contains('\\') {
            return Err(ManifestError::InvalidName(self.name.clone()));
        }
        Ok(())
    }
}
