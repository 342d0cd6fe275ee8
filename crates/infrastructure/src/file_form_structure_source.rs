use std::path::{Path, PathBuf};

use async_trait::async_trait;
use formweave_application::FormStructureSource;
use formweave_core::{AppError, AppResult};
use formweave_domain::FormStructure;
use tracing::info;

/// Reads a form structure document from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileFormStructureSource {
    path: PathBuf,
}

impl FileFormStructureSource {
    /// Creates a source reading `path` on every load.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FormStructureSource for FileFormStructureSource {
    async fn load(&self) -> AppResult<FormStructure> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|error| {
            AppError::NotFound(format!(
                "failed to read form structure '{}': {error}",
                self.path.display()
            ))
        })?;
        let structure = FormStructure::from_json(&raw)?;
        info!(path = %self.path.display(), "form structure loaded from file");
        Ok(structure)
    }
}
