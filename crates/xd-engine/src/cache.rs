//! Source texts read once per run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::EngineError;

/// Contents of every document read during a run.
///
/// Both passes process the same documents, so each file is read only once.
#[derive(Debug, Default)]
pub struct DocumentCache {
    texts: HashMap<PathBuf, Arc<str>>,
}

impl DocumentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text of the file at `path`, reading it on first access.
    pub fn get(&mut self, path: &Path) -> Result<Arc<str>, EngineError> {
        if let Some(text) = self.texts.get(path) {
            return Ok(Arc::clone(text));
        }
        let text: Arc<str> = std::fs::read_to_string(path)
            .map_err(|source| EngineError::Io {
                path: path.to_owned(),
                source,
            })?
            .into();
        tracing::debug!(path = %path.display(), "Read document");
        self.texts.insert(path.to_owned(), Arc::clone(&text));
        Ok(text)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
