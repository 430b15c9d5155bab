//! Durable JSON-file store, namespaced by a caller-supplied key.
//!
//! The on-disk format is one JSON object mapping namespace keys to anchor
//! arrays, so several documents can share a file. Every operation is a
//! read-modify-write of the whole file; the collection sizes this store is
//! meant for (per-document highlight lists) keep that cheap.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use textmarker_engine::anchor::{AnchorPatch, HighlightAnchor};
use textmarker_engine::store::{HighlightStore, StorageError};

type Namespaces = BTreeMap<String, Vec<HighlightAnchor>>;

/// File-backed highlight store, durable across runs.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    namespace: String,
}

impl FileStore {
    /// Store anchors under `namespace` in the JSON file at `path`. The file
    /// is created on the first save.
    pub fn new(path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn read_all(&self) -> Result<Namespaces, StorageError> {
        if !self.path.exists() {
            return Ok(Namespaces::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Namespaces::new());
        }
        serde_json::from_str(&content).map_err(|err| StorageError::Corrupt(err.to_string()))
    }

    fn write_all(&self, namespaces: &Namespaces) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(namespaces)
            .map_err(|err| StorageError::Corrupt(err.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl HighlightStore for FileStore {
    fn load(&mut self) -> Result<Vec<HighlightAnchor>, StorageError> {
        let namespaces = self.read_all()?;
        Ok(namespaces.get(&self.namespace).cloned().unwrap_or_default())
    }

    fn save(&mut self, anchor: &HighlightAnchor) -> Result<(), StorageError> {
        anchor.validate()?;
        let mut namespaces = self.read_all()?;
        let anchors = namespaces.entry(self.namespace.clone()).or_default();
        match anchors.iter_mut().find(|a| a.id == anchor.id) {
            Some(existing) => *existing = anchor.clone(),
            None => anchors.push(anchor.clone()),
        }
        self.write_all(&namespaces)
    }

    fn update(&mut self, id: &str, patch: &AnchorPatch) -> Result<HighlightAnchor, StorageError> {
        let mut namespaces = self.read_all()?;
        let anchors = namespaces
            .get_mut(&self.namespace)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let anchor = anchors
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let mut updated = anchor.clone();
        updated.apply_patch(patch);
        updated.validate()?;
        *anchor = updated.clone();
        self.write_all(&namespaces)?;
        Ok(updated)
    }

    fn remove(&mut self, id: &str) -> Result<(), StorageError> {
        let mut namespaces = self.read_all()?;
        let anchors = namespaces
            .get_mut(&self.namespace)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let before = anchors.len();
        anchors.retain(|a| a.id != id);
        if anchors.len() == before {
            return Err(StorageError::NotFound(id.to_string()));
        }
        self.write_all(&namespaces)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        let mut namespaces = self.read_all()?;
        namespaces.remove(&self.namespace);
        self.write_all(&namespaces)
    }
}
