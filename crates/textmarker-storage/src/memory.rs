//! Non-durable in-memory store.

use textmarker_engine::anchor::{AnchorPatch, HighlightAnchor};
use textmarker_engine::store::{HighlightStore, StorageError};

/// In-memory highlight store preserving insertion order. Contents are lost
/// when the store is dropped; intended for tests and demos.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    anchors: Vec<HighlightAnchor>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

impl HighlightStore for MemoryStore {
    fn load(&mut self) -> Result<Vec<HighlightAnchor>, StorageError> {
        Ok(self.anchors.clone())
    }

    fn save(&mut self, anchor: &HighlightAnchor) -> Result<(), StorageError> {
        anchor.validate()?;
        match self.anchors.iter_mut().find(|a| a.id == anchor.id) {
            Some(existing) => *existing = anchor.clone(),
            None => self.anchors.push(anchor.clone()),
        }
        Ok(())
    }

    fn update(&mut self, id: &str, patch: &AnchorPatch) -> Result<HighlightAnchor, StorageError> {
        let anchor = self
            .anchors
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        let mut updated = anchor.clone();
        updated.apply_patch(patch);
        updated.validate()?;
        *anchor = updated.clone();
        Ok(updated)
    }

    fn remove(&mut self, id: &str) -> Result<(), StorageError> {
        let before = self.anchors.len();
        self.anchors.retain(|a| a.id != id);
        if self.anchors.len() == before {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.anchors.clear();
        Ok(())
    }
}
