//! Storage collaborator contract.
//!
//! The orchestrator persists anchors through this trait and never assumes a
//! particular backend. The `textmarker-storage` crate ships the reference
//! adapters (in-memory, JSON file, channel message-passing); embedders may
//! bring their own.

use std::time::Duration;

use thiserror::Error;

use crate::anchor::{AnchorError, AnchorPatch, HighlightAnchor};

#[derive(Debug, Error)]
pub enum StorageError {
    /// Malformed anchor; nothing was persisted.
    #[error("invalid anchor: {0}")]
    Validation(#[from] AnchorError),
    /// The referenced highlight id is unknown to the store.
    #[error("no stored highlight with id {0}")]
    NotFound(String),
    /// The storage transport failed (disconnected endpoint, bad response).
    #[error("storage transport failed: {0}")]
    Transport(String),
    /// A bounded round-trip elapsed without a response.
    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Persisted data could not be decoded.
    #[error("corrupt highlight data: {0}")]
    Corrupt(String),
}

/// The five operations the orchestrator needs from a backend.
///
/// `save` and `update` must validate anchors ([`HighlightAnchor::validate`])
/// and fail without persisting partial data; `update` and `remove` on an
/// unknown id fail with [`StorageError::NotFound`]. `update` applies the
/// patch, bumps `updated_at` and returns the stored result so callers can
/// mirror it without re-applying the patch themselves.
pub trait HighlightStore {
    fn load(&mut self) -> Result<Vec<HighlightAnchor>, StorageError>;
    fn save(&mut self, anchor: &HighlightAnchor) -> Result<(), StorageError>;
    fn update(&mut self, id: &str, patch: &AnchorPatch) -> Result<HighlightAnchor, StorageError>;
    fn remove(&mut self, id: &str) -> Result<(), StorageError>;
    fn clear(&mut self) -> Result<(), StorageError>;
}

impl<S: HighlightStore + ?Sized> HighlightStore for &mut S {
    fn load(&mut self) -> Result<Vec<HighlightAnchor>, StorageError> {
        (**self).load()
    }

    fn save(&mut self, anchor: &HighlightAnchor) -> Result<(), StorageError> {
        (**self).save(anchor)
    }

    fn update(&mut self, id: &str, patch: &AnchorPatch) -> Result<HighlightAnchor, StorageError> {
        (**self).update(id, patch)
    }

    fn remove(&mut self, id: &str) -> Result<(), StorageError> {
        (**self).remove(id)
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        (**self).clear()
    }
}
