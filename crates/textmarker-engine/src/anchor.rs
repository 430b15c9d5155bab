//! Persisted and transient highlight records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::tree::TreeRange;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    #[error("anchor id must not be empty")]
    EmptyId,
    #[error("anchor raw text must not be empty")]
    EmptyRawText,
    #[error("anchor normalized text must not be empty")]
    EmptyNormalizedText,
    #[error("anchor end offset {end} precedes start offset {start}")]
    InvertedOffsets { start: usize, end: usize },
}

/// The durable, storage-facing description of a highlight.
///
/// Anchors identify text, not nodes: node identity does not survive a
/// reload, so restoration re-locates `normalized_text` in the live document,
/// disambiguated by the captured context windows. `start_offset`/`end_offset`
/// are a best-effort cache in normalized char units and are recomputed on
/// restore; they are never treated as authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightAnchor {
    pub id: String,
    /// The exact substring as originally selected, kept for display/audit.
    pub raw_text: String,
    /// Canonical form of `raw_text`; the match key.
    pub normalized_text: String,
    /// Normalized window of text immediately before the selection.
    pub prefix_context: String,
    /// Normalized window of text immediately after the selection.
    pub suffix_context: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub spans_multiple_nodes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HighlightAnchor {
    /// Check the storage validation contract: required fields present and
    /// coherent. Stores call this before persisting anything.
    pub fn validate(&self) -> Result<(), AnchorError> {
        if self.id.is_empty() {
            return Err(AnchorError::EmptyId);
        }
        if self.raw_text.is_empty() {
            return Err(AnchorError::EmptyRawText);
        }
        if self.normalized_text.is_empty() {
            return Err(AnchorError::EmptyNormalizedText);
        }
        if self.end_offset < self.start_offset {
            return Err(AnchorError::InvertedOffsets {
                start: self.start_offset,
                end: self.end_offset,
            });
        }
        Ok(())
    }

    /// Generate a fresh unique highlight id.
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Apply a partial update and bump `updated_at`.
    pub fn apply_patch(&mut self, patch: &AnchorPatch) {
        if let Some(color) = &patch.color {
            self.color = Some(color.clone());
        }
        if let Some(note) = &patch.note {
            self.note = Some(note.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update to a highlight's display metadata. `None` fields are left
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A captured user selection, alive only until it is confirmed into an
/// anchor or dismissed.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSelection {
    pub raw_text: String,
    pub normalized_text: String,
    pub range: TreeRange,
    /// Raw (pre-normalization) context windows; normalized when the anchor
    /// is built.
    pub prefix_context: String,
    pub suffix_context: String,
    pub spans_multiple_nodes: bool,
}

/// Output of a successful restoration attempt, consumed immediately by the
/// renderer and never cached across reloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSpan {
    pub range: TreeRange,
    /// Certainty of the match in `[0, 1]`; 1.0 denotes an exact,
    /// context-validated match.
    pub confidence: f64,
    pub exact_match: bool,
}
