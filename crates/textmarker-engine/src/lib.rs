//! # textmarker-engine
//!
//! Text anchoring and restoration engine: capture a selection in a document
//! tree, persist it as a durable text-based anchor, and re-locate and
//! re-render the same logical span after the document has been reloaded or
//! re-rendered with different whitespace and quote characters.
//!
//! Node identity is transient, so anchors describe text: the canonical
//! normalized form of the selection plus bounded context windows. On
//! restore, a context-validated search over the container's normalized text
//! is authoritative; cached offsets are advisory. When exact matching fails,
//! an edit-distance fuzzy fallback produces a confidence-scored best effort.
//!
//! The algorithms run against the [`tree::DocumentTree`] trait, so they are
//! testable against [`tree::MemoryTree`] without a rendering engine.

pub mod anchor;
pub mod bridge;
pub mod chars;
pub mod context;
pub mod highlighter;
pub mod locate;
pub mod normalize;
pub mod render;
pub mod restore;
pub mod similarity;
pub mod store;
pub mod tree;

// Re-export key types for easier usage
pub use anchor::{AnchorError, AnchorPatch, HighlightAnchor, LiveSelection, ResolvedSpan};
pub use highlighter::{
    HighlightError, Highlighter, HighlighterOptions, LoadReport, SelectionUi, TrackedHighlight,
};
pub use normalize::{NormalizeOptions, normalize, normalize_default};
pub use restore::{RestoreError, RestoreOptions, RestoreResult};
pub use similarity::similarity;
pub use store::{HighlightStore, StorageError};
pub use tree::{Boundary, DocumentTree, MemoryTree, NodeId, TreeError, TreeRange};
