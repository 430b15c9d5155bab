//! Context window extraction around a live selection.
//!
//! The windows captured here are what later disambiguates repeated
//! occurrences of the same phrase during restoration. Extraction works on
//! the raw flattened text of the range's common ancestor; the caller
//! normalizes the windows before persisting them.

use crate::chars;
use crate::tree::{Boundary, DocumentTree, NodeId, TreeError, TreeRange};

/// Default width of each context window, in chars.
pub const DEFAULT_CONTEXT_CHARS: usize = 32;

/// Raw text windows around a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    pub prefix: String,
    pub suffix: String,
}

/// Extract up to `chars_before`/`chars_after` chars of raw text around
/// `range` within its common-ancestor container, clamped to the container.
pub fn extract_context<T: DocumentTree + ?Sized>(
    tree: &T,
    range: &TreeRange,
    chars_before: usize,
    chars_after: usize,
) -> Result<ContextWindow, TreeError> {
    let container = tree.common_ancestor(range);
    let flat = tree.flatten_text(container);

    let start = raw_offset_of(tree, container, range.start)?;
    let end = raw_offset_of(tree, container, range.end)?;

    let prefix = chars::slice(&flat, start.saturating_sub(chars_before), start).to_string();
    let suffix_end = (end + chars_after).min(chars::len(&flat));
    let suffix = chars::slice(&flat, end, suffix_end).to_string();

    Ok(ContextWindow { prefix, suffix })
}

/// Raw char offset of a text-leaf boundary within `container`'s flattened
/// text.
fn raw_offset_of<T: DocumentTree + ?Sized>(
    tree: &T,
    container: NodeId,
    boundary: Boundary,
) -> Result<usize, TreeError> {
    let mut cumulative = 0usize;
    for leaf in tree.text_leaves(container) {
        let Some(text) = tree.leaf_text(leaf) else {
            continue;
        };
        if leaf == boundary.node {
            return Ok(cumulative + boundary.offset.min(chars::len(text)));
        }
        cumulative += chars::len(text);
    }
    Err(TreeError::UnknownNode(boundary.node))
}
