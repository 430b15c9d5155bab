//! Wrapping resolved ranges in marker elements, and reversing it.

use thiserror::Error;

use crate::bridge::leaves_in_range;
use crate::tree::{DocumentTree, MarkAttrs, NodeId, TreeError, TreeRange};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("range contains no text nodes")]
    EmptyRange,
    #[error("no segment of the range could be wrapped")]
    NothingRendered,
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Display options for a highlight's markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkStyle {
    pub color: Option<String>,
    pub class_name: Option<String>,
}

/// Wrap `range` in marker elements tagged with `highlight_id`.
///
/// A range confined to one text leaf becomes a single untagged-part marker;
/// wrapping failures there are fatal. A cross-node range gets one marker per
/// contributing leaf with a zero-based part index; an individual segment
/// that fails to wrap is logged and skipped, and the call only fails when no
/// segment rendered at all.
pub fn render<T: DocumentTree + ?Sized>(
    tree: &mut T,
    range: &TreeRange,
    highlight_id: &str,
    style: &MarkStyle,
) -> Result<Vec<NodeId>, RenderError> {
    if range.start.node == range.end.node {
        let attrs = MarkAttrs {
            highlight_id: highlight_id.to_string(),
            part: None,
            color: style.color.clone(),
            class_name: style.class_name.clone(),
        };
        let marker = tree.wrap(range.start.node, range.start.offset, range.end.offset, &attrs)?;
        return Ok(vec![marker]);
    }

    let leaves = leaves_in_range(tree, range)?;
    if leaves.is_empty() {
        return Err(RenderError::EmptyRange);
    }

    let mut markers = Vec::new();
    for (part, leaf) in leaves.iter().enumerate() {
        let attrs = MarkAttrs {
            highlight_id: highlight_id.to_string(),
            part: Some(part),
            color: style.color.clone(),
            class_name: style.class_name.clone(),
        };
        match tree.wrap(leaf.node, leaf.start_offset, leaf.end_offset, &attrs) {
            Ok(marker) => markers.push(marker),
            Err(err) => {
                log::warn!(
                    "skipping segment {part} of highlight {highlight_id}: {err}"
                );
            }
        }
    }

    if markers.is_empty() {
        return Err(RenderError::NothingRendered);
    }
    Ok(markers)
}

/// Remove every marker for `highlight_id` under `root` (the tree root when
/// `None`), restoring plain text and merging adjacent leaves. Returns the
/// number of markers removed.
pub fn unwrap<T: DocumentTree + ?Sized>(
    tree: &mut T,
    highlight_id: &str,
    root: Option<NodeId>,
) -> usize {
    let root = root.unwrap_or_else(|| tree.root());
    tree.unwrap_marks(root, highlight_id)
}

/// Highlight id of the innermost marker enclosing `node`; with overlapping
/// highlights the most recently created (innermost) one wins.
pub fn marker_highlight_id<T: DocumentTree + ?Sized>(tree: &T, node: NodeId) -> Option<String> {
    tree.marker_id(node)
}

/// All marker elements for `highlight_id`, in document order.
pub fn marks_for<T: DocumentTree + ?Sized>(tree: &T, highlight_id: &str) -> Vec<NodeId> {
    tree.markers_for(highlight_id)
}

/// Update the display color of an existing marker set in place.
pub fn set_color<T: DocumentTree + ?Sized>(
    tree: &mut T,
    highlight_id: &str,
    color: &str,
) -> usize {
    tree.set_marker_color(highlight_id, color)
}
