//! Abstract ordered document tree.
//!
//! The anchoring algorithms never see a real rendering engine. They run
//! against [`DocumentTree`], which exposes exactly the operations the core
//! needs: flatten to text, enumerate text leaves in document order, wrap and
//! unwrap leaf sub-ranges in marker elements, and compare boundary points.
//! [`MemoryTree`] is the arena-backed implementation used by tests, benches
//! and embedders without a host document model.

mod memory;

pub use memory::MemoryTree;

use std::cmp::Ordering;

use thiserror::Error;

/// Attribute carrying the owning highlight's id on a marker element.
pub const ATTR_HIGHLIGHT_ID: &str = "data-textmarker-id";
/// Attribute carrying the zero-based part index of a multi-part marker.
pub const ATTR_PART: &str = "data-textmarker-part";
/// Attribute carrying the marker's display color.
pub const ATTR_COLOR: &str = "data-textmarker-color";
/// Attribute carrying the marker's CSS class.
pub const ATTR_CLASS: &str = "class";

/// Tag used for marker elements.
pub const MARK_TAG: &str = "mark";
/// Class applied to markers when the caller does not supply one.
pub const DEFAULT_MARK_CLASS: &str = "textmarker-highlight";

/// Opaque node identity within one tree.
///
/// Ids are only meaningful against the tree that produced them and do not
/// survive a reload; durable identity lives in the anchor text, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

/// A point in the tree: a node plus a char offset within it.
///
/// For text leaves the offset counts chars into the leaf's text; for element
/// nodes it counts children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

/// A contiguous span between two boundary points, start before end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeRange {
    pub start: Boundary,
    pub end: Boundary,
}

impl TreeRange {
    /// True when start and end sit in different nodes.
    pub fn spans_multiple_nodes(&self) -> bool {
        self.start.node != self.end.node
    }
}

/// Attributes applied to a marker element at wrap time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkAttrs {
    pub highlight_id: String,
    pub part: Option<usize>,
    pub color: Option<String>,
    pub class_name: Option<String>,
}

impl MarkAttrs {
    pub fn new(highlight_id: impl Into<String>) -> Self {
        Self {
            highlight_id: highlight_id.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {0:?} is not part of this tree")]
    UnknownNode(NodeId),
    #[error("node {0:?} is not a text node")]
    NotText(NodeId),
    #[error("offset {offset} is outside node {node:?} (len {len})")]
    OffsetOutOfBounds {
        node: NodeId,
        offset: usize,
        len: usize,
    },
    #[error("range end precedes range start")]
    InvertedRange,
    #[error("node {0:?} has no parent to attach a marker under")]
    DetachedNode(NodeId),
}

/// The tree operations the anchoring core is written against.
pub trait DocumentTree {
    /// The tree's root element.
    fn root(&self) -> NodeId;

    /// Text content of `node` if it is a text leaf.
    fn leaf_text(&self, node: NodeId) -> Option<&str>;

    /// All text leaves under `container` (inclusive), in document order.
    fn text_leaves(&self, container: NodeId) -> Vec<NodeId>;

    /// True when `node` equals `ancestor` or sits inside it.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    /// Deepest node containing both ends of `range`; the root as a fallback.
    fn common_ancestor(&self, range: &TreeRange) -> NodeId;

    /// Document-order comparison of two boundary points.
    fn compare_points(&self, a: Boundary, b: Boundary) -> Ordering;

    /// Wrap chars `[start, end)` of the text leaf `node` in a marker element,
    /// splitting the leaf as needed. Returns the marker's id.
    fn wrap(
        &mut self,
        node: NodeId,
        start: usize,
        end: usize,
        attrs: &MarkAttrs,
    ) -> Result<NodeId, TreeError>;

    /// Remove every marker for `highlight_id` under `root`, replacing each by
    /// a plain text leaf and re-merging adjacent text leaves. Returns the
    /// number of markers removed.
    fn unwrap_marks(&mut self, root: NodeId, highlight_id: &str) -> usize;

    /// Highlight id of the innermost marker enclosing `node`, if any.
    fn marker_id(&self, node: NodeId) -> Option<String>;

    /// All marker elements for `highlight_id`, in document order.
    fn markers_for(&self, highlight_id: &str) -> Vec<NodeId>;

    /// Update the display color of every marker for `highlight_id`. Returns
    /// the number of markers touched.
    fn set_marker_color(&mut self, highlight_id: &str, color: &str) -> usize;

    /// Concatenated text of all leaves under `container`, in document order.
    fn flatten_text(&self, container: NodeId) -> String {
        let mut out = String::new();
        for leaf in self.text_leaves(container) {
            if let Some(text) = self.leaf_text(leaf) {
                out.push_str(text);
            }
        }
        out
    }
}
