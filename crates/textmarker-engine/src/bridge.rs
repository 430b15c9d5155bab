//! Conversion between normalized char offsets and live tree ranges.
//!
//! Restoration locates anchors as offset pairs inside a container's
//! normalized flattened text; rendering needs concrete boundary points in
//! text leaves. This module converts in both directions and enumerates the
//! leaves a multi-node range touches.
//!
//! Offsets here are in normalized-text char units. When normalization
//! changes a leaf's length (collapsed whitespace, stripped padding), local
//! offsets only approximate raw positions; they are clamped to the leaf and
//! treated as advisory. Faithful substring identity comes from the
//! context-validated search, not from these offsets.

use std::cmp::Ordering;

use crate::chars;
use crate::normalize::normalize_default;
use crate::tree::{Boundary, DocumentTree, NodeId, TreeError, TreeRange};

/// One text leaf's contribution to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeLeaf {
    pub node: NodeId,
    pub is_first: bool,
    pub is_last: bool,
    /// Char offset where the range enters this leaf.
    pub start_offset: usize,
    /// Char offset where the range leaves this leaf.
    pub end_offset: usize,
}

/// Build a live range from `[start, end)` char offsets into `container`'s
/// normalized flattened text.
///
/// Walks the container's text leaves in document order, skipping leaves that
/// normalize to nothing, and accumulates normalized lengths until the leaf
/// containing each boundary is found. The end boundary is inclusive of the
/// leaf that exactly completes it. Returns `None` when either boundary falls
/// outside the accumulated text.
pub fn range_from_offsets<T: DocumentTree + ?Sized>(
    tree: &T,
    container: NodeId,
    start: usize,
    end: usize,
) -> Option<TreeRange> {
    if end < start {
        return None;
    }

    let mut range_start: Option<Boundary> = None;
    let mut range_end: Option<Boundary> = None;
    let mut cumulative = 0usize;

    for leaf in tree.text_leaves(container) {
        let Some(raw) = tree.leaf_text(leaf) else {
            continue;
        };
        let normalized_len = chars::len(&normalize_default(raw));
        if normalized_len == 0 {
            continue;
        }
        let raw_len = chars::len(raw);

        if range_start.is_none() && start >= cumulative && start < cumulative + normalized_len {
            range_start = Some(Boundary {
                node: leaf,
                offset: (start - cumulative).min(raw_len),
            });
        }
        if range_end.is_none() && end > cumulative && end <= cumulative + normalized_len {
            range_end = Some(Boundary {
                node: leaf,
                offset: (end - cumulative).min(raw_len),
            });
        }
        if let (Some(start), Some(end)) = (range_start, range_end) {
            return Some(TreeRange { start, end });
        }

        cumulative += normalized_len;
    }

    None
}

/// Approximate normalized char offsets of `range` within `container`'s
/// flattened text: the inverse of [`range_from_offsets`], used to seed the
/// advisory offset cache on a fresh anchor.
pub fn offsets_from_range<T: DocumentTree + ?Sized>(
    tree: &T,
    container: NodeId,
    range: &TreeRange,
) -> Option<(usize, usize)> {
    let mut start = None;
    let mut end = None;
    let mut cumulative = 0usize;

    for leaf in tree.text_leaves(container) {
        let Some(raw) = tree.leaf_text(leaf) else {
            continue;
        };
        let normalized_len = chars::len(&normalize_default(raw));
        if leaf == range.start.node {
            start = Some(cumulative + range.start.offset.min(normalized_len));
        }
        if leaf == range.end.node {
            end = Some(cumulative + range.end.offset.min(normalized_len));
        }
        cumulative += normalized_len;
    }

    match (start, end) {
        (Some(start), Some(end)) if start <= end => Some((start, end)),
        _ => None,
    }
}

/// Ordered list of text leaves intersecting `range`, with per-leaf offsets.
///
/// A range confined to one text leaf short-circuits. Otherwise non-blank
/// leaves under the range's common ancestor are filtered by boundary-point
/// comparison; if that yields nothing (inconsistent comparisons in a host
/// tree), a document-order walk between the two boundary containers is used
/// instead.
pub fn leaves_in_range<T: DocumentTree + ?Sized>(
    tree: &T,
    range: &TreeRange,
) -> Result<Vec<RangeLeaf>, TreeError> {
    if range.start.node == range.end.node && tree.leaf_text(range.start.node).is_some() {
        if range.end.offset < range.start.offset {
            return Err(TreeError::InvertedRange);
        }
        return Ok(vec![RangeLeaf {
            node: range.start.node,
            is_first: true,
            is_last: true,
            start_offset: range.start.offset,
            end_offset: range.end.offset,
        }]);
    }

    let mut nodes = filtered_leaves(tree, range);
    if nodes.is_empty() {
        nodes = fallback_leaves(tree, range);
    }

    Ok(annotate(tree, range, nodes))
}

/// Primary path: boundary-comparison filter over the common ancestor.
fn filtered_leaves<T: DocumentTree + ?Sized>(tree: &T, range: &TreeRange) -> Vec<NodeId> {
    let ancestor = tree.common_ancestor(range);
    tree.text_leaves(ancestor)
        .into_iter()
        .filter(|&leaf| {
            let Some(text) = tree.leaf_text(leaf) else {
                return false;
            };
            if text.trim().is_empty() {
                return false;
            }
            let leaf_start = Boundary {
                node: leaf,
                offset: 0,
            };
            let leaf_end = Boundary {
                node: leaf,
                offset: chars::len(text),
            };
            // Reject when the range starts at/after this leaf ends, or ends
            // at/before this leaf starts.
            tree.compare_points(range.start, leaf_end) == Ordering::Less
                && tree.compare_points(range.end, leaf_start) == Ordering::Greater
        })
        .collect()
}

/// Defensive fallback: collect every text leaf between the boundary
/// containers in document order.
fn fallback_leaves<T: DocumentTree + ?Sized>(tree: &T, range: &TreeRange) -> Vec<NodeId> {
    let mut collected = Vec::new();
    let mut collecting = false;

    for leaf in tree.text_leaves(tree.root()) {
        let at_start = leaf == range.start.node || tree.contains(leaf, range.start.node);
        let at_end = leaf == range.end.node || tree.contains(leaf, range.end.node);

        if !collecting && at_start {
            collecting = true;
        }
        if collecting {
            let blank = tree
                .leaf_text(leaf)
                .map(|t| t.trim().is_empty())
                .unwrap_or(true);
            if !blank {
                collected.push(leaf);
            }
        }
        if collecting && at_end {
            break;
        }
    }

    collected
}

fn annotate<T: DocumentTree + ?Sized>(
    tree: &T,
    range: &TreeRange,
    nodes: Vec<NodeId>,
) -> Vec<RangeLeaf> {
    let count = nodes.len();
    nodes
        .into_iter()
        .enumerate()
        .map(|(index, node)| {
            let len = tree.leaf_text(node).map(chars::len).unwrap_or(0);
            let start_offset = if node == range.start.node {
                range.start.offset.min(len)
            } else {
                0
            };
            let end_offset = if node == range.end.node {
                range.end.offset.min(len)
            } else {
                len
            };
            RangeLeaf {
                node,
                is_first: index == 0,
                is_last: index + 1 == count,
                start_offset,
                end_offset,
            }
        })
        .collect()
}

/// Raw text covered by `range`, concatenated across its leaves.
pub fn range_text<T: DocumentTree + ?Sized>(
    tree: &T,
    range: &TreeRange,
) -> Result<String, TreeError> {
    let mut out = String::new();
    for leaf in leaves_in_range(tree, range)? {
        if let Some(text) = tree.leaf_text(leaf.node) {
            out.push_str(chars::slice(text, leaf.start_offset, leaf.end_offset));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::MemoryTree;
    use pretty_assertions::assert_eq;

    fn fixture() -> (MemoryTree, NodeId, NodeId, NodeId) {
        // <article><p>"The quick "<em>"brown"</em>" fox"</p><p>"jumps high"</p></article>
        let mut tree = MemoryTree::new("article");
        let p1 = tree.append_element(tree.root(), "p");
        let t1 = tree.append_text(p1, "The quick ");
        let em = tree.append_element(p1, "em");
        let t2 = tree.append_text(em, "brown");
        let t3 = tree.append_text(p1, " fox");
        let p2 = tree.append_element(tree.root(), "p");
        tree.append_text(p2, "jumps high");
        (tree, t1, t2, t3)
    }

    #[test]
    fn test_range_from_offsets_lands_in_the_right_leaves() {
        let (tree, _, t2, _) = fixture();
        // Normalized leaves: "the quick" (9), "brown" (5), "fox" (3), ...
        let range = range_from_offsets(&tree, tree.root(), 9, 14).unwrap();
        assert_eq!(range.start.node, t2);
        assert_eq!(range.start.offset, 0);
        assert_eq!(range.end.node, t2);
        assert_eq!(range.end.offset, 5);
    }

    #[test]
    fn test_range_from_offsets_end_boundary_is_inclusive_of_completing_leaf() {
        let (tree, t1, _, _) = fixture();
        // End offset 9 exactly completes the first leaf.
        let range = range_from_offsets(&tree, tree.root(), 0, 9).unwrap();
        assert_eq!(range.start.node, t1);
        assert_eq!(range.end.node, t1);
        assert_eq!(range.end.offset, 9);
    }

    #[test]
    fn test_range_from_offsets_spans_leaves() {
        let (tree, t1, _, t3) = fixture();
        // "quick brown fox": starts in t1, ends in t3.
        let range = range_from_offsets(&tree, tree.root(), 4, 17).unwrap();
        assert_eq!(range.start.node, t1);
        assert_eq!(range.start.offset, 4);
        assert_eq!(range.end.node, t3);
    }

    #[test]
    fn test_range_from_offsets_out_of_bounds_is_none() {
        let (tree, _, _, _) = fixture();
        assert!(range_from_offsets(&tree, tree.root(), 0, 999).is_none());
        assert!(range_from_offsets(&tree, tree.root(), 999, 1000).is_none());
        assert!(range_from_offsets(&tree, tree.root(), 5, 2).is_none());
    }

    #[test]
    fn test_range_from_offsets_skips_blank_leaves() {
        let mut tree = MemoryTree::new("article");
        let p = tree.append_element(tree.root(), "p");
        tree.append_text(p, "   ");
        let t = tree.append_text(p, "words");
        let range = range_from_offsets(&tree, tree.root(), 0, 5).unwrap();
        assert_eq!(range.start.node, t);
        assert_eq!(range.end.node, t);
    }

    #[test]
    fn test_offsets_from_range_inverts_range_from_offsets() {
        let (tree, _, _, _) = fixture();
        let range = range_from_offsets(&tree, tree.root(), 4, 14).unwrap();
        let (start, end) = offsets_from_range(&tree, tree.root(), &range).unwrap();
        assert_eq!((start, end), (4, 14));
    }

    #[test]
    fn test_leaves_in_range_single_leaf_short_circuits() {
        let (tree, t1, _, _) = fixture();
        let range = TreeRange {
            start: Boundary { node: t1, offset: 4 },
            end: Boundary { node: t1, offset: 9 },
        };
        let leaves = leaves_in_range(&tree, &range).unwrap();
        assert_eq!(
            leaves,
            vec![RangeLeaf {
                node: t1,
                is_first: true,
                is_last: true,
                start_offset: 4,
                end_offset: 9,
            }]
        );
    }

    #[test]
    fn test_leaves_in_range_collects_intermediate_leaves() {
        let (tree, t1, t2, t3) = fixture();
        let range = TreeRange {
            start: Boundary { node: t1, offset: 4 },
            end: Boundary { node: t3, offset: 4 },
        };
        let leaves = leaves_in_range(&tree, &range).unwrap();
        let nodes: Vec<NodeId> = leaves.iter().map(|l| l.node).collect();
        assert_eq!(nodes, vec![t1, t2, t3]);

        assert!(leaves[0].is_first && !leaves[0].is_last);
        assert_eq!(leaves[0].start_offset, 4);
        assert_eq!(leaves[0].end_offset, 10);

        assert_eq!(leaves[1].start_offset, 0);
        assert_eq!(leaves[1].end_offset, 5);

        assert!(leaves[2].is_last);
        assert_eq!(leaves[2].start_offset, 0);
        assert_eq!(leaves[2].end_offset, 4);
    }

    #[test]
    fn test_leaves_in_range_excludes_leaf_touched_only_at_boundary() {
        let (tree, t1, t2, _) = fixture();
        // Range ends exactly where t2 starts; t2 contributes nothing.
        let range = TreeRange {
            start: Boundary { node: t1, offset: 0 },
            end: Boundary { node: t2, offset: 0 },
        };
        let leaves = leaves_in_range(&tree, &range).unwrap();
        let nodes: Vec<NodeId> = leaves.iter().map(|l| l.node).collect();
        assert_eq!(nodes, vec![t1]);
    }

    #[test]
    fn test_fallback_walk_matches_primary_filter() {
        let (tree, t1, t2, t3) = fixture();
        let range = TreeRange {
            start: Boundary { node: t1, offset: 4 },
            end: Boundary { node: t3, offset: 4 },
        };
        assert_eq!(fallback_leaves(&tree, &range), vec![t1, t2, t3]);
    }

    #[test]
    fn test_element_boundary_containers_resolve_via_primary_filter() {
        let (tree, t1, t2, t3) = fixture();
        let p1 = tree.parent(t1).unwrap();
        // Boundary containers are elements (offsets count children); the
        // boundary-comparison filter still finds the covered leaves.
        let range = TreeRange {
            start: Boundary { node: p1, offset: 0 },
            end: Boundary { node: p1, offset: 3 },
        };
        let leaves = leaves_in_range(&tree, &range).unwrap();
        let nodes: Vec<NodeId> = leaves.iter().map(|l| l.node).collect();
        assert_eq!(nodes, vec![t1, t2, t3]);
    }

    #[test]
    fn test_range_text_concatenates_clipped_slices() {
        let (tree, t1, _, t3) = fixture();
        let range = TreeRange {
            start: Boundary { node: t1, offset: 4 },
            end: Boundary { node: t3, offset: 4 },
        };
        assert_eq!(range_text(&tree, &range).unwrap(), "quick brown fox");
    }
}
