//! Arena-backed reference implementation of [`DocumentTree`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::chars;
use crate::tree::{
    ATTR_CLASS, ATTR_COLOR, ATTR_HIGHLIGHT_ID, ATTR_PART, Boundary, DEFAULT_MARK_CLASS,
    DocumentTree, MARK_TAG, MarkAttrs, NodeId, TreeError, TreeRange,
};

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// In-memory ordered tree of element and text nodes.
///
/// Nodes live in an arena; structural edits (wrapping, unwrapping) detach
/// nodes rather than freeing them, so a stale [`NodeId`] is never reused for
/// a different node within one tree's lifetime. Detached nodes are invisible
/// to every traversal, which always starts from the attached root.
#[derive(Debug, Clone)]
pub struct MemoryTree {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl MemoryTree {
    /// Create a tree whose root is an element with the given tag.
    pub fn new(root_tag: impl Into<String>) -> Self {
        let root = NodeData {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element {
                tag: root_tag.into(),
                attrs: BTreeMap::new(),
            },
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// Convenience: a root with one element child per entry, each holding a
    /// single text leaf.
    pub fn from_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> Self {
        let mut tree = Self::new("article");
        for paragraph in paragraphs {
            let p = tree.append_element(tree.root(), "p");
            tree.append_text(p, paragraph.as_ref());
        }
        tree
    }

    /// Append a new element under `parent` and return its id.
    pub fn append_element(&mut self, parent: NodeId, tag: impl Into<String>) -> NodeId {
        let id = self.push(NodeData {
            parent: Some(parent),
            children: Vec::new(),
            kind: NodeKind::Element {
                tag: tag.into(),
                attrs: BTreeMap::new(),
            },
        });
        self.nodes[parent.0 as usize].children.push(id);
        id
    }

    /// Append a new text leaf under `parent` and return its id.
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let id = self.push(NodeData {
            parent: Some(parent),
            children: Vec::new(),
            kind: NodeKind::Text(text.into()),
        });
        self.nodes[parent.0 as usize].children.push(id);
        id
    }

    /// Attribute value on an element node.
    pub fn attr(&self, node: NodeId, key: &str) -> Option<&str> {
        match &self.get(node)?.kind {
            NodeKind::Element { attrs, .. } => attrs.get(key).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    /// Tag of an element node.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// Children of `node`, in order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.get(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Parent of `node`, if attached.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.parent)
    }

    fn get(&self, node: NodeId) -> Option<&NodeData> {
        self.nodes.get(node.0 as usize)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(data);
        id
    }

    fn is_text(&self, node: NodeId) -> bool {
        matches!(self.get(node).map(|n| &n.kind), Some(NodeKind::Text(_)))
    }

    /// Child index path from the root down to `boundary`, with the boundary
    /// offset as the final component. Lexicographic comparison of two paths
    /// is document-order comparison of the points.
    fn boundary_path(&self, boundary: Boundary) -> Vec<usize> {
        let mut path = vec![boundary.offset];
        let mut current = boundary.node;
        while let Some(parent) = self.parent(current) {
            let index = self.nodes[parent.0 as usize]
                .children
                .iter()
                .position(|&c| c == current)
                .unwrap_or(0);
            path.push(index);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Preorder walk collecting every attached marker for `highlight_id`
    /// under `root` (inclusive).
    fn collect_markers(&self, root: NodeId, highlight_id: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.attr(node, ATTR_HIGHLIGHT_ID) == Some(highlight_id) {
                found.push(node);
            }
            let children = self.children(node);
            for &child in children.iter().rev() {
                stack.push(child);
            }
        }
        found
    }

    /// Merge adjacent text children and drop empty text leaves, recursively,
    /// undoing the fragmentation wrapping introduces.
    fn merge_text_children(&mut self, node: NodeId) {
        let children = self.children(node).to_vec();
        let mut merged: Vec<NodeId> = Vec::new();
        for child in children {
            match self.nodes[child.0 as usize].kind.clone() {
                NodeKind::Text(text) => {
                    if text.is_empty() {
                        self.nodes[child.0 as usize].parent = None;
                        continue;
                    }
                    let absorbed = match merged.last() {
                        Some(&last) if self.is_text(last) => {
                            if let NodeKind::Text(prev) = &mut self.nodes[last.0 as usize].kind {
                                prev.push_str(&text);
                            }
                            true
                        }
                        _ => false,
                    };
                    if absorbed {
                        self.nodes[child.0 as usize].parent = None;
                    } else {
                        merged.push(child);
                    }
                }
                NodeKind::Element { .. } => {
                    self.merge_text_children(child);
                    merged.push(child);
                }
            }
        }
        self.nodes[node.0 as usize].children = merged;
    }
}

impl DocumentTree for MemoryTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn leaf_text(&self, node: NodeId) -> Option<&str> {
        match &self.get(node)?.kind {
            NodeKind::Text(text) => Some(text.as_str()),
            NodeKind::Element { .. } => None,
        }
    }

    fn text_leaves(&self, container: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![container];
        while let Some(node) = stack.pop() {
            match self.get(node).map(|n| &n.kind) {
                Some(NodeKind::Text(_)) => leaves.push(node),
                Some(NodeKind::Element { .. }) => {
                    for &child in self.children(node).iter().rev() {
                        stack.push(child);
                    }
                }
                None => {}
            }
        }
        leaves
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    fn common_ancestor(&self, range: &TreeRange) -> NodeId {
        let mut chain = Vec::new();
        let mut current = Some(range.start.node);
        while let Some(n) = current {
            chain.push(n);
            current = self.parent(n);
        }
        let mut candidate = Some(range.end.node);
        while let Some(n) = candidate {
            if chain.contains(&n) {
                return n;
            }
            candidate = self.parent(n);
        }
        self.root
    }

    fn compare_points(&self, a: Boundary, b: Boundary) -> Ordering {
        self.boundary_path(a).cmp(&self.boundary_path(b))
    }

    fn wrap(
        &mut self,
        node: NodeId,
        start: usize,
        end: usize,
        attrs: &MarkAttrs,
    ) -> Result<NodeId, TreeError> {
        let data = self.get(node).ok_or(TreeError::UnknownNode(node))?;
        let NodeKind::Text(text) = data.kind.clone() else {
            return Err(TreeError::NotText(node));
        };
        let parent = data.parent.ok_or(TreeError::DetachedNode(node))?;

        let len = chars::len(&text);
        if start > end {
            return Err(TreeError::InvertedRange);
        }
        if end > len {
            return Err(TreeError::OffsetOutOfBounds {
                node,
                offset: end,
                len,
            });
        }

        let before = chars::slice(&text, 0, start).to_string();
        let inner = chars::slice(&text, start, end).to_string();
        let after = chars::slice(&text, end, len).to_string();

        let mut marker_attrs = BTreeMap::new();
        marker_attrs.insert(ATTR_HIGHLIGHT_ID.to_string(), attrs.highlight_id.clone());
        marker_attrs.insert(
            ATTR_CLASS.to_string(),
            attrs
                .class_name
                .clone()
                .unwrap_or_else(|| DEFAULT_MARK_CLASS.to_string()),
        );
        if let Some(part) = attrs.part {
            marker_attrs.insert(ATTR_PART.to_string(), part.to_string());
        }
        if let Some(color) = &attrs.color {
            marker_attrs.insert(ATTR_COLOR.to_string(), color.clone());
        }

        let marker = self.push(NodeData {
            parent: Some(parent),
            children: Vec::new(),
            kind: NodeKind::Element {
                tag: MARK_TAG.to_string(),
                attrs: marker_attrs,
            },
        });
        let inner_id = self.push(NodeData {
            parent: Some(marker),
            children: Vec::new(),
            kind: NodeKind::Text(inner),
        });
        self.nodes[marker.0 as usize].children.push(inner_id);

        let mut replacement = Vec::new();
        if !before.is_empty() {
            let before_id = self.push(NodeData {
                parent: Some(parent),
                children: Vec::new(),
                kind: NodeKind::Text(before),
            });
            replacement.push(before_id);
        }
        replacement.push(marker);
        if !after.is_empty() {
            let after_id = self.push(NodeData {
                parent: Some(parent),
                children: Vec::new(),
                kind: NodeKind::Text(after),
            });
            replacement.push(after_id);
        }

        let index = self.nodes[parent.0 as usize]
            .children
            .iter()
            .position(|&c| c == node)
            .ok_or(TreeError::DetachedNode(node))?;
        self.nodes[parent.0 as usize]
            .children
            .splice(index..=index, replacement);
        self.nodes[node.0 as usize].parent = None;

        Ok(marker)
    }

    fn unwrap_marks(&mut self, root: NodeId, highlight_id: &str) -> usize {
        let markers = self.collect_markers(root, highlight_id);
        let mut touched_parents = Vec::new();

        // Innermost first so an outer marker flattens already-unwrapped text.
        for &marker in markers.iter().rev() {
            let Some(parent) = self.parent(marker) else {
                continue;
            };
            let text = self.flatten_text(marker);
            let replacement = self.push(NodeData {
                parent: Some(parent),
                children: Vec::new(),
                kind: NodeKind::Text(text),
            });
            if let Some(index) = self.nodes[parent.0 as usize]
                .children
                .iter()
                .position(|&c| c == marker)
            {
                self.nodes[parent.0 as usize].children[index] = replacement;
            }
            self.nodes[marker.0 as usize].parent = None;
            if !touched_parents.contains(&parent) {
                touched_parents.push(parent);
            }
        }

        for parent in touched_parents {
            // A parent may itself have been unwrapped in the same pass.
            if parent == self.root || self.parent(parent).is_some() {
                self.merge_text_children(parent);
            }
        }

        markers.len()
    }

    fn marker_id(&self, node: NodeId) -> Option<String> {
        let mut current = Some(node);
        while let Some(n) = current {
            if let Some(id) = self.attr(n, ATTR_HIGHLIGHT_ID) {
                return Some(id.to_string());
            }
            current = self.parent(n);
        }
        None
    }

    fn markers_for(&self, highlight_id: &str) -> Vec<NodeId> {
        self.collect_markers(self.root, highlight_id)
    }

    fn set_marker_color(&mut self, highlight_id: &str, color: &str) -> usize {
        let markers = self.collect_markers(self.root, highlight_id);
        for &marker in &markers {
            if let NodeKind::Element { attrs, .. } = &mut self.nodes[marker.0 as usize].kind {
                attrs.insert(ATTR_COLOR.to_string(), color.to_string());
            }
        }
        markers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_paragraph_tree() -> (MemoryTree, NodeId, NodeId) {
        let mut tree = MemoryTree::new("article");
        let p1 = tree.append_element(tree.root(), "p");
        let t1 = tree.append_text(p1, "The quick brown fox");
        let p2 = tree.append_element(tree.root(), "p");
        let t2 = tree.append_text(p2, "jumps over the lazy dog");
        (tree, t1, t2)
    }

    #[test]
    fn test_flatten_concatenates_leaves_in_document_order() {
        let (tree, _, _) = two_paragraph_tree();
        assert_eq!(
            tree.flatten_text(tree.root()),
            "The quick brown foxjumps over the lazy dog"
        );
    }

    #[test]
    fn test_text_leaves_in_document_order() {
        let (tree, t1, t2) = two_paragraph_tree();
        assert_eq!(tree.text_leaves(tree.root()), vec![t1, t2]);
    }

    #[test]
    fn test_compare_points_orders_across_nodes() {
        let (tree, t1, t2) = two_paragraph_tree();
        let a = Boundary { node: t1, offset: 5 };
        let b = Boundary { node: t1, offset: 9 };
        let c = Boundary { node: t2, offset: 0 };
        assert_eq!(tree.compare_points(a, b), Ordering::Less);
        assert_eq!(tree.compare_points(b, c), Ordering::Less);
        assert_eq!(tree.compare_points(c, a), Ordering::Greater);
        assert_eq!(tree.compare_points(a, a), Ordering::Equal);
    }

    #[test]
    fn test_wrap_splits_leaf_and_tags_marker() {
        let (mut tree, t1, _) = two_paragraph_tree();
        let attrs = MarkAttrs {
            highlight_id: "h1".into(),
            color: Some("gold".into()),
            ..Default::default()
        };
        let marker = tree.wrap(t1, 4, 9, &attrs).unwrap();

        assert_eq!(tree.tag(marker), Some(MARK_TAG));
        assert_eq!(tree.attr(marker, ATTR_HIGHLIGHT_ID), Some("h1"));
        assert_eq!(tree.attr(marker, ATTR_COLOR), Some("gold"));
        assert_eq!(tree.attr(marker, ATTR_CLASS), Some(DEFAULT_MARK_CLASS));
        assert_eq!(tree.flatten_text(marker), "quick");
        // The surrounding text is preserved exactly.
        assert_eq!(
            tree.flatten_text(tree.root()),
            "The quick brown foxjumps over the lazy dog"
        );
    }

    #[test]
    fn test_wrap_at_leaf_edges_creates_no_empty_siblings() {
        let (mut tree, t1, _) = two_paragraph_tree();
        let p1 = tree.parent(t1).unwrap();
        tree.wrap(t1, 0, 19, &MarkAttrs::new("h1")).unwrap();
        assert_eq!(tree.children(p1).len(), 1);
    }

    #[test]
    fn test_wrap_rejects_bad_input() {
        let (mut tree, t1, _) = two_paragraph_tree();
        let p1 = tree.parent(t1).unwrap();
        assert_eq!(
            tree.wrap(p1, 0, 1, &MarkAttrs::new("h1")),
            Err(TreeError::NotText(p1))
        );
        assert_eq!(
            tree.wrap(t1, 5, 2, &MarkAttrs::new("h1")),
            Err(TreeError::InvertedRange)
        );
        assert!(matches!(
            tree.wrap(t1, 0, 99, &MarkAttrs::new("h1")),
            Err(TreeError::OffsetOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_unwrap_restores_text_and_merges_leaves() {
        let (mut tree, t1, _) = two_paragraph_tree();
        let p1 = tree.parent(t1).unwrap();
        tree.wrap(t1, 4, 9, &MarkAttrs::new("h1")).unwrap();
        assert_eq!(tree.children(p1).len(), 3);

        let removed = tree.unwrap_marks(tree.root(), "h1");
        assert_eq!(removed, 1);
        assert!(tree.markers_for("h1").is_empty());
        // Adjacent leaves are merged back into one.
        assert_eq!(tree.children(p1).len(), 1);
        assert_eq!(tree.flatten_text(p1), "The quick brown fox");
    }

    #[test]
    fn test_unwrap_only_touches_the_requested_id() {
        let (mut tree, t1, t2) = two_paragraph_tree();
        tree.wrap(t1, 0, 3, &MarkAttrs::new("h1")).unwrap();
        tree.wrap(t2, 0, 5, &MarkAttrs::new("h2")).unwrap();

        tree.unwrap_marks(tree.root(), "h1");
        assert!(tree.markers_for("h1").is_empty());
        assert_eq!(tree.markers_for("h2").len(), 1);
    }

    #[test]
    fn test_nested_markers_resolve_to_innermost() {
        let (mut tree, t1, _) = two_paragraph_tree();
        let outer = tree.wrap(t1, 0, 19, &MarkAttrs::new("outer")).unwrap();
        // The outer marker's text leaf gets wrapped again by a later
        // highlight; clicks inside it belong to the inner one.
        let inner_leaf = tree.text_leaves(outer)[0];
        let inner = tree.wrap(inner_leaf, 4, 9, &MarkAttrs::new("inner")).unwrap();

        let clicked = tree.text_leaves(inner)[0];
        assert_eq!(tree.marker_id(clicked), Some("inner".to_string()));

        let outside = tree.text_leaves(outer)[0];
        assert_eq!(tree.marker_id(outside), Some("outer".to_string()));
    }

    #[test]
    fn test_set_marker_color_touches_every_part() {
        let (mut tree, t1, t2) = two_paragraph_tree();
        tree.wrap(t1, 0, 3, &MarkAttrs::new("h1")).unwrap();
        tree.wrap(t2, 0, 5, &MarkAttrs::new("h1")).unwrap();

        assert_eq!(tree.set_marker_color("h1", "tomato"), 2);
        for marker in tree.markers_for("h1") {
            assert_eq!(tree.attr(marker, ATTR_COLOR), Some("tomato"));
        }
    }

    #[test]
    fn test_common_ancestor_of_cross_paragraph_range() {
        let (tree, t1, t2) = two_paragraph_tree();
        let range = TreeRange {
            start: Boundary { node: t1, offset: 4 },
            end: Boundary { node: t2, offset: 5 },
        };
        assert_eq!(tree.common_ancestor(&range), tree.root());

        let same = TreeRange {
            start: Boundary { node: t1, offset: 0 },
            end: Boundary { node: t1, offset: 3 },
        };
        assert_eq!(tree.common_ancestor(&same), t1);
    }
}
