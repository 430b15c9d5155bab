//! Re-locating persisted anchors in a live document.
//!
//! The exact path scans occurrences of the anchor's normalized text and
//! accepts the first one whose surroundings match the captured context. The
//! fuzzy fallback slides a window across the document and keeps the best
//! candidate above a similarity threshold. Both thresholds are empirical
//! tuning knobs exposed through [`RestoreOptions`] rather than constants.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::anchor::{HighlightAnchor, ResolvedSpan};
use crate::bridge::{range_from_offsets, range_text};
use crate::chars;
use crate::locate::{find_normalized, validate_at};
use crate::normalize::normalize_default;
use crate::similarity::similarity;
use crate::tree::{DocumentTree, NodeId, TreeError, TreeRange};

/// Tuning knobs for restoration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RestoreOptions {
    /// Minimum similarity for the fuzzy fallback to accept a window.
    pub fuzzy_threshold: f64,
    /// Stricter bar applied by [`validate_restored`] for callers that
    /// re-check a resolved range.
    pub revalidate_threshold: f64,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.8,
            revalidate_threshold: 0.9,
        }
    }
}

/// Expected, non-fatal restoration failures. The anchor stays persisted; a
/// later pass may succeed after the document changes back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RestoreError {
    #[error("highlighted text not found")]
    NotFound,
    #[error("anchor text normalizes to nothing")]
    EmptyAnchor,
    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type RestoreResult = Result<ResolvedSpan, RestoreError>;

/// Re-locate `anchor` inside `container` and produce a render-ready span.
pub fn restore<T: DocumentTree + ?Sized>(
    tree: &T,
    container: NodeId,
    anchor: &HighlightAnchor,
    options: &RestoreOptions,
) -> RestoreResult {
    let haystack = normalize_default(&tree.flatten_text(container));
    let needle = normalize_default(&anchor.normalized_text);
    if needle.is_empty() {
        return Err(RestoreError::EmptyAnchor);
    }

    // Exact path: scan occurrences until one survives context validation.
    let mut from = 0;
    while let Some(position) = find_normalized(&haystack, &needle, from) {
        if validate_at(
            &haystack,
            position,
            &anchor.prefix_context,
            &anchor.suffix_context,
        ) {
            match range_from_offsets(tree, container, position.start, position.end) {
                Some(range) => {
                    return Ok(ResolvedSpan {
                        range,
                        confidence: 1.0,
                        exact_match: true,
                    });
                }
                None => {
                    log::debug!(
                        "validated occurrence of highlight {} at {}..{} did not map to a range",
                        anchor.id,
                        position.start,
                        position.end
                    );
                }
            }
        }
        from = position.start + 1;
    }

    fuzzy_restore(tree, container, &haystack, &needle, options)
}

/// Sliding-window fallback for text that drifted past exact matching.
///
/// The window steps by a quarter of the needle length, so a slightly better
/// alignment between sampled offsets can be missed for short needles; this
/// is a documented approximation, not a correctness guarantee.
fn fuzzy_restore<T: DocumentTree + ?Sized>(
    tree: &T,
    container: NodeId,
    haystack: &str,
    needle: &str,
    options: &RestoreOptions,
) -> RestoreResult {
    let needle_len = chars::len(needle);
    let haystack_len = chars::len(haystack);
    if needle_len == 0 || haystack_len < needle_len {
        return Err(RestoreError::NotFound);
    }

    let step = (needle_len / 4).max(1);
    let mut best: Option<(f64, usize)> = None;

    let mut at = 0;
    while at + needle_len <= haystack_len {
        let window = chars::slice(haystack, at, at + needle_len);
        let score = similarity(needle, window);
        if score >= options.fuzzy_threshold
            && best.map_or(true, |(best_score, _)| score > best_score)
        {
            best = Some((score, at));
        }
        at += step;
    }

    let Some((score, at)) = best else {
        return Err(RestoreError::NotFound);
    };
    let Some(range) = range_from_offsets(tree, container, at, at + needle_len) else {
        return Err(RestoreError::NotFound);
    };
    Ok(ResolvedSpan {
        range,
        confidence: score,
        exact_match: false,
    })
}

/// Restore a batch of anchors independently; one anchor's failure never
/// blocks another's.
pub fn restore_all<T: DocumentTree + ?Sized>(
    tree: &T,
    container: NodeId,
    anchors: &[HighlightAnchor],
    options: &RestoreOptions,
) -> BTreeMap<String, RestoreResult> {
    anchors
        .iter()
        .map(|anchor| (anchor.id.clone(), restore(tree, container, anchor, options)))
        .collect()
}

/// Post-hoc check for callers wanting a stricter acceptance bar than the
/// fuzzy threshold: the resolved range's live text must score at least
/// `revalidate_threshold` against the anchor.
pub fn validate_restored<T: DocumentTree + ?Sized>(
    tree: &T,
    range: &TreeRange,
    anchor: &HighlightAnchor,
    options: &RestoreOptions,
) -> bool {
    match range_text(tree, range) {
        Ok(live) => similarity(&live, &anchor.normalized_text) >= options.revalidate_threshold,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_default;
    use chrono::Utc;

    fn anchor_for(raw: &str, prefix: &str, suffix: &str) -> HighlightAnchor {
        let now = Utc::now();
        HighlightAnchor {
            id: HighlightAnchor::generate_id(),
            raw_text: raw.to_string(),
            normalized_text: normalize_default(raw),
            prefix_context: normalize_default(prefix),
            suffix_context: normalize_default(suffix),
            start_offset: 0,
            end_offset: chars::len(&normalize_default(raw)),
            spans_multiple_nodes: false,
            color: None,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_exact_restore_has_full_confidence() {
        let tree = crate::tree::MemoryTree::from_paragraphs(&[
            "The quick brown fox jumps over the lazy dog",
        ]);
        let anchor = anchor_for("brown fox", "the quick ", " jumps");
        let span = restore(&tree, tree.root(), &anchor, &RestoreOptions::default()).unwrap();
        assert_eq!(span.confidence, 1.0);
        assert!(span.exact_match);
        assert_eq!(range_text(&tree, &span.range).unwrap(), "brown fox");
    }

    #[test]
    fn test_context_picks_the_right_occurrence() {
        let tree = crate::tree::MemoryTree::from_paragraphs(&[
            "a fish swims",
            "another fish sleeps",
        ]);
        let anchor = anchor_for("fish", "another ", " sleeps");
        let span = restore(&tree, tree.root(), &anchor, &RestoreOptions::default()).unwrap();
        assert!(span.exact_match);
        // The match lands in the second paragraph's leaf.
        let second_leaf = tree.text_leaves(tree.root())[1];
        assert_eq!(span.range.start.node, second_leaf);
    }

    #[test]
    fn test_unrelated_edits_do_not_affect_confidence() {
        let original =
            crate::tree::MemoryTree::from_paragraphs(&["intro", "the quick brown fox jumps"]);
        let edited = crate::tree::MemoryTree::from_paragraphs(&[
            "a completely new introduction paragraph",
            "the quick brown fox jumps",
        ]);
        let anchor = anchor_for("brown fox", "quick ", " jumps");
        let options = RestoreOptions::default();

        let before = restore(&original, original.root(), &anchor, &options).unwrap();
        let after = restore(&edited, edited.root(), &anchor, &options).unwrap();
        assert_eq!(before.confidence, after.confidence);
        assert_eq!(after.confidence, 1.0);
    }

    #[test]
    fn test_fuzzy_fallback_finds_slightly_edited_text() {
        // "jumps" became "jumped": exact matching fails, the fuzzy window
        // still clears the default threshold.
        let tree = crate::tree::MemoryTree::from_paragraphs(&[
            "the quick brown fox jumped over the lazy dog",
        ]);
        let anchor = anchor_for("the quick brown fox jumps over the lazy dog", "", "");
        let span = restore(&tree, tree.root(), &anchor, &RestoreOptions::default()).unwrap();
        assert!(!span.exact_match);
        assert!(span.confidence >= 0.8 && span.confidence < 1.0);
    }

    #[test]
    fn test_deleted_text_fails_without_panicking() {
        let tree = crate::tree::MemoryTree::from_paragraphs(&["entirely unrelated content here"]);
        let anchor = anchor_for("the quick brown fox jumps over", "", "");
        let result = restore(&tree, tree.root(), &anchor, &RestoreOptions::default());
        assert_eq!(result, Err(RestoreError::NotFound));
    }

    #[test]
    fn test_fuzzy_threshold_is_a_tuning_knob() {
        // The same drifted document fails under a stricter threshold,
        // confirming 0.8 is configuration rather than a derived constant.
        let tree = crate::tree::MemoryTree::from_paragraphs(&[
            "the quick brown fox jumped over the lazy dog",
        ]);
        let anchor = anchor_for("the quick brown fox jumps over the lazy dog", "", "");
        let strict = RestoreOptions {
            fuzzy_threshold: 0.99,
            ..Default::default()
        };
        assert_eq!(
            restore(&tree, tree.root(), &anchor, &strict),
            Err(RestoreError::NotFound)
        );
    }

    #[test]
    fn test_restore_all_isolates_failures() {
        let tree =
            crate::tree::MemoryTree::from_paragraphs(&["the quick brown fox jumps over it"]);
        let good = anchor_for("brown fox", "quick ", " jumps");
        let bad = anchor_for("no such text anywhere at all", "", "");
        let results = restore_all(
            &tree,
            tree.root(),
            &[good.clone(), bad.clone()],
            &RestoreOptions::default(),
        );
        assert!(results[&good.id].is_ok());
        assert_eq!(results[&bad.id], Err(RestoreError::NotFound));
    }

    #[test]
    fn test_validate_restored_applies_stricter_bar() {
        let tree = crate::tree::MemoryTree::from_paragraphs(&["the quick brown fox jumps over"]);
        let anchor = anchor_for("brown fox", "quick ", " jumps");
        let options = RestoreOptions::default();
        let span = restore(&tree, tree.root(), &anchor, &options).unwrap();
        assert!(validate_restored(&tree, &span.range, &anchor, &options));

        let unrelated = anchor_for("completely different words", "", "");
        assert!(!validate_restored(&tree, &span.range, &unrelated, &options));
    }

    #[test]
    fn test_empty_anchor_is_rejected() {
        let tree = crate::tree::MemoryTree::from_paragraphs(&["some text"]);
        let mut anchor = anchor_for("placeholder", "", "");
        anchor.normalized_text = "   ".to_string();
        assert_eq!(
            restore(&tree, tree.root(), &anchor, &RestoreOptions::default()),
            Err(RestoreError::EmptyAnchor)
        );
    }
}
