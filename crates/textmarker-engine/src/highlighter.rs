//! Highlight orchestrator: the top-level state owner.
//!
//! Owns the in-memory index of live highlights and mediates between
//! selection capture, persistence, restoration and rendering. Per highlight
//! the lifecycle is `absent → pending-creation → persisted+rendered →
//! (updated)* → removed`. The pending selection is explicit state here, not
//! a module-level global, so capture and confirm stay decoupled from any
//! particular event wiring.

use std::collections::HashMap;

use thiserror::Error;

use crate::anchor::{AnchorPatch, HighlightAnchor, LiveSelection, ResolvedSpan};
use crate::bridge::{offsets_from_range, range_text};
use crate::context::{DEFAULT_CONTEXT_CHARS, extract_context};
use crate::normalize::normalize_default;
use crate::render::{self, MarkStyle, RenderError};
use crate::restore::{self, RestoreOptions};
use crate::store::{HighlightStore, StorageError};
use crate::tree::{DocumentTree, NodeId, TreeError, TreeRange};

use chrono::Utc;

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("selection normalizes to empty text")]
    EmptySelection,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Orchestrator configuration; see `textmarker-config` for the TOML form.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlighterOptions {
    /// Width of each captured context window, in chars.
    pub context_chars: usize,
    pub restore: RestoreOptions,
    /// CSS class applied to markers; the tree default when `None`.
    pub mark_class: Option<String>,
    /// Color for new highlights with no explicit color.
    pub default_color: Option<String>,
}

impl Default for HighlighterOptions {
    fn default() -> Self {
        Self {
            context_chars: DEFAULT_CONTEXT_CHARS,
            restore: RestoreOptions::default(),
            mark_class: None,
            default_color: None,
        }
    }
}

/// One tracked highlight: its durable anchor plus, when restoration or
/// creation succeeded in this document session, its live span.
#[derive(Debug, Clone)]
pub struct TrackedHighlight {
    pub anchor: HighlightAnchor,
    pub span: Option<ResolvedSpan>,
}

/// Summary of a [`Highlighter::load_highlights`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Anchors fetched from storage.
    pub loaded: usize,
    /// Anchors restored and rendered.
    pub restored: usize,
    /// Ids that could not be restored; they stay persisted for later.
    pub failed: Vec<String>,
}

/// Selection UI collaborator: the visual affordance shown near a selection.
/// Implemented by the embedding application.
pub trait SelectionUi {
    fn show(&mut self, x: f64, y: f64, selection: &LiveSelection);
    fn hide(&mut self);
    fn destroy(&mut self);
    /// Register the hook the UI invokes when the user confirms they want to
    /// highlight the current selection. Embedders typically forward it to
    /// [`Highlighter::confirm_pending`].
    fn on_highlight_requested(&mut self, callback: Box<dyn FnMut()>);
}

type AnchorCallback = Box<dyn FnMut(&HighlightAnchor)>;
type ClickCallback = Box<dyn FnMut(&str, (f64, f64))>;

/// Top-level highlight state owner, generic over the storage backend.
pub struct Highlighter<S: HighlightStore> {
    store: S,
    options: HighlighterOptions,
    index: HashMap<String, TrackedHighlight>,
    pending: Option<LiveSelection>,
    on_created: Option<AnchorCallback>,
    on_removed: Option<AnchorCallback>,
    on_updated: Option<AnchorCallback>,
    on_clicked: Option<ClickCallback>,
}

impl<S: HighlightStore> Highlighter<S> {
    pub fn new(store: S, options: HighlighterOptions) -> Self {
        Self {
            store,
            options,
            index: HashMap::new(),
            pending: None,
            on_created: None,
            on_removed: None,
            on_updated: None,
            on_clicked: None,
        }
    }

    pub fn options(&self) -> &HighlighterOptions {
        &self.options
    }

    // Event callbacks are fire-and-forget notifications; no return value is
    // consumed.
    pub fn on_highlight_created(&mut self, callback: impl FnMut(&HighlightAnchor) + 'static) {
        self.on_created = Some(Box::new(callback));
    }

    pub fn on_highlight_removed(&mut self, callback: impl FnMut(&HighlightAnchor) + 'static) {
        self.on_removed = Some(Box::new(callback));
    }

    pub fn on_highlight_updated(&mut self, callback: impl FnMut(&HighlightAnchor) + 'static) {
        self.on_updated = Some(Box::new(callback));
    }

    pub fn on_highlight_clicked(&mut self, callback: impl FnMut(&str, (f64, f64)) + 'static) {
        self.on_clicked = Some(Box::new(callback));
    }

    /// Capture the current selection into a [`LiveSelection`].
    ///
    /// Rejects selections that normalize to nothing (whitespace-only).
    pub fn capture_selection<T: DocumentTree + ?Sized>(
        &self,
        tree: &T,
        range: TreeRange,
    ) -> Result<LiveSelection, HighlightError> {
        let raw_text = range_text(tree, &range)?;
        let normalized_text = normalize_default(&raw_text);
        if normalized_text.is_empty() {
            return Err(HighlightError::EmptySelection);
        }
        let context = extract_context(
            tree,
            &range,
            self.options.context_chars,
            self.options.context_chars,
        )?;
        Ok(LiveSelection {
            raw_text,
            normalized_text,
            spans_multiple_nodes: range.spans_multiple_nodes(),
            range,
            prefix_context: context.prefix,
            suffix_context: context.suffix,
        })
    }

    /// Stash `selection` as the pending one and surface the UI affordance.
    pub fn present_selection(
        &mut self,
        ui: &mut dyn SelectionUi,
        x: f64,
        y: f64,
        selection: LiveSelection,
    ) {
        ui.show(x, y, &selection);
        self.pending = Some(selection);
    }

    /// Drop the pending selection (user selected elsewhere or dismissed).
    pub fn dismiss_selection(&mut self, ui: &mut dyn SelectionUi) {
        self.pending = None;
        ui.hide();
    }

    pub fn pending_selection(&self) -> Option<&LiveSelection> {
        self.pending.as_ref()
    }

    /// Confirm the pending selection into a persisted, rendered highlight.
    pub fn confirm_pending<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
    ) -> Result<Option<HighlightAnchor>, HighlightError> {
        match self.pending.take() {
            Some(selection) => self.create_highlight(tree, selection).map(Some),
            None => Ok(None),
        }
    }

    /// Create a highlight from a captured selection: build the anchor,
    /// render its marks, persist, index, notify.
    ///
    /// A persistence failure unwinds the freshly rendered marks so the tree,
    /// the index and the store stay in agreement.
    pub fn create_highlight<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        selection: LiveSelection,
    ) -> Result<HighlightAnchor, HighlightError> {
        if selection.normalized_text.is_empty() {
            return Err(HighlightError::EmptySelection);
        }

        let (start_offset, end_offset) =
            offsets_from_range(tree, tree.root(), &selection.range).unwrap_or((0, 0));
        let now = Utc::now();
        let anchor = HighlightAnchor {
            id: HighlightAnchor::generate_id(),
            raw_text: selection.raw_text,
            normalized_text: selection.normalized_text,
            prefix_context: normalize_default(&selection.prefix_context),
            suffix_context: normalize_default(&selection.suffix_context),
            start_offset,
            end_offset,
            spans_multiple_nodes: selection.spans_multiple_nodes,
            color: self.options.default_color.clone(),
            note: None,
            created_at: now,
            updated_at: now,
        };

        render::render(tree, &selection.range, &anchor.id, &self.mark_style(&anchor))?;

        if let Err(err) = self.store.save(&anchor) {
            log::warn!("persisting highlight {} failed: {err}", anchor.id);
            render::unwrap(tree, &anchor.id, None);
            return Err(err.into());
        }

        self.index.insert(
            anchor.id.clone(),
            TrackedHighlight {
                anchor: anchor.clone(),
                span: Some(ResolvedSpan {
                    range: selection.range,
                    confidence: 1.0,
                    exact_match: true,
                }),
            },
        );
        if let Some(callback) = &mut self.on_created {
            callback(&anchor);
        }
        Ok(anchor)
    }

    /// Fetch persisted anchors and restore them against `container`.
    ///
    /// Each anchor restores independently. Failures are tracked without a
    /// span (so update/remove still work) and are never deleted from
    /// storage: restoration failure is not deletion.
    pub fn load_highlights<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        container: NodeId,
    ) -> Result<LoadReport, HighlightError> {
        let anchors = self.store.load()?;
        let mut report = LoadReport {
            loaded: anchors.len(),
            ..Default::default()
        };

        for anchor in anchors {
            match restore::restore(tree, container, &anchor, &self.options.restore) {
                Ok(span) => {
                    if let Err(err) =
                        render::render(tree, &span.range, &anchor.id, &self.mark_style(&anchor))
                    {
                        log::warn!("rendering restored highlight {} failed: {err}", anchor.id);
                    }
                    report.restored += 1;
                    self.index.insert(
                        anchor.id.clone(),
                        TrackedHighlight {
                            anchor,
                            span: Some(span),
                        },
                    );
                }
                Err(err) => {
                    log::debug!("highlight {} not restored: {err}", anchor.id);
                    report.failed.push(anchor.id.clone());
                    self.index
                        .insert(anchor.id.clone(), TrackedHighlight { anchor, span: None });
                }
            }
        }

        Ok(report)
    }

    /// Remove a highlight: unwrap marks, drop from the index, delete from
    /// storage, notify. An id absent from the index is a silent no-op (it
    /// may already have been removed by another path).
    pub fn remove_highlight<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        id: &str,
    ) -> Result<(), HighlightError> {
        if !self.index.contains_key(id) {
            return Ok(());
        }

        render::unwrap(tree, id, None);
        match self.store.remove(id) {
            // Already gone from storage: treat as removed.
            Ok(()) | Err(StorageError::NotFound(_)) => {}
            Err(err) => {
                log::warn!("removing highlight {id} from storage failed: {err}");
                // Marks are gone but the highlight is still persisted; keep
                // tracking it without a span so a later removal can retry.
                if let Some(tracked) = self.index.get_mut(id) {
                    tracked.span = None;
                }
                return Err(err.into());
            }
        }

        if let Some(tracked) = self.index.remove(id) {
            if let Some(callback) = &mut self.on_removed {
                callback(&tracked.anchor);
            }
        }
        Ok(())
    }

    /// Merge partial fields into a highlight, persist, recolor live marks
    /// when the color changed, notify.
    pub fn update_highlight<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
        id: &str,
        patch: &AnchorPatch,
    ) -> Result<HighlightAnchor, HighlightError> {
        let updated = self.store.update(id, patch)?;
        if let Some(tracked) = self.index.get_mut(id) {
            tracked.anchor = updated.clone();
        }
        if let Some(color) = &patch.color {
            render::set_color(tree, id, color);
        }
        if let Some(callback) = &mut self.on_updated {
            callback(&updated);
        }
        Ok(updated)
    }

    /// Remove every tracked highlight's marks, then clear the store.
    pub fn clear_all<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &mut T,
    ) -> Result<(), HighlightError> {
        let ids: Vec<String> = self.index.keys().cloned().collect();
        for id in ids {
            render::unwrap(tree, &id, None);
            if let Some(tracked) = self.index.remove(&id) {
                if let Some(callback) = &mut self.on_removed {
                    callback(&tracked.anchor);
                }
            }
        }
        self.store.clear()?;
        Ok(())
    }

    /// Resolve a pointer event on `node` to its highlight and notify.
    pub fn handle_click<T: DocumentTree + ?Sized>(
        &mut self,
        tree: &T,
        node: NodeId,
        x: f64,
        y: f64,
    ) -> Option<String> {
        let id = render::marker_highlight_id(tree, node)?;
        if let Some(callback) = &mut self.on_clicked {
            callback(&id, (x, y));
        }
        Some(id)
    }

    /// Tracked anchors, oldest first.
    pub fn list(&self) -> Vec<&HighlightAnchor> {
        let mut anchors: Vec<&HighlightAnchor> =
            self.index.values().map(|t| &t.anchor).collect();
        anchors.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        anchors
    }

    pub fn get(&self, id: &str) -> Option<&TrackedHighlight> {
        self.index.get(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn mark_style(&self, anchor: &HighlightAnchor) -> MarkStyle {
        MarkStyle {
            color: anchor.color.clone(),
            class_name: self.options.mark_class.clone(),
        }
    }
}
