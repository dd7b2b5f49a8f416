//! Application state stores.
//!
//! Two plain structs owned by the model: [`UiState`] holds toolbar and
//! page presentation state, [`EditorState`] tracks the serialized document
//! and its dirtiness. Neither is global; everything flows through the
//! model so tests can construct them directly.

use crate::engine::{Document, NodeKey, Selection, TextFormat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageOrientation {
    #[default]
    Portrait,
    Landscape,
}

impl PageOrientation {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Portrait => Self::Landscape,
            Self::Landscape => Self::Portrait,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }

    /// Target content width in columns. Landscape pages are wider.
    pub const fn page_width(self) -> u16 {
        match self {
            Self::Portrait => 80,
            Self::Landscape => 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageMargin {
    None,
    Narrow,
    #[default]
    Normal,
    Wide,
}

impl PageMargin {
    pub const fn cycled(self) -> Self {
        match self {
            Self::None => Self::Narrow,
            Self::Narrow => Self::Normal,
            Self::Normal => Self::Wide,
            Self::Wide => Self::None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Narrow => "narrow",
            Self::Normal => "normal",
            Self::Wide => "wide",
        }
    }

    /// Horizontal padding in columns on each side of the page.
    pub const fn padding(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Narrow => 2,
            Self::Normal => 6,
            Self::Wide => 12,
        }
    }
}

/// State of the math editor overlay. `node` is `None` when inserting a new
/// math node and `Some` when editing an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathEdit {
    pub node: Option<NodeKey>,
    pub latex: String,
    pub inline: bool,
}

impl MathEdit {
    pub const fn insert(inline: bool) -> Self {
        Self {
            node: None,
            latex: String::new(),
            inline,
        }
    }

    pub const fn edit(node: NodeKey, latex: String, inline: bool) -> Self {
        Self {
            node: Some(node),
            latex,
            inline,
        }
    }
}

/// Toolbar and page presentation state.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Format flags shown in the toolbar. Updated from caret and range
    /// selections only; a node selection leaves the last values standing.
    pub format: TextFormat,
    pub math_edit: Option<MathEdit>,
    pub orientation: PageOrientation,
    pub margin: PageMargin,
}

impl UiState {
    /// Refresh the toolbar flags from the document selection. Node and
    /// absent selections are ignored so the flags go stale rather than
    /// flickering to defaults.
    pub fn sync_selection(&mut self, doc: &Document) {
        if matches!(doc.selection(), Selection::Caret(_) | Selection::Range { .. }) {
            if let Some(format) = doc.selection_format() {
                self.format = format;
            }
        }
    }
}

/// Document persistence state.
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    /// Last serialized form of the document, if any.
    pub serialized: Option<String>,
    /// True when edits exist that are not yet on disk.
    pub is_dirty: bool,
    /// Wall-clock milliseconds of the last successful save.
    pub last_saved: Option<u64>,
}

impl EditorState {
    /// Record a fresh serialization of an edited document.
    pub fn set_serialized(&mut self, json: String) {
        self.serialized = Some(json);
        self.is_dirty = true;
    }

    /// Record content that arrived from disk, which is clean by definition.
    pub fn set_loaded(&mut self, json: String) {
        self.serialized = Some(json);
        self.is_dirty = false;
    }

    pub fn mark_saved(&mut self, now_ms: u64) {
        self.is_dirty = false;
        self.last_saved = Some(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Format;

    #[test]
    fn test_serialize_then_save_clears_dirty() {
        let mut state = EditorState::default();
        assert!(!state.is_dirty);
        state.set_serialized("{}".to_string());
        assert!(state.is_dirty);
        state.mark_saved(1_000);
        assert!(!state.is_dirty);
        assert_eq!(state.last_saved, Some(1_000));
    }

    #[test]
    fn test_loaded_content_is_clean() {
        let mut state = EditorState::default();
        state.set_loaded("{}".to_string());
        assert!(!state.is_dirty);
        assert!(state.serialized.is_some());
    }

    #[test]
    fn test_sync_selection_tracks_caret_format() {
        let mut doc = Document::new();
        doc.update(|tx| {
            tx.toggle_format(Format::Bold);
            tx.insert_text("b");
        });
        let mut ui = UiState::default();
        ui.sync_selection(&doc);
        assert!(ui.format.bold);
    }

    #[test]
    fn test_node_selection_leaves_flags_stale() {
        let mut doc = Document::new();
        doc.update(|tx| {
            tx.toggle_format(Format::Bold);
            tx.insert_text("b");
            tx.insert_inline_math("x");
        });
        let mut ui = UiState::default();
        ui.sync_selection(&doc);
        let before = ui.format;
        doc.update(|tx| tx.move_left());
        assert!(matches!(doc.selection(), Selection::Node(_)));
        ui.sync_selection(&doc);
        assert_eq!(ui.format, before);
    }

    #[test]
    fn test_margin_cycle_covers_all_values() {
        let mut margin = PageMargin::None;
        let mut seen = vec![margin];
        for _ in 0..3 {
            margin = margin.cycled();
            seen.push(margin);
        }
        assert_eq!(margin.cycled(), PageMargin::None);
        seen.sort_by_key(|m| m.padding());
        seen.dedup();
        assert_eq!(seen.len(), 4);
    }
}
