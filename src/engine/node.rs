//! Core node types for the document tree.
//!
//! The node model is a closed registry: every kind of node the editor can
//! ever hold is a variant of [`NodeKind`]. Nodes live in a slotmap arena
//! owned by [`crate::engine::Document`] and are addressed by [`NodeKey`],
//! an engine-assigned key that stays valid for the node's whole lifetime.

use serde::{Deserialize, Serialize};

slotmap::new_key_type! {
    /// Engine-assigned unique key for a node in the document tree.
    pub struct NodeKey;
}

/// A single text-format attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

/// The four independent format memberships of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextFormat {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
}

impl TextFormat {
    /// Whether this run carries the given format.
    pub const fn has(&self, format: Format) -> bool {
        match format {
            Format::Bold => self.bold,
            Format::Italic => self.italic,
            Format::Underline => self.underline,
            Format::Strikethrough => self.strikethrough,
        }
    }

    /// Flip one format attribute in place.
    pub const fn toggle(&mut self, format: Format) {
        match format {
            Format::Bold => self.bold = !self.bold,
            Format::Italic => self.italic = !self.italic,
            Format::Underline => self.underline = !self.underline,
            Format::Strikethrough => self.strikethrough = !self.strikethrough,
        }
    }

    pub const fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.underline || self.strikethrough)
    }
}

/// The closed set of node kinds the editor understands.
///
/// Element kinds (root, paragraph, table, row, cell) carry their payload
/// elsewhere in the arena via child links; leaf kinds (text, math) carry
/// their content inline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Paragraph,
    Text { text: String, format: TextFormat },
    Table,
    TableRow,
    TableCell { header: bool },
    Math { latex: String, inline: bool },
}

impl NodeKind {
    /// Stable type tag, matching the serialized `type` field.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Paragraph => "paragraph",
            Self::Text { .. } => "text",
            Self::Table => "table",
            Self::TableRow => "tablerow",
            Self::TableCell { .. } => "tablecell",
            Self::Math { .. } => "math",
        }
    }

    /// Leaf nodes carry content and never have children.
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Text { .. } | Self::Math { .. })
    }

    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    pub const fn is_math(&self) -> bool {
        matches!(self, Self::Math { .. })
    }

    /// Textual fallback content for copy/search: text runs yield their
    /// text, math nodes yield their LaTeX source.
    pub fn text_content(&self) -> &str {
        match self {
            Self::Text { text, .. } => text,
            Self::Math { latex, .. } => latex,
            _ => "",
        }
    }
}

/// Arena record: a node kind plus its tree links.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
}

impl NodeData {
    pub const fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_toggle_is_involutive() {
        let mut format = TextFormat::default();
        format.toggle(Format::Bold);
        assert!(format.has(Format::Bold));
        format.toggle(Format::Bold);
        assert!(!format.has(Format::Bold));
        assert!(format.is_plain());
    }

    #[test]
    fn test_formats_are_independent() {
        let mut format = TextFormat::default();
        format.toggle(Format::Italic);
        format.toggle(Format::Strikethrough);
        assert!(!format.has(Format::Bold));
        assert!(format.has(Format::Italic));
        assert!(!format.has(Format::Underline));
        assert!(format.has(Format::Strikethrough));
    }

    #[test]
    fn test_text_content_fallback() {
        let math = NodeKind::Math {
            latex: "e = mc^2".to_string(),
            inline: true,
        };
        assert_eq!(math.text_content(), "e = mc^2");
        assert_eq!(NodeKind::Paragraph.text_content(), "");
    }

    #[test]
    fn test_type_names_are_distinct() {
        let kinds = [
            NodeKind::Root,
            NodeKind::Paragraph,
            NodeKind::Text {
                text: String::new(),
                format: TextFormat::default(),
            },
            NodeKind::Table,
            NodeKind::TableRow,
            NodeKind::TableCell { header: false },
            NodeKind::Math {
                latex: String::new(),
                inline: false,
            },
        ];
        let mut names: Vec<_> = kinds.iter().map(NodeKind::type_name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), kinds.len());
    }
}
