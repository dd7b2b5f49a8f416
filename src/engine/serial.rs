//! Snapshot serialization.
//!
//! Documents persist as a JSON tree of tagged nodes plus an optional caret
//! position. Every node carries a `type` tag and a `version` so the format
//! can evolve per node kind; an unrecognized tag fails the whole load, it
//! is never silently dropped.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use super::document::Document;
use super::node::{NodeData, NodeKey, NodeKind, TextFormat};
use super::selection::Selection;
use crate::error::QuillError;

/// Current snapshot envelope version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// One serialized node. The `type` tag is the closed registry: loading a
/// snapshot that names any other tag is a hard error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SerializedNode {
    Root {
        version: u32,
        children: Vec<SerializedNode>,
    },
    Paragraph {
        version: u32,
        children: Vec<SerializedNode>,
    },
    Text {
        version: u32,
        text: String,
        #[serde(default)]
        format: TextFormat,
    },
    Table {
        version: u32,
        children: Vec<SerializedNode>,
    },
    #[serde(rename = "tablerow")]
    TableRow {
        version: u32,
        children: Vec<SerializedNode>,
    },
    #[serde(rename = "tablecell")]
    TableCell {
        version: u32,
        header: bool,
        children: Vec<SerializedNode>,
    },
    Math {
        version: u32,
        latex: String,
        inline: bool,
    },
}

/// Caret position as a root-relative child-index path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedCaret {
    pub path: Vec<usize>,
    pub offset: usize,
}

/// The persisted document: tree plus caret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub root: SerializedNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<SerializedCaret>,
}

impl Snapshot {
    /// Capture the document. Only caret selections persist; ranges and
    /// node selections collapse to nothing.
    pub fn capture(doc: &Document) -> Self {
        let selection = match doc.selection() {
            Selection::Caret(point) => doc.path_to(point.key).map(|path| SerializedCaret {
                path,
                offset: point.offset,
            }),
            _ => None,
        };
        Self {
            version: SNAPSHOT_VERSION,
            root: serialize_node(doc, doc.root()),
            selection,
        }
    }

    pub fn to_json(&self) -> Result<String, QuillError> {
        serde_json::to_string(self).map_err(QuillError::Serialize)
    }

    pub fn from_json(json: &str) -> Result<Self, QuillError> {
        let snapshot: Self = serde_json::from_str(json).map_err(QuillError::Deserialize)?;
        if !matches!(snapshot.root, SerializedNode::Root { .. }) {
            return Err(QuillError::MalformedSnapshot("top-level node is not a root"));
        }
        Ok(snapshot)
    }

    /// Rebuild a document from this snapshot. The caret is restored when
    /// its path still resolves to a text run, else it falls back to the
    /// first text stop.
    pub fn restore(&self) -> Result<Document, QuillError> {
        let mut nodes: SlotMap<NodeKey, NodeData> = SlotMap::with_key();
        let root = build_node(&mut nodes, &self.root, None)?;
        let mut doc = Document::new();
        doc.update(|tx| tx.replace_tree(nodes, root));
        let caret = self
            .selection
            .as_ref()
            .and_then(|caret| {
                let key = doc.node_at_path(&caret.path)?;
                match doc.kind(key) {
                    Some(NodeKind::Text { text, .. }) if text.is_char_boundary(caret.offset) => {
                        Some(Selection::caret(key, caret.offset))
                    }
                    _ => None,
                }
            })
            .or_else(|| first_text_caret(&doc));
        if let Some(caret) = caret {
            doc.update(|tx| tx.set_selection(caret));
        }
        Ok(doc)
    }
}

fn first_text_caret(doc: &Document) -> Option<Selection> {
    for &block in doc.children(doc.root()) {
        for &leaf in doc.children(block) {
            if doc.kind(leaf).is_some_and(NodeKind::is_text) {
                return Some(Selection::caret(leaf, 0));
            }
        }
    }
    None
}

fn serialize_node(doc: &Document, key: NodeKey) -> SerializedNode {
    let children = || {
        doc.children(key)
            .iter()
            .map(|&child| serialize_node(doc, child))
            .collect()
    };
    match doc.kind(key).expect("serialized key must be live") {
        NodeKind::Root => SerializedNode::Root {
            version: 1,
            children: children(),
        },
        NodeKind::Paragraph => SerializedNode::Paragraph {
            version: 1,
            children: children(),
        },
        NodeKind::Text { text, format } => SerializedNode::Text {
            version: 1,
            text: text.clone(),
            format: *format,
        },
        NodeKind::Table => SerializedNode::Table {
            version: 1,
            children: children(),
        },
        NodeKind::TableRow => SerializedNode::TableRow {
            version: 1,
            children: children(),
        },
        NodeKind::TableCell { header } => SerializedNode::TableCell {
            version: 1,
            header: *header,
            children: children(),
        },
        NodeKind::Math { latex, inline } => SerializedNode::Math {
            version: 1,
            latex: latex.clone(),
            inline: *inline,
        },
    }
}

fn build_node(
    nodes: &mut SlotMap<NodeKey, NodeData>,
    serialized: &SerializedNode,
    parent: Option<NodeKey>,
) -> Result<NodeKey, QuillError> {
    let (kind, children) = match serialized {
        SerializedNode::Root { children, .. } => (NodeKind::Root, Some(children)),
        SerializedNode::Paragraph { children, .. } => (NodeKind::Paragraph, Some(children)),
        SerializedNode::Text { text, format, .. } => (
            NodeKind::Text {
                text: text.clone(),
                format: *format,
            },
            None,
        ),
        SerializedNode::Table { children, .. } => (NodeKind::Table, Some(children)),
        SerializedNode::TableRow { children, .. } => (NodeKind::TableRow, Some(children)),
        SerializedNode::TableCell {
            header, children, ..
        } => (NodeKind::TableCell { header: *header }, Some(children)),
        SerializedNode::Math { latex, inline, .. } => (
            NodeKind::Math {
                latex: latex.clone(),
                inline: *inline,
            },
            None,
        ),
    };
    if parent.is_none() && !matches!(kind, NodeKind::Root) {
        return Err(QuillError::MalformedSnapshot("top-level node is not a root"));
    }
    let key = nodes.insert(NodeData::new(kind));
    nodes[key].parent = parent;
    if let Some(children) = children {
        for child in children {
            let child_key = build_node(nodes, child, Some(key))?;
            nodes[key].children.push(child_key);
        }
    }
    Ok(key)
}
