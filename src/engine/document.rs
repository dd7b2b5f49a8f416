//! The document tree and its transactional update path.
//!
//! All mutation goes through [`Document::update`], which hands the closure
//! a [`Tx`] and collects an [`UpdateSummary`] of what changed. Callers use
//! the summary to decide whether a snapshot needs to be queued and whether
//! the toolbar state needs a refresh; an update that dirtied nothing is
//! skipped entirely by the persistence layer.

use std::collections::HashSet;

use slotmap::SlotMap;

use super::node::{Format, NodeData, NodeKey, NodeKind, TextFormat};
use super::selection::{Point, Selection};

/// What a single update pass touched.
#[derive(Debug, Default, Clone)]
pub struct UpdateSummary {
    /// Element nodes whose children changed.
    pub dirty_elements: HashSet<NodeKey>,
    /// Leaf nodes whose content changed.
    pub dirty_leaves: HashSet<NodeKey>,
    pub selection_changed: bool,
}

impl UpdateSummary {
    /// True when nothing in the tree changed. Selection-only updates are
    /// content-clean and must not trigger a save.
    pub fn is_content_clean(&self) -> bool {
        self.dirty_elements.is_empty() && self.dirty_leaves.is_empty()
    }

    fn merge(&mut self, other: Self) {
        self.dirty_elements.extend(other.dirty_elements);
        self.dirty_leaves.extend(other.dirty_leaves);
        self.selection_changed |= other.selection_changed;
    }
}

/// One item the caret can land on while traversing the document: a text
/// run it can enter, or an opaque node it selects as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaretStop {
    Text(NodeKey),
    Opaque(NodeKey),
}

pub struct Document {
    nodes: SlotMap<NodeKey, NodeData>,
    root: NodeKey,
    selection: Selection,
    /// Format queued by a caret toggle, applied to the next insertion.
    caret_format: Option<TextFormat>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: a root with one empty paragraph, caret inside it.
    pub fn new() -> Self {
        let mut nodes: SlotMap<NodeKey, NodeData> = SlotMap::with_key();
        let root = nodes.insert(NodeData::new(NodeKind::Root));
        let mut doc = Self {
            nodes,
            root,
            selection: Selection::None,
            caret_format: None,
        };
        let paragraph = doc.insert_node(NodeKind::Paragraph, root, 0);
        let text = doc.insert_node(
            NodeKind::Text {
                text: String::new(),
                format: TextFormat::default(),
            },
            paragraph,
            0,
        );
        doc.selection = Selection::caret(text, 0);
        doc
    }

    pub const fn root(&self) -> NodeKey {
        self.root
    }

    pub const fn selection(&self) -> Selection {
        self.selection
    }

    pub fn get(&self, key: NodeKey) -> Option<&NodeData> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn kind(&self, key: NodeKey) -> Option<&NodeKind> {
        self.nodes.get(key).map(|n| &n.kind)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map_or(&[], |n| n.children.as_slice())
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(|n| n.parent)
    }

    /// Child-index path from the root to `key`, used to persist the caret
    /// position across sessions without leaking arena keys.
    pub fn path_to(&self, key: NodeKey) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = key;
        while let Some(parent) = self.parent(current) {
            let index = self.children(parent).iter().position(|&c| c == current)?;
            path.push(index);
            current = parent;
        }
        if current == self.root {
            path.reverse();
            Some(path)
        } else {
            None
        }
    }

    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeKey> {
        let mut current = self.root;
        for &index in path {
            current = *self.children(current).get(index)?;
        }
        Some(current)
    }

    /// Run a mutation inside a transaction and report what it touched.
    pub fn update<F>(&mut self, f: F) -> UpdateSummary
    where
        F: FnOnce(&mut Tx),
    {
        let mut tx = Tx {
            doc: self,
            summary: UpdateSummary::default(),
        };
        f(&mut tx);
        let mut summary = tx.summary;
        summary.merge(self.normalize());
        summary
    }

    /// The format the toolbar should display for the current selection.
    /// Node selections yield `None`: the flags go stale rather than reset.
    pub fn selection_format(&self) -> Option<TextFormat> {
        let key = self.selection.text_key()?;
        let NodeKind::Text { format, .. } = self.kind(key)? else {
            return None;
        };
        match self.selection {
            Selection::Caret(_) => Some(self.caret_format.unwrap_or(*format)),
            _ => Some(*format),
        }
    }

    // Tree surgery shared by the transaction handle.

    fn insert_node(&mut self, kind: NodeKind, parent: NodeKey, index: usize) -> NodeKey {
        let key = self.nodes.insert(NodeData::new(kind));
        self.nodes[key].parent = Some(parent);
        let children = &mut self.nodes[parent].children;
        let index = index.min(children.len());
        children.insert(index, key);
        key
    }

    fn detach(&mut self, key: NodeKey) {
        if let Some(parent) = self.parent(key) {
            self.nodes[parent].children.retain(|&c| c != key);
            self.nodes[key].parent = None;
        }
    }

    fn remove_subtree(&mut self, key: NodeKey) {
        self.detach(key);
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            if let Some(node) = self.nodes.remove(k) {
                stack.extend(node.children);
            }
        }
    }

    fn sibling_index(&self, key: NodeKey) -> Option<(NodeKey, usize)> {
        let parent = self.parent(key)?;
        let index = self.children(parent).iter().position(|&c| c == key)?;
        Some((parent, index))
    }

    /// The top-level block under the root containing `key`.
    fn enclosing_block(&self, key: NodeKey) -> Option<NodeKey> {
        let mut current = key;
        while let Some(parent) = self.parent(current) {
            if parent == self.root {
                return Some(current);
            }
            current = parent;
        }
        None
    }

    fn is_inside_table(&self, key: NodeKey) -> bool {
        let mut current = key;
        while let Some(parent) = self.parent(current) {
            if matches!(self.kind(parent), Some(NodeKind::Table)) {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Every paragraph and table cell keeps at least one text leaf so the
    /// caret always has somewhere to land. Repairs run after every update.
    fn normalize(&mut self) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        let needs_text: Vec<NodeKey> = self
            .nodes
            .iter()
            .filter(|(_, node)| {
                matches!(node.kind, NodeKind::Paragraph | NodeKind::TableCell { .. })
                    && !node.children.iter().any(|&c| {
                        self.nodes.get(c).is_some_and(|n| n.kind.is_text())
                    })
            })
            .map(|(key, _)| key)
            .collect();
        for element in needs_text {
            let index = self.children(element).len();
            self.insert_node(
                NodeKind::Text {
                    text: String::new(),
                    format: TextFormat::default(),
                },
                element,
                index,
            );
            summary.dirty_elements.insert(element);
        }
        summary
    }

    // Caret traversal.

    /// Document-order stops the caret can visit. Table interiors are
    /// skipped: the table is one opaque stop, edited via its own mode.
    fn caret_stops(&self) -> Vec<CaretStop> {
        let mut stops = Vec::new();
        for &block in self.children(self.root) {
            match self.kind(block) {
                Some(NodeKind::Paragraph) => {
                    for &leaf in self.children(block) {
                        match self.kind(leaf) {
                            Some(NodeKind::Text { .. }) => stops.push(CaretStop::Text(leaf)),
                            Some(NodeKind::Math { .. }) => stops.push(CaretStop::Opaque(leaf)),
                            _ => {}
                        }
                    }
                }
                Some(NodeKind::Table | NodeKind::Math { .. }) => {
                    stops.push(CaretStop::Opaque(block));
                }
                _ => {}
            }
        }
        stops
    }

    fn stop_index(&self, stops: &[CaretStop]) -> Option<usize> {
        let target = match self.selection {
            Selection::Caret(point) => CaretStop::Text(point.key),
            Selection::Node(key) => CaretStop::Opaque(key),
            Selection::Range { focus, .. } => CaretStop::Text(focus.key),
            Selection::None => return None,
        };
        stops.iter().position(|&s| s == target)
    }

    fn selection_for_stop(&self, stop: CaretStop, at_end: bool) -> Selection {
        match stop {
            CaretStop::Text(key) => {
                let len = self
                    .kind(key)
                    .map_or(0, |k| k.text_content().len());
                Selection::caret(key, if at_end { len } else { 0 })
            }
            CaretStop::Opaque(key) => Selection::Node(key),
        }
    }

    fn text_len(&self, key: NodeKey) -> usize {
        match self.kind(key) {
            Some(NodeKind::Text { text, .. }) => text.len(),
            _ => 0,
        }
    }

    fn prev_char_boundary(&self, key: NodeKey, offset: usize) -> usize {
        match self.kind(key) {
            Some(NodeKind::Text { text, .. }) => text[..offset]
                .char_indices()
                .next_back()
                .map_or(0, |(i, _)| i),
            _ => 0,
        }
    }

    fn next_char_boundary(&self, key: NodeKey, offset: usize) -> usize {
        match self.kind(key) {
            Some(NodeKind::Text { text, .. }) => text[offset..]
                .chars()
                .next()
                .map_or(offset, |c| offset + c.len_utf8()),
            _ => offset,
        }
    }
}

/// Mutable transaction handle. Mutations mark the touched nodes dirty;
/// selection moves mark the summary without dirtying content.
pub struct Tx<'a> {
    doc: &'a mut Document,
    summary: UpdateSummary,
}

impl Tx<'_> {
    pub fn doc(&self) -> &Document {
        self.doc
    }

    fn dirty_leaf(&mut self, key: NodeKey) {
        self.summary.dirty_leaves.insert(key);
    }

    fn dirty_element(&mut self, key: NodeKey) {
        self.summary.dirty_elements.insert(key);
    }

    pub fn set_selection(&mut self, selection: Selection) {
        if self.doc.selection != selection {
            self.doc.selection = selection;
            self.doc.caret_format = None;
            self.summary.selection_changed = true;
        }
    }

    /// Replace the whole tree with one loaded from a snapshot. Used only
    /// at startup; the caller rebuilds the selection afterwards.
    pub(crate) fn replace_tree(&mut self, nodes: SlotMap<NodeKey, NodeData>, root: NodeKey) {
        self.doc.nodes = nodes;
        self.doc.root = root;
        self.doc.selection = Selection::None;
        self.doc.caret_format = None;
        self.dirty_element(root);
        self.summary.selection_changed = true;
    }

    // Text editing.

    /// Insert text at the caret, replacing any active range first. A
    /// pending caret format splits the run so the new text carries it.
    pub fn insert_text(&mut self, input: &str) {
        if self.doc.selection.is_range() {
            self.delete_selection_range();
        }
        let Selection::Caret(point) = self.doc.selection else {
            return;
        };
        let format = match self.doc.kind(point.key) {
            Some(NodeKind::Text { format, .. }) => *format,
            _ => return,
        };
        let pending = self.doc.caret_format.take();
        if let Some(wanted) = pending.filter(|w| *w != format) {
            let target = self.split_run_for_format(point, wanted);
            self.doc.selection = Selection::caret(target, 0);
            self.insert_at_caret(input);
            return;
        }
        self.insert_at_caret(input);
    }

    fn insert_at_caret(&mut self, input: &str) {
        let Selection::Caret(point) = self.doc.selection else {
            return;
        };
        if let Some(NodeKind::Text { text, .. }) = self
            .doc
            .nodes
            .get_mut(point.key)
            .map(|n| &mut n.kind)
        {
            text.insert_str(point.offset, input);
            self.doc.selection = Selection::caret(point.key, point.offset + input.len());
            self.summary.selection_changed = true;
            self.dirty_leaf(point.key);
            if let Some(parent) = self.doc.parent(point.key) {
                self.dirty_element(parent);
            }
        }
    }

    /// Split the run at the caret and return an empty run carrying
    /// `format`, positioned between the two halves.
    fn split_run_for_format(&mut self, point: Point, format: TextFormat) -> NodeKey {
        let Some((parent, index)) = self.doc.sibling_index(point.key) else {
            return point.key;
        };
        let tail = match self.doc.nodes.get_mut(point.key).map(|n| &mut n.kind) {
            Some(NodeKind::Text { text, .. }) => text.split_off(point.offset),
            _ => return point.key,
        };
        let old_format = match self.doc.kind(point.key) {
            Some(NodeKind::Text { format, .. }) => *format,
            _ => TextFormat::default(),
        };
        let formatted = self.doc.insert_node(
            NodeKind::Text {
                text: String::new(),
                format,
            },
            parent,
            index + 1,
        );
        if !tail.is_empty() {
            self.doc.insert_node(
                NodeKind::Text {
                    text: tail,
                    format: old_format,
                },
                parent,
                index + 2,
            );
        }
        self.dirty_leaf(point.key);
        self.dirty_element(parent);
        formatted
    }

    /// Delete backwards from the caret. At a run boundary this deletes an
    /// adjacent opaque leaf, merges runs, or joins paragraphs.
    pub fn backspace(&mut self) {
        if self.doc.selection.is_range() {
            self.delete_selection_range();
            return;
        }
        if let Selection::Node(key) = self.doc.selection {
            self.delete_node_selection(key);
            return;
        }
        let Selection::Caret(point) = self.doc.selection else {
            return;
        };
        if point.offset > 0 {
            let start = self.doc.prev_char_boundary(point.key, point.offset);
            self.remove_text_span(point.key, start, point.offset);
            self.doc.selection = Selection::caret(point.key, start);
            self.summary.selection_changed = true;
            return;
        }
        let Some((parent, index)) = self.doc.sibling_index(point.key) else {
            return;
        };
        if index > 0 {
            let prev = self.doc.children(parent)[index - 1];
            match self.doc.kind(prev) {
                Some(NodeKind::Math { .. }) => {
                    self.doc.remove_subtree(prev);
                    self.dirty_element(parent);
                }
                Some(NodeKind::Text { .. }) => {
                    let end = self.doc.text_len(prev);
                    let start = self.doc.prev_char_boundary(prev, end);
                    self.remove_text_span(prev, start, end);
                    self.doc.selection = Selection::caret(prev, start);
                    self.summary.selection_changed = true;
                }
                _ => {}
            }
            return;
        }
        self.join_with_previous_paragraph(parent);
    }

    /// Delete forwards from the caret.
    pub fn delete_forward(&mut self) {
        if self.doc.selection.is_range() {
            self.delete_selection_range();
            return;
        }
        if let Selection::Node(key) = self.doc.selection {
            self.delete_node_selection(key);
            return;
        }
        let Selection::Caret(point) = self.doc.selection else {
            return;
        };
        let len = self.doc.text_len(point.key);
        if point.offset < len {
            let end = self.doc.next_char_boundary(point.key, point.offset);
            self.remove_text_span(point.key, point.offset, end);
            return;
        }
        let Some((parent, index)) = self.doc.sibling_index(point.key) else {
            return;
        };
        let siblings = self.doc.children(parent);
        if index + 1 < siblings.len() {
            let next = siblings[index + 1];
            match self.doc.kind(next) {
                Some(NodeKind::Math { .. }) => {
                    self.doc.remove_subtree(next);
                    self.dirty_element(parent);
                }
                Some(NodeKind::Text { .. }) => {
                    let end = self.doc.next_char_boundary(next, 0);
                    self.remove_text_span(next, 0, end);
                }
                _ => {}
            }
        }
    }

    fn delete_node_selection(&mut self, key: NodeKey) {
        let Some((parent, index)) = self.doc.sibling_index(key) else {
            return;
        };
        self.doc.remove_subtree(key);
        self.dirty_element(parent);
        // Land the caret on the nearest remaining text stop.
        let stops = self.doc.caret_stops();
        let fallback = stops
            .iter()
            .take(index.min(stops.len()))
            .rev()
            .chain(stops.iter().skip(index.min(stops.len())))
            .find_map(|&s| match s {
                CaretStop::Text(k) => Some(k),
                CaretStop::Opaque(_) => None,
            });
        if let Some(text) = fallback {
            self.doc.selection = Selection::caret(text, self.doc.text_len(text));
        } else {
            self.doc.selection = Selection::None;
        }
        self.summary.selection_changed = true;
    }

    fn remove_text_span(&mut self, key: NodeKey, start: usize, end: usize) {
        if let Some(NodeKind::Text { text, .. }) =
            self.doc.nodes.get_mut(key).map(|n| &mut n.kind)
        {
            text.replace_range(start..end, "");
            self.dirty_leaf(key);
            if let Some(parent) = self.doc.parent(key) {
                self.dirty_element(parent);
            }
        }
    }

    fn delete_selection_range(&mut self) {
        let Some((start, end)) = self.doc.selection.ordered_range() else {
            return;
        };
        if start.key == end.key && start.offset < end.offset {
            self.remove_text_span(start.key, start.offset, end.offset);
        }
        self.doc.selection = Selection::caret(start.key, start.offset);
        self.summary.selection_changed = true;
    }

    fn join_with_previous_paragraph(&mut self, paragraph: NodeKey) {
        if !matches!(self.doc.kind(paragraph), Some(NodeKind::Paragraph)) {
            return;
        }
        if self.doc.is_inside_table(paragraph) {
            return;
        }
        let Some((root, index)) = self.doc.sibling_index(paragraph) else {
            return;
        };
        if index == 0 {
            return;
        }
        let prev = self.doc.children(root)[index - 1];
        if !matches!(self.doc.kind(prev), Some(NodeKind::Paragraph)) {
            return;
        }
        let caret_key = self
            .doc
            .children(prev)
            .iter()
            .rev()
            .copied()
            .find(|&k| self.doc.kind(k).is_some_and(NodeKind::is_text));
        let moved: Vec<NodeKey> = self.doc.children(paragraph).to_vec();
        for key in &moved {
            self.doc.detach(*key);
            self.doc.nodes[*key].parent = Some(prev);
            self.doc.nodes[prev].children.push(*key);
        }
        self.doc.remove_subtree(paragraph);
        self.dirty_element(prev);
        self.dirty_element(root);
        if let Some(key) = caret_key {
            self.doc.selection = Selection::caret(key, self.doc.text_len(key));
            self.summary.selection_changed = true;
        }
    }

    /// Split the current paragraph at the caret, producing a new paragraph
    /// that takes the tail of the run and all following siblings.
    pub fn split_paragraph(&mut self) {
        if self.doc.selection.is_range() {
            self.delete_selection_range();
        }
        let Selection::Caret(point) = self.doc.selection else {
            return;
        };
        let Some(paragraph) = self.doc.parent(point.key) else {
            return;
        };
        if !matches!(self.doc.kind(paragraph), Some(NodeKind::Paragraph)) {
            return;
        }
        if self.doc.is_inside_table(paragraph) {
            return;
        }
        let Some((container, block_index)) = self.doc.sibling_index(paragraph) else {
            return;
        };
        let format = match self.doc.kind(point.key) {
            Some(NodeKind::Text { format, .. }) => *format,
            _ => TextFormat::default(),
        };
        let tail = match self.doc.nodes.get_mut(point.key).map(|n| &mut n.kind) {
            Some(NodeKind::Text { text, .. }) => text.split_off(point.offset),
            _ => return,
        };
        let new_paragraph = self
            .doc
            .insert_node(NodeKind::Paragraph, container, block_index + 1);
        let head = self.doc.insert_node(
            NodeKind::Text { text: tail, format },
            new_paragraph,
            0,
        );
        // Siblings after the split point move to the new paragraph.
        let Some((_, run_index)) = self.doc.sibling_index(point.key) else {
            return;
        };
        let trailing: Vec<NodeKey> = self.doc.children(paragraph)[run_index + 1..].to_vec();
        for key in &trailing {
            self.doc.detach(*key);
            self.doc.nodes[*key].parent = Some(new_paragraph);
            self.doc.nodes[new_paragraph].children.push(*key);
        }
        self.dirty_leaf(point.key);
        self.dirty_element(paragraph);
        self.dirty_element(new_paragraph);
        self.dirty_element(container);
        self.doc.selection = Selection::caret(head, 0);
        self.summary.selection_changed = true;
    }

    // Formatting.

    /// Toggle a format. With a caret this queues the format for the next
    /// insertion; with a range it splits the run and flips the middle.
    pub fn toggle_format(&mut self, format: Format) {
        match self.doc.selection {
            Selection::Caret(point) => {
                let current = match self.doc.kind(point.key) {
                    Some(NodeKind::Text { format, .. }) => *format,
                    _ => return,
                };
                let mut pending = self.doc.caret_format.unwrap_or(current);
                pending.toggle(format);
                self.doc.caret_format = Some(pending);
                self.summary.selection_changed = true;
            }
            Selection::Range { .. } => self.toggle_range_format(format),
            _ => {}
        }
    }

    fn toggle_range_format(&mut self, format: Format) {
        let Some((start, end)) = self.doc.selection.ordered_range() else {
            return;
        };
        if start.key != end.key || start.offset == end.offset {
            return;
        }
        let key = start.key;
        let Some((parent, index)) = self.doc.sibling_index(key) else {
            return;
        };
        let (text, mut run_format) = match self.doc.kind(key) {
            Some(NodeKind::Text { text, format }) => (text.clone(), *format),
            _ => return,
        };
        let before = text[..start.offset].to_string();
        let middle = text[start.offset..end.offset].to_string();
        let after = text[end.offset..].to_string();
        let old_format = run_format;
        run_format.toggle(format);

        // Rewrite the run in place as the middle segment and insert the
        // unchanged head and tail around it.
        if let Some(NodeKind::Text { text, format }) =
            self.doc.nodes.get_mut(key).map(|n| &mut n.kind)
        {
            *text = middle.clone();
            *format = run_format;
        }
        let mut insert_at = index;
        if !before.is_empty() {
            self.doc.insert_node(
                NodeKind::Text {
                    text: before,
                    format: old_format,
                },
                parent,
                insert_at,
            );
            insert_at += 1;
        }
        if !after.is_empty() {
            self.doc.insert_node(
                NodeKind::Text {
                    text: after,
                    format: old_format,
                },
                parent,
                insert_at + 1,
            );
        }
        self.dirty_leaf(key);
        self.dirty_element(parent);
        self.doc.selection = Selection::Range {
            anchor: Point::new(key, 0),
            focus: Point::new(key, middle.len()),
        };
        self.summary.selection_changed = true;
    }

    // Math.

    /// Insert an inline math leaf at the caret, splitting the run.
    pub fn insert_inline_math(&mut self, latex: &str) -> Option<NodeKey> {
        if self.doc.selection.is_range() {
            self.delete_selection_range();
        }
        let Selection::Caret(point) = self.doc.selection else {
            return None;
        };
        let (parent, index) = self.doc.sibling_index(point.key)?;
        let format = match self.doc.kind(point.key) {
            Some(NodeKind::Text { format, .. }) => *format,
            _ => return None,
        };
        let tail = match self.doc.nodes.get_mut(point.key).map(|n| &mut n.kind) {
            Some(NodeKind::Text { text, .. }) => text.split_off(point.offset),
            _ => return None,
        };
        let math = self.doc.insert_node(
            NodeKind::Math {
                latex: latex.to_string(),
                inline: true,
            },
            parent,
            index + 1,
        );
        let right = self
            .doc
            .insert_node(NodeKind::Text { text: tail, format }, parent, index + 2);
        self.dirty_leaf(point.key);
        self.dirty_leaf(math);
        self.dirty_element(parent);
        self.doc.selection = Selection::caret(right, 0);
        self.summary.selection_changed = true;
        Some(math)
    }

    /// Insert a block math node after the block containing the selection,
    /// followed by a fresh paragraph so the caret has somewhere to go.
    pub fn insert_block_math(&mut self, latex: &str) -> Option<NodeKey> {
        let block_index = self.anchor_block_index();
        let root = self.doc.root;
        let math = self.doc.insert_node(
            NodeKind::Math {
                latex: latex.to_string(),
                inline: false,
            },
            root,
            block_index + 1,
        );
        let paragraph = self
            .doc
            .insert_node(NodeKind::Paragraph, root, block_index + 2);
        let text = self.doc.insert_node(
            NodeKind::Text {
                text: String::new(),
                format: TextFormat::default(),
            },
            paragraph,
            0,
        );
        self.dirty_leaf(math);
        self.dirty_element(root);
        self.dirty_element(paragraph);
        self.doc.selection = Selection::caret(text, 0);
        self.summary.selection_changed = true;
        Some(math)
    }

    /// Rewrite an existing math node's source. A stale or non-math key is
    /// a no-op; the display flag is never touched here.
    pub fn update_math(&mut self, key: NodeKey, latex: &str) {
        if let Some(NodeKind::Math { latex: current, .. }) =
            self.doc.nodes.get_mut(key).map(|n| &mut n.kind)
        {
            if current != latex {
                *current = latex.to_string();
                self.dirty_leaf(key);
                if let Some(parent) = self.doc.parent(key) {
                    self.dirty_element(parent);
                }
            }
        }
    }

    // Tables.

    /// Insert a `rows` by `cols` table after the block containing the
    /// selection. Row zero is the header row; every cell starts with one
    /// paragraph holding one empty run.
    pub fn insert_table(&mut self, rows: usize, cols: usize) -> Option<NodeKey> {
        if rows == 0 || cols == 0 {
            return None;
        }
        let block_index = self.anchor_block_index();
        let root = self.doc.root;
        let table = self.doc.insert_node(NodeKind::Table, root, block_index + 1);
        for row in 0..rows {
            let row_key = self.doc.insert_node(NodeKind::TableRow, table, row);
            for col in 0..cols {
                let cell = self.doc.insert_node(
                    NodeKind::TableCell { header: row == 0 },
                    row_key,
                    col,
                );
                let paragraph = self.doc.insert_node(NodeKind::Paragraph, cell, 0);
                self.doc.insert_node(
                    NodeKind::Text {
                        text: String::new(),
                        format: TextFormat::default(),
                    },
                    paragraph,
                    0,
                );
                self.dirty_element(cell);
                self.dirty_element(paragraph);
            }
            self.dirty_element(row_key);
        }
        let paragraph = self
            .doc
            .insert_node(NodeKind::Paragraph, root, block_index + 2);
        let text = self.doc.insert_node(
            NodeKind::Text {
                text: String::new(),
                format: TextFormat::default(),
            },
            paragraph,
            0,
        );
        self.dirty_element(table);
        self.dirty_element(root);
        self.dirty_element(paragraph);
        self.doc.selection = Selection::caret(text, 0);
        self.summary.selection_changed = true;
        Some(table)
    }

    /// Index under root of the block holding the selection, or the last
    /// block when there is no usable selection.
    fn anchor_block_index(&self) -> usize {
        let block = match self.doc.selection {
            Selection::Caret(point) => self.doc.enclosing_block(point.key),
            Selection::Range { anchor, .. } => self.doc.enclosing_block(anchor.key),
            Selection::Node(key) => self.doc.enclosing_block(key),
            Selection::None => None,
        };
        let children = self.doc.children(self.doc.root);
        block
            .and_then(|b| children.iter().position(|&c| c == b))
            .unwrap_or(children.len().saturating_sub(1))
    }

    // Caret movement. These live on the transaction so selection changes
    // flow through the same summary as everything else.

    pub fn move_left(&mut self) {
        if let Selection::Caret(point) = self.doc.selection {
            if point.offset > 0 {
                let offset = self.doc.prev_char_boundary(point.key, point.offset);
                self.set_selection(Selection::caret(point.key, offset));
                return;
            }
        }
        self.step_stop(-1);
    }

    pub fn move_right(&mut self) {
        if let Selection::Caret(point) = self.doc.selection {
            if point.offset < self.doc.text_len(point.key) {
                let offset = self.doc.next_char_boundary(point.key, point.offset);
                self.set_selection(Selection::caret(point.key, offset));
                return;
            }
        }
        self.step_stop(1);
    }

    /// Extend or shrink a range selection by one char at the focus.
    pub fn extend_selection(&mut self, forward: bool) {
        let (anchor, focus) = match self.doc.selection {
            Selection::Caret(point) => (point, point),
            Selection::Range { anchor, focus } => (anchor, focus),
            _ => return,
        };
        let offset = if forward {
            self.doc.next_char_boundary(focus.key, focus.offset)
        } else {
            self.doc.prev_char_boundary(focus.key, focus.offset)
        };
        if offset == focus.offset {
            return;
        }
        let focus = Point::new(focus.key, offset);
        let selection = if anchor == focus {
            Selection::Caret(anchor)
        } else {
            Selection::Range { anchor, focus }
        };
        self.set_selection(selection);
    }

    fn step_stop(&mut self, direction: isize) {
        let stops = self.doc.caret_stops();
        if stops.is_empty() {
            return;
        }
        let next = match self.doc.stop_index(&stops) {
            Some(index) => {
                let target = index as isize + direction;
                if target < 0 || target as usize >= stops.len() {
                    return;
                }
                target as usize
            }
            None => {
                if direction > 0 {
                    0
                } else {
                    stops.len() - 1
                }
            }
        };
        let selection = self.doc.selection_for_stop(stops[next], direction < 0);
        self.set_selection(selection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caret_text(doc: &Document) -> NodeKey {
        match doc.selection() {
            Selection::Caret(point) => point.key,
            other => panic!("expected caret, got {other:?}"),
        }
    }

    fn run_text(doc: &Document, key: NodeKey) -> String {
        match doc.kind(key) {
            Some(NodeKind::Text { text, .. }) => text.clone(),
            other => panic!("expected text run, got {other:?}"),
        }
    }

    #[test]
    fn test_new_document_has_empty_paragraph_with_caret() {
        let doc = Document::new();
        let blocks = doc.children(doc.root());
        assert_eq!(blocks.len(), 1);
        assert!(matches!(doc.kind(blocks[0]), Some(NodeKind::Paragraph)));
        let key = caret_text(&doc);
        assert_eq!(run_text(&doc, key), "");
    }

    #[test]
    fn test_insert_text_advances_caret_and_dirties() {
        let mut doc = Document::new();
        let summary = doc.update(|tx| tx.insert_text("hi"));
        assert!(!summary.is_content_clean());
        assert_eq!(summary.dirty_leaves.len(), 1);
        let key = caret_text(&doc);
        assert_eq!(run_text(&doc, key), "hi");
        assert_eq!(doc.selection(), Selection::caret(key, 2));
    }

    #[test]
    fn test_selection_only_update_is_content_clean() {
        let mut doc = Document::new();
        doc.update(|tx| tx.insert_text("abc"));
        let summary = doc.update(|tx| tx.move_left());
        assert!(summary.is_content_clean());
        assert!(summary.selection_changed);
    }

    #[test]
    fn test_backspace_removes_multibyte_char() {
        let mut doc = Document::new();
        doc.update(|tx| tx.insert_text("héllo"));
        doc.update(|tx| tx.backspace());
        doc.update(|tx| tx.backspace());
        doc.update(|tx| tx.backspace());
        doc.update(|tx| tx.backspace());
        let key = caret_text(&doc);
        assert_eq!(run_text(&doc, key), "h");
    }

    #[test]
    fn test_backspace_at_paragraph_start_joins_previous() {
        let mut doc = Document::new();
        doc.update(|tx| {
            tx.insert_text("one");
            tx.split_paragraph();
            tx.insert_text("two");
        });
        assert_eq!(doc.children(doc.root()).len(), 2);
        doc.update(|tx| {
            let Selection::Caret(point) = tx.doc().selection() else {
                panic!("expected caret");
            };
            tx.set_selection(Selection::caret(point.key, 0));
            tx.backspace();
        });
        assert_eq!(doc.children(doc.root()).len(), 1);
        let key = caret_text(&doc);
        assert_eq!(run_text(&doc, key), "one");
    }

    #[test]
    fn test_split_paragraph_moves_tail() {
        let mut doc = Document::new();
        doc.update(|tx| tx.insert_text("hello"));
        let key = caret_text(&doc);
        doc.update(|tx| {
            tx.set_selection(Selection::caret(key, 2));
            tx.split_paragraph();
        });
        let blocks = doc.children(doc.root());
        assert_eq!(blocks.len(), 2);
        assert_eq!(run_text(&doc, doc.children(blocks[0])[0]), "he");
        assert_eq!(run_text(&doc, doc.children(blocks[1])[0]), "llo");
        assert_eq!(doc.selection(), Selection::caret(doc.children(blocks[1])[0], 0));
    }

    #[test]
    fn test_caret_toggle_formats_next_insertion_only() {
        let mut doc = Document::new();
        doc.update(|tx| tx.insert_text("ab"));
        doc.update(|tx| tx.toggle_format(Format::Bold));
        assert!(doc.selection_format().unwrap().bold);
        doc.update(|tx| tx.insert_text("c"));
        let key = caret_text(&doc);
        match doc.kind(key) {
            Some(NodeKind::Text { text, format }) => {
                assert_eq!(text, "c");
                assert!(format.bold);
            }
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_range_toggle_splits_run() {
        let mut doc = Document::new();
        doc.update(|tx| tx.insert_text("abcdef"));
        let key = caret_text(&doc);
        doc.update(|tx| {
            tx.set_selection(Selection::Range {
                anchor: Point::new(key, 2),
                focus: Point::new(key, 4),
            });
            tx.toggle_format(Format::Italic);
        });
        let paragraph = doc.children(doc.root())[0];
        let runs = doc.children(paragraph).to_vec();
        assert_eq!(runs.len(), 3);
        assert_eq!(run_text(&doc, runs[0]), "ab");
        assert_eq!(run_text(&doc, runs[1]), "cd");
        assert_eq!(run_text(&doc, runs[2]), "ef");
        match doc.kind(runs[1]) {
            Some(NodeKind::Text { format, .. }) => assert!(format.italic),
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_inline_math_splices_the_run() {
        let mut doc = Document::new();
        doc.update(|tx| tx.insert_text("sum"));
        let key = caret_text(&doc);
        let mut math = None;
        doc.update(|tx| {
            tx.set_selection(Selection::caret(key, 1));
            math = tx.insert_inline_math("x^2");
        });
        let math = math.unwrap();
        let paragraph = doc.children(doc.root())[0];
        let leaves = doc.children(paragraph).to_vec();
        assert_eq!(leaves.len(), 3);
        assert_eq!(leaves[1], math);
        assert_eq!(run_text(&doc, leaves[0]), "s");
        assert_eq!(run_text(&doc, leaves[2]), "um");
        assert!(matches!(
            doc.kind(math),
            Some(NodeKind::Math { inline: true, .. })
        ));
    }

    #[test]
    fn test_block_math_followed_by_fresh_paragraph() {
        let mut doc = Document::new();
        doc.update(|tx| tx.insert_text("before"));
        doc.update(|tx| {
            tx.insert_block_math("\\int_0^1 f");
        });
        let blocks = doc.children(doc.root()).to_vec();
        assert_eq!(blocks.len(), 3);
        assert!(matches!(
            doc.kind(blocks[1]),
            Some(NodeKind::Math { inline: false, .. })
        ));
        assert!(matches!(doc.kind(blocks[2]), Some(NodeKind::Paragraph)));
        let key = caret_text(&doc);
        assert_eq!(doc.parent(key), Some(blocks[2]));
    }

    #[test]
    fn test_update_math_preserves_display_flag() {
        let mut doc = Document::new();
        let mut math = None;
        doc.update(|tx| math = tx.insert_inline_math("a"));
        let math = math.unwrap();
        let summary = doc.update(|tx| tx.update_math(math, "a + b"));
        assert!(summary.dirty_leaves.contains(&math));
        assert!(matches!(
            doc.kind(math),
            Some(NodeKind::Math { latex, inline: true }) if latex == "a + b"
        ));
    }

    #[test]
    fn test_update_math_same_source_is_clean() {
        let mut doc = Document::new();
        let mut math = None;
        doc.update(|tx| math = tx.insert_inline_math("a"));
        let summary = doc.update(|tx| tx.update_math(math.unwrap(), "a"));
        assert!(summary.is_content_clean());
    }

    #[test]
    fn test_update_math_stale_key_is_noop() {
        let mut doc = Document::new();
        let mut math = None;
        doc.update(|tx| math = tx.insert_inline_math("a"));
        let math = math.unwrap();
        doc.update(|tx| {
            tx.set_selection(Selection::Node(math));
            tx.backspace();
        });
        assert!(!doc.contains(math));
        let summary = doc.update(|tx| tx.update_math(math, "b"));
        assert!(summary.is_content_clean());
    }

    #[test]
    fn test_insert_table_shape_and_headers() {
        let mut doc = Document::new();
        let mut table = None;
        doc.update(|tx| table = tx.insert_table(3, 4));
        let table = table.unwrap();
        let rows = doc.children(table).to_vec();
        assert_eq!(rows.len(), 3);
        for (row_index, &row) in rows.iter().enumerate() {
            let cells = doc.children(row).to_vec();
            assert_eq!(cells.len(), 4);
            for &cell in &cells {
                assert!(matches!(
                    doc.kind(cell),
                    Some(NodeKind::TableCell { header }) if *header == (row_index == 0)
                ));
                let paragraphs = doc.children(cell);
                assert_eq!(paragraphs.len(), 1);
                let leaves = doc.children(paragraphs[0]);
                assert_eq!(leaves.len(), 1);
                assert_eq!(run_text(&doc, leaves[0]), "");
            }
        }
    }

    #[test]
    fn test_insert_zero_sized_table_rejected() {
        let mut doc = Document::new();
        let mut table = Some(doc.root());
        let summary = doc.update(|tx| table = tx.insert_table(0, 3));
        assert!(table.is_none());
        assert!(summary.is_content_clean());
    }

    #[test]
    fn test_caret_skips_table_interior() {
        let mut doc = Document::new();
        doc.update(|tx| {
            tx.insert_text("a");
            tx.insert_table(2, 2);
        });
        // Caret sits in the paragraph after the table. Moving left selects
        // the table as a whole instead of entering a cell.
        doc.update(|tx| tx.move_left());
        let Selection::Node(key) = doc.selection() else {
            panic!("expected node selection, got {:?}", doc.selection());
        };
        assert!(matches!(doc.kind(key), Some(NodeKind::Table)));
        doc.update(|tx| tx.move_left());
        let Selection::Caret(point) = doc.selection() else {
            panic!("expected caret");
        };
        assert_eq!(run_text(&doc, point.key), "a");
        assert_eq!(point.offset, 1);
    }

    #[test]
    fn test_backspace_deletes_adjacent_inline_math() {
        let mut doc = Document::new();
        doc.update(|tx| {
            tx.insert_text("x");
            tx.insert_inline_math("y");
        });
        let paragraph = doc.children(doc.root())[0];
        assert_eq!(doc.children(paragraph).len(), 3);
        doc.update(|tx| tx.backspace());
        let leaves = doc.children(paragraph).to_vec();
        assert!(leaves
            .iter()
            .all(|&k| doc.kind(k).is_some_and(NodeKind::is_text)));
    }

    #[test]
    fn test_paragraph_never_left_without_text() {
        let mut doc = Document::new();
        let mut math = None;
        doc.update(|tx| math = tx.insert_block_math("z"));
        let math = math.unwrap();
        doc.update(|tx| {
            tx.set_selection(Selection::Node(math));
            tx.delete_forward();
        });
        for &block in doc.children(doc.root()) {
            if matches!(doc.kind(block), Some(NodeKind::Paragraph)) {
                assert!(doc
                    .children(block)
                    .iter()
                    .any(|&k| doc.kind(k).is_some_and(NodeKind::is_text)));
            }
        }
    }

    #[test]
    fn test_path_round_trip() {
        let mut doc = Document::new();
        doc.update(|tx| {
            tx.insert_text("one");
            tx.split_paragraph();
            tx.insert_text("two");
        });
        let key = caret_text(&doc);
        let path = doc.path_to(key).unwrap();
        assert_eq!(doc.node_at_path(&path), Some(key));
    }

    #[test]
    fn test_extend_selection_builds_range() {
        let mut doc = Document::new();
        doc.update(|tx| tx.insert_text("abc"));
        doc.update(|tx| {
            tx.extend_selection(false);
            tx.extend_selection(false);
        });
        let (start, end) = doc.selection().ordered_range().unwrap();
        assert_eq!(start.offset, 1);
        assert_eq!(end.offset, 3);
        doc.update(|tx| tx.extend_selection(true));
        let (start, end) = doc.selection().ordered_range().unwrap();
        assert_eq!(start.offset, 2);
        assert_eq!(end.offset, 3);
    }
}
