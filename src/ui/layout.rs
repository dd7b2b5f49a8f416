//! Document layout.
//!
//! Turns the node tree into styled terminal lines at a given content
//! width, keeping enough origin information to map the caret back to a
//! screen position. Paragraphs wrap at the content width; tables render
//! with box-drawing borders; math nodes render through [`crate::math`].

use ratatui::prelude::*;
use unicode_width::UnicodeWidthChar;
use unicode_width::UnicodeWidthStr;

use crate::engine::{Document, NodeKey, NodeKind, Selection, TextFormat};

/// Where a slice of a text run landed on screen.
#[derive(Debug, Clone)]
struct Segment {
    line: usize,
    col: u16,
    key: NodeKey,
    /// Byte range of the run shown in this segment.
    start: usize,
    end: usize,
}

/// One wrappable unit: a single char of a text run, or an unbreakable
/// rendered chunk (inline math).
struct Cell {
    text: String,
    width: u16,
    style: Style,
    /// Run key and byte offset for caret mapping; `None` for chunks.
    origin: Option<(NodeKey, usize)>,
    /// Key recorded for node-line lookup (inline math).
    node: Option<NodeKey>,
}

pub struct DocLayout {
    pub lines: Vec<Line<'static>>,
    segments: Vec<Segment>,
    node_lines: Vec<(NodeKey, usize)>,
}

impl DocLayout {
    /// Lay out the whole document at `width` columns.
    pub fn build(doc: &Document, width: u16) -> Self {
        let width = width.max(4);
        let mut layout = Self {
            lines: Vec::new(),
            segments: Vec::new(),
            node_lines: Vec::new(),
        };
        let blocks = doc.children(doc.root());
        for (index, &block) in blocks.iter().enumerate() {
            match doc.kind(block) {
                Some(NodeKind::Paragraph) => layout.push_paragraph(doc, block, width),
                Some(NodeKind::Math { latex, .. }) => {
                    layout.push_block_math(doc, block, latex, width);
                }
                Some(NodeKind::Table) => layout.push_table(doc, block, width),
                _ => {}
            }
            if index + 1 < blocks.len() {
                layout.lines.push(Line::raw(""));
            }
        }
        if layout.lines.is_empty() {
            layout.lines.push(Line::raw(""));
        }
        layout
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Screen position of a caret inside a text run.
    pub fn caret_line_col(&self, doc: &Document, key: NodeKey, offset: usize) -> Option<(usize, u16)> {
        let Some(NodeKind::Text { text, .. }) = doc.kind(key) else {
            return None;
        };
        // Prefer the latest segment covering the offset so a caret at a
        // wrap boundary lands on the new line.
        let segment = self
            .segments
            .iter()
            .filter(|s| s.key == key && s.start <= offset && offset <= s.end)
            .next_back()?;
        let prefix_width = text
            .get(segment.start..offset)
            .map_or(0, UnicodeWidthStr::width);
        Some((
            segment.line,
            segment.col + u16::try_from(prefix_width).unwrap_or(u16::MAX),
        ))
    }

    /// First line occupied by an opaque node (math or table).
    pub fn node_line(&self, key: NodeKey) -> Option<usize> {
        self.node_lines
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, line)| *line)
    }

    /// The line the current selection sits on, for scroll-into-view.
    pub fn selection_line(&self, doc: &Document) -> Option<usize> {
        match doc.selection() {
            Selection::Caret(point) => self
                .caret_line_col(doc, point.key, point.offset)
                .map(|(line, _)| line),
            Selection::Range { focus, .. } => self
                .caret_line_col(doc, focus.key, focus.offset)
                .map(|(line, _)| line),
            Selection::Node(key) => self.node_line(key),
            Selection::None => None,
        }
    }

    fn push_paragraph(&mut self, doc: &Document, paragraph: NodeKey, width: u16) {
        let selection = doc.selection();
        let selected_range = selection.ordered_range();
        let mut cells: Vec<Cell> = Vec::new();
        for &leaf in doc.children(paragraph) {
            match doc.kind(leaf) {
                Some(NodeKind::Text { text, format }) => {
                    let base = text_style(*format);
                    for (byte, ch) in text.char_indices() {
                        let mut style = base;
                        if let Some((start, end)) = selected_range {
                            if start.key == leaf && byte >= start.offset && byte < end.offset {
                                style = style.add_modifier(Modifier::REVERSED);
                            }
                        }
                        cells.push(Cell {
                            text: ch.to_string(),
                            width: u16::try_from(ch.width().unwrap_or(0)).unwrap_or(0),
                            style,
                            origin: Some((leaf, byte)),
                            node: None,
                        });
                    }
                    if text.is_empty() {
                        // Zero-width anchor so the caret can land in an
                        // empty run.
                        cells.push(Cell {
                            text: String::new(),
                            width: 0,
                            style: base,
                            origin: Some((leaf, 0)),
                            node: None,
                        });
                    }
                }
                Some(NodeKind::Math { latex, .. }) => {
                    let mut style = Style::default().fg(Color::Cyan).italic();
                    if selection == Selection::Node(leaf) {
                        style = style.add_modifier(Modifier::REVERSED);
                    }
                    let rendered = crate::math::render(latex);
                    let chunk_width = u16::try_from(rendered.width()).unwrap_or(u16::MAX);
                    cells.push(Cell {
                        text: rendered,
                        width: chunk_width,
                        style,
                        origin: None,
                        node: Some(leaf),
                    });
                }
                _ => {}
            }
        }
        self.wrap_cells(cells, width);
    }

    /// Greedy wrap of a paragraph's cells, emitting spans and segments.
    fn wrap_cells(&mut self, cells: Vec<Cell>, width: u16) {
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut col: u16 = 0;
        let mut current: Option<(NodeKey, usize, usize, u16, Style, String)> = None;

        macro_rules! flush_run {
            () => {
                if let Some((key, start, end, run_col, style, text)) = current.take() {
                    self.segments.push(Segment {
                        line: self.lines.len(),
                        col: run_col,
                        key,
                        start,
                        end,
                    });
                    spans.push(Span::styled(text, style));
                }
            };
        }

        for cell in cells {
            if col + cell.width > width && col > 0 {
                flush_run!();
                let line_spans = std::mem::take(&mut spans);
                self.lines.push(Line::from(line_spans));
                col = 0;
            }
            if let Some((key, byte)) = cell.origin {
                let end = byte + cell.text.len();
                match &mut current {
                    Some((run_key, _, run_end, _, style, text))
                        if *run_key == key && *style == cell.style =>
                    {
                        *run_end = end;
                        text.push_str(&cell.text);
                    }
                    _ => {
                        flush_run!();
                        current = Some((key, byte, end, col, cell.style, cell.text.clone()));
                    }
                }
            } else {
                flush_run!();
                if let Some(node) = cell.node {
                    self.node_lines.push((node, self.lines.len()));
                }
                spans.push(Span::styled(cell.text, cell.style));
            }
            col += cell.width;
        }
        flush_run!();
        self.lines.push(Line::from(spans));
    }

    fn push_block_math(&mut self, doc: &Document, key: NodeKey, latex: &str, width: u16) {
        let rendered = crate::math::render(latex);
        let mut style = Style::default().fg(Color::Cyan);
        if doc.selection() == Selection::Node(key) {
            style = style.add_modifier(Modifier::REVERSED);
        }
        self.node_lines.push((key, self.lines.len()));
        // Center display math on its line.
        let pad = (width as usize).saturating_sub(rendered.width()) / 2;
        self.lines.push(Line::from(vec![
            Span::raw(" ".repeat(pad)),
            Span::styled(rendered, style),
        ]));
    }

    fn push_table(&mut self, doc: &Document, table: NodeKey, width: u16) {
        let selected = doc.selection() == Selection::Node(table);
        let border_style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(Color::Indexed(245))
        };
        self.node_lines.push((table, self.lines.len()));

        let rows: Vec<Vec<(String, bool)>> = doc
            .children(table)
            .iter()
            .map(|&row| {
                doc.children(row)
                    .iter()
                    .map(|&cell| {
                        let header = matches!(
                            doc.kind(cell),
                            Some(NodeKind::TableCell { header: true })
                        );
                        (cell_text(doc, cell), header)
                    })
                    .collect()
            })
            .collect();
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        if cols == 0 {
            return;
        }
        // Column width fits the widest cell, bounded so wide tables still
        // render inside the page.
        let max_col_width = ((width as usize).saturating_sub(cols + 1) / cols).max(3);
        let mut widths = vec![3usize; cols];
        for row in &rows {
            for (i, (text, _)) in row.iter().enumerate() {
                widths[i] = widths[i].max(text.width() + 2).min(max_col_width);
            }
        }

        self.lines.push(border_line('┌', '┬', '┐', &widths, border_style));
        for (row_index, row) in rows.iter().enumerate() {
            let mut spans = vec![Span::styled("│", border_style)];
            for (i, width) in widths.iter().enumerate() {
                let (text, header) = row.get(i).cloned().unwrap_or_default();
                let truncated = truncate_to_width(&text, width.saturating_sub(2));
                let padding = width.saturating_sub(truncated.width() + 2);
                let style = if header {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                spans.push(Span::styled(format!(" {truncated}{} ", " ".repeat(padding)), style));
                spans.push(Span::styled("│", border_style));
            }
            self.lines.push(Line::from(spans));
            if row_index == 0 && rows.len() > 1 {
                self.lines.push(border_line('├', '┼', '┤', &widths, border_style));
            }
        }
        self.lines.push(border_line('└', '┴', '┘', &widths, border_style));
    }
}

fn cell_text(doc: &Document, cell: NodeKey) -> String {
    let mut out = String::new();
    for &paragraph in doc.children(cell) {
        for &leaf in doc.children(paragraph) {
            if let Some(kind) = doc.kind(leaf) {
                match kind {
                    NodeKind::Math { latex, .. } => out.push_str(&crate::math::render(latex)),
                    _ => out.push_str(kind.text_content()),
                }
            }
        }
    }
    out
}

fn truncate_to_width(text: &str, max: usize) -> String {
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max {
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

fn border_line(
    left: char,
    mid: char,
    right: char,
    widths: &[usize],
    style: Style,
) -> Line<'static> {
    let mut text = String::new();
    text.push(left);
    for (i, width) in widths.iter().enumerate() {
        text.push_str(&"─".repeat(*width));
        text.push(if i + 1 == widths.len() { right } else { mid });
    }
    Line::styled(text, style)
}

fn text_style(format: TextFormat) -> Style {
    let mut style = Style::default();
    if format.bold {
        style = style.add_modifier(Modifier::BOLD);
    }
    if format.italic {
        style = style.add_modifier(Modifier::ITALIC);
    }
    if format.underline {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if format.strikethrough {
        style = style.add_modifier(Modifier::CROSSED_OUT);
    }
    style
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Tx;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_empty_document_has_one_line() {
        let doc = Document::new();
        let layout = DocLayout::build(&doc, 80);
        assert_eq!(layout.line_count(), 1);
    }

    #[test]
    fn test_caret_maps_to_column() {
        let mut doc = Document::new();
        doc.update(|tx| tx.insert_text("hello"));
        let layout = DocLayout::build(&doc, 80);
        let Selection::Caret(point) = doc.selection() else {
            panic!("expected caret");
        };
        assert_eq!(layout.caret_line_col(&doc, point.key, 0), Some((0, 0)));
        assert_eq!(layout.caret_line_col(&doc, point.key, 5), Some((0, 5)));
    }

    #[test]
    fn test_long_paragraph_wraps() {
        let mut doc = Document::new();
        doc.update(|tx| tx.insert_text(&"a".repeat(25)));
        let layout = DocLayout::build(&doc, 10);
        assert_eq!(layout.line_count(), 3);
        let Selection::Caret(point) = doc.selection() else {
            panic!("expected caret");
        };
        let (line, col) = layout.caret_line_col(&doc, point.key, 25).unwrap();
        assert_eq!(line, 2);
        assert_eq!(col, 5);
    }

    #[test]
    fn test_inline_math_renders_in_paragraph_line() {
        let mut doc = Document::new();
        doc.update(|tx| {
            tx.insert_text("sum ");
            tx.insert_inline_math("\\alpha^2");
        });
        let layout = DocLayout::build(&doc, 80);
        assert!(line_text(&layout.lines[0]).contains("α²"));
    }

    #[test]
    fn test_invalid_math_shows_marker() {
        let mut doc = Document::new();
        doc.update(|tx| {
            tx.insert_block_math("{unclosed");
        });
        let layout = DocLayout::build(&doc, 80);
        let all: String = layout.lines.iter().map(line_text).collect();
        assert!(all.contains(crate::math::INVALID_MARKER));
    }

    #[test]
    fn test_table_renders_borders_and_content() {
        let mut doc = Document::new();
        let mut table = None;
        doc.update(|tx| table = tx.insert_table(2, 2));
        let table = table.unwrap();
        // Put text in the first header cell.
        let cell = doc.children(doc.children(table)[0])[0];
        let text_key = doc.children(doc.children(cell)[0])[0];
        doc.update(|tx| {
            tx.set_selection(Selection::caret(text_key, 0));
            tx.insert_text("Name");
        });
        let layout = DocLayout::build(&doc, 80);
        let all: Vec<String> = layout.lines.iter().map(line_text).collect();
        assert!(all.iter().any(|l| l.starts_with('┌')));
        assert!(all.iter().any(|l| l.contains("Name")));
        assert!(all.iter().any(|l| l.starts_with('└')));
        assert!(layout.node_line(table).is_some());
    }

    #[test]
    fn test_selection_line_for_node_selection() {
        let mut doc = Document::new();
        doc.update(|tx| {
            tx.insert_text("x");
            tx.insert_block_math("y");
        });
        let math = doc
            .children(doc.root())
            .iter()
            .copied()
            .find(|&k| doc.kind(k).is_some_and(NodeKind::is_math))
            .unwrap();
        doc.update(|tx| tx.set_selection(Selection::Node(math)));
        let layout = DocLayout::build(&doc, 80);
        assert_eq!(layout.selection_line(&doc), layout.node_line(math));
    }

    #[test]
    fn test_caret_in_empty_paragraph_maps_to_line() {
        let mut doc = Document::new();
        doc.update(|tx| {
            tx.insert_text("a");
            tx.split_paragraph();
        });
        let Selection::Caret(point) = doc.selection() else {
            panic!("expected caret");
        };
        let layout = DocLayout::build(&doc, 80);
        assert_eq!(layout.caret_line_col(&doc, point.key, 0), Some((2, 0)));
    }
}
