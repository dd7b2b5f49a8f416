use ratatui::prelude::*;
use ratatui::widgets::{Clear, Paragraph};

use crate::app::Model;
use crate::engine::Selection;

use super::{CHROME_ROWS, layout::DocLayout, overlays, status};

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let area = frame.area();

    let toast_active = model.active_toast().is_some();
    let toolbar_area = Rect { height: 1, ..area };
    let doc_area = Rect {
        y: area.y + 1,
        height: area
            .height
            .saturating_sub(CHROME_ROWS + u16::from(toast_active)),
        ..area
    };
    let toast_area = Rect {
        y: area.y + area.height.saturating_sub(2),
        height: 1,
        ..area
    };
    let status_area = Rect {
        y: area.y + area.height.saturating_sub(1),
        height: 1,
        ..area
    };

    render_document(model, frame, doc_area);
    status::render_toolbar_bar(model, frame, toolbar_area);
    if toast_active {
        status::render_toast_bar(model, frame, toast_area);
    }
    status::render_status_bar(model, frame, status_area);

    if model.help_visible {
        overlays::render_help_overlay(model, frame, area);
    } else if let Some(edit) = &model.ui.math_edit {
        overlays::render_math_overlay(edit, frame, area);
    } else if model.table_picker.is_some() {
        overlays::render_table_picker_overlay(model, frame, area);
    }
}

fn render_document(model: &mut Model, frame: &mut Frame, area: Rect) {
    model.viewport.resize(area.width, area.height);

    let content_width = model.content_width();
    let layout = DocLayout::build(&model.document, content_width);
    model.viewport.set_total_lines(layout.line_count());

    // After an edit the caret must stay on screen; manual scrolling wins
    // otherwise.
    if model.caret_follow {
        if let Some(line) = layout.selection_line(&model.document) {
            model.viewport.ensure_visible(line);
        }
        model.caret_follow = false;
    }

    let page_x = area.x + area.width.saturating_sub(content_width) / 2;
    let range = model.viewport.visible_range();
    let visible: Vec<Line> = layout.lines[range.clone()].to_vec();
    let content_area = Rect::new(
        page_x,
        area.y,
        content_width.min(area.width),
        area.height,
    );

    // Clear the full document area so shorter frames do not leave stale cells.
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(visible), content_area);

    if !model.overlay_active()
        && let Selection::Caret(point) = model.document.selection()
        && let Some((line, col)) =
            layout.caret_line_col(&model.document, point.key, point.offset)
        && range.contains(&line)
    {
        let y = area.y + u16::try_from(line - range.start).unwrap_or(u16::MAX);
        frame.set_cursor_position((page_x + col, y));
    }
}
