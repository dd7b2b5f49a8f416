use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::app::Model;
use crate::store::MathEdit;

pub fn render_help_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let popup_width = area.width.saturating_sub(12).clamp(48, 64);
    let popup_height = area.height.saturating_sub(4).min(34);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let global_cfg = model
        .config_global_path
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string());
    let local_cfg = model
        .config_local_path
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());

    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let mut all_lines: Vec<Line> = Vec::new();

    all_lines.push(Line::styled("Editing", section_style));
    all_lines.push(Line::raw("  Type to insert text at the caret"));
    all_lines.push(Line::raw("  Enter               Split paragraph"));
    all_lines.push(Line::raw("  Backspace/Delete    Delete backward / forward"));
    all_lines.push(Line::raw("  Ctrl-b/e/u/r        Bold / italic / underline / strike"));
    all_lines.push(Line::raw(""));

    all_lines.push(Line::styled("Navigation", section_style));
    all_lines.push(Line::raw("  Left/Right          Move caret"));
    all_lines.push(Line::raw("  Shift+Left/Right    Extend selection"));
    all_lines.push(Line::raw("  Home/End            Start / end of paragraph"));
    all_lines.push(Line::raw("  Up/Down, PageUp/Dn  Scroll"));
    all_lines.push(Line::raw("  Ctrl+Home/End       Top / bottom of document"));
    all_lines.push(Line::raw(""));

    all_lines.push(Line::styled("Insert", section_style));
    all_lines.push(Line::raw("  Alt-m               Inline math"));
    all_lines.push(Line::raw("  Alt-M               Display math"));
    all_lines.push(Line::raw("  Enter on math       Edit selected math"));
    all_lines.push(Line::raw("  Ctrl-t              Table picker"));
    all_lines.push(Line::raw(""));

    all_lines.push(Line::styled("Page", section_style));
    all_lines.push(Line::raw("  Alt-o               Toggle orientation"));
    all_lines.push(Line::raw("  Alt-g               Cycle margin"));
    all_lines.push(Line::raw(""));

    all_lines.push(Line::styled("Document", section_style));
    all_lines.push(Line::raw("  Ctrl-s              Save now"));
    all_lines.push(Line::raw("  Ctrl-n              New document"));
    all_lines.push(Line::raw("  Ctrl-q / Ctrl-c     Quit"));
    all_lines.push(Line::raw("  F1                  Toggle help"));
    all_lines.push(Line::raw(""));

    all_lines.push(Line::styled("Config", section_style));
    all_lines.push(Line::raw(format!("  Global: {global_cfg}")));
    all_lines.push(Line::raw(format!("  Local override: {local_cfg}")));

    let block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(all_lines).block(block), popup);
}

pub fn render_math_overlay(edit: &MathEdit, frame: &mut Frame, area: Rect) {
    let popup_width = area.width.saturating_sub(16).clamp(40, 72);
    let popup = centered_popup_rect(popup_width, 9, area);

    let title = if edit.node.is_some() {
        "Edit Math"
    } else if edit.inline {
        "Insert Inline Math"
    } else {
        "Insert Display Math"
    };

    let dim = Style::default().fg(Color::Indexed(245));
    let preview = crate::math::render(&edit.latex);

    let lines = vec![
        Line::from(vec![
            Span::styled("Source: ", dim),
            Span::raw(edit.latex.clone()),
            Span::styled("\u{2588}", Style::default().fg(Color::White)),
        ]),
        Line::raw(""),
        Line::from(vec![
            Span::styled("Preview: ", dim),
            Span::styled(preview, Style::default().fg(Color::Cyan)),
        ]),
        Line::raw(""),
        Line::styled(
            if edit.node.is_some() {
                "Enter saves \u{2502} Esc cancels"
            } else {
                "Enter inserts \u{2502} Tab switches inline/display \u{2502} Esc cancels"
            },
            dim,
        ),
    ];

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

pub fn render_table_picker_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let Some(picker) = &model.table_picker else {
        return;
    };
    let popup = centered_popup_rect(36, 8, area);

    let dim = Style::default().fg(Color::Indexed(245));
    let value_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);

    let lines = vec![
        Line::from(vec![
            Span::raw("Rows: "),
            Span::styled(picker.rows.to_string(), value_style),
            Span::raw("   Cols: "),
            Span::styled(picker.cols.to_string(), value_style),
        ]),
        Line::raw(""),
        Line::styled("\u{2191}\u{2193} rows \u{2502} \u{2190}\u{2192} cols", dim),
        Line::styled("Enter inserts \u{2502} Esc cancels", dim),
    ];

    let block = Block::default()
        .title("Insert Table")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
