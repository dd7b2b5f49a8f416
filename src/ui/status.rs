use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::Model;

/// Format toggle buttons and page settings, rendered as the top bar.
pub fn render_toolbar_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let base = Style::default().bg(Color::DarkGray).fg(Color::White);
    let active = Style::default()
        .bg(Color::White)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD);

    let flag = |on: bool| if on { active } else { base };
    let format = model.ui.format;

    let mut spans = vec![
        Span::styled(" ", base),
        Span::styled(" B ", flag(format.bold)),
        Span::styled(" ", base),
        Span::styled(" I ", flag(format.italic)),
        Span::styled(" ", base),
        Span::styled(" U ", flag(format.underline)),
        Span::styled(" ", base),
        Span::styled(" S ", flag(format.strikethrough)),
    ];
    spans.push(Span::styled(
        format!(
            "  {} \u{00b7} {} margin",
            model.ui.orientation.label(),
            model.ui.margin.label()
        ),
        base,
    ));
    spans.push(Span::styled(
        "  Ctrl+B/E/U/R format  Alt+M math  Ctrl+T table",
        base.fg(Color::Indexed(250)),
    ));

    let bar = Paragraph::new(Line::from(spans)).style(base);
    frame.render_widget(bar, area);
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let filename = model
        .store_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "untitled".to_string());

    let save_indicator = if model.editor.is_dirty {
        " [modified]"
    } else if model.editor.last_saved.is_some() {
        " [saved]"
    } else {
        ""
    };

    let percent = model.viewport.scroll_percent();

    let status = format!(" {filename}{save_indicator}  [{percent}%]  F1:help  Ctrl+Q:quit");

    let status_bar =
        Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(status_bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        crate::app::ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        crate::app::ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        crate::app::ToastLevel::Error => {
            ("[error]", Style::default().bg(Color::Red).fg(Color::White))
        }
    };
    let toast = Paragraph::new(format!("{} {}", prefix, message)).style(style);
    frame.render_widget(toast, area);
}
