use crossterm::event::{
    self, Event, KeyCode, KeyModifiers, MouseEvent, MouseEventKind,
};

use crate::app::{App, Message, Model};
use crate::engine::{Format, NodeKind, Selection};

use super::event_loop::ResizeDebouncer;

impl App {
    pub(super) fn handle_event(
        event: &Event,
        model: &Model,
        now_ms: u64,
        resize_debouncer: &mut ResizeDebouncer,
    ) -> Option<Message> {
        match event {
            Event::Key(key) => Self::handle_key(*key, model),
            Event::Mouse(mouse) => Self::handle_mouse(*mouse),
            Event::Resize(w, h) => {
                resize_debouncer.queue(*w, *h, now_ms);
                None
            }
            _ => None,
        }
    }

    fn handle_mouse(mouse: MouseEvent) -> Option<Message> {
        match mouse.kind {
            MouseEventKind::ScrollUp => Some(Message::ScrollUp(3)),
            MouseEventKind::ScrollDown => Some(Message::ScrollDown(3)),
            _ => None,
        }
    }

    pub(super) fn handle_key(key: event::KeyEvent, model: &Model) -> Option<Message> {
        // Any key dismisses help.
        if model.help_visible {
            return Some(Message::HideHelp);
        }

        // The math editor owns the keyboard while open.
        if model.ui.math_edit.is_some() {
            return match key.code {
                KeyCode::Esc => Some(Message::MathCancel),
                KeyCode::Enter => Some(Message::MathConfirm),
                KeyCode::Backspace => Some(Message::MathBackspace),
                KeyCode::Tab => Some(Message::MathToggleInline),
                KeyCode::Char(c)
                    if !key.modifiers.contains(KeyModifiers::CONTROL)
                        && !key.modifiers.contains(KeyModifiers::ALT) =>
                {
                    Some(Message::MathInput(c))
                }
                _ => None,
            };
        }

        if model.table_picker.is_some() {
            return match key.code {
                KeyCode::Esc => Some(Message::TablePickerCancel),
                KeyCode::Enter => Some(Message::TablePickerConfirm),
                KeyCode::Up => Some(Message::TablePickerAdjust(-1, 0)),
                KeyCode::Down => Some(Message::TablePickerAdjust(1, 0)),
                KeyCode::Left => Some(Message::TablePickerAdjust(0, -1)),
                KeyCode::Right => Some(Message::TablePickerAdjust(0, 1)),
                _ => None,
            };
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);

        match key.code {
            // Application
            KeyCode::Char('q' | 'c') if ctrl => Some(Message::Quit),
            KeyCode::Char('s') if ctrl => Some(Message::SaveNow),
            KeyCode::Char('n') if ctrl => Some(Message::NewDocument),
            KeyCode::F(1) => Some(Message::ToggleHelp),

            // Formatting
            KeyCode::Char('b') if ctrl => Some(Message::ToggleFormat(Format::Bold)),
            KeyCode::Char('e') if ctrl => Some(Message::ToggleFormat(Format::Italic)),
            KeyCode::Char('u') if ctrl => Some(Message::ToggleFormat(Format::Underline)),
            KeyCode::Char('r') if ctrl => Some(Message::ToggleFormat(Format::Strikethrough)),

            // Insertions
            KeyCode::Char('t') if ctrl => Some(Message::OpenTablePicker),
            KeyCode::Char('m' | 'M') if alt && shift => {
                Some(Message::OpenMathEditor { inline: false })
            }
            KeyCode::Char('m') if alt => Some(Message::OpenMathEditor { inline: true }),

            // Page presentation
            KeyCode::Char('o') if alt => Some(Message::ToggleOrientation),
            KeyCode::Char('g') if alt => Some(Message::CycleMargin),

            // Caret
            KeyCode::Left if shift => Some(Message::ExtendLeft),
            KeyCode::Right if shift => Some(Message::ExtendRight),
            KeyCode::Left => Some(Message::MoveLeft),
            KeyCode::Right => Some(Message::MoveRight),
            KeyCode::Home if ctrl => Some(Message::GoToTop),
            KeyCode::End if ctrl => Some(Message::GoToBottom),
            KeyCode::Home => Some(Message::CaretHome),
            KeyCode::End => Some(Message::CaretEnd),

            // Scrolling
            KeyCode::Up => Some(Message::ScrollUp(1)),
            KeyCode::Down => Some(Message::ScrollDown(1)),
            KeyCode::PageUp => Some(Message::PageUp),
            KeyCode::PageDown => Some(Message::PageDown),

            // Editing
            KeyCode::Enter => {
                // Enter on a selected math node opens it for editing.
                if let Selection::Node(node) = model.document.selection() {
                    if model.document.kind(node).is_some_and(NodeKind::is_math) {
                        return Some(Message::EditSelectedMath);
                    }
                }
                Some(Message::SplitParagraph)
            }
            KeyCode::Backspace => Some(Message::Backspace),
            KeyCode::Delete => Some(Message::DeleteForward),
            KeyCode::Tab => None,
            KeyCode::Char(c) if !ctrl && !alt => Some(Message::InsertChar(c)),
            _ => None,
        }
    }
}
