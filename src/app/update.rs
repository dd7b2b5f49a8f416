use crate::app::Model;
use crate::app::model::{TablePicker, ToastLevel};
use crate::engine::{Command, Format, NodeKind, Selection};
use crate::store::MathEdit;

/// All possible events and actions in the application.
///
/// These represent user input, system events, and internal actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Editing
    /// Insert a character at the caret
    InsertChar(char),
    /// Delete backwards (Backspace)
    Backspace,
    /// Delete forwards (Delete)
    DeleteForward,
    /// Split the paragraph at the caret (Enter)
    SplitParagraph,
    /// Toggle a text format on the selection
    ToggleFormat(Format),

    // Caret
    /// Move caret one position left
    MoveLeft,
    /// Move caret one position right
    MoveRight,
    /// Extend the selection one char left (Shift+Left)
    ExtendLeft,
    /// Extend the selection one char right (Shift+Right)
    ExtendRight,
    /// Move caret to the start of its run (Home)
    CaretHome,
    /// Move caret to the end of its run (End)
    CaretEnd,

    // Scrolling
    ScrollUp(usize),
    ScrollDown(usize),
    PageUp,
    PageDown,
    GoToTop,
    GoToBottom,

    // Table picker
    /// Open the table size picker
    OpenTablePicker,
    /// Adjust the pending table size (delta rows, delta cols)
    TablePickerAdjust(i8, i8),
    /// Insert the table with the picked size
    TablePickerConfirm,
    TablePickerCancel,

    // Math editor
    /// Open the math editor for a new node (inline or display)
    OpenMathEditor { inline: bool },
    /// Open the math editor for the selected math node
    EditSelectedMath,
    /// Append a character to the math source being edited
    MathInput(char),
    /// Delete the last character of the math source
    MathBackspace,
    /// Switch a pending insert between inline and display mode (Tab)
    MathToggleInline,
    /// Commit the math editor (insert or update)
    MathConfirm,
    MathCancel,

    // Page presentation
    ToggleOrientation,
    CycleMargin,

    // Persistence
    /// Save the current snapshot immediately (Ctrl+S)
    SaveNow,
    /// Replace the document with a fresh empty one
    NewDocument,

    // Overlays
    ToggleHelp,
    HideHelp,

    // Window
    /// Terminal resized
    Resize(u16, u16),

    // Application
    /// Quit the application
    Quit,
}

/// Pure function that updates the model based on a message.
///
/// This is the core of TEA - all state transitions happen here.
/// Side effects (snapshot writes) happen afterwards in the effects layer.
pub fn update(mut model: Model, msg: Message) -> Model {
    // A failed quit flush only survives into an immediate second quit.
    if !matches!(msg, Message::Quit) {
        model.quit_confirmed = false;
    }

    match msg {
        // Editing
        Message::InsertChar(c) => {
            let summary = model.document.update(|tx| {
                let mut buf = [0u8; 4];
                tx.insert_text(c.encode_utf8(&mut buf));
            });
            model.apply_summary(&summary);
        }
        Message::Backspace => {
            let summary = model.document.update(|tx| tx.backspace());
            model.apply_summary(&summary);
        }
        Message::DeleteForward => {
            let summary = model.document.update(|tx| tx.delete_forward());
            model.apply_summary(&summary);
        }
        Message::SplitParagraph => {
            let summary = model.document.update(|tx| tx.split_paragraph());
            model.apply_summary(&summary);
        }
        Message::ToggleFormat(format) => {
            let (_, summary) = model.document.dispatch(&Command::ToggleFormat(format));
            model.apply_summary(&summary);
        }

        // Caret
        Message::MoveLeft => {
            let summary = model.document.update(|tx| tx.move_left());
            model.apply_summary(&summary);
        }
        Message::MoveRight => {
            let summary = model.document.update(|tx| tx.move_right());
            model.apply_summary(&summary);
        }
        Message::ExtendLeft => {
            let summary = model.document.update(|tx| tx.extend_selection(false));
            model.apply_summary(&summary);
        }
        Message::ExtendRight => {
            let summary = model.document.update(|tx| tx.extend_selection(true));
            model.apply_summary(&summary);
        }
        Message::CaretHome => {
            if let Some(key) = model.document.selection().text_key() {
                let summary = model
                    .document
                    .update(|tx| tx.set_selection(Selection::caret(key, 0)));
                model.apply_summary(&summary);
            }
        }
        Message::CaretEnd => {
            if let Some(key) = model.document.selection().text_key() {
                let len = model
                    .document
                    .kind(key)
                    .map_or(0, |k| k.text_content().len());
                let summary = model
                    .document
                    .update(|tx| tx.set_selection(Selection::caret(key, len)));
                model.apply_summary(&summary);
            }
        }

        // Scrolling
        Message::ScrollUp(n) => model.viewport.scroll_up(n),
        Message::ScrollDown(n) => model.viewport.scroll_down(n),
        Message::PageUp => model.viewport.page_up(),
        Message::PageDown => model.viewport.page_down(),
        Message::GoToTop => model.viewport.go_to_top(),
        Message::GoToBottom => model.viewport.go_to_bottom(),

        // Table picker
        Message::OpenTablePicker => {
            model.table_picker = Some(TablePicker::default());
        }
        Message::TablePickerAdjust(d_rows, d_cols) => {
            if let Some(picker) = &mut model.table_picker {
                picker.adjust(d_rows, d_cols);
            }
        }
        Message::TablePickerConfirm => {
            if let Some(picker) = model.table_picker.take() {
                let (_, summary) = model.document.dispatch(&Command::InsertTable {
                    rows: picker.rows,
                    cols: picker.cols,
                });
                model.apply_summary(&summary);
            }
        }
        Message::TablePickerCancel => {
            model.table_picker = None;
        }

        // Math editor
        Message::OpenMathEditor { inline } => {
            model.ui.math_edit = Some(MathEdit::insert(inline));
        }
        Message::EditSelectedMath => {
            if let Selection::Node(key) = model.document.selection() {
                if let Some(NodeKind::Math { latex, inline }) = model.document.kind(key) {
                    model.ui.math_edit = Some(MathEdit::edit(key, latex.clone(), *inline));
                }
            }
        }
        Message::MathInput(c) => {
            if let Some(edit) = &mut model.ui.math_edit {
                edit.latex.push(c);
            }
        }
        Message::MathBackspace => {
            if let Some(edit) = &mut model.ui.math_edit {
                edit.latex.pop();
            }
        }
        Message::MathToggleInline => {
            // Existing nodes keep their display mode; only inserts toggle.
            if let Some(edit) = &mut model.ui.math_edit
                && edit.node.is_none()
            {
                edit.inline = !edit.inline;
            }
        }
        Message::MathConfirm => {
            if let Some(edit) = model.ui.math_edit.clone() {
                let latex = edit.latex.trim().to_string();
                if latex.is_empty() {
                    // Keep the editor open so the input isn't lost.
                    model.show_toast(ToastLevel::Warning, "Math source cannot be empty");
                } else {
                    let command = match edit.node {
                        Some(key) => Command::UpdateMath { key, latex },
                        None => Command::InsertMath {
                            latex,
                            inline: edit.inline,
                        },
                    };
                    let (_, summary) = model.document.dispatch(&command);
                    model.apply_summary(&summary);
                    model.ui.math_edit = None;
                }
            }
        }
        Message::MathCancel => {
            model.ui.math_edit = None;
        }

        // Page presentation
        Message::ToggleOrientation => {
            model.ui.orientation = model.ui.orientation.toggled();
        }
        Message::CycleMargin => {
            model.ui.margin = model.ui.margin.cycled();
        }

        // Persistence
        Message::NewDocument => {
            model.document = crate::engine::Document::new();
            // Force a snapshot of the fresh document so the old one is
            // replaced on the next save.
            let mut summary = crate::engine::UpdateSummary::default();
            summary.dirty_elements.insert(model.document.root());
            summary.selection_changed = true;
            model.apply_summary(&summary);
            model.show_toast(ToastLevel::Info, "New document");
        }
        // SaveNow: snapshot write handled in effects
        Message::SaveNow => {}

        // Overlays
        Message::ToggleHelp => {
            model.help_visible = !model.help_visible;
        }
        Message::HideHelp => {
            model.help_visible = false;
        }

        // Window
        Message::Resize(width, height) => {
            model.viewport.resize(width, height.saturating_sub(2));
        }

        // Application
        Message::Quit => {
            model.should_quit = true;
        }
    }

    model
}
