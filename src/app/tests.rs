use std::path::PathBuf;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};

use crate::autosave::SaveDebouncer;
use crate::engine::{Document, Format, NodeKind, Selection, Snapshot};
use crate::persist::SnapshotStore;

use super::event_loop::ResizeDebouncer;
use super::{App, Message, Model, ToastLevel, update};

fn create_test_model() -> Model {
    let mut doc = Document::new();
    doc.update(|tx| tx.insert_text("Hello world"));
    Model::new(PathBuf::from("notes.json"), doc, (80, 24))
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn alt(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::ALT)
}

#[test]
fn test_insert_char_marks_dirty_and_queues_snapshot() {
    let model = create_test_model();
    assert!(!model.editor.is_dirty);

    let model = update(model, Message::InsertChar('x'));
    assert!(model.editor.is_dirty);
    assert!(model.pending_snapshot.is_some());
    assert!(model.caret_follow);
}

#[test]
fn test_caret_moves_do_not_queue_snapshot() {
    let model = create_test_model();
    let model = update(model, Message::MoveLeft);
    assert!(!model.editor.is_dirty);
    assert!(model.pending_snapshot.is_none());
}

#[test]
fn test_toggle_format_reflects_in_toolbar() {
    let model = create_test_model();
    let model = update(model, Message::ExtendLeft);
    let model = update(model, Message::ToggleFormat(Format::Bold));
    assert!(model.ui.format.bold);
    assert!(model.editor.is_dirty);
}

#[test]
fn test_toggle_help_changes_visibility() {
    let model = create_test_model();
    assert!(!model.help_visible);

    let model = update(model, Message::ToggleHelp);
    assert!(model.help_visible);

    let model = update(model, Message::ToggleHelp);
    assert!(!model.help_visible);
}

#[test]
fn test_table_picker_flow_inserts_table() {
    let model = create_test_model();
    let model = update(model, Message::OpenTablePicker);
    assert!(model.table_picker.is_some());

    let model = update(model, Message::TablePickerAdjust(1, -1));
    let picker = model.table_picker.clone().unwrap();
    assert_eq!((picker.rows, picker.cols), (4, 2));

    let model = update(model, Message::TablePickerConfirm);
    assert!(model.table_picker.is_none());
    assert!(model.editor.is_dirty);
    let has_table = model
        .document
        .children(model.document.root())
        .iter()
        .any(|&k| matches!(model.document.kind(k), Some(NodeKind::Table)));
    assert!(has_table);
}

#[test]
fn test_table_picker_clamps_at_limits() {
    let mut model = create_test_model();
    model = update(model, Message::OpenTablePicker);
    for _ in 0..40 {
        model = update(model, Message::TablePickerAdjust(1, 1));
    }
    let picker = model.table_picker.clone().unwrap();
    assert_eq!((picker.rows, picker.cols), (20, 10));

    for _ in 0..40 {
        model = update(model, Message::TablePickerAdjust(-1, -1));
    }
    let picker = model.table_picker.clone().unwrap();
    assert_eq!((picker.rows, picker.cols), (1, 1));
}

#[test]
fn test_math_confirm_empty_keeps_editor_open_and_tree_untouched() {
    let model = create_test_model();
    let tree_before = Snapshot::capture(&model.document).root;

    let model = update(model, Message::OpenMathEditor { inline: true });
    let model = update(model, Message::MathInput(' '));
    let model = update(model, Message::MathConfirm);

    assert!(model.ui.math_edit.is_some());
    assert!(matches!(
        model.active_toast(),
        Some((_, ToastLevel::Warning))
    ));
    // Rejected input must not touch the document.
    assert_eq!(Snapshot::capture(&model.document).root, tree_before);
    assert!(!model.editor.is_dirty);
    assert!(model.pending_snapshot.is_none());
}

#[test]
fn test_math_toggle_inline_only_while_inserting() {
    let model = create_test_model();
    let model = update(model, Message::OpenMathEditor { inline: true });
    let model = update(model, Message::MathToggleInline);
    assert!(!model.ui.math_edit.as_ref().unwrap().inline);

    // An existing node keeps its display mode.
    let mut model = update(model, Message::MathInput('x'));
    model = update(model, Message::MathConfirm);
    model = update(model, Message::MoveLeft);
    model = update(model, Message::EditSelectedMath);
    let inline_before = model.ui.math_edit.as_ref().unwrap().inline;
    let model = update(model, Message::MathToggleInline);
    assert_eq!(model.ui.math_edit.as_ref().unwrap().inline, inline_before);
}

#[test]
fn test_math_confirm_inserts_inline_node() {
    let model = create_test_model();
    let model = update(model, Message::OpenMathEditor { inline: true });
    let mut model = model;
    for c in "x^2".chars() {
        model = update(model, Message::MathInput(c));
    }
    let model = update(model, Message::MathConfirm);

    assert!(model.ui.math_edit.is_none());
    assert!(model.editor.is_dirty);
    let json = model.editor.serialized.as_deref().unwrap();
    assert!(json.contains("\"type\":\"math\""));
    assert!(json.contains("\"inline\":true"));
}

#[test]
fn test_edit_selected_math_round_trip() {
    let mut model = create_test_model();
    model = update(model, Message::OpenMathEditor { inline: true });
    for c in "a+b".chars() {
        model = update(model, Message::MathInput(c));
    }
    model = update(model, Message::MathConfirm);

    // Caret sits after the math node; one step left selects it.
    model = update(model, Message::MoveLeft);
    assert!(matches!(model.document.selection(), Selection::Node(_)));

    model = update(model, Message::EditSelectedMath);
    let edit = model.ui.math_edit.clone().unwrap();
    assert_eq!(edit.latex, "a+b");
    assert!(edit.node.is_some());

    model = update(model, Message::MathInput('!'));
    model = update(model, Message::MathConfirm);
    let json = model.editor.serialized.as_deref().unwrap();
    assert!(json.contains("a+b!"));
}

#[test]
fn test_new_document_resets_content() {
    let model = create_test_model();
    let model = update(model, Message::InsertChar('x'));
    let model = update(model, Message::NewDocument);

    assert!(model.editor.is_dirty);
    let json = model.editor.serialized.as_deref().unwrap();
    assert!(!json.contains("Hello"));
}

#[test]
fn test_orientation_and_margin_messages() {
    let model = create_test_model();
    let before = model.content_width();
    let model = update(model, Message::ToggleOrientation);
    assert_eq!(model.ui.orientation.label(), "landscape");
    // Wider page, but still capped by the viewport.
    assert!(model.content_width() >= before);

    let margin = model.ui.margin;
    let model = update(model, Message::CycleMargin);
    assert_ne!(model.ui.margin, margin);
}

#[test]
fn test_quit_sets_flag_and_second_message_clears_confirmation() {
    let model = create_test_model();
    let model = update(model, Message::Quit);
    assert!(model.should_quit);

    let mut model = model;
    model.should_quit = false;
    model.quit_confirmed = true;
    let model = update(model, Message::InsertChar('x'));
    assert!(!model.quit_confirmed);
}

#[test]
fn test_key_mapping_basic_editing() {
    let model = create_test_model();
    assert_eq!(
        App::handle_key(key(KeyCode::Char('a')), &model),
        Some(Message::InsertChar('a'))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Enter), &model),
        Some(Message::SplitParagraph)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Backspace), &model),
        Some(Message::Backspace)
    );
    assert_eq!(App::handle_key(ctrl('q'), &model), Some(Message::Quit));
    assert_eq!(App::handle_key(ctrl('s'), &model), Some(Message::SaveNow));
    assert_eq!(
        App::handle_key(ctrl('b'), &model),
        Some(Message::ToggleFormat(Format::Bold))
    );
    assert_eq!(
        App::handle_key(alt('m'), &model),
        Some(Message::OpenMathEditor { inline: true })
    );
}

#[test]
fn test_key_mapping_enter_on_math_opens_editor() {
    let mut model = create_test_model();
    model = update(model, Message::OpenMathEditor { inline: true });
    model = update(model, Message::MathInput('x'));
    model = update(model, Message::MathConfirm);
    model = update(model, Message::MoveLeft);

    assert_eq!(
        App::handle_key(key(KeyCode::Enter), &model),
        Some(Message::EditSelectedMath)
    );
}

#[test]
fn test_math_editor_captures_keyboard() {
    let mut model = create_test_model();
    model = update(model, Message::OpenMathEditor { inline: false });

    assert_eq!(
        App::handle_key(key(KeyCode::Char('q')), &model),
        Some(Message::MathInput('q'))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Esc), &model),
        Some(Message::MathCancel)
    );
}

#[test]
fn test_help_swallows_next_key() {
    let mut model = create_test_model();
    model = update(model, Message::ToggleHelp);
    assert_eq!(
        App::handle_key(key(KeyCode::Char('x')), &model),
        Some(Message::HideHelp)
    );
}

#[test]
fn test_go_to_top_and_bottom_move_viewport() {
    let mut model = create_test_model();
    model.viewport.set_total_lines(100);

    let mut model = update(model, Message::GoToBottom);
    assert!(model.viewport.offset() > 0);
    model = update(model, Message::GoToTop);
    assert_eq!(model.viewport.offset(), 0);

    assert_eq!(
        App::handle_key(
            KeyEvent::new(KeyCode::Home, KeyModifiers::CONTROL),
            &model
        ),
        Some(Message::GoToTop)
    );
    assert_eq!(
        App::handle_key(KeyEvent::new(KeyCode::End, KeyModifiers::CONTROL), &model),
        Some(Message::GoToBottom)
    );
}

#[test]
fn test_resize_events_are_debounced() {
    let model = create_test_model();
    let mut debouncer = ResizeDebouncer::new(100);

    let msg = App::handle_event(&Event::Resize(100, 40), &model, 0, &mut debouncer);
    assert_eq!(msg, None);
    assert!(debouncer.is_pending());

    assert_eq!(debouncer.take_ready(50), None);
    assert_eq!(debouncer.take_ready(100), Some((100, 40)));
    assert!(!debouncer.is_pending());
}

#[test]
fn test_save_now_writes_snapshot_and_marks_clean() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    let store = SnapshotStore::new(&path);
    let mut debouncer = SaveDebouncer::new(1_000);

    let mut model = update(create_test_model(), Message::InsertChar('x'));
    assert!(model.editor.is_dirty);

    App::handle_message_side_effects(&mut model, &store, &mut debouncer, &Message::SaveNow);

    assert!(path.exists());
    assert!(!model.editor.is_dirty);
    assert!(model.editor.last_saved.is_some());
    assert!(model.pending_snapshot.is_none());
}

#[test]
fn test_failed_save_leaves_dirty_and_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    // The store path is a directory, so every write fails.
    let store = SnapshotStore::new(dir.path());
    let mut debouncer = SaveDebouncer::new(1_000);

    let mut model = update(create_test_model(), Message::InsertChar('x'));
    assert!(!App::service_autosave(&mut model, &store, &mut debouncer, 0, true));
    assert!(debouncer.is_pending());

    // The write fires, fails, and the snapshot is dropped.
    assert!(App::service_autosave(&mut model, &store, &mut debouncer, 1_000, true));
    assert!(model.editor.is_dirty);
    assert!(!debouncer.is_pending());
    assert!(matches!(model.active_toast(), Some((_, ToastLevel::Error))));

    // No automatic retry: nothing is re-armed on later ticks.
    assert!(!App::service_autosave(&mut model, &store, &mut debouncer, 10_000, true));

    // The next content change is the only path to another attempt.
    model = update(model, Message::InsertChar('y'));
    assert!(!App::service_autosave(&mut model, &store, &mut debouncer, 10_001, true));
    assert!(debouncer.is_pending());
}

#[test]
fn test_autosave_disabled_leaves_pending_slot() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("notes.json"));
    let mut debouncer = SaveDebouncer::new(1_000);

    let mut model = update(create_test_model(), Message::InsertChar('x'));
    assert!(!App::service_autosave(&mut model, &store, &mut debouncer, 5_000, false));
    assert!(!debouncer.is_pending());
    assert!(model.pending_snapshot.is_some());
}

#[test]
fn test_quit_save_failure_requires_second_quit() {
    let dir = tempfile::tempdir().unwrap();
    // The store path is a directory, so every write fails.
    let store = SnapshotStore::new(dir.path());
    let mut debouncer = SaveDebouncer::new(1_000);

    let mut model = update(create_test_model(), Message::InsertChar('x'));
    model = update(model, Message::Quit);
    assert!(model.should_quit);

    App::handle_message_side_effects(&mut model, &store, &mut debouncer, &Message::Quit);
    assert!(!model.should_quit);
    assert!(model.quit_confirmed);
    assert!(model.editor.is_dirty);
    assert!(model.pending_snapshot.is_some());
    assert!(matches!(model.active_toast(), Some((_, ToastLevel::Error))));

    // The second quit gives up on saving and exits.
    model = update(model, Message::Quit);
    App::handle_message_side_effects(&mut model, &store, &mut debouncer, &Message::Quit);
    assert!(model.should_quit);
}

#[test]
fn test_new_document_clears_stored_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.json");
    let store = SnapshotStore::new(&path);
    let mut debouncer = SaveDebouncer::new(1_000);
    debouncer.queue("{}".to_owned(), 0);
    std::fs::write(&path, "{}").unwrap();

    let mut model = update(create_test_model(), Message::NewDocument);
    App::handle_message_side_effects(&mut model, &store, &mut debouncer, &Message::NewDocument);

    assert!(!path.exists());
    assert!(!debouncer.is_pending());
    // The fresh document is still queued for its own write.
    assert!(model.pending_snapshot.is_some());
}

#[test]
fn test_toast_expires() {
    let mut model = create_test_model();
    model.show_toast(ToastLevel::Info, "hi");
    assert!(model.active_toast().is_some());
    let far = std::time::Instant::now() + std::time::Duration::from_secs(10);
    assert!(model.expire_toast(far));
    assert!(model.active_toast().is_none());
}
