use crate::app::{App, Message, Model, ToastLevel};
use crate::autosave::SaveDebouncer;
use crate::engine::Snapshot;
use crate::persist::{SaveOutcome, SnapshotStore};

impl App {
    /// Side effects that must not live in the pure update function:
    /// snapshot writes triggered by explicit saves and by quitting.
    pub(super) fn handle_message_side_effects(
        model: &mut Model,
        store: &SnapshotStore,
        save_debouncer: &mut SaveDebouncer,
        msg: &Message,
    ) {
        match msg {
            Message::SaveNow => {
                let json = take_freshest_snapshot(model, save_debouncer);
                match json {
                    Some(json) => {
                        if perform_save(model, store, &json) {
                            model.show_toast(ToastLevel::Info, "Saved");
                        }
                    }
                    None => model.show_toast(ToastLevel::Info, "No changes to save"),
                }
            }
            Message::NewDocument => {
                // Drop writes queued against the old document; the fresh
                // snapshot in the pending slot replaces the stored one.
                save_debouncer.cancel();
                store.clear();
            }
            Message::Quit => {
                if model.quit_confirmed {
                    return;
                }
                let Some(json) = take_freshest_snapshot(model, save_debouncer) else {
                    return;
                };
                if !perform_save(model, store, &json) {
                    // Keep the failed snapshot so a retry has something to
                    // write, and require a second quit to discard it.
                    model.pending_snapshot = Some(json);
                    model.should_quit = false;
                    model.quit_confirmed = true;
                    model.show_toast(
                        ToastLevel::Error,
                        "Save failed - press quit again to discard changes",
                    );
                }
            }
            _ => {}
        }
    }
}

/// The most recent serialized state that still needs writing, if any.
/// Drains both the debouncer and the model's pending slot so a save
/// that follows never writes stale content.
fn take_freshest_snapshot(model: &mut Model, save_debouncer: &mut SaveDebouncer) -> Option<String> {
    let pending = model.pending_snapshot.take();
    let queued = save_debouncer.take_now();
    // The pending slot is always at least as fresh as the queued one.
    pending.or(queued).or_else(|| {
        if model.editor.is_dirty {
            model.editor.serialized.clone().map_or_else(
                || Snapshot::capture(&model.document).to_json().ok(),
                Some,
            )
        } else {
            None
        }
    })
}

/// Write a snapshot and fold the outcome into the model. Returns true on
/// success.
pub(super) fn perform_save(model: &mut Model, store: &SnapshotStore, json: &str) -> bool {
    match store.save(json) {
        SaveOutcome::Saved { timestamp_ms } => {
            model.editor.mark_saved(timestamp_ms);
            true
        }
        SaveOutcome::Failed(err) => {
            model.show_toast(ToastLevel::Error, format!("Save failed: {err}"));
            false
        }
    }
}
