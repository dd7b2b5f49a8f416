use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::{App, Message, Model, update};
use crate::autosave::SaveDebouncer;
use crate::engine::{Document, Snapshot};
use crate::persist::{LoadOutcome, SnapshotStore};

pub(super) struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u16, u64)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) const fn queue(&mut self, width: u16, height: u16, now_ms: u64) {
        self.pending = Some((width, height, now_ms));
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> Option<(u16, u16)> {
        let (width, height, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization fails or the stored
    /// snapshot cannot be parsed.
    pub fn run(&mut self) -> Result<()> {
        // Load the snapshot BEFORE initializing the terminal so a malformed
        // store fails with a readable error instead of a garbled screen.
        let store = SnapshotStore::new(self.store_path.clone());
        let (document, loaded_json) = match store.load() {
            LoadOutcome::Loaded(json) => {
                let snapshot = Snapshot::from_json(&json).with_context(|| {
                    format!("Failed to parse snapshot {}", store.path().display())
                })?;
                let doc = snapshot.restore().with_context(|| {
                    format!("Failed to restore snapshot {}", store.path().display())
                })?;
                (doc, Some(json))
            }
            LoadOutcome::Empty => (Document::new(), None),
            LoadOutcome::Failed(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read {}", store.path().display()));
            }
        };

        // Initialize terminal
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal - quill requires an interactive terminal")?;
        let size = terminal.size()?;
        execute!(stdout(), EnableMouseCapture)?;

        // Create initial model
        let mut model = Model::new(self.store_path.clone(), document, (size.width, size.height));
        if let Some(json) = loaded_json {
            model.editor.set_loaded(json);
        }
        if self.landscape {
            model.ui.orientation = model.ui.orientation.toggled();
        }
        if let Some(margin) = self.margin {
            model.ui.margin = margin;
        }
        if let Some(delay_ms) = self.save_delay_ms {
            model.save_delay_ms = delay_ms;
        }
        model
            .config_global_path
            .clone_from(&self.config_global_path);
        model.config_local_path.clone_from(&self.config_local_path);

        // Main loop
        let result = Self::event_loop(&mut terminal, &mut model, &store, self.autosave);

        // Restore terminal
        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();

        result
    }

    /// Drain the freshest snapshot into the debouncer and perform any due
    /// write. Returns true when something happened that needs a render.
    ///
    /// Each edit restarts the countdown with the freshest snapshot; only a
    /// quiet stretch lets one through. With autosave off the pending slot is
    /// left for save-now and the quit flush. A failed write is not retried:
    /// the model stays dirty and only the next content change re-arms the
    /// debounce.
    pub(super) fn service_autosave(
        model: &mut Model,
        store: &SnapshotStore,
        save_debouncer: &mut SaveDebouncer,
        now_ms: u64,
        autosave: bool,
    ) -> bool {
        if autosave && let Some(json) = model.pending_snapshot.take() {
            save_debouncer.queue(json, now_ms);
        }
        if let Some(json) = save_debouncer.take_ready(now_ms) {
            super::effects::perform_save(model, store, &json);
            true
        } else {
            false
        }
    }

    fn event_loop(
        terminal: &mut DefaultTerminal,
        model: &mut Model,
        store: &SnapshotStore,
        autosave: bool,
    ) -> Result<()> {
        let start = Instant::now();
        let mut resize_debouncer = ResizeDebouncer::new(100);
        let mut save_debouncer = SaveDebouncer::new(model.save_delay_ms);
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

            if let Some((width, height)) = resize_debouncer.take_ready(now_ms) {
                *model = update(std::mem::take(model), Message::Resize(width, height));
                needs_render = true;
            }

            if Self::service_autosave(model, store, &mut save_debouncer, now_ms, autosave) {
                needs_render = true;
            }

            // Handle events
            let poll_ms = if needs_render {
                0
            } else if resize_debouncer.is_pending() || save_debouncer.is_pending() {
                10
            } else {
                250
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                // Refresh timestamp after poll wait so debouncers use accurate times.
                let event_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                let msg =
                    Self::handle_event(&event::read()?, model, event_ms, &mut resize_debouncer);
                if let Some(msg) = msg {
                    let side_msg = msg.clone();
                    *model = update(std::mem::take(model), msg);
                    Self::handle_message_side_effects(
                        model,
                        store,
                        &mut save_debouncer,
                        &side_msg,
                    );
                    needs_render = true;
                }

                // Coalesce key repeat bursts into a single render.
                while event::poll(Duration::from_millis(0))? {
                    let drain_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let msg =
                        Self::handle_event(&event::read()?, model, drain_ms, &mut resize_debouncer);
                    if let Some(msg) = msg {
                        let side_msg = msg.clone();
                        *model = update(std::mem::take(model), msg);
                        Self::handle_message_side_effects(
                            model,
                            store,
                            &mut save_debouncer,
                            &side_msg,
                        );
                        needs_render = true;
                    }
                }
            }

            if needs_render {
                terminal.draw(|frame| crate::ui::render(model, frame))?;
                needs_render = false;
            }

            if model.should_quit {
                break;
            }
        }
        Ok(())
    }
}
