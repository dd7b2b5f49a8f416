use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::engine::{Document, Snapshot, UpdateSummary};
use crate::store::{EditorState, UiState};
use crate::ui::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// Table size picker overlay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TablePicker {
    pub rows: usize,
    pub cols: usize,
}

pub const MAX_TABLE_ROWS: usize = 20;
pub const MAX_TABLE_COLS: usize = 10;

impl Default for TablePicker {
    fn default() -> Self {
        Self { rows: 3, cols: 3 }
    }
}

impl TablePicker {
    pub fn adjust(&mut self, d_rows: i8, d_cols: i8) {
        self.rows = self
            .rows
            .saturating_add_signed(isize::from(d_rows))
            .clamp(1, MAX_TABLE_ROWS);
        self.cols = self
            .cols
            .saturating_add_signed(isize::from(d_cols))
            .clamp(1, MAX_TABLE_COLS);
    }
}

/// The complete application state.
///
/// All state lives here - no global or scattered state.
pub struct Model {
    /// The document tree being edited
    pub document: Document,
    /// Toolbar and page presentation state
    pub ui: UiState,
    /// Serialized state and dirtiness tracking
    pub editor: EditorState,
    /// Viewport managing scroll position
    pub viewport: Viewport,
    /// Path of the snapshot file, shown in the status bar and help
    pub store_path: PathBuf,
    /// Global config path shown in help
    pub config_global_path: Option<PathBuf>,
    /// Local override path shown in help
    pub config_local_path: Option<PathBuf>,
    /// Whether help overlay is visible
    pub help_visible: bool,
    /// Table size picker, when open
    pub table_picker: Option<TablePicker>,
    toast: Option<Toast>,
    /// Freshest snapshot waiting to be queued on the save debouncer.
    /// Taken by the event loop after every update pass.
    pub pending_snapshot: Option<String>,
    /// Autosave delay between the last edit and the write
    pub save_delay_ms: u64,
    /// True when the next render should scroll the caret into view.
    /// Manual scrolling leaves it false so the view stays put.
    pub caret_follow: bool,
    /// Whether the app should quit
    pub should_quit: bool,
    /// Set after a quit attempt failed to flush; allows second quit to
    /// proceed without saving
    pub quit_confirmed: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("store_path", &self.store_path)
            .field("is_dirty", &self.editor.is_dirty)
            .field("help_visible", &self.help_visible)
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Create a new model with default settings.
    pub fn new(store_path: PathBuf, document: Document, terminal_size: (u16, u16)) -> Self {
        Self {
            document,
            ui: UiState::default(),
            editor: EditorState::default(),
            viewport: Viewport::new(terminal_size.0, terminal_size.1.saturating_sub(2), 1),
            store_path,
            config_global_path: None,
            config_local_path: None,
            help_visible: false,
            table_picker: None,
            toast: None,
            pending_snapshot: None,
            save_delay_ms: crate::autosave::DEFAULT_SAVE_DELAY_MS,
            caret_follow: true,
            should_quit: false,
            quit_confirmed: false,
        }
    }

    /// Content width in columns after page orientation and margins.
    pub fn content_width(&self) -> u16 {
        let page = self.ui.orientation.page_width().min(self.viewport.width());
        page.saturating_sub(self.ui.margin.padding() * 2).max(10)
    }

    /// True while an overlay owns the keyboard.
    pub fn overlay_active(&self) -> bool {
        self.help_visible || self.table_picker.is_some() || self.ui.math_edit.is_some()
    }

    /// Fold an update summary into the stores: re-serialize on content
    /// changes so the autosave picks it up, refresh the toolbar flags on
    /// selection changes. Updates that touched nothing are skipped.
    pub fn apply_summary(&mut self, summary: &UpdateSummary) {
        if !summary.is_content_clean() {
            match Snapshot::capture(&self.document).to_json() {
                Ok(json) => {
                    self.editor.set_serialized(json.clone());
                    self.pending_snapshot = Some(json);
                }
                Err(err) => {
                    self.show_toast(ToastLevel::Error, format!("Serialize failed: {err}"));
                }
            }
        }
        if summary.selection_changed {
            self.ui.sync_selection(&self.document);
        }
        if summary.selection_changed || !summary.is_content_clean() {
            self.caret_follow = true;
        }
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(PathBuf::new(), Document::new(), (80, 24))
    }
}
