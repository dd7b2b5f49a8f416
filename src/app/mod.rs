//! Application state and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::run`]: Main event loop with rendering and autosave

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{Model, TablePicker, ToastLevel};
pub use update::{Message, update};

use std::path::PathBuf;

use crate::store::PageMargin;

/// Main application struct that owns the terminal and runs the event loop.
pub struct App {
    store_path: PathBuf,
    landscape: bool,
    margin: Option<PageMargin>,
    save_delay_ms: Option<u64>,
    autosave: bool,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    /// Create a new application backed by the given snapshot file.
    pub fn new(store_path: PathBuf) -> Self {
        Self {
            store_path,
            landscape: false,
            margin: None,
            save_delay_ms: None,
            autosave: true,
            config_global_path: None,
            config_local_path: None,
        }
    }

    /// Start in landscape page orientation.
    pub const fn with_landscape(mut self, enabled: bool) -> Self {
        self.landscape = enabled;
        self
    }

    /// Override the initial page margin.
    pub const fn with_margin(mut self, margin: Option<PageMargin>) -> Self {
        self.margin = margin;
        self
    }

    /// Override the autosave delay in milliseconds.
    pub const fn with_save_delay_ms(mut self, delay_ms: Option<u64>) -> Self {
        self.save_delay_ms = delay_ms;
        self
    }

    /// Enable or disable debounced autosave. Manual saves and the quit
    /// flush are unaffected.
    pub const fn with_autosave(mut self, enabled: bool) -> Self {
        self.autosave = enabled;
        self
    }

    /// Set config paths to show in help.
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }
}

#[cfg(test)]
mod tests;
