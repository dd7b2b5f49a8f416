// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. store::SnapshotStore)
    clippy::module_name_repetitions
)]

//! # Quill
//!
//! A terminal rich-text document editor with autosave.
//!
//! Quill edits a structured document tree in the terminal with:
//! - Bold, italic, underline, and strikethrough text runs
//! - Inline and display math rendered from LaTeX source
//! - Tables with a header row
//! - Debounced snapshot autosave to a JSON file
//!
//! ## Architecture
//!
//! Quill uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`app`]: Main application loop and state
//! - [`engine`]: Document tree, selection, transactions, serialization
//! - [`math`]: LaTeX subset validation and plain-text rendering
//! - [`store`]: UI and persistence state owned by the model
//! - [`persist`]: Snapshot file storage
//! - [`autosave`]: Debounced save scheduling
//! - [`ui`]: Terminal UI components

pub mod app;
pub mod autosave;
pub mod config;
pub mod engine;
pub mod error;
pub mod math;
pub mod persist;
pub mod store;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::engine::{Document, Snapshot};
    pub use crate::ui::viewport::Viewport;
}
