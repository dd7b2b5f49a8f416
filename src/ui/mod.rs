//! Terminal UI components.
//!
//! This module contains all UI-related code including:
//! - [`viewport`]: Scroll position and visible range management
//! - [`layout`]: Flattening the document tree into styled lines
//! - overlays and bars for the toolbar, status line, and popups

pub mod layout;
pub mod viewport;

mod overlays;
mod render;
mod status;

pub use render::render;

/// Rows reserved outside the document area: toolbar above, status below.
pub const CHROME_ROWS: u16 = 2;
