//! The editor command bus.
//!
//! High-level edits arrive as [`Command`] values and are dispatched inside
//! a single transaction. Dispatch reports whether the command was handled
//! so callers can tell a stale-key no-op from a real edit.

use super::document::{Document, UpdateSummary};
use super::node::{Format, NodeKey, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Insert a math node at the selection. Inline math splices the run at
    /// the caret; display math lands after the enclosing block.
    InsertMath { latex: String, inline: bool },
    /// Rewrite an existing math node's source. Stale keys are ignored.
    UpdateMath { key: NodeKey, latex: String },
    /// Insert a table with a header row after the enclosing block.
    InsertTable { rows: usize, cols: usize },
    ToggleFormat(Format),
}

impl Document {
    /// Run a command in one transaction. Returns the change summary and
    /// whether the command actually did anything.
    pub fn dispatch(&mut self, command: &Command) -> (bool, UpdateSummary) {
        let mut handled = false;
        let summary = self.update(|tx| match command {
            Command::InsertMath { latex, inline } => {
                let inserted = if *inline {
                    tx.insert_inline_math(latex)
                } else {
                    tx.insert_block_math(latex)
                };
                handled = inserted.is_some();
            }
            Command::UpdateMath { key, latex } => {
                handled = tx.doc().kind(*key).is_some_and(NodeKind::is_math);
                tx.update_math(*key, latex);
            }
            Command::InsertTable { rows, cols } => {
                handled = tx.insert_table(*rows, *cols).is_some();
            }
            Command::ToggleFormat(format) => {
                handled = tx.doc().selection().text_key().is_some();
                tx.toggle_format(*format);
            }
        });
        (handled, summary)
    }
}
