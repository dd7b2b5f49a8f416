//! Document engine: the node tree, selection, transactional updates, and
//! the snapshot format.

pub mod commands;
pub mod document;
pub mod node;
pub mod selection;
pub mod serial;

pub use commands::Command;
pub use document::{Document, Tx, UpdateSummary};
pub use node::{Format, NodeData, NodeKey, NodeKind, TextFormat};
pub use selection::{Point, Selection};
pub use serial::{SerializedCaret, SerializedNode, Snapshot, SNAPSHOT_VERSION};
