//! Typed errors for the engine and storage boundary. The app layer wraps
//! these in `anyhow` with context.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuillError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to parse snapshot: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(&'static str),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
