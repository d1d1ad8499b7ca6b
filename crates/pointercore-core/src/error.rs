//! Error types for pointercore
//!
//! Only failures that actually propagate to a caller get a variant here.
//! Per-node and per-constraint problems (missing AST node, unresolved
//! callee, malformed source location) are never represented as `Err` — they
//! are logged and the affected item is omitted, so the result stays
//! "partial but consistent."

use thiserror::Error;

/// pointercore error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("store error: {0}")]
    Store(String),

    #[error("graph backend error: {0}")]
    GraphBackend(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for pointercore
pub type Result<T> = std::result::Result<T, Error>;
