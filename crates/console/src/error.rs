//! Console error type.

use std::path::PathBuf;

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("line framing error: {0}")]
    Codec(#[from] LinesCodecError),

    #[error("failed to parse config {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("{0}")]
    Paths(String),

    #[error("capture source {path:?} unavailable: {source}")]
    CaptureUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("capture is not configured (set capture.path or pass --camera)")]
    CaptureNotConfigured,
}
