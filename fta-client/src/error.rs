//! Error types for fta-client
//!
//! Upload and join errors abort a submission before the event stream is
//! opened and are returned as `Err(SubmitError)`. Stream errors never escape
//! to the caller; they are folded into a `JobOutcome::Failure`.

use std::path::PathBuf;
use thiserror::Error;

/// Asset upload errors
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Cannot read asset {path}: {source}")]
    AssetUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Upload response contained no file paths")]
    EmptyResponse,
}

/// Queue join errors
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Queue join rejected {0}: {1}")]
    Rejected(u16, String),
}

/// Transport-level failures of the event stream
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Failed to open event stream: {0}")]
    Connect(String),

    #[error("Event stream returned HTTP {0}")]
    Status(u16),

    #[error("Event stream transport error: {0}")]
    Transport(String),

    #[error("Event stream ended before a terminal event")]
    EndOfStream,
}

/// Errors that abort a submission before the event stream phase
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Queue join failed: {0}")]
    Join(#[from] JoinError),
}
