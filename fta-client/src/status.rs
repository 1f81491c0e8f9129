//! Status updates delivered to the caller while a submission runs

use chrono::{DateTime, Utc};
use fta_common::SessionToken;
use serde::Serialize;
use tokio::sync::mpsc;

/// Which part of the submission produced an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Uploading,
    Joining,
    Streaming,
    Completed,
    Failed,
}

/// One human-readable progress update
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    /// Submission this update belongs to
    pub session: SessionToken,
    pub stage: Stage,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn new(session: &SessionToken, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            session: session.clone(),
            stage,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Receiver of status updates
///
/// Implemented for closures and for tokio unbounded senders. Implementations
/// must not block; they are called from inside the event loop.
pub trait StatusSink: Send + Sync {
    fn on_status(&self, update: StatusUpdate);
}

impl<F> StatusSink for F
where
    F: Fn(StatusUpdate) + Send + Sync,
{
    fn on_status(&self, update: StatusUpdate) {
        self(update)
    }
}

impl StatusSink for mpsc::UnboundedSender<StatusUpdate> {
    fn on_status(&self, update: StatusUpdate) {
        // Receiver gone means the caller stopped listening
        let _ = self.send(update);
    }
}
