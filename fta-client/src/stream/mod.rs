//! Event stream subscription
//!
//! Opens `GET /queue/data?session_hash=...` and feeds its frames, strictly
//! in arrival order, through an [`EventInterpreter`] until the submission
//! terminates. Every exit path (terminal event, transport error, idle
//! timeout, cancellation) closes the connection before the outcome is
//! returned, and dropping the `subscribe` future drops the connection too.

pub mod interpreter;
pub mod sse;

pub use interpreter::{EventInterpreter, InterpreterState, Transition};
pub use sse::{SseDecoder, SseFrame};

use fta_common::{Failure, JobOutcome, Mode, SessionToken, StreamEvent};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::endpoints::ServiceEndpoints;
use crate::error::StreamError;
use crate::status::{Stage, StatusSink, StatusUpdate};

/// An open push-event connection
///
/// Closing drops the response body, which releases the HTTP connection.
pub struct EventConnection {
    frames: Option<BoxStream<'static, Result<SseFrame, StreamError>>>,
}

impl EventConnection {
    pub fn new(frames: BoxStream<'static, Result<SseFrame, StreamError>>) -> Self {
        Self {
            frames: Some(frames),
        }
    }

    /// Next frame, or `None` once closed
    pub async fn next_frame(&mut self) -> Option<Result<SseFrame, StreamError>> {
        match self.frames.as_mut() {
            Some(frames) => frames.next().await,
            None => None,
        }
    }

    /// Close the connection; returns false if it was already closed
    pub fn close(&mut self) -> bool {
        self.frames.take().is_some()
    }
}

enum Next {
    Frame(SseFrame),
    Failed(StreamError),
    IdleTimeout,
    Cancelled,
}

/// Subscribes to a session's event stream and drives it to an outcome
#[derive(Debug, Clone)]
pub struct EventStreamInterpreter {
    http_client: reqwest::Client,
    endpoints: ServiceEndpoints,
    idle_timeout: Duration,
}

impl EventStreamInterpreter {
    pub fn new(http_client: reqwest::Client, endpoints: ServiceEndpoints, idle_timeout: Duration) -> Self {
        Self {
            http_client,
            endpoints,
            idle_timeout,
        }
    }

    async fn open(&self, session: &SessionToken) -> Result<EventConnection, StreamError> {
        let response = self
            .http_client
            .get(self.endpoints.queue_data(session))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| StreamError::Connect(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Status(status.as_u16()));
        }

        Ok(EventConnection::new(sse::decode_frames(response.bytes_stream()).boxed()))
    }

    /// Follow the session's events until the submission terminates
    ///
    /// Always settles with a `JobOutcome`; stream-phase problems become
    /// `JobOutcome::Failure`. The final status (success or failure message)
    /// is reported to `sink` before returning.
    pub async fn subscribe(
        &self,
        session: &SessionToken,
        mode: Mode,
        sink: &dyn StatusSink,
        cancel: &CancellationToken,
    ) -> JobOutcome {
        let mut interpreter = EventInterpreter::new(mode, self.endpoints.clone());

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Failure::cancelled()),
            opened = tokio::time::timeout(self.idle_timeout, self.open(session)) => match opened {
                Ok(Ok(connection)) => Ok(connection),
                Ok(Err(e)) => {
                    error!(session = %session, error = %e, "Event stream failed to open");
                    Err(Failure::stream_error(e))
                }
                Err(_) => Err(Failure::timeout(self.idle_timeout)),
            },
        };

        let mut connection = match opened {
            Ok(connection) => connection,
            Err(failure) => {
                interpreter.terminate();
                let outcome = JobOutcome::Failure(failure);
                report_outcome(sink, session, &outcome);
                return outcome;
            }
        };

        interpreter.connected();
        info!(session = %session, "Event stream connected");

        let outcome = loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Next::Cancelled,
                frame = tokio::time::timeout(self.idle_timeout, connection.next_frame()) => match frame {
                    Ok(Some(Ok(frame))) => Next::Frame(frame),
                    Ok(Some(Err(e))) => Next::Failed(e),
                    Ok(None) => Next::Failed(StreamError::EndOfStream),
                    Err(_) => Next::IdleTimeout,
                },
            };

            let frame = match next {
                Next::Frame(frame) => frame,
                Next::Failed(e) => {
                    error!(session = %session, error = %e, "Event stream failed");
                    interpreter.terminate();
                    break JobOutcome::Failure(Failure::stream_error(e));
                }
                Next::IdleTimeout => {
                    warn!(session = %session, idle_timeout = ?self.idle_timeout, "Event stream idle");
                    interpreter.terminate();
                    break JobOutcome::Failure(Failure::timeout(self.idle_timeout));
                }
                Next::Cancelled => {
                    info!(session = %session, "Submission cancelled by caller");
                    interpreter.terminate();
                    break JobOutcome::Failure(Failure::cancelled());
                }
            };

            let event = match StreamEvent::parse(&frame.data) {
                Ok(event) => event,
                Err(e) => {
                    warn!(session = %session, error = %e, data = %frame.data, "Ignoring malformed event");
                    continue;
                }
            };
            debug!(session = %session, ?event, "Stream event");

            match interpreter.handle(event) {
                Transition::Status(message) => {
                    sink.on_status(StatusUpdate::new(session, Stage::Streaming, message))
                }
                Transition::Ignored => {}
                Transition::Terminal(outcome) => break outcome,
            }
        };

        if connection.close() {
            debug!(session = %session, "Event stream closed");
        }

        report_outcome(sink, session, &outcome);
        outcome
    }
}

fn report_outcome(sink: &dyn StatusSink, session: &SessionToken, outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Success(_) => {
            info!(session = %session, "Process completed successfully");
            sink.on_status(StatusUpdate::new(
                session,
                Stage::Completed,
                "Process completed successfully!",
            ));
        }
        JobOutcome::Failure(failure) => {
            warn!(session = %session, kind = %failure.kind, "{}", failure.message);
            sink.on_status(StatusUpdate::new(session, Stage::Failed, failure.message.clone()));
        }
    }
}
