//! Event stream state machine
//!
//! ```text
//! Idle --connected--> Connected --terminal event / transport failure--> Terminated
//!                       ^    |
//!                       +----+ non-terminal events (status only)
//! ```
//!
//! Terminated is absorbing: once an outcome has been produced every later
//! event is ignored, so a server that double-sends `process_completed`
//! cannot settle a submission twice. Events fed to an `Idle` interpreter are
//! ignored as well.

use fta_common::events::{is_truthy, CompletedOutput};
use fta_common::{Failure, JobOutcome, Mode, ResultPayload, StreamEvent};
use serde_json::Value;
use tracing::debug;

use crate::endpoints::ServiceEndpoints;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterState {
    Idle,
    Connected,
    Terminated,
}

/// Result of feeding one event to the interpreter
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Non-terminal event with a status line for the caller
    Status(String),
    /// Event carries nothing for the caller (unknown, or after termination)
    Ignored,
    /// Terminal event; the connection must be closed
    Terminal(JobOutcome),
}

/// Interprets stream events for one submission
#[derive(Debug)]
pub struct EventInterpreter {
    mode: Mode,
    endpoints: ServiceEndpoints,
    state: InterpreterState,
}

impl EventInterpreter {
    pub fn new(mode: Mode, endpoints: ServiceEndpoints) -> Self {
        Self {
            mode,
            endpoints,
            state: InterpreterState::Idle,
        }
    }

    pub fn state(&self) -> InterpreterState {
        self.state
    }

    /// Stream opened successfully
    pub fn connected(&mut self) {
        if self.state == InterpreterState::Idle {
            self.state = InterpreterState::Connected;
        }
    }

    /// Enter Terminated without an event (transport error, timeout, cancel)
    ///
    /// Returns false when the interpreter had already terminated.
    pub fn terminate(&mut self) -> bool {
        let was_live = self.state != InterpreterState::Terminated;
        self.state = InterpreterState::Terminated;
        was_live
    }

    /// Feed one event; only a `Connected` interpreter acts on events
    pub fn handle(&mut self, event: StreamEvent) -> Transition {
        match self.state {
            InterpreterState::Connected => {}
            InterpreterState::Idle => {
                debug!(?event, "Ignoring event before the stream connected");
                return Transition::Ignored;
            }
            InterpreterState::Terminated => {
                debug!(?event, "Ignoring event after termination");
                return Transition::Ignored;
            }
        }

        if event.is_terminal() {
            self.state = InterpreterState::Terminated;
        }

        match event {
            StreamEvent::ProcessCompleted { success, output } => {
                Transition::Terminal(self.completed(&success, &output))
            }
            StreamEvent::CloseStream => Transition::Terminal(JobOutcome::Failure(Failure::stream_closed())),
            other => match other.status_message() {
                Some(message) => Transition::Status(message),
                None => Transition::Ignored,
            },
        }
    }

    fn completed(&self, success: &Value, output: &Value) -> JobOutcome {
        let output = CompletedOutput::new(output);

        if !is_truthy(success) {
            return JobOutcome::Failure(Failure::processing(output.error_detail().as_deref()));
        }

        let value = match output.first_result() {
            Ok(value) => value,
            Err(detail) => return JobOutcome::Failure(Failure::malformed(detail)),
        };

        let resolve = |path: &str| self.endpoints.file_url(path);
        match ResultPayload::from_output(self.mode, value, &resolve) {
            Ok(payload) => JobOutcome::Success(payload),
            Err(detail) => JobOutcome::Failure(Failure::malformed(detail)),
        }
    }
}
