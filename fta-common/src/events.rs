//! Server push-event vocabulary
//!
//! Each frame on the queue data stream is a JSON object discriminated by its
//! `msg` field. Known messages map to typed variants; anything else lands in
//! [`StreamEvent::Unknown`] so newer servers do not break older clients.
//!
//! Only `msg` is decoded strictly. Every other field is kept as a raw JSON
//! value and read leniently, so a known event with an oddly typed field is
//! still dispatched instead of being dropped as undecodable.

use serde::Deserialize;
use serde_json::Value;

/// One decoded event from the queue data stream
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Diagnostic line emitted by the server
    Log {
        #[serde(default)]
        level: Value,
        #[serde(default)]
        log: Value,
    },

    /// Job accepted and began executing
    ProcessStarts,

    /// Server queue saturated
    QueueFull,

    /// Percentage progress
    Progress {
        #[serde(default)]
        progress: Value,
    },

    /// Liveness ping
    Heartbeat,

    /// Job finished, successfully or not
    ProcessCompleted {
        /// Tested for truthiness, not for a strict boolean
        #[serde(default)]
        success: Value,
        #[serde(default)]
        output: Value,
    },

    /// Server asks the client to close the connection
    CloseStream,

    /// Unrecognized `msg` value
    #[serde(other)]
    Unknown,
}

/// Truthiness of a JSON value: `null`, `false`, `0`, `NaN` and `""` are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Read-only view over the `output` field of a `process_completed` message
#[derive(Debug, Clone, Copy)]
pub struct CompletedOutput<'a> {
    output: &'a Value,
}

impl<'a> CompletedOutput<'a> {
    pub fn new(output: &'a Value) -> Self {
        Self { output }
    }

    /// First entry of `output.data`, the result payload
    pub fn first_result(&self) -> Result<&'a Value, &'static str> {
        match self.output.get("data") {
            None | Some(Value::Null) => Err("output.data is missing"),
            Some(Value::Array(items)) => items.first().ok_or("output.data is empty"),
            Some(_) => Err("output.data is not an array"),
        }
    }

    /// Server-supplied error detail, rendered as text whatever its JSON type
    pub fn error_detail(&self) -> Option<String> {
        self.output.get("error").and_then(text)
    }
}

impl StreamEvent {
    /// Parse the data field of one SSE frame
    pub fn parse(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }

    /// Whether this event ends the submission
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ProcessCompleted { .. } | Self::CloseStream)
    }

    /// Status text forwarded to the caller for non-terminal events
    pub fn status_message(&self) -> Option<String> {
        match self {
            Self::Log { level, log } => Some(format!(
                "{}: {}",
                text(level).unwrap_or_else(|| "info".to_string()),
                text(log).unwrap_or_default()
            )),
            Self::ProcessStarts => Some("Process started...".to_string()),
            Self::QueueFull => Some("Queue is full, please wait...".to_string()),
            Self::Progress { progress } => Some(format!("Progress: {}%", format_percent(progress))),
            Self::Heartbeat => Some("Server is active...".to_string()),
            Self::ProcessCompleted { .. } | Self::CloseStream | Self::Unknown => None,
        }
    }
}

/// Strings as-is, other non-null values as compact JSON
fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn format_percent(progress: &Value) -> String {
    let number = match progress {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(p) if p.is_finite() && p.fract() == 0.0 => format!("{:.0}", p),
        Some(p) if p.is_finite() => format!("{}", p),
        _ => "?".to_string(),
    }
}
