//! Processing modes and job outcome types
//!
//! A submission ends in exactly one [`JobOutcome`]. Successful outcomes carry a
//! payload whose shape depends on the [`Mode`] the caller selected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::Error;

/// Processing variant sent to the server alongside the uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Analyse the image and recommend matching products
    #[default]
    Recommendation,
    /// Create a new product description and imagery from the image
    Creation,
}

impl Mode {
    /// Wire name used in the queue join payload
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recommendation => "recommendation",
            Self::Creation => "creation",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recommendation" => Ok(Self::Recommendation),
            "creation" => Ok(Self::Creation),
            other => Err(Error::InvalidInput(format!(
                "unknown mode '{}', expected 'recommendation' or 'creation'",
                other
            ))),
        }
    }
}

/// One recommended item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationItem {
    pub image: String,
    pub caption: String,
}

/// Result of a Recommendation submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
    pub analysis: String,
    pub items: Vec<RecommendationItem>,
}

/// Result of a Creation submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreationResult {
    pub caption: String,
    /// Always holds at least one image reference
    pub images: Vec<String>,
}

/// Mode-dependent success payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ResultPayload {
    Recommendation(RecommendationResult),
    Creation(CreationResult),
}

impl ResultPayload {
    /// Interpret `output.data[0]` of a successful `process_completed` event
    ///
    /// Image references may be plain URLs or file objects (`{url, path}`);
    /// `resolve_path` turns a bare server path into a retrieval URL.
    pub fn from_output(
        mode: Mode,
        value: &Value,
        resolve_path: &dyn Fn(&str) -> String,
    ) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("expected a result object, got {}", type_name(value)))?;

        match mode {
            Mode::Recommendation => {
                let analysis = object
                    .get("analysis")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();

                let mut items = Vec::new();
                if let Some(entries) = object.get("data").and_then(Value::as_array) {
                    for (index, entry) in entries.iter().enumerate() {
                        let image = entry
                            .get("image")
                            .and_then(|v| image_ref(v, resolve_path))
                            .ok_or_else(|| format!("item {} has no usable image reference", index))?;
                        let caption = entry
                            .get("caption")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string();
                        items.push(RecommendationItem { image, caption });
                    }
                }

                Ok(Self::Recommendation(RecommendationResult { analysis, items }))
            }
            Mode::Creation => {
                let caption = object
                    .get("caption")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();

                let images = match object.get("image") {
                    Some(Value::Array(entries)) => entries
                        .iter()
                        .map(|v| image_ref(v, resolve_path))
                        .collect::<Option<Vec<_>>>()
                        .ok_or_else(|| "image list contains an unusable reference".to_string())?,
                    Some(single) => image_ref(single, resolve_path).into_iter().collect(),
                    None => Vec::new(),
                };

                if images.is_empty() {
                    return Err("creation result has no image".to_string());
                }

                Ok(Self::Creation(CreationResult { caption, images }))
            }
        }
    }
}

fn image_ref(value: &Value, resolve_path: &dyn Fn(&str) -> String) -> Option<String> {
    match value {
        Value::String(url) if !url.is_empty() => Some(url.clone()),
        Value::Object(file) => {
            if let Some(url) = file.get("url").and_then(Value::as_str) {
                return Some(url.to_string());
            }
            file.get("path").and_then(Value::as_str).map(resolve_path)
        }
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Why a submission's stream phase did not produce a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Server reported `process_completed` with `success=false`
    ProcessingFailure,
    /// Server sent `close_stream` before any terminal result
    StreamClosedWithoutResult,
    /// Transport-level failure of the push connection
    StreamError,
    /// No event within the idle window
    Timeout,
    /// `process_completed` succeeded but `output.data[0]` was unusable
    MalformedResult,
    /// Caller cancelled the submission
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProcessingFailure => "processing failure",
            Self::StreamClosedWithoutResult => "stream closed without result",
            Self::StreamError => "stream error",
            Self::Timeout => "timeout",
            Self::MalformedResult => "malformed result",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Typed failure with a human-readable message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn processing(server_error: Option<&str>) -> Self {
        match server_error {
            Some(detail) => Self::new(FailureKind::ProcessingFailure, format!("Processing error: {}", detail)),
            None => Self::new(FailureKind::ProcessingFailure, "Processing error."),
        }
    }

    pub fn stream_closed() -> Self {
        Self::new(FailureKind::StreamClosedWithoutResult, "Stream closed without result.")
    }

    pub fn stream_error(detail: impl fmt::Display) -> Self {
        Self::new(FailureKind::StreamError, format!("Stream error: {}", detail))
    }

    pub fn timeout(idle: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("No server events received within {}s.", idle.as_secs_f64()),
        )
    }

    pub fn malformed(detail: impl fmt::Display) -> Self {
        Self::new(FailureKind::MalformedResult, format!("Malformed result: {}", detail))
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "Submission cancelled.")
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

/// Final outcome of one submission, produced exactly once
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "lowercase")]
pub enum JobOutcome {
    Success(ResultPayload),
    Failure(Failure),
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }
}
