//! Server-Sent Events framing
//!
//! Turns the raw body of a `text/event-stream` response into frames. Only
//! the `event` and `data` fields matter to this client; `id`, `retry` and
//! comment lines are consumed and dropped. Comments (keep-alives) never
//! produce a frame, so they do not count as activity.

use futures::stream::Stream;
use futures::StreamExt;
use std::fmt::Display;

use crate::error::StreamError;

/// One dispatched SSE event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE line parser
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk; returns every frame completed by it
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(line) = self.take_line() {
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Pop one complete line (terminated by `\n`, `\r\n` or `\r`)
    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n' || b == b'\r')?;

        let terminator_len = if self.pending[end] == b'\r' {
            match self.pending.get(end + 1) {
                Some(b'\n') => 2,
                Some(_) => 1,
                // A lone trailing \r may be the first half of \r\n
                None => return None,
            }
        } else {
            1
        };

        let line = String::from_utf8_lossy(&self.pending[..end]).into_owned();
        self.pending.drain(..end + terminator_len);
        Some(line)
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame { event, data })
    }
}

/// Decode a byte stream into SSE frames
///
/// The returned stream always ends with an error: either the transport
/// error that broke the body, or [`StreamError::EndOfStream`] when the server
/// closed the body. A partially received event at that point is discarded.
pub fn decode_frames<S, B, E>(body: S) -> impl Stream<Item = Result<SseFrame, StreamError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    async_stream::stream! {
        let mut body = Box::pin(body);
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    let frames = decoder.feed(bytes.as_ref());
                    for frame in frames {
                        yield Ok(frame);
                    }
                }
                Err(e) => {
                    yield Err(StreamError::Transport(e.to_string()));
                    return;
                }
            }
        }

        yield Err(StreamError::EndOfStream);
    }
}
