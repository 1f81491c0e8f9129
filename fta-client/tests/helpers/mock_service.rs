//! In-process mock of the inference service
//!
//! Serves the three endpoints the client uses and records what it saw:
//! upload and join counts, session ids, join bodies, and how many event
//! streams were opened and later closed by the client.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

/// One step of a scripted event stream
#[derive(Debug, Clone)]
pub enum Step {
    /// Send a JSON event
    Event(Value),
    /// Send a frame whose data is not valid event JSON
    Raw(String),
    /// Pause before the next step
    Delay(Duration),
}

type Script = Arc<dyn Fn(&str) -> Vec<Step> + Send + Sync>;

/// What the mock answers
pub struct Scenario {
    pub upload_status: StatusCode,
    pub upload_response: Value,
    pub join_status: StatusCode,
    /// Event script, chosen by the mode string sent in the join
    pub script: Script,
    /// Keep the stream open after the script instead of ending the body
    pub hold_open: bool,
    /// Pause before answering an upload
    pub upload_delay: Option<Duration>,
    /// Pause before answering a queue join
    pub join_delay: Option<Duration>,
}

impl Scenario {
    /// Same event script regardless of mode
    pub fn with_events(events: Vec<Step>) -> Self {
        Self::with_script(move |_| events.clone())
    }

    pub fn with_script(script: impl Fn(&str) -> Vec<Step> + Send + Sync + 'static) -> Self {
        Self {
            upload_status: StatusCode::OK,
            upload_response: json!(["/tmp/gradio/0a1b2c/look.png"]),
            join_status: StatusCode::OK,
            script: Arc::new(script),
            hold_open: true,
            upload_delay: None,
            join_delay: None,
        }
    }
}

/// Counters and captured requests
#[derive(Default)]
pub struct Recorder {
    pub uploads: AtomicUsize,
    pub joins: AtomicUsize,
    pub streams_opened: AtomicUsize,
    pub streams_closed: AtomicUsize,
    pub upload_ids: Mutex<Vec<String>>,
    pub upload_content_types: Mutex<Vec<String>>,
    pub join_bodies: Mutex<Vec<Value>>,
    pub stream_sessions: Mutex<Vec<String>>,
    modes: Mutex<HashMap<String, String>>,
}

impl Recorder {
    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn joins(&self) -> usize {
        self.joins.load(Ordering::SeqCst)
    }

    pub fn streams_opened(&self) -> usize {
        self.streams_opened.load(Ordering::SeqCst)
    }

    pub fn streams_closed(&self) -> usize {
        self.streams_closed.load(Ordering::SeqCst)
    }
}

/// Increments `streams_closed` when the SSE body is dropped
struct CloseGuard(Arc<Recorder>);

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.0.streams_closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
struct MockState {
    scenario: Arc<Scenario>,
    recorder: Arc<Recorder>,
}

async fn upload(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let recorder = &state.recorder;
    recorder.uploads.fetch_add(1, Ordering::SeqCst);
    if let Some(id) = query.get("upload_id") {
        recorder.upload_ids.lock().unwrap().push(id.clone());
    }
    if let Some(content_type) = headers.get("content-type").and_then(|v| v.to_str().ok()) {
        recorder
            .upload_content_types
            .lock()
            .unwrap()
            .push(content_type.to_string());
    }
    assert!(!body.is_empty(), "upload body should not be empty");
    if let Some(pause) = state.scenario.upload_delay {
        tokio::time::sleep(pause).await;
    }

    (
        state.scenario.upload_status,
        Json(state.scenario.upload_response.clone()),
    )
}

async fn join(State(state): State<MockState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let recorder = &state.recorder;
    recorder.joins.fetch_add(1, Ordering::SeqCst);

    let session = body["session_hash"].as_str().unwrap_or_default().to_string();
    let mode = body["data"][1].as_str().unwrap_or_default().to_string();
    recorder.modes.lock().unwrap().insert(session, mode);
    recorder.join_bodies.lock().unwrap().push(body);
    if let Some(pause) = state.scenario.join_delay {
        tokio::time::sleep(pause).await;
    }

    (state.scenario.join_status, Json(json!({"event_id": "evt-0001"})))
}

async fn queue_data(
    State(state): State<MockState>,
    Query(query): Query<HashMap<String, String>>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let recorder = state.recorder.clone();
    recorder.streams_opened.fetch_add(1, Ordering::SeqCst);

    let session = query.get("session_hash").cloned().unwrap_or_default();
    recorder.stream_sessions.lock().unwrap().push(session.clone());
    let mode = recorder
        .modes
        .lock()
        .unwrap()
        .get(&session)
        .cloned()
        .unwrap_or_default();

    let steps = (state.scenario.script)(&mode);
    let hold_open = state.scenario.hold_open;

    let stream = async_stream::stream! {
        let _guard = CloseGuard(recorder);

        for step in steps {
            match step {
                Step::Event(value) => yield Ok(Event::default().data(value.to_string())),
                Step::Raw(data) => yield Ok(Event::default().data(data)),
                Step::Delay(pause) => tokio::time::sleep(pause).await,
            }
        }

        if hold_open {
            futures::future::pending::<()>().await;
        }
    };

    // Keep-alive comments make a dropped client visible to the server
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_millis(25)))
}

/// Running mock service, shut down on drop
pub struct MockService {
    pub base_url: String,
    pub recorder: Arc<Recorder>,
    server: JoinHandle<()>,
}

impl MockService {
    pub async fn start(scenario: Scenario) -> Self {
        let recorder = Arc::new(Recorder::default());
        let state = MockState {
            scenario: Arc::new(scenario),
            recorder: recorder.clone(),
        };

        let app = Router::new()
            .route("/upload", post(upload))
            .route("/queue/join", post(join))
            .route("/queue/data", get(queue_data))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            recorder,
            server,
        }
    }
}

impl Drop for MockService {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub fn event(value: Value) -> Step {
    Step::Event(value)
}
