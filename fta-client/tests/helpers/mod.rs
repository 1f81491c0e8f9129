//! Shared test helpers for fta-client integration tests

pub mod mock_service;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fta_client::{ClientConfig, StatusUpdate};
use tempfile::TempDir;

/// PNG signature plus the start of an IHDR chunk
const PNG_BYTES: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

/// Write a small PNG-looking asset into a fresh temp dir
pub fn test_asset() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("look.png");
    std::fs::write(&path, PNG_BYTES).unwrap();
    (dir, path)
}

/// Client config pointing at a mock service
pub fn test_config(base_url: &str, idle_timeout_secs: u64) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.service.base_url = base_url.to_string();
    config.service.request_timeout_secs = 5;
    config.stream.idle_timeout_secs = idle_timeout_secs;
    config
}

/// Status sink that records every update
#[derive(Clone, Default)]
pub struct RecordingSink {
    updates: Arc<Mutex<Vec<StatusUpdate>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> impl Fn(StatusUpdate) + Send + Sync + 'static {
        let updates = self.updates.clone();
        move |update| updates.lock().unwrap().push(update)
    }

    pub fn updates(&self) -> Vec<StatusUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.updates().into_iter().map(|u| u.message).collect()
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
