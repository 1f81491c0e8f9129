//! Queue join
//!
//! Enqueues the processing job for an uploaded file. The acknowledgement
//! carries nothing the client needs; the job's real progress arrives on the
//! event stream bound to the same session.

use fta_common::{Mode, SessionToken};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::endpoints::ServiceEndpoints;
use crate::error::JoinError;
use crate::uploader::ServerFileReference;

/// One job to enqueue
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub file_reference: ServerFileReference,
    pub mode: Mode,
    pub session_token: SessionToken,
}

/// Pipeline step addressed by a join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineTarget {
    pub fn_index: u32,
    pub trigger_id: u32,
}

impl Default for PipelineTarget {
    fn default() -> Self {
        Self {
            fn_index: 0,
            trigger_id: 10,
        }
    }
}

/// Wire body of `POST /queue/join`
#[derive(Debug, Serialize)]
struct JoinEnvelope<'a> {
    data: (&'a ServerFileReference, Mode),
    event_data: Option<()>,
    fn_index: u32,
    trigger_id: u32,
    session_hash: &'a SessionToken,
}

#[derive(Debug, Default, Deserialize)]
struct JoinAck {
    #[serde(default)]
    event_id: Option<String>,
}

/// Submits jobs to the server queue
#[derive(Debug, Clone)]
pub struct QueueJoiner {
    http_client: reqwest::Client,
    endpoints: ServiceEndpoints,
    target: PipelineTarget,
    request_timeout: Duration,
}

impl QueueJoiner {
    pub fn new(
        http_client: reqwest::Client,
        endpoints: ServiceEndpoints,
        target: PipelineTarget,
        request_timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            endpoints,
            target,
            request_timeout,
        }
    }

    fn envelope<'a>(&self, job: &'a JobRequest) -> JoinEnvelope<'a> {
        JoinEnvelope {
            data: (&job.file_reference, job.mode),
            event_data: None,
            fn_index: self.target.fn_index,
            trigger_id: self.target.trigger_id,
            session_hash: &job.session_token,
        }
    }

    /// Enqueue `job`; success only means the server accepted it
    pub async fn join(&self, job: &JobRequest) -> Result<(), JoinError> {
        debug!(
            session = %job.session_token,
            mode = %job.mode,
            fn_index = self.target.fn_index,
            trigger_id = self.target.trigger_id,
            "Joining queue"
        );

        let response = self
            .http_client
            .post(self.endpoints.queue_join())
            .timeout(self.request_timeout)
            .json(&self.envelope(job))
            .send()
            .await
            .map_err(|e| JoinError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(JoinError::Rejected(status.as_u16(), error_text));
        }

        // Acknowledgement body is informational only
        let ack: JoinAck = response.json().await.unwrap_or_default();
        info!(
            session = %job.session_token,
            event_id = ack.event_id.as_deref().unwrap_or("-"),
            "Joined queue"
        );

        Ok(())
    }
}
