//! Submission orchestration
//!
//! The one entry point the UI layer talks to. A submission runs
//! token → upload → queue join → event stream, each stage strictly after the
//! previous one succeeded. Upload and join failures abort before the event
//! stream is opened.

use fta_common::config::ClientConfig;
use fta_common::{Error, Failure, JobOutcome, Mode, SessionToken};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::asset::AssetDescriptor;
use crate::endpoints::ServiceEndpoints;
use crate::error::SubmitError;
use crate::queue::{JobRequest, PipelineTarget, QueueJoiner};
use crate::status::{Stage, StatusSink, StatusUpdate};
use crate::stream::EventStreamInterpreter;
use crate::uploader::AssetUploader;

const USER_AGENT: &str = concat!("fta-client/", env!("CARGO_PKG_VERSION"));

/// Client for the queue-based inference service
///
/// Holds no per-submission state, so one instance can run any number of
/// submissions concurrently; each gets its own session token and stream.
#[derive(Debug, Clone)]
pub struct SubmissionClient {
    uploader: AssetUploader,
    joiner: QueueJoiner,
    events: EventStreamInterpreter,
}

impl SubmissionClient {
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        config.validate()?;

        // No overall request timeout here: it would cut off the event
        // stream. Upload and join set their own per-request timeouts.
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.service.connect_timeout())
            .build()
            .map_err(|e| Error::Internal(format!("HTTP client: {}", e)))?;

        let endpoints = ServiceEndpoints::new(&config.service.base_url);
        let request_timeout = config.service.request_timeout();
        let target = PipelineTarget {
            fn_index: config.service.fn_index,
            trigger_id: config.service.trigger_id,
        };

        Ok(Self {
            uploader: AssetUploader::new(http_client.clone(), endpoints.clone(), request_timeout),
            joiner: QueueJoiner::new(http_client.clone(), endpoints.clone(), target, request_timeout),
            events: EventStreamInterpreter::new(http_client, endpoints, config.stream.idle_timeout()),
        })
    }

    /// Submit the image at `asset_path` for processing in `mode`
    ///
    /// Dropping the returned future abandons the submission and closes any
    /// open event stream.
    pub async fn submit(
        &self,
        asset_path: &Path,
        mode: Mode,
        sink: impl StatusSink,
    ) -> Result<JobOutcome, SubmitError> {
        self.submit_with_cancel(asset_path, mode, sink, CancellationToken::new())
            .await
    }

    /// Like [`submit`](Self::submit), but can also be stopped through `cancel`
    ///
    /// Cancelling at any stage settles the submission with
    /// `FailureKind::Cancelled`; an in-flight upload or join request is
    /// dropped and no later stage is started.
    pub async fn submit_with_cancel(
        &self,
        asset_path: &Path,
        mode: Mode,
        sink: impl StatusSink,
        cancel: CancellationToken,
    ) -> Result<JobOutcome, SubmitError> {
        let session = SessionToken::generate();
        info!(session = %session, mode = %mode, asset = %asset_path.display(), "Starting submission");

        sink.on_status(StatusUpdate::new(&session, Stage::Uploading, "Uploading image..."));
        let uploaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(cancelled(&session, &sink, Stage::Uploading)),
            uploaded = async {
                let asset = AssetDescriptor::from_path(asset_path).await?;
                self.uploader.upload(&asset, &session).await
            } => uploaded,
        };
        let file_reference = match uploaded {
            Ok(reference) => reference,
            Err(e) => {
                warn!(session = %session, error = %e, "Upload failed");
                sink.on_status(StatusUpdate::new(
                    &session,
                    Stage::Failed,
                    format!("Error uploading image: {}", e),
                ));
                return Err(e.into());
            }
        };

        let job = JobRequest {
            file_reference,
            mode,
            session_token: session.clone(),
        };

        sink.on_status(StatusUpdate::new(&session, Stage::Joining, "Joining queue..."));
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(cancelled(&session, &sink, Stage::Joining)),
            joined = self.joiner.join(&job) => joined,
        };
        if let Err(e) = joined {
            warn!(session = %session, error = %e, "Queue join failed");
            sink.on_status(StatusUpdate::new(
                &session,
                Stage::Failed,
                format!("Error joining queue: {}", e),
            ));
            return Err(e.into());
        }

        let outcome = self.events.subscribe(&session, mode, &sink, &cancel).await;
        info!(
            session = %session,
            success = outcome.is_success(),
            "Submission finished"
        );
        Ok(outcome)
    }
}

fn cancelled(session: &SessionToken, sink: &impl StatusSink, stage: Stage) -> JobOutcome {
    info!(session = %session, ?stage, "Submission cancelled before the event stream opened");
    let failure = Failure::cancelled();
    sink.on_status(StatusUpdate::new(session, Stage::Failed, failure.message.clone()));
    JobOutcome::Failure(failure)
}
