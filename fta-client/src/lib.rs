//! fta-client - queue-based inference submission client
//!
//! Submits one image to the remote service, joins its processing queue and
//! follows the server-push event stream until a terminal event arrives.
//!
//! ```rust,ignore
//! let client = SubmissionClient::new(ClientConfig::default())?;
//! let outcome = client
//!     .submit(Path::new("look.jpg"), Mode::Recommendation, |update: StatusUpdate| {
//!         println!("{}", update.message)
//!     })
//!     .await?;
//! ```

pub mod asset;
pub mod endpoints;
pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod status;
pub mod stream;
pub mod uploader;

pub use crate::asset::AssetDescriptor;
pub use crate::endpoints::ServiceEndpoints;
pub use crate::error::{JoinError, StreamError, SubmitError, UploadError};
pub use crate::orchestrator::SubmissionClient;
pub use crate::status::{Stage, StatusSink, StatusUpdate};
pub use crate::uploader::ServerFileReference;

pub use fta_common::config::ClientConfig;
pub use fta_common::{Failure, FailureKind, JobOutcome, Mode, ResultPayload, SessionToken};
