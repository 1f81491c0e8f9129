//! # FTA Common Library
//!
//! Shared code for the FTA inference client including:
//! - Error types
//! - Client configuration loading (TOML bootstrap + resolution order)
//! - Session tokens used to correlate upload, queue join and event stream
//! - Server push-event vocabulary (StreamEvent enum)
//! - Processing modes and job outcome types

pub mod config;
pub mod error;
pub mod events;
pub mod outcome;
pub mod session;

pub use error::{Error, Result};
pub use events::StreamEvent;
pub use outcome::{Failure, FailureKind, JobOutcome, Mode, ResultPayload};
pub use session::SessionToken;
