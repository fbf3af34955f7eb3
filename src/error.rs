//! Error taxonomy for the ingestion pipeline.
//!
//! Transport and timeout failures are terminal and single-fire; a consumer
//! rejecting one record is local and never aborts the stream.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

/// Pipeline-level errors.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Retrieval failure on a local source. Terminal.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Retrieval failure on a network source. Terminal.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Neither loader path settled before the deadline.
    #[error("load timed out after {0:?}")]
    Timeout(Duration),

    /// The consumer raised while ingesting a single record.
    /// Reported per-record; does not terminate the stream.
    #[error("consumer rejected record: {0}")]
    Consumer(#[from] SinkError),

    /// A submitted payload could not be normalized to JSON.
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl IngestError {
    /// True for the TransportError class (retrieval failures).
    pub fn is_transport(&self) -> bool {
        matches!(self, IngestError::Io(_) | IngestError::Http(_))
    }
}

/// Error returned by a [`FeatureSink`](crate::engine::FeatureSink) when it
/// rejects a record or a style update.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SinkError {
    pub message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
