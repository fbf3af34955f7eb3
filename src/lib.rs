//! Streaming geospatial feature ingestion.
//!
//! Incrementally loads a large GeoJSON-style document from a URL or a local
//! file and forwards individually complete feature records to a consumer
//! before the whole document has arrived, under a bounded memory budget.
//!
//! # Architecture
//!
//! ```text
//! +---------------+     +---------------------+     +--------------+
//! | Stream Source | --> | Ingestion Controller| --> | FeatureSink  |
//! | (file / http) |     | (buffer + scanner)  |     | (engine)     |
//! +---------------+     +---------------------+     +--------------+
//!
//! DualPathLoader races two such pipelines for one URL: the engine's own
//! retrieval (via a per-request HandoffSlot) against our HTTP stream.
//! DeferredAttachment holds a payload until the consumer handle exists.
//! ```
//!
//! Everything downstream of the sink - rendering, spatial indexing,
//! projection - is an external collaborator reached only through
//! [`engine::FeatureSink`].

pub mod attach;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod loader;
pub mod source;

pub use attach::{AttachState, DeferredAttachment, PreparedPayload, SinkCell};
pub use engine::{lock_sink, shared_sink, EngineFetch, FeatureSink, MemorySink, SharedSink};
pub use error::{IngestError, Result, SinkError};
pub use ingest::{
    find_record_boundary, IngestConfig, IngestController, LoadHooks, LoadResult, ProgressSample,
    DEFAULT_CHUNK_SIZE,
};
pub use loader::{DualPathLoader, HandoffSlot, DEFAULT_SETTLE_TIMEOUT};
pub use source::{FileSource, HttpSource, StreamSource};
