//! Incremental feature ingestion.
//!
//! A controller accumulates decoded fragments, drives the boundary scanner
//! over the buffer, and dispatches each complete top-level object to the
//! consumer before the document has finished arriving.

pub mod buffer;
pub mod controller;
pub mod scanner;

pub use buffer::RecordBuffer;
pub use controller::{
    IngestConfig, IngestController, LoadHooks, LoadResult, ProgressSample, DEFAULT_CHUNK_SIZE,
};
pub use scanner::find_record_boundary;
