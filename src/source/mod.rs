//! Stream sources: ordered fragments plus an optional total-size hint.
//!
//! A source is read strictly sequentially by its controller; implementations
//! never see overlapping `next_fragment` calls.

pub mod file;
pub mod http;

pub use file::FileSource;
pub use http::HttpSource;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// An ordered byte-fragment source.
#[async_trait]
pub trait StreamSource: Send {
    /// Next fragment, or `None` at end of stream. Fragment sizes are
    /// arbitrary; callers must not assume any alignment.
    async fn next_fragment(&mut self) -> Result<Option<Bytes>>;

    /// Total byte size, when the source knows it. May become available only
    /// after the first read (e.g. HTTP content length).
    fn total_size(&self) -> Option<u64>;
}
