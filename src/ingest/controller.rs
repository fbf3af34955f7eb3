//! Ingestion controller: accumulate fragments, slice out complete records,
//! dispatch them to the consumer, and drive a stream source to completion.
//!
//! One controller owns one accumulation buffer. Reads are strictly
//! sequential: a fragment is fully absorbed before the next read is issued.

use crate::engine::{lock_sink, FeatureSink, SharedSink};
use crate::error::{IngestError, Result};
use crate::ingest::buffer::RecordBuffer;
use crate::ingest::scanner::find_record_boundary;
use crate::source::StreamSource;
use serde::Serialize;
use std::sync::Arc;

/// Default chunk size for sliced reads (1 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Ingestion tuning knobs.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Read size for sliced sources, and the trim target for backpressure.
    pub chunk_size: usize,

    /// Buffer length above which the backpressure trim kicks in.
    /// Lossy when a single record exceeds this limit; see [`IngestController`].
    pub buffer_limit: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
    }
}

impl IngestConfig {
    /// Config with the conventional limit of twice the chunk size.
    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            buffer_limit: chunk_size * 2,
        }
    }
}

/// Ephemeral progress snapshot, emitted after each absorbed fragment.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProgressSample {
    pub loaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub percentage: Option<f64>,
    pub record_count: u64,
}

/// Terminal snapshot, emitted exactly once per successful operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoadResult {
    pub total_records: u64,
    pub total_bytes: Option<u64>,
    pub loaded_bytes: u64,
}

pub type ProgressHook = Arc<dyn Fn(ProgressSample) + Send + Sync>;
pub type CompleteHook = Arc<dyn Fn(&LoadResult) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&IngestError) + Send + Sync>;

/// Caller-supplied callback set. All slots optional; cloning shares the
/// underlying callbacks, which lets both loader paths report through one set.
#[derive(Clone, Default)]
pub struct LoadHooks {
    pub on_progress: Option<ProgressHook>,
    pub on_complete: Option<CompleteHook>,
    pub on_error: Option<ErrorHook>,
}

impl LoadHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, f: impl Fn(ProgressSample) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(f));
        self
    }

    pub fn with_complete(mut self, f: impl Fn(&LoadResult) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    pub fn with_error(mut self, f: impl Fn(&IngestError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn complete(&self, result: &LoadResult) {
        if let Some(f) = &self.on_complete {
            f(result);
        }
    }

    pub(crate) fn error(&self, err: &IngestError) {
        if let Some(f) = &self.on_error {
            f(err);
        }
    }
}

/// Drives the boundary scanner over the accumulation buffer and hands
/// complete records to the consumer.
///
/// # Backpressure trade-off
///
/// After each absorb, if the buffer exceeds `buffer_limit` it is trimmed to
/// its last `chunk_size` bytes. This is intentionally lossy: a record larger
/// than the limit, with no boundary inside the discarded prefix, is dropped.
/// The policy is only safe when individual records are smaller than
/// `chunk_size`; it caps memory instead of growing without bound on
/// pathological input.
pub struct IngestController<S: FeatureSink> {
    sink: SharedSink<S>,
    config: IngestConfig,
    hooks: LoadHooks,
    buffer: RecordBuffer,
    loaded_bytes: u64,
    total_bytes: Option<u64>,
    records: u64,
    rejected: u64,
}

impl<S: FeatureSink> IngestController<S> {
    pub fn new(sink: SharedSink<S>, config: IngestConfig) -> Self {
        Self {
            sink,
            config,
            hooks: LoadHooks::default(),
            buffer: RecordBuffer::new(),
            loaded_bytes: 0,
            total_bytes: None,
            records: 0,
            rejected: 0,
        }
    }

    pub fn with_hooks(mut self, hooks: LoadHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Records dispatched and accepted so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn loaded_bytes(&self) -> u64 {
        self.loaded_bytes
    }

    /// Absorb one fragment: decode, append, then repeatedly slice and
    /// dispatch every complete record found. Returns the number of records
    /// dispatched by this call.
    pub fn absorb(&mut self, fragment: &[u8]) -> usize {
        self.buffer.push_bytes(fragment);
        self.loaded_bytes += fragment.len() as u64;

        let mut dispatched = 0;
        while let Some(end) = find_record_boundary(self.buffer.as_str()) {
            let record = self.buffer.consume_through(end);
            self.dispatch(record.trim_start(), false);
            dispatched += 1;
        }

        if self.buffer.len() > self.config.buffer_limit {
            tracing::warn!(
                buffered = self.buffer.len(),
                limit = self.config.buffer_limit,
                "buffer over limit, trimming oldest bytes (lossy)"
            );
            self.buffer.trim_to_tail(self.config.chunk_size);
        }

        dispatched
    }

    /// Flush any remaining suffix as a final record and emit the terminal
    /// snapshot. The suffix may be structurally incomplete; the consumer is
    /// expected to tolerate or reject it, and a rejection stays non-fatal.
    pub fn finish(&mut self) -> LoadResult {
        let tail = self.buffer.take_remaining();
        let tail = tail.trim();
        if !tail.is_empty() {
            self.dispatch(tail, true);
        }
        LoadResult {
            total_records: self.records,
            total_bytes: self.total_bytes,
            loaded_bytes: self.loaded_bytes,
        }
    }

    /// Pull fragments from `source` to completion. Reads are issued one at a
    /// time; a source error terminates the operation immediately and is not
    /// retried here.
    pub async fn run<Src: StreamSource>(&mut self, mut source: Src) -> Result<LoadResult> {
        self.total_bytes = source.total_size();
        while let Some(fragment) = source.next_fragment().await? {
            if self.total_bytes.is_none() {
                self.total_bytes = source.total_size();
            }
            self.absorb(&fragment);
            self.emit_progress();
        }
        Ok(self.finish())
    }

    fn dispatch(&mut self, text: &str, is_final: bool) {
        let outcome = lock_sink(&self.sink).ingest_record(text, is_final);
        match outcome {
            Ok(()) => self.records += 1,
            Err(err) => {
                // ConsumerRejection: local, reported, never aborts the stream.
                self.rejected += 1;
                tracing::warn!(%err, is_final, "consumer rejected record");
                self.hooks.error(&IngestError::Consumer(err));
            }
        }
    }

    fn emit_progress(&self) {
        if let Some(f) = &self.hooks.on_progress {
            let percentage = self
                .total_bytes
                .filter(|t| *t > 0)
                .map(|t| self.loaded_bytes as f64 * 100.0 / t as f64);
            f(ProgressSample {
                loaded_bytes: self.loaded_bytes,
                total_bytes: self.total_bytes,
                percentage,
                record_count: self.records,
            });
        }
    }
}
