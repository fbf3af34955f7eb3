//! Consumer-side interface.
//!
//! The rendering engine downstream of this pipeline is an external
//! collaborator; everything it exposes to us is the narrow surface here.
//! Records are handed over as text spans, exactly once, in discovery order.

use crate::error::SinkError;
use crate::loader::HandoffSlot;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

/// Consumer of discovered feature records.
///
/// `ingest_record` may reject malformed input; the controller catches the
/// rejection per-record and keeps streaming.
pub trait FeatureSink {
    /// Hand one record to the consumer. `is_final` marks the forced flush of
    /// a trailing fragment at end of stream, which may not be structurally
    /// complete.
    fn ingest_record(&mut self, text: &str, is_final: bool) -> Result<(), SinkError>;

    /// Number of records the consumer has accepted so far.
    fn record_count(&self) -> u64;

    /// Apply a style record to the consumer's layer.
    fn apply_style(&mut self, style: &Value) -> Result<(), SinkError>;
}

/// Shared handle to a sink. Critical sections are short (one record hand-off)
/// and never held across an await, so a std mutex is sufficient.
pub type SharedSink<S> = Arc<Mutex<S>>;

/// Wrap a sink for use by controllers and loaders.
pub fn shared_sink<S: FeatureSink>(sink: S) -> SharedSink<S> {
    Arc::new(Mutex::new(sink))
}

/// Lock a shared sink, recovering from poisoning instead of panicking.
/// A sink that panicked mid-record left at worst a partially applied record;
/// the pipeline's counters stay consistent either way.
pub fn lock_sink<S>(sink: &SharedSink<S>) -> MutexGuard<'_, S> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Engine-side retrieval capability.
///
/// When the engine can fetch a URL on its own, the loader hands it the URL
/// and a per-request [`HandoffSlot`]; the engine writes the payload into the
/// slot when the retrieval completes. Fire-and-forget: failures on the engine
/// side simply leave the slot empty.
pub trait EngineFetch: Send + Sync {
    fn begin_fetch(&self, url: &str, slot: HandoffSlot);
}

/// In-memory reference sink.
///
/// Validates each record as JSON (rejecting malformed input the way a real
/// engine would), keeps the record text, and remembers the last style applied.
/// Used by the CLI and as the test consumer.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<String>,
    style: Option<Value>,
    rejected: u64,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[String] {
        &self.records
    }

    pub fn style(&self) -> Option<&Value> {
        self.style.as_ref()
    }

    /// Records rejected as malformed.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

impl FeatureSink for MemorySink {
    fn ingest_record(&mut self, text: &str, _is_final: bool) -> Result<(), SinkError> {
        if let Err(e) = serde_json::from_str::<Value>(text) {
            self.rejected += 1;
            return Err(SinkError::new(format!("malformed feature: {e}")));
        }
        self.records.push(text.to_string());
        Ok(())
    }

    fn record_count(&self) -> u64 {
        self.records.len() as u64
    }

    fn apply_style(&mut self, style: &Value) -> Result<(), SinkError> {
        self.style = Some(style.clone());
        Ok(())
    }
}
