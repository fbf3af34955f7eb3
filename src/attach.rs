//! Deferred attachment: accept a payload before the consumer exists.
//!
//! A load may be requested before the engine has created the consumer
//! handle. The latest submitted payload is held (a queue of one, later
//! submissions overwrite earlier ones) and flushed exactly once when the
//! handle becomes available. Readiness is an explicit signal from the engine
//! side, not a poll.

use crate::engine::{lock_sink, FeatureSink, SharedSink};
use crate::error::Result;
use crate::ingest::{IngestConfig, IngestController, LoadHooks};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Attachment lifecycle. `Applied` is terminal for a consumer lifetime:
/// later submissions are deliberate no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Unloaded,
    Pending,
    Applied,
}

/// Shared cell the engine fills once the consumer handle exists.
pub struct SinkCell<S: FeatureSink> {
    inner: Arc<Mutex<Option<SharedSink<S>>>>,
    ready: Arc<watch::Sender<bool>>,
}

impl<S: FeatureSink> Clone for SinkCell<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            ready: self.ready.clone(),
        }
    }
}

impl<S: FeatureSink> Default for SinkCell<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FeatureSink> SinkCell<S> {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            inner: Arc::new(Mutex::new(None)),
            ready: Arc::new(ready),
        }
    }

    /// Engine side: the consumer handle now exists. Wakes any waiter.
    pub fn install(&self, sink: SharedSink<S>) {
        *self.inner.lock().unwrap_or_else(|p| p.into_inner()) = Some(sink);
        self.ready.send_replace(true);
    }

    pub fn get(&self) -> Option<SharedSink<S>> {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }

    /// Wait for the consumer handle.
    pub async fn wait_ready(&self) -> SharedSink<S> {
        let mut rx = self.ready.subscribe();
        loop {
            if let Some(sink) = self.get() {
                return sink;
            }
            // The sender lives in self, so this cannot error out.
            let _ = rx.changed().await;
        }
    }
}

/// Geographic extent of a payload, in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// A payload normalized on submission: structured for metadata queries,
/// canonical text for the ingestion engine.
#[derive(Debug, Clone)]
pub struct PreparedPayload {
    value: Value,
    text: String,
}

impl PreparedPayload {
    /// Parse and canonicalize. Fails on payloads that are not valid JSON.
    pub fn parse(payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload)?;
        let text = serde_json::to_string(&value)?;
        Ok(Self { value, text })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Canonical text form fed to the ingestion controller.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of features: collection length, or 1 for a bare object.
    pub fn feature_count(&self) -> usize {
        self.value
            .get("features")
            .and_then(Value::as_array)
            .map(|features| features.len())
            .unwrap_or(1)
    }

    /// Extent over every coordinate position in the payload, or `None` when
    /// it contains no positions.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut bounds = None;
        collect_bounds(&self.value, &mut bounds);
        bounds
    }
}

fn collect_bounds(value: &Value, bounds: &mut Option<Bounds>) {
    let Value::Object(map) = value else { return };
    if let Some(coords) = map.get("coordinates") {
        collect_positions(coords, bounds);
    }
    if let Some(geometry) = map.get("geometry") {
        collect_bounds(geometry, bounds);
    }
    for key in ["geometries", "features"] {
        if let Some(items) = map.get(key).and_then(Value::as_array) {
            for item in items {
                collect_bounds(item, bounds);
            }
        }
    }
}

fn collect_positions(value: &Value, bounds: &mut Option<Bounds>) {
    let Some(array) = value.as_array() else { return };
    // A position is an array starting with two numbers; anything else is a
    // nesting level.
    if array.len() >= 2 {
        if let (Some(x), Some(y)) = (array[0].as_f64(), array[1].as_f64()) {
            let b = bounds.get_or_insert(Bounds {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
            });
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
            return;
        }
    }
    for item in array {
        collect_positions(item, bounds);
    }
}

/// Holds at most one normalized payload until the consumer handle exists,
/// then flushes it exactly once.
pub struct DeferredAttachment<S: FeatureSink> {
    cell: SinkCell<S>,
    config: IngestConfig,
    hooks: LoadHooks,
    state: AttachState,
    pending: Option<PreparedPayload>,
    style: Option<Value>,
}

impl<S: FeatureSink> DeferredAttachment<S> {
    pub fn new(cell: SinkCell<S>, config: IngestConfig) -> Self {
        Self {
            cell,
            config,
            hooks: LoadHooks::default(),
            state: AttachState::Unloaded,
            pending: None,
            style: None,
        }
    }

    pub fn with_hooks(mut self, hooks: LoadHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn state(&self) -> AttachState {
        self.state
    }

    /// Store a style update. Applied together with the payload, or
    /// immediately when the payload was already applied.
    pub fn set_style(&mut self, style: Value) -> Result<()> {
        if self.state == AttachState::Applied {
            if let Some(sink) = self.cell.get() {
                lock_sink(&sink).apply_style(&style)?;
            }
        }
        self.style = Some(style);
        Ok(())
    }

    /// Normalize `payload` and either apply it now (consumer ready) or hold
    /// it as the sole pending payload, overwriting any earlier one.
    ///
    /// Once a payload has been applied for this consumer instance, further
    /// submissions are no-ops.
    pub fn submit(&mut self, payload: &str) -> Result<AttachState> {
        if self.state == AttachState::Applied {
            tracing::debug!("payload already applied for this consumer, ignoring submit");
            return Ok(self.state);
        }
        let prepared = PreparedPayload::parse(payload)?;
        match self.cell.get() {
            Some(sink) => self.apply(&sink, prepared)?,
            None => {
                if self.pending.is_some() {
                    tracing::debug!("replacing pending payload with newer submission");
                }
                self.pending = Some(prepared);
                self.state = AttachState::Pending;
            }
        }
        Ok(self.state)
    }

    /// Wait for the consumer handle and flush the pending payload. Resolves
    /// immediately when there is nothing pending.
    pub async fn flush_when_ready(&mut self) -> Result<AttachState> {
        if self.state != AttachState::Pending {
            return Ok(self.state);
        }
        let sink = self.cell.wait_ready().await;
        if let Some(prepared) = self.pending.take() {
            self.apply(&sink, prepared)?;
        }
        Ok(self.state)
    }

    fn apply(&mut self, sink: &SharedSink<S>, prepared: PreparedPayload) -> Result<()> {
        let mut ctrl =
            IngestController::new(sink.clone(), self.config.clone()).with_hooks(self.hooks.clone());
        ctrl.absorb(prepared.text().as_bytes());
        ctrl.finish();
        if let Some(style) = &self.style {
            lock_sink(sink).apply_style(style)?;
        }
        self.state = AttachState::Applied;
        Ok(())
    }
}
