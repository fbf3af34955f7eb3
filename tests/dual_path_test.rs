//! Dual-path race behavior: winner-takes-all settlement, timeout, and
//! handoff slot hygiene. Timer-sensitive tests run under tokio's paused
//! clock, so the documented 30 s default is exercised without waiting.

use async_trait::async_trait;
use bytes::Bytes;
use geostream::{
    lock_sink, shared_sink, DualPathLoader, FeatureSink, HandoffSlot, IngestConfig, IngestError,
    LoadHooks, MemorySink, Result, StreamSource,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Source that delivers each fragment after a fixed delay.
struct ScriptedSource {
    delay: Duration,
    fragments: VecDeque<Bytes>,
}

impl ScriptedSource {
    fn new(delay_ms: u64, fragments: &[&str]) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            fragments: fragments
                .iter()
                .map(|f| Bytes::copy_from_slice(f.as_bytes()))
                .collect(),
        }
    }
}

#[async_trait]
impl StreamSource for ScriptedSource {
    async fn next_fragment(&mut self) -> Result<Option<Bytes>> {
        match self.fragments.pop_front() {
            Some(fragment) => {
                sleep(self.delay).await;
                Ok(Some(fragment))
            }
            None => Ok(None),
        }
    }

    fn total_size(&self) -> Option<u64> {
        None
    }
}

/// Source that never produces anything.
struct StalledSource;

#[async_trait]
impl StreamSource for StalledSource {
    async fn next_fragment(&mut self) -> Result<Option<Bytes>> {
        std::future::pending().await
    }

    fn total_size(&self) -> Option<u64> {
        None
    }
}

fn counting_hooks() -> (LoadHooks, Arc<AtomicU64>, Arc<AtomicU64>) {
    let completions = Arc::new(AtomicU64::new(0));
    let errors = Arc::new(AtomicU64::new(0));
    let (c, e) = (completions.clone(), errors.clone());
    let hooks = LoadHooks::new()
        .with_complete(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .with_error(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });
    (hooks, completions, errors)
}

#[tokio::test(start_paused = true)]
async fn test_stream_path_wins_and_resolves_once() {
    let sink = shared_sink(MemorySink::new());
    let loader = DualPathLoader::new(sink.clone(), IngestConfig::default());
    let (hooks, completions, errors) = counting_hooks();

    // Path (b) delivers three records at 10 ms; the engine payload lands at
    // 50 ms, after the race has settled.
    let slot = HandoffSlot::new();
    let late_producer = slot.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        late_producer.put(r#"{"late":true}"#.into());
    });

    let source = ScriptedSource::new(10, &[r#"{"a":1} {"b":2} {"c":3}"#]);
    let result = loader.load_racing(slot.clone(), source, hooks).await.unwrap();

    assert_eq!(result.total_records, 3);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
    assert_eq!(lock_sink(&sink).record_count(), 3);

    // Cleared at settlement, before the engine's late payload exists.
    assert!(slot.is_empty());

    // The loser's later arrival must not surface anywhere: no second
    // completion, no extra records.
    sleep(Duration::from_millis(100)).await;
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    assert_eq!(lock_sink(&sink).record_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_engine_path_wins_when_stream_is_slow() {
    let sink = shared_sink(MemorySink::new());
    let loader = DualPathLoader::new(sink.clone(), IngestConfig::default());
    let (hooks, completions, _errors) = counting_hooks();

    let slot = HandoffSlot::new();
    let producer = slot.clone();
    tokio::spawn(async move {
        sleep(Duration::from_millis(10)).await;
        producer.put(r#"{"type":"Feature","geometry":null,"properties":{}}"#.into());
    });

    let source = ScriptedSource::new(50, &[r#"{"slow":1}"#]);
    let result = loader.load_racing(slot, source, hooks).await.unwrap();

    assert_eq!(result.total_records, 1);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
    let sink = lock_sink(&sink);
    assert_eq!(sink.record_count(), 1);
    assert!(sink.records()[0].contains("Feature"));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_with_default_deadline() {
    let sink = shared_sink(MemorySink::new());
    let loader = DualPathLoader::new(sink, IngestConfig::default());
    let (hooks, completions, errors) = counting_hooks();

    let slot = HandoffSlot::new();
    let outcome = loader.load_racing(slot.clone(), StalledSource, hooks).await;

    match outcome {
        Err(IngestError::Timeout(limit)) => assert_eq!(limit, Duration::from_secs(30)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(completions.load(Ordering::SeqCst), 0);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert!(slot.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_configured_deadline_is_honored() {
    let sink = shared_sink(MemorySink::new());
    let loader = DualPathLoader::new(sink, IngestConfig::default())
        .with_settle_timeout(Duration::from_millis(20));
    let (hooks, _completions, errors) = counting_hooks();

    let slot = HandoffSlot::new();
    // The stream path would deliver, but only after the deadline.
    let source = ScriptedSource::new(500, &[r#"{"a":1}"#]);
    let outcome = loader.load_racing(slot.clone(), source, hooks).await;

    match outcome {
        Err(IngestError::Timeout(limit)) => assert_eq!(limit, Duration::from_millis(20)),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert!(slot.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stream_error_settles_the_operation() {
    struct FailingSource;

    #[async_trait]
    impl StreamSource for FailingSource {
        async fn next_fragment(&mut self) -> Result<Option<Bytes>> {
            Err(IngestError::Io(std::io::Error::other("connection reset")))
        }
        fn total_size(&self) -> Option<u64> {
            None
        }
    }

    let sink = shared_sink(MemorySink::new());
    let loader = DualPathLoader::new(sink, IngestConfig::default());
    let (hooks, completions, errors) = counting_hooks();

    let slot = HandoffSlot::new();
    let outcome = loader.load_racing(slot, FailingSource, hooks).await;

    assert!(outcome.err().map(|e| e.is_transport()).unwrap_or(false));
    assert_eq!(completions.load(Ordering::SeqCst), 0);
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}
