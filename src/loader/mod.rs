//! Dual-path document loader.
//!
//! Two independent retrieval paths race for the same URL: the engine's own
//! retrieval (handing its payload over through a per-request [`HandoffSlot`])
//! and this pipeline's own stream source. The first path to settle wins; the
//! loser is cancelled. Exactly one completion or terminal error is reported
//! per operation.

pub mod handoff;
pub mod race;

pub use handoff::HandoffSlot;
pub use race::first_settled;

use crate::engine::{EngineFetch, FeatureSink, SharedSink};
use crate::error::Result;
use crate::ingest::{IngestConfig, IngestController, LoadHooks, LoadResult};
use crate::source::{FileSource, HttpSource, StreamSource};
use futures::future::BoxFuture;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Default deadline for a load operation to settle.
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Composes two ingestion pipelines racing for one URL.
pub struct DualPathLoader<S: FeatureSink + Send + 'static> {
    sink: SharedSink<S>,
    config: IngestConfig,
    engine_fetch: Option<Arc<dyn EngineFetch>>,
    settle_timeout: Duration,
}

impl<S: FeatureSink + Send + 'static> DualPathLoader<S> {
    pub fn new(sink: SharedSink<S>, config: IngestConfig) -> Self {
        Self {
            sink,
            config,
            engine_fetch: None,
            settle_timeout: DEFAULT_SETTLE_TIMEOUT,
        }
    }

    /// Enable the engine-side retrieval path.
    pub fn with_engine_fetch(mut self, fetch: Arc<dyn EngineFetch>) -> Self {
        self.engine_fetch = Some(fetch);
        self
    }

    pub fn with_settle_timeout(mut self, timeout: Duration) -> Self {
        self.settle_timeout = timeout;
        self
    }

    /// Load a URL, racing the engine's retrieval against our own stream.
    /// Completes exactly once with a [`LoadResult`] or a terminal error.
    pub async fn load_from_url(&self, url: &str, hooks: LoadHooks) -> Result<LoadResult> {
        let slot = HandoffSlot::new();
        if let Some(fetch) = &self.engine_fetch {
            fetch.begin_fetch(url, slot.clone());
        }
        self.load_racing(slot, HttpSource::new(url), hooks).await
    }

    /// Load a local file. Single path, no race.
    pub async fn load_from_file(
        &self,
        path: impl AsRef<Path>,
        hooks: LoadHooks,
    ) -> Result<LoadResult> {
        match FileSource::open(path, self.config.chunk_size).await {
            Ok(source) => self.load_single(source, hooks).await,
            Err(err) => {
                hooks.error(&err);
                Err(err)
            }
        }
    }

    /// Race the slot-fed path against `source`. The slot is cleared
    /// unconditionally once the operation settles or times out.
    pub async fn load_racing<Src>(
        &self,
        slot: HandoffSlot,
        source: Src,
        hooks: LoadHooks,
    ) -> Result<LoadResult>
    where
        Src: StreamSource + 'static,
    {
        // Path (a): wait for the engine-retrieved payload, then feed it
        // through a controller of its own. Pends forever if the engine never
        // delivers; the settle deadline bounds it.
        let path_a: BoxFuture<'static, Result<LoadResult>> = {
            let slot = slot.clone();
            let mut ctrl = IngestController::new(self.sink.clone(), self.config.clone())
                .with_hooks(hooks.clone());
            Box::pin(async move {
                let payload = slot.wait_take().await;
                ctrl.absorb(payload.as_bytes());
                Ok(ctrl.finish())
            })
        };

        // Path (b): our own streaming retrieval.
        let path_b: BoxFuture<'static, Result<LoadResult>> = {
            let mut ctrl = IngestController::new(self.sink.clone(), self.config.clone())
                .with_hooks(hooks.clone());
            Box::pin(async move { ctrl.run(source).await })
        };

        let outcome = first_settled(self.settle_timeout, vec![path_a, path_b]).await;
        slot.clear();

        match &outcome {
            Ok(result) => hooks.complete(result),
            Err(err) => hooks.error(err),
        }
        outcome
    }

    /// Run a single source to completion and report through `hooks`.
    pub async fn load_single<Src: StreamSource>(
        &self,
        source: Src,
        hooks: LoadHooks,
    ) -> Result<LoadResult> {
        let mut ctrl =
            IngestController::new(self.sink.clone(), self.config.clone()).with_hooks(hooks.clone());
        let outcome = ctrl.run(source).await;
        match &outcome {
            Ok(result) => hooks.complete(result),
            Err(err) => hooks.error(err),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{lock_sink, shared_sink, MemorySink};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source that never yields; stands in for a stalled network.
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

    struct ImmediateFetch;

    impl EngineFetch for ImmediateFetch {
        fn begin_fetch(&self, _url: &str, slot: HandoffSlot) {
            slot.put(r#"{"type":"Feature","geometry":null,"properties":{}}"#.into());
        }
    }

    #[tokio::test]
    async fn test_engine_path_wins_over_stalled_stream() {
        let sink = shared_sink(MemorySink::new());
        let completions = Arc::new(AtomicUsize::new(0));
        let completions2 = completions.clone();
        let hooks = LoadHooks::new().with_complete(move |_| {
            completions2.fetch_add(1, Ordering::SeqCst);
        });

        let loader = DualPathLoader::new(sink.clone(), IngestConfig::default());
        let slot = HandoffSlot::new();
        ImmediateFetch.begin_fetch("http://example/features.geojson", slot.clone());

        let result = loader
            .load_racing(slot.clone(), StalledSource, hooks)
            .await
            .unwrap();

        assert_eq!(result.total_records, 1);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert!(slot.is_empty());
        assert_eq!(lock_sink(&sink).record_count(), 1);
    }
}
