//! Output sink: embed every chunk in batches, then upload in batches
//!
//! Embedding completes for the whole list before the first upload, so a
//! fatal embedding error leaves the store untouched. Upload batches are
//! independent; a failure part-way through keeps the earlier batches.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;

use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::providers::{ChunkStore, EmbeddingProvider};
use crate::types::Chunk;

use super::retry::RetryPolicy;

/// Counts from one sink run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Leading chunks dropped by the skip offset
    pub skipped: usize,
    /// Chunks that received an embedding
    pub embedded: usize,
    /// Chunks written to the store
    pub uploaded: usize,
}

/// Embeds and persists chunk lists
pub struct OutputSink {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn ChunkStore>,
    embed_batch_size: usize,
    embed_batch_delay: Duration,
    upload_batch_size: usize,
    retry: RetryPolicy,
    show_progress: bool,
}

impl OutputSink {
    /// Create a sink over the given providers
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn ChunkStore>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            embed_batch_size: config.embedding.batch_size.max(1),
            embed_batch_delay: config.embedding.batch_delay(),
            upload_batch_size: config.storage.batch_size.max(1),
            retry: RetryPolicy::from_config(&config.retry),
            show_progress: false,
        }
    }

    /// Draw progress bars on stderr
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Skip, embed, and upload a chunk list
    pub async fn process(&self, chunks: Vec<Chunk>, skip: usize) -> Result<SinkReport> {
        let total = chunks.len();
        let mut chunks = skip_leading(chunks, skip);
        let skipped = total - chunks.len();

        if skipped > 0 {
            tracing::info!("Skipping first {} chunks, resuming at chunk {}", skipped, skipped);
        }

        if chunks.is_empty() {
            tracing::info!("Nothing to embed");
            return Ok(SinkReport {
                skipped,
                ..SinkReport::default()
            });
        }

        tracing::info!(
            "Embedding {} chunks with {} ({} dimensions)",
            chunks.len(),
            self.embedder.name(),
            self.embedder.dimensions()
        );
        let embedded = self.embed_all(&mut chunks).await?;

        tracing::info!("Uploading {} chunks to {}", chunks.len(), self.store.name());
        let uploaded = self.upload(&chunks).await?;

        tracing::info!("Done. Uploaded {} chunks", uploaded);
        Ok(SinkReport {
            skipped,
            embedded,
            uploaded,
        })
    }

    /// Attach an embedding to every chunk, in order
    async fn embed_all(&self, chunks: &mut [Chunk]) -> Result<usize> {
        let progress = self.progress_bar(chunks.len(), "Embedding");
        let batch_count = chunks.len().div_ceil(self.embed_batch_size);
        let mut embedded = 0;

        for (batch_index, batch) in chunks.chunks_mut(self.embed_batch_size).enumerate() {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let label = format!("Embedding batch {}/{}", batch_index + 1, batch_count);

            let embedder = &self.embedder;
            let texts = texts.as_slice();
            let vectors = self
                .retry
                .run(&label, move || embedder.embed_batch(texts))
                .await?;

            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "{} returned {} vectors for {} texts",
                    label,
                    vectors.len(),
                    batch.len()
                )));
            }

            for (chunk, vector) in batch.iter_mut().zip(vectors) {
                chunk.embedding = vector;
            }
            embedded += batch.len();
            progress.inc(batch.len() as u64);

            if batch_index + 1 < batch_count && !self.embed_batch_delay.is_zero() {
                sleep(self.embed_batch_delay).await;
            }
        }

        progress.finish_and_clear();
        Ok(embedded)
    }

    /// Insert chunks in fixed-size batches
    async fn upload(&self, chunks: &[Chunk]) -> Result<usize> {
        let progress = self.progress_bar(chunks.len(), "Uploading");
        let mut uploaded = 0;

        for (batch_index, batch) in chunks.chunks(self.upload_batch_size).enumerate() {
            self.store.insert_batch(batch).await.map_err(|e| {
                tracing::error!(
                    "Upload batch {} failed after {} chunks were stored",
                    batch_index + 1,
                    uploaded
                );
                e
            })?;

            uploaded += batch.len();
            progress.inc(batch.len() as u64);
        }

        progress.finish_and_clear();
        Ok(uploaded)
    }

    fn progress_bar(&self, len: usize, label: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(len as u64);
        let style = ProgressStyle::with_template("{msg:>10} [{bar:40}] {pos}/{len} ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.set_message(label);
        bar
    }
}

/// Drop the first `skip` chunks, saturating at the list length
pub fn skip_leading(mut chunks: Vec<Chunk>, skip: usize) -> Vec<Chunk> {
    let skip = skip.min(chunks.len());
    chunks.drain(..skip);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Volume;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockEmbedder {
        calls: AtomicUsize,
        failures: Mutex<Vec<Error>>,
        short_by: usize,
    }

    impl MockEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures: Mutex::new(Vec::new()),
                short_by: 0,
            }
        }

        fn failing_with(errors: Vec<Error>) -> Self {
            Self {
                failures: Mutex::new(errors),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for MockEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = self.failures.lock().unwrap().pop() {
                return Err(err);
            }
            let count = texts.len().saturating_sub(self.short_by);
            Ok(texts.iter().take(count).map(|t| vec![t.len() as f32; 3]).collect())
        }

        fn dimensions(&self) -> usize {
            3
        }

        fn name(&self) -> &str {
            "mock-embedder"
        }
    }

    #[derive(Default)]
    struct MockStore {
        batches: Mutex<Vec<Vec<Chunk>>>,
        fail_on_batch: Option<usize>,
    }

    impl MockStore {
        fn stored(&self) -> Vec<Chunk> {
            self.batches.lock().unwrap().iter().flatten().cloned().collect()
        }
    }

    #[async_trait]
    impl ChunkStore for MockStore {
        async fn insert_batch(&self, chunks: &[Chunk]) -> Result<()> {
            let mut batches = self.batches.lock().unwrap();
            if self.fail_on_batch == Some(batches.len()) {
                return Err(Error::storage("409 Conflict"));
            }
            batches.push(chunks.to_vec());
            Ok(())
        }

        fn name(&self) -> &str {
            "mock-store"
        }
    }

    fn chunks(count: usize) -> Vec<Chunk> {
        (0..count)
            .map(|i| Chunk {
                content: format!("chunk {}", i),
                volume: Volume::Two,
                part: Some("Part H1 Structure".to_string()),
                section: Some(format!("H1D{}", i)),
                title: format!("Clause {}", i),
                applicable_classes: vec![1, 10],
                state_specific: false,
                embedding: Vec::new(),
            })
            .collect()
    }

    fn fast_config() -> IngestConfig {
        let mut config = IngestConfig::default();
        config.embedding.batch_delay_ms = 0;
        config.retry.backoff_step_secs = 0;
        config
    }

    fn rate_limited() -> Error {
        Error::EmbeddingStatus {
            status: 429,
            message: "RESOURCE_EXHAUSTED".to_string(),
        }
    }

    #[test]
    fn test_skip_leading_saturates() {
        assert_eq!(skip_leading(chunks(5), 2).len(), 3);
        assert_eq!(skip_leading(chunks(5), 2)[0].content, "chunk 2");
        assert!(skip_leading(chunks(5), 99).is_empty());
        assert_eq!(skip_leading(chunks(5), 0).len(), 5);
    }

    #[tokio::test]
    async fn test_skip_then_embed_and_upload() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = Arc::new(MockStore::default());
        let sink = OutputSink::new(embedder.clone(), store.clone(), &fast_config());

        let report = sink.process(chunks(40), 10).await.unwrap();
        assert_eq!(
            report,
            SinkReport {
                skipped: 10,
                embedded: 30,
                uploaded: 30
            }
        );

        // 30 chunks in batches of 20
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);

        let stored = store.stored();
        assert_eq!(stored.len(), 30);
        assert_eq!(stored[0].content, "chunk 10");
        assert_eq!(stored[29].content, "chunk 39");
        assert!(stored.iter().all(|c| c.embedding.len() == 3));
        assert_eq!(store.batches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_uploads_in_batches_of_fifty() {
        let store = Arc::new(MockStore::default());
        let sink = OutputSink::new(Arc::new(MockEmbedder::new()), store.clone(), &fast_config());

        sink.process(chunks(120), 0).await.unwrap();

        let sizes: Vec<usize> = store.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![50, 50, 20]);
    }

    #[tokio::test]
    async fn test_transient_error_is_retried() {
        let embedder = Arc::new(MockEmbedder::failing_with(vec![rate_limited()]));
        let store = Arc::new(MockStore::default());
        let sink = OutputSink::new(embedder.clone(), store.clone(), &fast_config());

        let report = sink.process(chunks(5), 0).await.unwrap();
        assert_eq!(report.uploaded, 5);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_before_upload() {
        let embedder = Arc::new(MockEmbedder::failing_with(vec![Error::EmbeddingStatus {
            status: 400,
            message: "API key not valid".to_string(),
        }]));
        let store = Arc::new(MockStore::default());
        let sink = OutputSink::new(embedder.clone(), store.clone(), &fast_config());

        let err = sink.process(chunks(5), 0).await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingStatus { status: 400, .. }));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
        assert!(store.stored().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_retries_propagate() {
        let failures = (0..5).map(|_| rate_limited()).collect();
        let embedder = Arc::new(MockEmbedder::failing_with(failures));
        let store = Arc::new(MockStore::default());
        let sink = OutputSink::new(embedder.clone(), store.clone(), &fast_config());

        assert!(sink.process(chunks(5), 0).await.is_err());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 5);
        assert!(store.stored().is_empty());
    }

    #[tokio::test]
    async fn test_vector_count_mismatch_is_fatal() {
        let embedder = Arc::new(MockEmbedder {
            short_by: 1,
            ..MockEmbedder::new()
        });
        let store = Arc::new(MockStore::default());
        let sink = OutputSink::new(embedder.clone(), store.clone(), &fast_config());

        let err = sink.process(chunks(5), 0).await.unwrap_err();
        assert!(err.to_string().contains("4 vectors for 5 texts"));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_earlier_batches() {
        let store = Arc::new(MockStore {
            fail_on_batch: Some(1),
            ..MockStore::default()
        });
        let sink = OutputSink::new(Arc::new(MockEmbedder::new()), store.clone(), &fast_config());

        let err = sink.process(chunks(80), 0).await.unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(store.stored().len(), 50);
    }

    #[tokio::test]
    async fn test_skip_past_end_does_nothing() {
        let embedder = Arc::new(MockEmbedder::new());
        let store = Arc::new(MockStore::default());
        let sink = OutputSink::new(embedder.clone(), store.clone(), &fast_config());

        let report = sink.process(chunks(3), 10).await.unwrap();
        assert_eq!(report.skipped, 3);
        assert_eq!(report.uploaded, 0);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_embedding_batches() {
        let mut config = IngestConfig::default();
        config.retry.backoff_step_secs = 0;
        let sink = OutputSink::new(
            Arc::new(MockEmbedder::new()),
            Arc::new(MockStore::default()),
            &config,
        );

        let started = tokio::time::Instant::now();
        sink.process(chunks(60), 0).await.unwrap();

        // three batches, two pauses of 500 ms
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1000));
        assert!(elapsed < Duration::from_millis(1500));
    }
}
