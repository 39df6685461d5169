//! # Indexing Pipeline Module
//!
//! ## Purpose
//! Background indexing pipeline: a single consumer drains an unbounded FIFO
//! queue of uploaded documents, extracts and tokenizes their text, and writes
//! the terms into the inverted index.
//!
//! ## Input/Output Specification
//! - **Input**: Document records queued by the upload flow
//! - **Output**: Populated inverted index
//! - **Workflow**: Fetch content → Extract text → Tokenize → Write terms → Done
//!
//! ## Failure Isolation
//! One document's failure is logged and never halts the worker, and terms
//! already indexed for other documents stay in place. A failed document may
//! leave some of its own terms behind; there is no per-document rollback.
//!
//! ## Shutdown
//! The worker observes a stop signal between dequeue attempts, finishes the
//! document in flight within a bounded grace period, and abandons anything
//! still queued.

use crate::config::IndexingConfig;
use crate::errors::{Result, SearchError};
use crate::index::InvertedIndex;
use crate::storage::{ContentStore, DocumentStore};
use crate::text_processing::TextProcessor;
use crate::Document;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// First position assigned to filename-derived tokens; subsequent tokens
/// decrement from here, keeping them clear of body offsets (>= 0) and of each
/// other's adjacency.
const FILENAME_POSITION_START: i32 = -100;

/// Outcome of a full index rebuild
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Documents enumerated from the store
    pub total: usize,
    /// Documents indexed successfully
    pub indexed: usize,
    /// Documents that failed and were skipped
    pub failed: usize,
}

/// Indexing pipeline with one background worker per instance.
pub struct IndexingService {
    index: Arc<InvertedIndex>,
    text_processor: Arc<TextProcessor>,
    documents: Arc<dyn DocumentStore>,
    content: Arc<dyn ContentStore>,
    queue_tx: mpsc::UnboundedSender<Document>,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown_grace: Duration,
}

impl IndexingService {
    /// Create the service and spawn its background worker
    pub fn new(
        index: Arc<InvertedIndex>,
        text_processor: Arc<TextProcessor>,
        documents: Arc<dyn DocumentStore>,
        content: Arc<dyn ContentStore>,
        config: IndexingConfig,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = tokio::spawn(run_worker(
            index.clone(),
            text_processor.clone(),
            content.clone(),
            queue_rx,
            shutdown_rx,
        ));

        Self {
            index,
            text_processor,
            documents,
            content,
            queue_tx,
            shutdown_tx,
            worker: Mutex::new(Some(worker)),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_seconds),
        }
    }

    /// Enqueue a document for background indexing. Never blocks.
    pub fn queue_document(&self, document: &Document) {
        if self.queue_tx.send(document.clone()).is_err() {
            tracing::error!(
                "Indexing worker is gone, dropping document {}",
                document.id
            );
            return;
        }
        tracing::info!("Document {} queued for indexing", document.id);
    }

    /// Index one document synchronously.
    ///
    /// Storage errors propagate to the caller; unsupported formats and empty
    /// extractions are logged and treated as a successful no-op.
    pub async fn index_document(&self, document: &Document) -> Result<()> {
        let content = self.content.open(&document.storage_path).await?;
        index_extracted(&self.index, &self.text_processor, document, &content)
    }

    /// Clear the index and re-index every known document.
    ///
    /// Per-document failures are logged and skipped independently; the rebuild
    /// itself only fails when the document store cannot be enumerated.
    pub async fn rebuild_index(&self) -> Result<RebuildReport> {
        tracing::info!("Rebuilding index");
        self.index.clear();

        let documents = self.documents.get_all().await?;
        let total = documents.len();
        let mut indexed = 0;
        let mut failed = 0;

        for document in &documents {
            match self.index_document(document).await {
                Ok(()) => indexed += 1,
                Err(e) => {
                    failed += 1;
                    tracing::error!("Error reindexing document {}: {}", document.id, e);
                }
            }
        }

        self.index.build_index();
        tracing::info!(
            "Index rebuild completed: {}/{} documents indexed, {} failed",
            indexed,
            total,
            failed
        );

        Ok(RebuildReport {
            total,
            indexed,
            failed,
        })
    }

    /// Stop the worker, draining in-flight work within the grace period.
    ///
    /// Documents still queued are abandoned; the index stays usable for reads.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down indexing pipeline");
        let _ = self.shutdown_tx.send(true);

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            match tokio::time::timeout(self.shutdown_grace, handle).await {
                Ok(_) => tracing::info!("Indexing worker drained and stopped"),
                Err(_) => tracing::warn!(
                    "Indexing worker did not stop within {:?}, abandoning",
                    self.shutdown_grace
                ),
            }
        }
    }
}

/// Background worker loop: one signal per enqueue, stop signal observed
/// between dequeues.
async fn run_worker(
    index: Arc<InvertedIndex>,
    text_processor: Arc<TextProcessor>,
    content: Arc<dyn ContentStore>,
    mut queue: mpsc::UnboundedReceiver<Document>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("Background indexing worker started");

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            next = queue.recv() => {
                let Some(document) = next else { break };
                tracing::info!("Processing document {} from queue", document.id);

                match content.open(&document.storage_path).await {
                    Ok(bytes) => {
                        if let Err(e) =
                            index_extracted(&index, &text_processor, &document, &bytes)
                        {
                            tracing::error!("Error indexing document {}: {}", document.id, e);
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            "Error fetching content for document {}: {}",
                            document.id,
                            e
                        );
                    }
                }
            }
        }
    }

    tracing::info!("Background indexing worker stopped");
}

/// Extract, tokenize and write one document's terms into the index.
///
/// Body tokens keep their pre-stop-word positions; filename tokens (extension
/// stripped, plain normalization) go in at descending negative positions.
fn index_extracted(
    index: &InvertedIndex,
    text_processor: &TextProcessor,
    document: &Document,
    content: &[u8],
) -> Result<()> {
    let text = match text_processor.extract_text(content, &document.file_extension) {
        Ok(text) => text,
        Err(SearchError::UnsupportedFormat { extension }) => {
            tracing::warn!(
                "No extractor for '{}', skipping document {}",
                extension,
                document.id
            );
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    if !TextProcessor::is_indexable(&text) {
        tracing::warn!("Extracted text is empty for document {}", document.id);
        return Ok(());
    }

    let tokens = text_processor.tokenize_with_positions(&text);
    tracing::debug!(
        "Document {} tokenized into {} tokens",
        document.id,
        tokens.len()
    );

    for (term, position) in &tokens {
        index.add_term(term, document.id, clamp_position(*position));
    }

    let stem = Path::new(&document.file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut position = FILENAME_POSITION_START;
    for term in text_processor.normalize(&stem) {
        index.add_term(&term, document.id, position);
        position -= 1;
    }

    tracing::info!("Successfully indexed document {}", document.id);
    Ok(())
}

/// Body positions saturate instead of wrapping for absurdly long documents
fn clamp_position(position: usize) -> i32 {
    i32::try_from(position).unwrap_or(i32::MAX)
}
