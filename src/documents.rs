//! # Document Service Module
//!
//! ## Purpose
//! Upload and download flows: duplicate detection, content persistence,
//! metadata persistence and hand-off to the indexing pipeline.
//!
//! ## Input/Output Specification
//! - **Input**: Raw uploaded bytes plus the original file name
//! - **Output**: `UploadOutcome` describing acceptance or rejection; raw bytes
//!   and metadata on download
//! - **Workflow**: Hash → Duplicate check → Store blob → Persist metadata →
//!   Queue indexing
//!
//! ## Consistency
//! Metadata is written after the blob; when the metadata write fails the blob
//! is deleted again so no orphaned content survives a failed upload.

use crate::errors::{Result, SearchError};
use crate::indexing::IndexingService;
use crate::storage::{ContentStore, DocumentStore};
use crate::utils::TextUtils;
use crate::{Document, DocumentId, UploadOutcome};
use std::sync::Arc;

/// Upload/download orchestration over the storage collaborators.
pub struct DocumentService {
    documents: Arc<dyn DocumentStore>,
    content: Arc<dyn ContentStore>,
    indexing: Arc<IndexingService>,
}

impl DocumentService {
    /// Create a new document service
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        content: Arc<dyn ContentStore>,
        indexing: Arc<IndexingService>,
    ) -> Self {
        Self {
            documents,
            content,
            indexing,
        }
    }

    /// Accept an upload, rejecting duplicates by file name or content hash.
    ///
    /// On acceptance the document is stored, persisted and queued for
    /// background indexing; the outcome message is safe to show to clients.
    pub async fn upload(&self, content: &[u8], file_name: &str) -> Result<UploadOutcome> {
        if file_name.trim().is_empty() {
            return Ok(UploadOutcome {
                document_id: None,
                file_name: None,
                accepted: false,
                message: "File name must not be empty".to_string(),
            });
        }

        if self.documents.exists_by_name(file_name).await? {
            tracing::info!("Rejected upload of '{}': name already exists", file_name);
            return Ok(UploadOutcome {
                document_id: None,
                file_name: Some(file_name.to_string()),
                accepted: false,
                message: format!("A file named '{}' already exists", file_name),
            });
        }

        let hash = TextUtils::hash_bytes(content);
        if self.documents.exists_by_hash(&hash).await? {
            tracing::info!(
                "Rejected upload of '{}': identical content already stored",
                file_name
            );
            return Ok(UploadOutcome {
                document_id: None,
                file_name: Some(file_name.to_string()),
                accepted: false,
                message: "A file with identical content already exists".to_string(),
            });
        }

        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        let locator = self.content.store(content, file_name).await?;
        let document = Document::new(file_name, extension, locator, content.len() as u64, hash);

        if let Err(e) = self.documents.save(&document).await {
            tracing::error!("Error persisting metadata for '{}': {}", file_name, e);
            // Remove the blob so a retried upload is not rejected as a
            // content-hash duplicate of a half-written record
            if let Err(cleanup) = self.content.delete(&document.storage_path).await {
                tracing::error!(
                    "Error cleaning up stored content {}: {}",
                    document.storage_path,
                    cleanup
                );
            }
            return Err(e);
        }

        self.indexing.queue_document(&document);

        tracing::info!(
            "Accepted upload '{}' ({}) as document {}",
            file_name,
            TextUtils::format_bytes(document.content_length),
            document.id
        );

        Ok(UploadOutcome {
            document_id: Some(document.id),
            file_name: Some(document.file_name),
            accepted: true,
            message: "File uploaded and queued for indexing".to_string(),
        })
    }

    /// Fetch one document's metadata and raw content.
    pub async fn download(&self, id: DocumentId) -> Result<(Document, Vec<u8>)> {
        let document = self
            .documents
            .get(id)
            .await?
            .ok_or(SearchError::DocumentNotFound { id })?;

        let content = self.content.open(&document.storage_path).await?;
        Ok((document, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexingConfig;
    use crate::index::InvertedIndex;
    use crate::storage::{FileContentStore, InMemoryDocumentStore};
    use crate::text_processing::TextProcessor;

    struct Fixture {
        service: DocumentService,
        documents: Arc<InMemoryDocumentStore>,
        index: Arc<InvertedIndex>,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(InvertedIndex::new());
        let documents = Arc::new(InMemoryDocumentStore::new());
        let content = Arc::new(
            FileContentStore::new(dir.path().to_path_buf(), false)
                .await
                .unwrap(),
        );
        let indexing = Arc::new(IndexingService::new(
            index.clone(),
            Arc::new(TextProcessor::new().unwrap()),
            documents.clone(),
            content.clone(),
            IndexingConfig::default(),
        ));
        let service = DocumentService::new(documents.clone(), content, indexing);

        Fixture {
            service,
            documents,
            index,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn upload_stores_and_queues_document() {
        let f = fixture().await;

        let outcome = f.service.upload(b"hello indexed world", "greeting.txt").await.unwrap();
        assert!(outcome.accepted);
        let id = outcome.document_id.unwrap();

        let stored = f.documents.get(id).await.unwrap().unwrap();
        assert_eq!(stored.file_name, "greeting.txt");
        assert_eq!(stored.file_extension, "txt");
        assert_eq!(stored.content_length, 19);

        // The background worker eventually indexes the upload
        for _ in 0..100 {
            if f.index.contains_term("indexed") {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("uploaded document was never indexed");
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let f = fixture().await;
        f.service.upload(b"first body", "report.txt").await.unwrap();

        let outcome = f.service.upload(b"different body", "report.txt").await.unwrap();
        assert!(!outcome.accepted);
        assert!(outcome.document_id.is_none());
        assert!(outcome.message.contains("report.txt"));
    }

    #[tokio::test]
    async fn duplicate_content_is_rejected() {
        let f = fixture().await;
        f.service.upload(b"same bytes", "original.txt").await.unwrap();

        let outcome = f.service.upload(b"same bytes", "copy.txt").await.unwrap();
        assert!(!outcome.accepted);
        assert!(outcome.message.contains("identical content"));
    }

    #[tokio::test]
    async fn empty_file_name_is_rejected() {
        let f = fixture().await;
        let outcome = f.service.upload(b"body", "  ").await.unwrap();
        assert!(!outcome.accepted);
    }

    #[tokio::test]
    async fn extension_is_lowercased_without_dot() {
        let f = fixture().await;
        let outcome = f.service.upload(b"body", "REPORT.TXT").await.unwrap();
        let stored = f
            .documents
            .get(outcome.document_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.file_extension, "txt");
    }

    #[tokio::test]
    async fn download_round_trip() {
        let f = fixture().await;
        let outcome = f.service.upload(b"round trip body", "data.txt").await.unwrap();

        let (document, content) = f
            .service
            .download(outcome.document_id.unwrap())
            .await
            .unwrap();
        assert_eq!(document.file_name, "data.txt");
        assert_eq!(content, b"round trip body");
    }

    #[tokio::test]
    async fn download_unknown_document_fails() {
        let f = fixture().await;
        let err = f.service.download(uuid::Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, SearchError::DocumentNotFound { .. }));
    }
}
