//! # File Search Engine
//!
//! ## Overview
//! This library implements an in-memory full-text search engine for uploaded
//! documents, ranking results with TF-IDF plus phrase-adjacency and filename
//! heuristics.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `text_processing`: Normalization, tokenization and plain-text extraction
//! - `index`: Inverted index mapping terms to per-document posting lists
//! - `indexing`: Background pipeline draining a queue of documents into the index
//! - `search`: TF-IDF ranking, boosts and snippet generation
//! - `documents`: Upload/download flows and duplicate detection
//! - `storage`: Document metadata and raw content store collaborators
//! - `api`: REST API endpoints
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Uploaded document bytes, free-text search queries
//! - **Output**: Ranked search results with scores and highlighted snippets
//! - **Index lifecycle**: Volatile; rebuilt on demand from stored documents
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use file_search_engine::index::InvertedIndex;
//! use file_search_engine::search::SearchService;
//! use file_search_engine::storage::{FileContentStore, InMemoryDocumentStore};
//! use file_search_engine::text_processing::TextProcessor;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let index = Arc::new(InvertedIndex::new());
//!     let documents = Arc::new(InMemoryDocumentStore::new());
//!     let content = Arc::new(FileContentStore::new("./storage".into(), false).await?);
//!     let processor = Arc::new(TextProcessor::new()?);
//!     let search = SearchService::new(index, processor, documents, content, Default::default());
//!     let results = search.search("quarterly invoice", 10).await?;
//!     println!("Found {} results", results.len());
//!     Ok(())
//! }
//! ```

// Core modules
pub mod api;
pub mod config;
pub mod documents;
pub mod errors;
pub mod index;
pub mod indexing;
pub mod search;
pub mod storage;
pub mod text_processing;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{Result, SearchError};
pub use search::{SearchQuery, SearchResult, SearchService};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for uploaded documents
pub type DocumentId = Uuid;

/// Immutable metadata record for one uploaded document.
///
/// Owned by the document store; the engine only reads it. The id and upload
/// timestamp are assigned once at creation and never change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document identifier
    pub id: DocumentId,
    /// Original file name as uploaded
    pub file_name: String,
    /// Lowercased file extension without the leading dot ("txt", "pdf", ...)
    pub file_extension: String,
    /// Locator understood by the content store
    pub storage_path: String,
    /// Raw content length in bytes
    pub content_length: u64,
    /// Hex digest of the raw content, used for duplicate detection
    pub hash: String,
    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document record with a fresh id and timestamp.
    pub fn new(
        file_name: impl Into<String>,
        file_extension: impl Into<String>,
        storage_path: impl Into<String>,
        content_length: u64,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            file_extension: file_extension.into(),
            storage_path: storage_path.into(),
            content_length,
            hash: hash.into(),
            uploaded_at: Utc::now(),
        }
    }
}

/// Outcome of an upload request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    /// Id of the stored document, if one was created
    pub document_id: Option<DocumentId>,
    /// File name as recorded
    pub file_name: Option<String>,
    /// Whether the document was stored and queued for indexing
    pub accepted: bool,
    /// Human-readable status message
    pub message: String,
}

/// Application state shared across components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub documents: Arc<documents::DocumentService>,
    pub search: Arc<search::SearchService>,
    pub indexing: Arc<indexing::IndexingService>,
    pub index: Arc<index::InvertedIndex>,
    pub document_store: Arc<dyn storage::DocumentStore>,
}
