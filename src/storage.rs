//! # Storage Module
//!
//! ## Purpose
//! Narrow storage contracts consumed by the engine — document metadata records
//! and raw content blobs — together with the concrete backends: an embedded
//! sled database, a volatile in-process map, and a filesystem blob store.
//!
//! ## Input/Output Specification
//! - **Input**: Document records, raw uploaded bytes
//! - **Output**: Persisted metadata, content locators, retrieved bytes
//! - **Contracts**: `DocumentStore` and `ContentStore` traits; the indexing and
//!   search components never depend on a concrete backend
//!
//! ## Key Features
//! - Embedded sled database for metadata (bincode-encoded)
//! - In-memory store for tests and ephemeral deployments
//! - Filesystem content store with optional gzip compression

use crate::errors::{Result, SearchError};
use crate::utils::ValidationUtils;
use crate::{Document, DocumentId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Document metadata store contract.
///
/// Used to obtain the total document count for IDF, resolve ids to metadata,
/// and enumerate documents for a full index rebuild.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by id
    async fn get(&self, id: DocumentId) -> Result<Option<Document>>;

    /// Enumerate all known documents
    async fn get_all(&self) -> Result<Vec<Document>>;

    /// Persist a document record
    async fn save(&self, document: &Document) -> Result<()>;

    /// Whether a document with this content hash exists
    async fn exists_by_hash(&self, hash: &str) -> Result<bool>;

    /// Whether a document with this file name exists
    async fn exists_by_name(&self, file_name: &str) -> Result<bool>;
}

/// Raw content store contract.
///
/// Locators are opaque to callers; only the store that issued one can resolve it.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store raw bytes, returning a locator for later retrieval
    async fn store(&self, content: &[u8], file_name: &str) -> Result<String>;

    /// Fetch the raw bytes behind a locator
    async fn open(&self, locator: &str) -> Result<Vec<u8>>;

    /// Delete the bytes behind a locator; missing content is not an error
    async fn delete(&self, locator: &str) -> Result<()>;
}

/// Sled-backed document store, the production metadata backend.
pub struct SledDocumentStore {
    db: sled::Db,
    documents: sled::Tree,
}

impl SledDocumentStore {
    /// Open (or create) the database at `db_path`
    pub async fn open(db_path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db = sled::open(db_path)?;
        let documents = db.open_tree("documents")?;

        tracing::info!(
            "Document store opened at {:?} with {} documents",
            db_path,
            documents.len()
        );

        Ok(Self { db, documents })
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await?;
        Ok(())
    }

    fn decode(value: &[u8]) -> Result<Document> {
        Ok(bincode::deserialize(value)?)
    }
}

#[async_trait]
impl DocumentStore for SledDocumentStore {
    async fn get(&self, id: DocumentId) -> Result<Option<Document>> {
        match self.documents.get(id.as_bytes())? {
            Some(value) => Ok(Some(Self::decode(&value)?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for entry in self.documents.iter() {
            let (_, value) = entry?;
            documents.push(Self::decode(&value)?);
        }
        Ok(documents)
    }

    async fn save(&self, document: &Document) -> Result<()> {
        let value = bincode::serialize(document)?;
        self.documents.insert(document.id.as_bytes(), value)?;
        tracing::debug!("Saved document record: {} ({})", document.file_name, document.id);
        Ok(())
    }

    async fn exists_by_hash(&self, hash: &str) -> Result<bool> {
        for entry in self.documents.iter() {
            let (_, value) = entry?;
            if Self::decode(&value)?.hash == hash {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn exists_by_name(&self, file_name: &str) -> Result<bool> {
        for entry in self.documents.iter() {
            let (_, value) = entry?;
            if Self::decode(&value)?.file_name == file_name {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Volatile in-process document store, used in tests and when
/// `storage.db_type = "memory"`.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<DocumentId, Document>,
}

impl InMemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, id: DocumentId) -> Result<Option<Document>> {
        Ok(self.documents.get(&id).map(|d| d.clone()))
    }

    async fn get_all(&self) -> Result<Vec<Document>> {
        Ok(self.documents.iter().map(|d| d.clone()).collect())
    }

    async fn save(&self, document: &Document) -> Result<()> {
        self.documents.insert(document.id, document.clone());
        Ok(())
    }

    async fn exists_by_hash(&self, hash: &str) -> Result<bool> {
        Ok(self.documents.iter().any(|d| d.hash == hash))
    }

    async fn exists_by_name(&self, file_name: &str) -> Result<bool> {
        Ok(self.documents.iter().any(|d| d.file_name == file_name))
    }
}

/// Filesystem content store.
///
/// Each blob is written under the base directory as `{uuid}_{sanitized name}`;
/// with compression enabled a `.gz` suffix marks gzip-encoded blobs so `open`
/// knows how to decode them.
pub struct FileContentStore {
    base_dir: PathBuf,
    enable_compression: bool,
}

impl FileContentStore {
    /// Create the store, ensuring the base directory exists
    pub async fn new(base_dir: PathBuf, enable_compression: bool) -> Result<Self> {
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self {
            base_dir,
            enable_compression,
        })
    }

    fn compress(content: &[u8]) -> Result<Vec<u8>> {
        use std::io::Write;

        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(content)?;
        Ok(encoder.finish()?)
    }

    fn decompress(content: &[u8]) -> Result<Vec<u8>> {
        use std::io::Read;

        let mut decoder = flate2::read::GzDecoder::new(content);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(decompressed)
    }
}

#[async_trait]
impl ContentStore for FileContentStore {
    async fn store(&self, content: &[u8], file_name: &str) -> Result<String> {
        let sanitized = ValidationUtils::sanitize_filename(file_name);
        let mut locator = format!("{}_{}", Uuid::new_v4(), sanitized);

        let data = if self.enable_compression {
            locator.push_str(".gz");
            Self::compress(content)?
        } else {
            content.to_vec()
        };

        let path = self.base_dir.join(&locator);
        tokio::fs::write(&path, data).await?;

        tracing::debug!("Stored {} bytes as {}", content.len(), locator);
        Ok(locator)
    }

    async fn open(&self, locator: &str) -> Result<Vec<u8>> {
        let path = self.base_dir.join(locator);

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SearchError::ContentNotFound {
                    locator: locator.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        if locator.ends_with(".gz") {
            Self::decompress(&data)
        } else {
            Ok(data)
        }
    }

    async fn delete(&self, locator: &str) -> Result<()> {
        let path = self.base_dir.join(locator);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("Deleted stored content {}", locator);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
