//! # Error Handling Module
//!
//! ## Purpose
//! Centralized error handling for the file search engine, providing structured
//! error types and conversion utilities for all system components.
//!
//! ## Input/Output Specification
//! - **Input**: Error conditions from various system components
//! - **Output**: Structured error types with context and error chains
//! - **Error Categories**: Text extraction, Indexing, Storage, Search, API, Configuration
//!
//! ## Key Features
//! - Per-component error variants with detailed context
//! - Automatic error conversion and chaining
//! - User-friendly error messages for API responses
//! - Structured logging integration
//!
//! ## Usage
//! ```rust
//! use file_search_engine::errors::{Result, SearchError};
//!
//! fn extract() -> Result<String> {
//!     Err(SearchError::UnsupportedFormat {
//!         extension: "xlsx".to_string(),
//!     })
//! }
//! ```

use thiserror::Error;
use uuid::Uuid;

/// Result type used throughout the application
pub type Result<T> = std::result::Result<T, SearchError>;

/// Error types for the file search engine
#[derive(Debug, Error)]
pub enum SearchError {
    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Text extraction attempted on a format with no extractor.
    /// Non-fatal: the indexing pipeline treats this as empty text.
    #[error("File extension '{extension}' is not supported")]
    UnsupportedFormat { extension: String },

    /// A referenced document record is missing from the metadata store
    #[error("Document not found: {id}")]
    DocumentNotFound { id: Uuid },

    /// Stored content is missing from the content store
    #[error("Content not found: {locator}")]
    ContentNotFound { locator: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation failed for field '{field}': {reason}")]
    Validation { field: String, reason: String },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Internal system errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SearchError {
    /// Whether this error refers to a missing document or missing content
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SearchError::DocumentNotFound { .. } | SearchError::ContentNotFound { .. }
        )
    }

    /// Get error category for metrics and logging
    pub fn category(&self) -> &'static str {
        match self {
            SearchError::UnsupportedFormat { .. } => "text_processing",
            SearchError::DocumentNotFound { .. } | SearchError::ContentNotFound { .. } => {
                "not_found"
            }
            SearchError::Config { .. } | SearchError::Validation { .. } => "configuration",
            SearchError::Database(_) | SearchError::Serialization(_) | SearchError::Io(_) => {
                "storage"
            }
            SearchError::Internal { .. } => "generic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        let err = SearchError::DocumentNotFound { id: Uuid::new_v4() };
        assert!(err.is_not_found());
        assert!(!SearchError::Internal {
            message: "boom".to_string()
        }
        .is_not_found());
    }

    #[test]
    fn categories() {
        assert_eq!(
            SearchError::UnsupportedFormat {
                extension: "xlsx".to_string()
            }
            .category(),
            "text_processing"
        );
        assert_eq!(
            SearchError::ContentNotFound {
                locator: "missing".to_string()
            }
            .category(),
            "not_found"
        );
    }
}
