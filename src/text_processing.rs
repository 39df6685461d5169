//! # Text Processing Module
//!
//! ## Purpose
//! Text normalization pipeline shared by indexing and search: case folding,
//! diacritic stripping, punctuation removal, stop-word filtering and
//! position-aware tokenization, plus plain-text extraction from uploads.
//!
//! ## Input/Output Specification
//! - **Input**: Raw document bytes or query text
//! - **Output**: Normalized term sequences, optionally with token positions
//! - **Positions**: Offsets into the whitespace-split token array *before*
//!   stop-word removal; gaps are preserved and never renumbered, which is what
//!   makes phrase-adjacency detection at search time work
//!
//! ## Key Features
//! - Unicode-aware diacritic stripping (NFD decomposition, combining marks dropped)
//! - Fixed multilingual stop-word set (English and Portuguese function words)
//! - Extension-dispatched text extraction with placeholder stubs for binary formats

use crate::errors::{Result, SearchError};
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Placeholder returned for PDF uploads until a real extractor exists
pub const PDF_PLACEHOLDER: &str = "[PDF content extraction not implemented]";
/// Placeholder returned for DOCX uploads until a real extractor exists
pub const DOCX_PLACEHOLDER: &str = "[DOCX content extraction not implemented]";

/// Function words excluded from indexing and search, covering English and
/// Portuguese. Applied after case folding and diacritic stripping.
const STOP_WORDS: &[&str] = &[
    // English
    "a", "an", "the", "and", "or", "but", "is", "are", "was", "were", "in", "on", "at", "to",
    "for", "with", "by", "about", "of", "as",
    // Portuguese
    "de", "o", "que", "e", "do", "da", "em", "um", "para", "é", "com", "não", "uma", "os", "no",
    "se", "na", "por", "mais", "dos", "como",
];

/// Shared text normalization and extraction pipeline.
pub struct TextProcessor {
    punctuation: Regex,
    stop_words: HashSet<&'static str>,
}

impl TextProcessor {
    /// Create a new text processor with the compiled pipeline
    pub fn new() -> Result<Self> {
        let punctuation = Regex::new(r"[^\w\s]").map_err(|e| SearchError::Internal {
            message: format!("Invalid punctuation regex: {}", e),
        })?;

        Ok(Self {
            punctuation,
            stop_words: STOP_WORDS.iter().copied().collect(),
        })
    }

    /// Normalize text into a sequence of terms.
    ///
    /// Lowercases, strips diacritics, replaces non-word characters with spaces,
    /// splits on whitespace and discards stop words. Pure; empty or
    /// whitespace-only input yields an empty sequence.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        self.split_tokens(text)
            .into_iter()
            .filter(|token| !self.stop_words.contains(token.as_str()))
            .collect()
    }

    /// Tokenize text keeping each surviving token's position.
    ///
    /// Positions index into the full whitespace-split token array, so stop-word
    /// removal leaves gaps between consecutive surviving tokens.
    pub fn tokenize_with_positions(&self, text: &str) -> Vec<(String, usize)> {
        self.split_tokens(text)
            .into_iter()
            .enumerate()
            .filter(|(_, token)| !self.stop_words.contains(token.as_str()))
            .map(|(position, token)| (token, position))
            .collect()
    }

    /// Extract indexable text from raw content, dispatching on the extension.
    ///
    /// Plain text is decoded verbatim; PDF and DOCX return a clearly marked
    /// placeholder; anything else fails with `UnsupportedFormat`.
    pub fn extract_text(&self, content: &[u8], file_extension: &str) -> Result<String> {
        let extension = file_extension.trim_start_matches('.').to_lowercase();

        match extension.as_str() {
            "txt" => Ok(String::from_utf8_lossy(content).into_owned()),
            "pdf" => {
                tracing::warn!("PDF extraction is not implemented, returning placeholder");
                Ok(PDF_PLACEHOLDER.to_string())
            }
            "docx" => {
                tracing::warn!("DOCX extraction is not implemented, returning placeholder");
                Ok(DOCX_PLACEHOLDER.to_string())
            }
            _ => Err(SearchError::UnsupportedFormat { extension }),
        }
    }

    /// Whether extracted text carries anything worth indexing.
    ///
    /// Empty/whitespace output and the binary-format placeholders both count
    /// as "no indexable text".
    pub fn is_indexable(text: &str) -> bool {
        let trimmed = text.trim();
        !trimmed.is_empty() && trimmed != PDF_PLACEHOLDER && trimmed != DOCX_PLACEHOLDER
    }

    /// Lowercase, strip diacritics, drop punctuation and split on whitespace
    fn split_tokens(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let lowercase = text.to_lowercase();
        let stripped = strip_diacritics(&lowercase);
        let spaced = self.punctuation.replace_all(&stripped, " ");

        spaced.split_whitespace().map(str::to_string).collect()
    }
}

/// Remove Unicode combining marks after canonical decomposition
fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).nfc().collect()
}
