//! # Inverted Index Module
//!
//! ## Purpose
//! In-memory inverted index mapping normalized terms to per-document posting
//! lists, the core data structure behind search.
//!
//! ## Input/Output Specification
//! - **Input**: (term, document id, position) triples from the indexing pipeline
//! - **Output**: Posting lists and term metadata for ranking
//! - **Lifecycle**: Volatile; built incrementally, cleared and rebuilt on demand
//!
//! ## Concurrency
//! A single coarse `RwLock` guards the term and posting maps: search requests
//! take read locks concurrently while the indexing worker takes short write
//! locks per term. Document-frequency increments happen inside the same
//! critical section as the posting existence check, so a term's document
//! frequency always equals its number of distinct documents.

use crate::DocumentId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// A normalized term with its document-frequency counter.
///
/// Equality and hashing are defined solely by the normalized value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    /// The term as first observed
    pub value: String,
    /// Case-folded form used as the index key
    pub normalized: String,
    /// Number of distinct documents containing the term
    pub document_frequency: u32,
}

impl Term {
    fn new(value: &str, normalized: &str) -> Self {
        Self {
            value: value.to_string(),
            normalized: normalized.to_string(),
            document_frequency: 0,
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Term {}

impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

/// Occurrence record for one (term, document) pair.
///
/// Body tokens use their zero-based offset in the pre-stop-word token array;
/// filename tokens use negative offsets starting at -100 and decrementing, so
/// the two ranges never collide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    /// Document containing the term
    pub document_id: DocumentId,
    /// Number of occurrences in the document
    pub term_frequency: u32,
    /// Token offsets in insertion order
    pub positions: Vec<i32>,
}

impl Posting {
    fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            term_frequency: 0,
            positions: Vec::new(),
        }
    }

    fn add_occurrence(&mut self, position: i32) {
        self.term_frequency += 1;
        self.positions.push(position);
    }
}

/// Index size counters for diagnostics
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of unique terms
    pub term_count: usize,
    /// Total number of postings across all terms
    pub posting_count: usize,
}

#[derive(Default)]
struct IndexInner {
    postings: HashMap<String, Vec<Posting>>,
    terms: HashMap<String, Term>,
}

/// In-memory inverted index with case-insensitive term lookup.
#[derive(Default)]
pub struct InvertedIndex {
    inner: RwLock<IndexInner>,
}

impl InvertedIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `term` in `document_id` at `position`.
    ///
    /// Creates term metadata on first sight and the posting on the first
    /// occurrence per document; the document-frequency counter is bumped only
    /// then. Callers are responsible for submitting each physical occurrence
    /// exactly once.
    pub fn add_term(&self, term: &str, document_id: DocumentId, position: i32) {
        let normalized = term.to_lowercase();
        let mut inner = self.inner.write();

        if !inner.terms.contains_key(&normalized) {
            inner
                .terms
                .insert(normalized.clone(), Term::new(term, &normalized));
        }

        let is_new_document = {
            let postings = inner.postings.entry(normalized.clone()).or_default();
            match postings.iter_mut().find(|p| p.document_id == document_id) {
                Some(posting) => {
                    posting.add_occurrence(position);
                    false
                }
                None => {
                    let mut posting = Posting::new(document_id);
                    posting.add_occurrence(position);
                    postings.push(posting);
                    true
                }
            }
        };

        if is_new_document {
            if let Some(term) = inner.terms.get_mut(&normalized) {
                term.document_frequency += 1;
            }
        }
    }

    /// Get the posting list for a term (case-insensitive).
    ///
    /// Returns an empty list when the term is absent.
    pub fn get_postings(&self, term: &str) -> Vec<Posting> {
        let normalized = term.to_lowercase();
        self.inner
            .read()
            .postings
            .get(&normalized)
            .cloned()
            .unwrap_or_default()
    }

    /// Case-insensitive presence check
    pub fn contains_term(&self, term: &str) -> bool {
        let normalized = term.to_lowercase();
        self.inner.read().postings.contains_key(&normalized)
    }

    /// Document frequency for a term, zero when absent
    pub fn document_frequency(&self, term: &str) -> u32 {
        let normalized = term.to_lowercase();
        self.inner
            .read()
            .terms
            .get(&normalized)
            .map(|t| t.document_frequency)
            .unwrap_or(0)
    }

    /// Drop all terms and postings; subsequent lookups behave as on a fresh index
    pub fn clear(&self) {
        tracing::warn!("Clearing inverted index");
        let mut inner = self.inner.write();
        inner.postings.clear();
        inner.terms.clear();
    }

    /// Diagnostic hook reporting index size; correctness does not depend on it
    pub fn build_index(&self) {
        let stats = self.stats();
        tracing::info!(
            "Index contains {} unique terms and {} postings",
            stats.term_count,
            stats.posting_count
        );
    }

    /// Current index size counters
    pub fn stats(&self) -> IndexStats {
        let inner = self.inner.read();
        IndexStats {
            term_count: inner.postings.len(),
            posting_count: inner.postings.values().map(Vec::len).sum(),
        }
    }
}
