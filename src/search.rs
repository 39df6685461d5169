//! # Search Module
//!
//! ## Purpose
//! Query execution over the inverted index: TF-IDF scoring, phrase-adjacency
//! and filename boosts, and highlighted snippet generation.
//!
//! ## Input/Output Specification
//! - **Input**: Free-text query, result limit
//! - **Output**: Results ordered by descending score with `<b>`-highlighted
//!   snippets
//! - **Ranking**: `tf * log10(total_docs / document_frequency)` summed per
//!   query term, then one flat x1.5 phrase boost and one x1.3 filename boost
//!
//! ## Scoring Notes
//! - Each distinct query term contributes once, however often it is repeated
//! - The phrase boost fires at most once per document: the first consecutive
//!   query-term pair found at adjacent positions wins and the scan stops
//! - The filename boost only considers documents that survived the first
//!   ranking pass, so it can reorder the cutoff set but never pull a document
//!   back in from below it
//! - Ties are broken by document id, keeping result order deterministic

use crate::config::SearchConfig;
use crate::errors::Result;
use crate::index::{InvertedIndex, Posting};
use crate::storage::{ContentStore, DocumentStore};
use crate::text_processing::TextProcessor;
use crate::utils::Timer;
use crate::{Document, DocumentId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Placeholder snippet when the term or the content cannot be located
const EMPTY_SNIPPET: &str = "...";

/// Search request parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    /// Free-text query
    pub q: String,
    /// Maximum number of results; the configured default applies when absent
    pub max_results: Option<usize>,
}

/// One ranked search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matched document id
    pub document_id: DocumentId,
    /// Original file name
    pub file_name: String,
    /// Content-store locator for the matched document
    pub storage_path: String,
    /// Final relevance score after boosts
    pub score: f64,
    /// Content excerpt with query-term occurrences wrapped in `<b>` tags
    pub snippet: String,
}

/// TF-IDF search engine over the inverted index.
pub struct SearchService {
    index: Arc<InvertedIndex>,
    text_processor: Arc<TextProcessor>,
    documents: Arc<dyn DocumentStore>,
    content: Arc<dyn ContentStore>,
    config: SearchConfig,
}

impl SearchService {
    /// Create a new search service
    pub fn new(
        index: Arc<InvertedIndex>,
        text_processor: Arc<TextProcessor>,
        documents: Arc<dyn DocumentStore>,
        content: Arc<dyn ContentStore>,
        config: SearchConfig,
    ) -> Self {
        Self {
            index,
            text_processor,
            documents,
            content,
            config,
        }
    }

    /// Execute a search and return up to `max_results` ranked results.
    pub async fn search(&self, raw_query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let timer = Timer::new("search");

        let terms = self.text_processor.normalize(raw_query);
        if terms.is_empty() {
            tracing::debug!("Query '{}' normalized to nothing", raw_query);
            return Ok(Vec::new());
        }

        let total_docs = self.documents.get_all().await?.len();

        // Distinct terms in first-seen order; repeated query terms score once
        let mut distinct_terms: Vec<&str> = Vec::new();
        let mut postings_by_term: HashMap<&str, Vec<Posting>> = HashMap::new();
        for term in &terms {
            if !postings_by_term.contains_key(term.as_str()) {
                distinct_terms.push(term);
                postings_by_term.insert(term, self.index.get_postings(term));
            }
        }

        let mut scores: HashMap<DocumentId, f64> = HashMap::new();
        for term in &distinct_terms {
            let postings = &postings_by_term[*term];
            if postings.is_empty() {
                continue;
            }

            let df = postings.len() as f64;
            let idf = if total_docs == 0 {
                1.0
            } else {
                (total_docs as f64 / df).log10()
            };

            for posting in postings {
                *scores.entry(posting.document_id).or_insert(0.0) +=
                    posting.term_frequency as f64 * idf;
            }
        }

        if terms.len() >= 2 {
            self.apply_phrase_boost(&terms, &postings_by_term, &mut scores);
        }

        let mut ranked: Vec<(DocumentId, f64)> = scores.into_iter().collect();
        sort_by_score(&mut ranked);
        ranked.truncate(max_results);

        let mut hits: Vec<(Document, f64)> = Vec::with_capacity(ranked.len());
        for (id, score) in ranked {
            match self.documents.get(id).await? {
                Some(document) => hits.push((document, score)),
                None => tracing::warn!("Indexed document {} has no metadata record", id),
            }
        }

        for (document, score) in &mut hits {
            let name = document.file_name.to_lowercase();
            if terms.iter().any(|t| name.contains(t.as_str())) {
                *score *= self.config.filename_boost;
            }
        }

        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        hits.truncate(max_results);

        let first_term = &terms[0];
        let mut results = Vec::with_capacity(hits.len());
        for (document, score) in hits {
            let snippet = self.snippet_for(&document, first_term).await;
            results.push(SearchResult {
                document_id: document.id,
                file_name: document.file_name,
                storage_path: document.storage_path,
                score,
                snippet,
            });
        }

        tracing::info!(
            "Query '{}' returned {} results in {}ms",
            raw_query,
            results.len(),
            timer.elapsed_ms()
        );
        Ok(results)
    }

    /// Generate a highlighted snippet for one document.
    ///
    /// Infallible by contract: any failure degrades to a bare `"..."`.
    pub async fn generate_snippet(&self, document_id: DocumentId, term: &str) -> String {
        match self.documents.get(document_id).await {
            Ok(Some(document)) => self.snippet_for(&document, term).await,
            Ok(None) => {
                tracing::warn!("Snippet requested for unknown document {}", document_id);
                EMPTY_SNIPPET.to_string()
            }
            Err(e) => {
                tracing::error!("Error resolving document {} for snippet: {}", document_id, e);
                EMPTY_SNIPPET.to_string()
            }
        }
    }

    /// Multiply the score once for documents containing every query term
    /// where some consecutive query-term pair sits at adjacent positions.
    fn apply_phrase_boost(
        &self,
        terms: &[String],
        postings_by_term: &HashMap<&str, Vec<Posting>>,
        scores: &mut HashMap<DocumentId, f64>,
    ) {
        let positions_in = |term: &str, id: DocumentId| -> Option<&Vec<i32>> {
            postings_by_term
                .get(term)?
                .iter()
                .find(|p| p.document_id == id)
                .map(|p| &p.positions)
        };

        for (&id, score) in scores.iter_mut() {
            let has_all_terms = terms.iter().all(|t| positions_in(t, id).is_some());
            if !has_all_terms {
                continue;
            }

            for pair in terms.windows(2) {
                let (Some(first), Some(second)) =
                    (positions_in(&pair[0], id), positions_in(&pair[1], id))
                else {
                    continue;
                };

                if first.iter().any(|p| second.contains(&(p + 1))) {
                    *score *= self.config.phrase_boost;
                    tracing::debug!("Phrase boost applied to document {}", id);
                    break;
                }
            }
        }
    }

    async fn snippet_for(&self, document: &Document, term: &str) -> String {
        let content = match self.content.open(&document.storage_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(
                    "Error reading content for snippet of document {}: {}",
                    document.id,
                    e
                );
                return EMPTY_SNIPPET.to_string();
            }
        };

        let text = String::from_utf8_lossy(&content);
        build_snippet(&text, term, self.config.snippet_context_chars)
            .unwrap_or_else(|| EMPTY_SNIPPET.to_string())
    }
}

/// Descending score, ascending document id on ties
fn sort_by_score(entries: &mut [(DocumentId, f64)]) {
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

/// Cut a window of `context` characters (not bytes) around the first
/// case-insensitive occurrence of `term` and highlight every occurrence
/// inside it.
fn build_snippet(text: &str, term: &str, context: usize) -> Option<String> {
    let finder = Regex::new(&format!("(?i){}", regex::escape(term))).ok()?;
    let hit = finder.find(text)?;

    let start = text[..hit.start()]
        .char_indices()
        .rev()
        .take(context)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(hit.start());

    let end = text[hit.end()..]
        .char_indices()
        .nth(context)
        .map(|(i, _)| hit.end() + i)
        .unwrap_or(text.len());

    let highlighted = finder.replace_all(&text[start..end], "<b>$0</b>");
    let prefix = if start > 0 { "..." } else { "" };
    let suffix = if end < text.len() { "..." } else { "" };

    Some(format!("{}{}{}", prefix, highlighted, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexingConfig;
    use crate::indexing::IndexingService;
    use crate::storage::{FileContentStore, InMemoryDocumentStore};

    struct Fixture {
        search: SearchService,
        indexing: IndexingService,
        documents: Arc<InMemoryDocumentStore>,
        content: Arc<FileContentStore>,
        _dir: tempfile::TempDir,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let index = Arc::new(InvertedIndex::new());
        let text_processor = Arc::new(TextProcessor::new().unwrap());
        let documents = Arc::new(InMemoryDocumentStore::new());
        let content = Arc::new(
            FileContentStore::new(dir.path().to_path_buf(), false)
                .await
                .unwrap(),
        );

        let search = SearchService::new(
            index.clone(),
            text_processor.clone(),
            documents.clone(),
            content.clone(),
            SearchConfig::default(),
        );
        let indexing = IndexingService::new(
            index,
            text_processor,
            documents.clone(),
            content.clone(),
            IndexingConfig::default(),
        );

        Fixture {
            search,
            indexing,
            documents,
            content,
            _dir: dir,
        }
    }

    async fn add_document(f: &Fixture, name: &str, body: &str) -> Document {
        let locator = f.content.store(body.as_bytes(), name).await.unwrap();
        let extension = name.rsplit('.').next().unwrap_or_default();
        let document = Document::new(name, extension, locator, body.len() as u64, name);
        f.documents.save(&document).await.unwrap();
        f.indexing.index_document(&document).await.unwrap();
        document
    }

    #[tokio::test]
    async fn empty_query_yields_no_results() {
        let f = fixture().await;
        add_document(&f, "a.txt", "some content here").await;

        assert!(f.search.search("", 10).await.unwrap().is_empty());
        assert!(f.search.search("   ", 10).await.unwrap().is_empty());
        // Stop-word-only queries normalize to nothing
        assert!(f.search.search("the of and", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unmatched_terms_yield_no_results() {
        let f = fixture().await;
        add_document(&f, "a.txt", "completely unrelated words").await;

        assert!(f.search.search("zebra", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn higher_term_frequency_ranks_first() {
        let f = fixture().await;
        let frequent = add_document(&f, "a.txt", "rust rust rust filler").await;
        add_document(&f, "b.txt", "rust filler filler filler").await;
        add_document(&f, "c.txt", "nothing relevant here").await;

        let results = f.search.search("rust", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, frequent.id);
        assert_eq!(results[0].storage_path, frequent.storage_path);
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn phrase_adjacency_outranks_scattered_terms() {
        let f = fixture().await;
        let adjacent = add_document(&f, "a.txt", "quick brown creature").await;
        add_document(&f, "b.txt", "quick creature likes brown").await;
        // Keeps document frequency below the total so idf stays positive
        add_document(&f, "c.txt", "unrelated filler words").await;

        let results = f.search.search("quick brown", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, adjacent.id);
        let ratio = results[0].score / results[1].score;
        assert!((ratio - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn phrase_boost_sees_through_stop_word_gaps() {
        let f = fixture().await;
        // "brown fox" stays adjacent in the pre-stop-word position space
        let doc = add_document(&f, "a.txt", "over the brown fox again").await;
        add_document(&f, "b.txt", "brown paint near fox dens").await;
        add_document(&f, "c.txt", "unrelated filler words").await;

        let results = f.search.search("brown fox", 10).await.unwrap();
        assert_eq!(results[0].document_id, doc.id);
    }

    #[tokio::test]
    async fn filename_match_outranks_equal_body_match() {
        let f = fixture().await;
        let named = add_document(&f, "invoice_report.txt", "ledger entry").await;
        add_document(&f, "notes.txt", "invoice ledger entry").await;
        add_document(&f, "filler.txt", "unrelated filler words").await;

        let results = f.search.search("invoice", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document_id, named.id);
    }

    #[tokio::test]
    async fn repeated_query_terms_score_once() {
        let f = fixture().await;
        add_document(&f, "a.txt", "falcon watching").await;
        add_document(&f, "b.txt", "other content entirely").await;

        let single = f.search.search("falcon", 10).await.unwrap();
        let double = f.search.search("falcon falcon", 10).await.unwrap();
        assert!((double[0].score - single[0].score).abs() < 1e-9);
    }

    #[tokio::test]
    async fn term_in_every_document_scores_zero_but_still_matches() {
        let f = fixture().await;
        add_document(&f, "a.txt", "shared token").await;

        // total_docs == document_frequency, so idf == log10(1) == 0
        let results = f.search.search("shared", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 0.0);
    }

    #[tokio::test]
    async fn empty_store_falls_back_to_unit_idf() {
        let f = fixture().await;
        // Terms in the index but no metadata records at all
        let orphan = uuid::Uuid::new_v4();
        let index = Arc::new(InvertedIndex::new());
        index.add_term("orphan", orphan, 0);
        let search = SearchService::new(
            index,
            Arc::new(TextProcessor::new().unwrap()),
            f.documents.clone(),
            f.content.clone(),
            SearchConfig::default(),
        );

        // Scoring must not divide by zero; the hit is then dropped for
        // lacking a metadata record
        let results = search.search("orphan", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn respects_max_results() {
        let f = fixture().await;
        for i in 0..5 {
            add_document(&f, &format!("doc{}.txt", i), "common theme here").await;
        }

        let results = f.search.search("theme", 3).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn results_are_deterministic_across_runs() {
        let f = fixture().await;
        for i in 0..4 {
            add_document(&f, &format!("tied{}.txt", i), "identical scoring body").await;
        }

        let first = f.search.search("identical", 10).await.unwrap();
        let second = f.search.search("identical", 10).await.unwrap();
        let ids: Vec<_> = first.iter().map(|r| r.document_id).collect();
        let ids_again: Vec<_> = second.iter().map(|r| r.document_id).collect();
        assert_eq!(ids, ids_again);
    }

    #[tokio::test]
    async fn snippet_highlights_every_window_occurrence() {
        let f = fixture().await;
        add_document(&f, "a.txt", "The Brown bear met a brown fox").await;

        let results = f.search.search("brown", 10).await.unwrap();
        assert_eq!(
            results[0].snippet,
            "The <b>Brown</b> bear met a <b>brown</b> fox"
        );
    }

    #[tokio::test]
    async fn snippet_truncates_with_ellipses() {
        let f = fixture().await;
        let body = format!("{} needle {}", "x".repeat(500), "y".repeat(500));
        add_document(&f, "long.txt", &body).await;

        let results = f.search.search("needle", 10).await.unwrap();
        let snippet = &results[0].snippet;
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert!(snippet.contains("<b>needle</b>"));
        assert!(snippet.len() < body.len());
    }

    #[tokio::test]
    async fn snippet_degrades_to_placeholder() {
        let f = fixture().await;
        let doc = add_document(&f, "a.txt", "actual content").await;

        // Unknown document
        let snippet = f.search.generate_snippet(uuid::Uuid::new_v4(), "term").await;
        assert_eq!(snippet, "...");

        // Known document, term absent from content
        let snippet = f.search.generate_snippet(doc.id, "zebra").await;
        assert_eq!(snippet, "...");

        // Content gone from disk
        f.content.delete(&doc.storage_path).await.unwrap();
        let snippet = f.search.generate_snippet(doc.id, "actual").await;
        assert_eq!(snippet, "...");
    }

    #[tokio::test]
    async fn snippet_window_respects_multibyte_boundaries() {
        let f = fixture().await;
        let body = format!("{} alvo {}", "é".repeat(300), "ã".repeat(300));
        add_document(&f, "acentos.txt", &body).await;

        let results = f.search.search("alvo", 10).await.unwrap();
        let snippet = &results[0].snippet;
        // Must not panic slicing mid-character
        assert!(snippet.contains("<b>alvo</b>"));

        // The window is 200 characters each side, not 200 bytes: the
        // surrounding space plus 199 two-byte letters on each flank
        assert!(snippet.starts_with("..."));
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().filter(|&c| c == 'é').count(), 199);
        assert_eq!(snippet.chars().filter(|&c| c == 'ã').count(), 199);
    }

    #[tokio::test]
    async fn diacritics_fold_between_query_and_document() {
        let f = fixture().await;
        let doc = add_document(&f, "pt.txt", "relatório de ação completo").await;

        let results = f.search.search("acao", 10).await.unwrap();
        assert_eq!(results[0].document_id, doc.id);
        let results = f.search.search("relatório", 10).await.unwrap();
        assert_eq!(results[0].document_id, doc.id);
    }
}
