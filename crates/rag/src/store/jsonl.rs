//! Local corpus store.
//!
//! Reads a JSON Lines export of the indexed chunks (one record per line) and
//! ranks them by term overlap with the query. Used for offline runs and
//! tests where no Chroma server is available.
//!
//! The file is read on the first search, not at construction. A missing or
//! unreadable corpus fails that search with `AppError::Retrieval` and is
//! retried on the next one.

use super::VectorStoreClient;
use crate::text;
use crate::types::Passage;
use docchat_core::{AppError, AppResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// One exported chunk.
#[derive(Debug, Clone, Deserialize)]
struct CorpusRecord {
    #[serde(alias = "source")]
    document_id: String,

    #[serde(alias = "id")]
    chunk_id: String,

    text: String,

    #[serde(default)]
    page: Option<u32>,
}

#[derive(Debug)]
struct IndexedChunk {
    record: CorpusRecord,
    terms: Vec<String>,
}

#[derive(Debug)]
struct CorpusIndex {
    chunks: Vec<IndexedChunk>,
}

impl CorpusIndex {
    /// Blank lines are skipped.
    fn parse(content: &str) -> AppResult<Self> {
        let mut chunks = Vec::new();

        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let record: CorpusRecord = serde_json::from_str(line).map_err(|e| {
                AppError::Retrieval(format!("Invalid corpus record on line {}: {}", line_no + 1, e))
            })?;
            let terms = text::content_terms(&record.text);
            chunks.push(IndexedChunk { record, terms });
        }

        Ok(Self { chunks })
    }

    /// Fraction of query terms present in the chunk.
    fn score(query_terms: &[String], chunk: &IndexedChunk) -> f32 {
        let matched = query_terms
            .iter()
            .filter(|term| chunk.terms.contains(term))
            .count();
        matched as f32 / query_terms.len() as f32
    }

    fn rank(&self, query: &str, k: usize) -> Vec<Passage> {
        let query_terms = text::content_terms(query);
        if query_terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|chunk| (Self::score(&query_terms, chunk), chunk))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        // Stable sort keeps corpus order among ties
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(score, chunk)| {
                let record = &chunk.record;
                let passage = Passage::new(
                    record.document_id.clone(),
                    record.chunk_id.clone(),
                    score,
                    record.text.clone(),
                );
                match record.page {
                    Some(page) => passage.with_page(page),
                    None => passage,
                }
            })
            .collect()
    }
}

/// Lexical index over a JSONL corpus.
#[derive(Debug)]
pub struct JsonlStore {
    path: Option<PathBuf>,
    index: OnceCell<CorpusIndex>,
}

impl JsonlStore {
    /// Store backed by the corpus at `path`, read on first search.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            index: OnceCell::new(),
        }
    }

    /// Store over an in-memory corpus.
    pub fn from_jsonl(content: &str) -> AppResult<Self> {
        Ok(Self {
            path: None,
            index: OnceCell::new_with(Some(CorpusIndex::parse(content)?)),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Chunks indexed so far; 0 until the corpus has been read.
    pub fn len(&self) -> usize {
        self.index.get().map(|index| index.chunks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn index(&self) -> AppResult<&CorpusIndex> {
        self.index
            .get_or_try_init(|| async {
                let path = self
                    .path
                    .as_deref()
                    .ok_or_else(|| AppError::Retrieval("Corpus has no source".to_string()))?;

                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    AppError::Retrieval(format!(
                        "Failed to read corpus {}: {}",
                        path.display(),
                        e
                    ))
                })?;

                let index = CorpusIndex::parse(&content)?;
                tracing::info!(
                    "Loaded {} chunks from {}",
                    index.chunks.len(),
                    path.display()
                );
                Ok::<CorpusIndex, AppError>(index)
            })
            .await
    }
}

#[async_trait::async_trait]
impl VectorStoreClient for JsonlStore {
    fn backend_name(&self) -> &str {
        "jsonl"
    }

    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<Passage>> {
        let passages = self.index().await?.rank(query, k);
        tracing::debug!("jsonl search '{}' -> {} passages", query, passages.len());
        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CORPUS: &str = r#"
{"document_id": "returns.pdf", "chunk_id": "returns_chunk_0", "text": "You can return a product within 30 days of delivery.", "page": 1}
{"document_id": "returns.pdf", "chunk_id": "returns_chunk_1", "text": "The return timeframe is extended to 60 days for members.", "page": 2}
{"source": "shipping.pdf", "id": "shipping_chunk_0", "text": "Shipping costs depend on the destination. National shipping is $5."}
"#;

    #[tokio::test]
    async fn test_ranks_by_term_overlap() {
        let store = JsonlStore::from_jsonl(CORPUS).unwrap();
        assert_eq!(store.len(), 3);

        let results = store.search("What is the return timeframe?", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source.chunk_id, "returns_chunk_1");
        assert_eq!(results[0].source.score, 1.0);
        assert_eq!(results[0].page, Some(2));
        assert_eq!(results[1].source.chunk_id, "returns_chunk_0");
        assert_eq!(results[1].source.score, 0.5);
    }

    #[tokio::test]
    async fn test_accepts_source_and_id_aliases() {
        let store = JsonlStore::from_jsonl(CORPUS).unwrap();

        let results = store.search("national shipping costs", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source.document_id, "shipping.pdf");
        assert_eq!(results[0].source.chunk_id, "shipping_chunk_0");
        assert_eq!(results[0].page, None);
    }

    #[tokio::test]
    async fn test_truncates_to_k() {
        let store = JsonlStore::from_jsonl(CORPUS).unwrap();
        let results = store.search("return timeframe", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let store = JsonlStore::from_jsonl(CORPUS).unwrap();
        assert!(store.search("quantum chromodynamics", 5).await.unwrap().is_empty());
        assert!(store.search("what is it?", 5).await.unwrap().is_empty());
    }

    #[test]
    fn test_invalid_line_reports_line_number() {
        let err = JsonlStore::from_jsonl("{\"text\": \"no ids\"}\n").unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)));
        assert!(err.to_string().contains("line 1"));
    }

    #[tokio::test]
    async fn test_file_read_on_first_search() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CORPUS.as_bytes()).unwrap();

        let store = JsonlStore::open(file.path());
        assert!(store.is_empty());

        let results = store.search("return timeframe", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_fails_search_not_open() {
        let store = JsonlStore::open("/nonexistent/corpus.jsonl");

        let err = store.search("return policy", 5).await.unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)));
        assert!(err.to_string().contains("/nonexistent/corpus.jsonl"));
    }

    #[tokio::test]
    async fn test_corpus_created_after_failed_search_is_picked_up() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("corpus.jsonl");
        let store = JsonlStore::open(&path);

        assert!(store.search("return timeframe", 5).await.is_err());

        std::fs::write(&path, CORPUS).unwrap();
        let results = store.search("return timeframe", 5).await.unwrap();
        assert_eq!(results[0].source.chunk_id, "returns_chunk_1");
    }
}
