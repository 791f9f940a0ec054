//! Vector store clients.
//!
//! The pipeline only needs "top-k passages for a query string". Two backends
//! implement that: a local JSONL corpus scored lexically, and a Chroma
//! collection queried over HTTP with Ollama embeddings.

pub mod chroma;
pub mod jsonl;

pub use chroma::ChromaClient;
pub use jsonl::JsonlStore;

use crate::types::Passage;
use docchat_core::{AppError, AppResult, RetrievalConfig};
use std::path::Path;
use std::sync::Arc;

/// Similarity search over an indexed corpus.
#[async_trait::async_trait]
pub trait VectorStoreClient: Send + Sync {
    /// Backend name for logging.
    fn backend_name(&self) -> &str;

    /// Up to `k` passages for `query`, best first.
    ///
    /// An empty result is not an error. Transport or index failures are
    /// reported as `AppError::Retrieval`.
    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<Passage>>;
}

/// Build the store selected by `config.backend`.
///
/// Only an unknown backend fails here. Neither backend touches its corpus
/// until the first search, so an unreachable store surfaces per query.
pub fn create_store(
    config: &RetrievalConfig,
    workspace: &Path,
) -> AppResult<Arc<dyn VectorStoreClient>> {
    tracing::debug!("Creating '{}' vector store", config.backend);

    match config.backend.as_str() {
        "jsonl" => {
            let store = JsonlStore::open(config.resolve_corpus_path(workspace));
            if let Some(path) = store.path() {
                tracing::debug!("Corpus path: {}", path.display());
            }
            Ok(Arc::new(store))
        }
        "chroma" => Ok(Arc::new(ChromaClient::new(
            &config.endpoint,
            &config.collection,
            &config.embedding_endpoint,
            &config.embedding_model,
        )?)),
        other => Err(AppError::Config(format!(
            "Unknown retrieval backend: {}. Supported: jsonl, chroma",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_jsonl_store_relative_to_workspace() {
        let temp = TempDir::new().unwrap();
        let mut file = std::fs::File::create(temp.path().join("corpus.jsonl")).unwrap();
        writeln!(
            file,
            r#"{{"document_id": "returns.pdf", "chunk_id": "returns_chunk_0", "text": "Returns within 30 days."}}"#
        )
        .unwrap();

        let store = create_store(&RetrievalConfig::default(), temp.path()).unwrap();
        assert_eq!(store.backend_name(), "jsonl");

        let results = store.search("returns", 5).await.unwrap();
        assert_eq!(results[0].source.document_id, "returns.pdf");
    }

    #[tokio::test]
    async fn test_missing_corpus_fails_search_not_creation() {
        let temp = TempDir::new().unwrap();

        let store = create_store(&RetrievalConfig::default(), temp.path()).unwrap();
        let err = store.search("returns", 5).await.unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)));
    }

    #[test]
    fn test_create_chroma_store() {
        let config = RetrievalConfig {
            backend: "chroma".to_string(),
            ..Default::default()
        };
        let store = create_store(&config, Path::new(".")).unwrap();
        assert_eq!(store.backend_name(), "chroma");
    }

    #[test]
    fn test_unknown_backend() {
        let config = RetrievalConfig {
            backend: "faiss".to_string(),
            ..Default::default()
        };
        let err = create_store(&config, Path::new(".")).err().unwrap();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("faiss"));
    }
}
