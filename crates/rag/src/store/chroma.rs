//! Chroma vector store client.
//!
//! Queries a collection built by the PDF indexer: each record carries the
//! chunk text as its document and `source` / `page` metadata. Queries are
//! embedded with the same Ollama model the indexer used, then sent to
//! Chroma's REST API.
//!
//! Chroma API: https://docs.trychroma.com/reference/python/client

use super::VectorStoreClient;
use crate::types::Passage;
use docchat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Request timeout in seconds, for both embedding and query calls
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Debug, Serialize)]
struct QueryRequest {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    include: Vec<&'static str>,
}

/// Column-oriented query result, one inner list per query embedding.
#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    ids: Vec<Vec<String>>,

    #[serde(default)]
    documents: Option<Vec<Vec<Option<String>>>>,

    #[serde(default)]
    metadatas: Option<Vec<Vec<Option<Map<String, Value>>>>>,

    #[serde(default)]
    distances: Option<Vec<Vec<f32>>>,
}

/// HTTP client for one Chroma collection.
pub struct ChromaClient {
    endpoint: String,
    collection: String,
    embedding_endpoint: String,
    embedding_model: String,
    client: reqwest::Client,
    /// Collection id, resolved on first search
    collection_id: OnceCell<String>,
}

impl ChromaClient {
    pub fn new(
        endpoint: &str,
        collection: &str,
        embedding_endpoint: &str,
        embedding_model: &str,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                AppError::Retrieval(format!("Failed to create HTTP client for Chroma: {}", e))
            })?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            collection: collection.to_string(),
            embedding_endpoint: embedding_endpoint.trim_end_matches('/').to_string(),
            embedding_model: embedding_model.to_string(),
            client,
            collection_id: OnceCell::new(),
        })
    }

    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.embedding_endpoint);
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to reach embedding service: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval(format!(
                "Embedding request failed with status {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Retrieval(format!("Failed to parse embedding response: {}", e))
        })?;

        if parsed.embedding.is_empty() {
            return Err(AppError::Retrieval(format!(
                "Embedding model '{}' returned an empty vector",
                self.embedding_model
            )));
        }

        Ok(parsed.embedding)
    }

    async fn collection_id(&self) -> AppResult<&str> {
        let id = self
            .collection_id
            .get_or_try_init(|| async {
                let url = format!("{}/api/v1/collections/{}", self.endpoint, self.collection);
                let response = self.client.get(&url).send().await.map_err(|e| {
                    AppError::Retrieval(format!("Failed to reach Chroma at {}: {}", self.endpoint, e))
                })?;

                if !response.status().is_success() {
                    return Err(AppError::Retrieval(format!(
                        "Chroma collection '{}' not found (status {})",
                        self.collection,
                        response.status()
                    )));
                }

                let info: CollectionInfo = response.json().await.map_err(|e| {
                    AppError::Retrieval(format!("Failed to parse Chroma collection: {}", e))
                })?;

                tracing::debug!("Resolved collection '{}' to {}", self.collection, info.id);
                Ok::<String, AppError>(info.id)
            })
            .await?;

        Ok(id.as_str())
    }

    async fn query(&self, embedding: Vec<f32>, k: usize) -> AppResult<QueryResponse> {
        let collection_id = self.collection_id().await?;
        let url = format!("{}/api/v1/collections/{}/query", self.endpoint, collection_id);
        let request = build_query(embedding, k);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to query Chroma: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Retrieval(format!(
                "Chroma query failed with status {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Retrieval(format!("Failed to parse Chroma response: {}", e)))
    }
}

fn build_query(embedding: Vec<f32>, k: usize) -> QueryRequest {
    QueryRequest {
        query_embeddings: vec![embedding],
        n_results: k,
        include: vec!["documents", "metadatas", "distances"],
    }
}

/// Convert the first result row into passages.
///
/// Chroma returns distances (lower is closer); they are mapped to
/// `1 / (1 + distance)` so scores are higher-is-better like every other
/// store. Records without a document text are skipped.
fn passages_from_response(response: QueryResponse) -> Vec<Passage> {
    let ids = response.ids.into_iter().next().unwrap_or_default();
    let documents = response
        .documents
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();
    let metadatas = response
        .metadatas
        .and_then(|m| m.into_iter().next())
        .unwrap_or_default();
    let distances = response
        .distances
        .and_then(|d| d.into_iter().next())
        .unwrap_or_default();

    ids.into_iter()
        .enumerate()
        .filter_map(|(i, id)| {
            let text = documents.get(i).cloned().flatten()?;
            let metadata = metadatas.get(i).cloned().flatten().unwrap_or_default();
            let distance = distances.get(i).copied().unwrap_or(0.0).max(0.0);

            let document_id = metadata
                .get("source")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| id.clone());

            let passage = Passage::new(document_id, id, 1.0 / (1.0 + distance), text);
            let page = metadata
                .get("page")
                .and_then(Value::as_u64)
                .and_then(|page| u32::try_from(page).ok());
            match page {
                Some(page) => Some(passage.with_page(page)),
                None => Some(passage),
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl VectorStoreClient for ChromaClient {
    fn backend_name(&self) -> &str {
        "chroma"
    }

    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<Passage>> {
        if k == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embed(query).await?;
        let response = self.query(embedding, k).await?;
        let passages = passages_from_response(response);

        tracing::debug!(
            "chroma search '{}' in '{}' -> {} passages",
            query,
            self.collection,
            passages.len()
        );
        Ok(passages)
    }
}
