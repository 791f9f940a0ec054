//! Retrieval data types shared by the cache, the stores and the pipeline.

use serde::{Deserialize, Serialize};

/// Identifies a retrieved passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source document (the indexed file name)
    pub document_id: String,

    /// Chunk within the document
    pub chunk_id: String,

    /// Relevance score, higher is better
    pub score: f32,
}

/// A retrieved passage: provenance plus text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub source: SourceRef,

    pub text: String,

    /// Page in the source document, when the index records one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Passage {
    pub fn new(
        document_id: impl Into<String>,
        chunk_id: impl Into<String>,
        score: f32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source: SourceRef {
                document_id: document_id.into(),
                chunk_id: chunk_id.into(),
                score,
            },
            text: text.into(),
            page: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }
}
