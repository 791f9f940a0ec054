//! Canned store and LLM for command tests.

use docchat_core::{AppError, AppResult};
use docchat_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use docchat_prompt::default_prompt;
use docchat_rag::{Passage, PipelineOptions, RagPipeline, VectorStoreClient};
use std::sync::Arc;

pub(crate) struct CannedStore;

#[async_trait::async_trait]
impl VectorStoreClient for CannedStore {
    fn backend_name(&self) -> &str {
        "canned"
    }

    async fn search(&self, _query: &str, _k: usize) -> AppResult<Vec<Passage>> {
        Ok(vec![Passage::new(
            "returns.pdf",
            "returns_chunk_0",
            0.9,
            "You can return a product within 30 days of delivery.",
        )
        .with_page(1)])
    }
}

pub(crate) struct CannedLlm {
    fail: bool,
}

#[async_trait::async_trait]
impl LlmClient for CannedLlm {
    fn provider_name(&self) -> &str {
        "canned"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        if self.fail {
            return Err(AppError::Llm("connection refused".to_string()));
        }

        Ok(LlmResponse {
            content: "Grounded answer".to_string(),
            model: request.model.clone(),
            usage: LlmUsage::default(),
            done: true,
        })
    }
}

pub(crate) fn pipeline(fail_llm: bool) -> RagPipeline {
    RagPipeline::new(
        Arc::new(CannedStore),
        Arc::new(CannedLlm { fail: fail_llm }),
        default_prompt(),
        PipelineOptions::default(),
    )
}
