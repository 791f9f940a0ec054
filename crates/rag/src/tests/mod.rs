//! Conversation scenario tests with in-process store and LLM doubles.


use crate::pipeline::{PipelineOptions, RagPipeline};
use crate::store::{JsonlStore, VectorStoreClient};
use crate::types::Passage;
use docchat_core::{AppError, AppResult};
use docchat_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use docchat_prompt::default_prompt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) const CORPUS: &str = r#"
{"document_id": "returns.pdf", "chunk_id": "returns_chunk_0", "text": "You can return a product within 30 days of delivery.", "page": 1}
{"document_id": "returns.pdf", "chunk_id": "returns_chunk_1", "text": "The return timeframe is extended to 60 days for members.", "page": 2}
{"document_id": "shipping.pdf", "chunk_id": "shipping_chunk_0", "text": "Shipping costs depend on the destination. National shipping costs $5 and international shipping costs $20.", "page": 1}
{"document_id": "shipping.pdf", "chunk_id": "shipping_chunk_1", "text": "Express shipping delivers within two business days.", "page": 3}
"#;

/// Lexical store over [`CORPUS`] that counts searches and can be made to fail.
pub(crate) struct FakeStore {
    inner: JsonlStore,
    searches: AtomicUsize,
    fail: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            inner: JsonlStore::from_jsonl(CORPUS).unwrap(),
            searches: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl VectorStoreClient for FakeStore {
    fn backend_name(&self) -> &str {
        "fake"
    }

    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<Passage>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Retrieval("connection refused".to_string()));
        }
        self.inner.search(query, k).await
    }
}

/// LLM double that records every prompt and answers "Answer N".
pub(crate) struct FakeLlm {
    prompts: Mutex<Vec<String>>,
    fail: AtomicBool,
    blank: AtomicBool,
}

impl FakeLlm {
    pub fn new() -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            blank: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_blank(&self, blank: bool) {
        self.blank.store(blank, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl LlmClient for FakeLlm {
    fn provider_name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let n = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(request.prompt.clone());
            prompts.len()
        };

        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Llm("endpoint unreachable".to_string()));
        }

        let content = if self.blank.load(Ordering::SeqCst) {
            "   ".to_string()
        } else {
            format!("Answer {}", n)
        };

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage: LlmUsage::default(),
            done: true,
        })
    }
}

pub(crate) struct Harness {
    pub store: Arc<FakeStore>,
    pub llm: Arc<FakeLlm>,
    pub pipeline: RagPipeline,
}

pub(crate) fn harness() -> Harness {
    let store = Arc::new(FakeStore::new());
    let llm = Arc::new(FakeLlm::new());
    let pipeline = RagPipeline::new(
        store.clone(),
        llm.clone(),
        default_prompt(),
        PipelineOptions::default(),
    );

    Harness {
        store,
        llm,
        pipeline,
    }
}
