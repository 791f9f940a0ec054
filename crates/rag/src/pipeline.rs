//! Retrieve, augment, generate.
//!
//! A [`RagPipeline`] holds the shared collaborators (vector store, LLM,
//! prompt definition) and no per-conversation state. All conversation state
//! lives in the [`Session`] passed to [`RagPipeline::ask`], so one pipeline
//! can serve many sessions without leaking context between them.
//!
//! A turn either commits completely or not at all: the cache write and the
//! memory append happen only after the answer has been generated.

use crate::cache::ResultCache;
use crate::followup::{self, Classification};
use crate::memory::{ConversationMemory, Exchange};
use crate::session::Session;
use crate::store::{self, VectorStoreClient};
use crate::types::{Passage, SourceRef};
use docchat_core::{AppConfig, AppError, AppResult};
use docchat_llm::{LlmClient, LlmRequest};
use docchat_prompt::{
    build_prompt, load_prompt, BuiltPrompt, ContextPassage, HistoryTurn, PromptContext,
    PromptDefinition, DEFAULT_PROMPT_ID,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Exchanges included in the prompt of a follow-up turn.
pub const HISTORY_TURNS: usize = 3;

/// Generation and retrieval parameters.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub model: String,
    pub top_k: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            top_k: config.session.top_k,
            temperature: config.session.temperature,
            max_tokens: config.session.max_tokens,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            top_k: 5,
            temperature: 0.3,
            max_tokens: 1000,
        }
    }
}

/// Result of the retrieve stage.
#[derive(Debug, Clone)]
pub struct Retrieval {
    /// Query sent to the cache and the store (rewritten for follow-ups)
    pub query: String,
    pub passages: Vec<Passage>,
    pub cache_hit: bool,
    /// The store failed and the turn continues without context
    pub degraded: bool,
}

impl Retrieval {
    pub fn is_grounded(&self) -> bool {
        !self.passages.is_empty()
    }

    /// Whether a successful turn should store these passages in the cache.
    ///
    /// Hits are already cached; failed and empty retrievals are never cached
    /// so the next attempt goes back to the store.
    pub fn needs_caching(&self) -> bool {
        !self.cache_hit && !self.degraded && !self.passages.is_empty()
    }
}

/// What a successful turn reports to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub classification: Classification,
    pub cache_hit: bool,
    /// At least one passage backed the answer
    pub grounded: bool,
    pub retrieval_query: String,
}

impl TurnOutcome {
    pub fn is_follow_up(&self) -> bool {
        self.classification.is_follow_up()
    }
}

pub struct RagPipeline {
    store: Arc<dyn VectorStoreClient>,
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    options: PipelineOptions,
}

impl RagPipeline {
    pub fn new(
        store: Arc<dyn VectorStoreClient>,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
        options: PipelineOptions,
    ) -> Self {
        Self {
            store,
            llm,
            prompt,
            options,
        }
    }

    /// Wire the configured store, LLM provider and answer prompt.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let store = store::create_store(&config.retrieval, &config.workspace)?;

        let llm = docchat_llm::create_client(
            &config.provider,
            config.provider_endpoint(),
            config.provider_timeout(),
        )
        .map_err(|e| AppError::Config(format!("Failed to create LLM client: {}", e)))?;

        let prompt = load_prompt(&config.workspace, DEFAULT_PROMPT_ID)?;

        tracing::debug!(
            "Pipeline ready (store: {}, provider: {}, model: {}, prompt: {})",
            store.backend_name(),
            llm.provider_name(),
            config.model,
            prompt.id
        );

        Ok(Self::new(store, llm, prompt, PipelineOptions::from_config(config)))
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Fetch passages for `query`, from the cache when possible.
    ///
    /// Follow-ups are rewritten with the previous topic first. Never fails:
    /// a store error yields an empty, degraded retrieval. The cache is only
    /// read here; hits and misses are recorded when the turn commits.
    pub async fn retrieve(
        &self,
        query: &str,
        classification: &Classification,
        memory: &ConversationMemory,
        cache: &ResultCache,
    ) -> Retrieval {
        let search_query = if classification.is_follow_up() {
            followup::rewrite_query(query, memory)
        } else {
            query.trim().to_string()
        };

        if search_query != query.trim() {
            tracing::debug!("Rewrote follow-up query to '{}'", search_query);
        }

        if let Some(entry) = cache.peek(&search_query) {
            return Retrieval {
                query: search_query,
                passages: entry.passages.clone(),
                cache_hit: true,
                degraded: false,
            };
        }

        match self.store.search(&search_query, self.options.top_k).await {
            Ok(passages) => {
                tracing::debug!(
                    "Retrieved {} passages from {}",
                    passages.len(),
                    self.store.backend_name()
                );
                Retrieval {
                    query: search_query,
                    passages,
                    cache_hit: false,
                    degraded: false,
                }
            }
            Err(e) => {
                tracing::warn!("Retrieval failed, answering without context: {}", e);
                Retrieval {
                    query: search_query,
                    passages: Vec::new(),
                    cache_hit: false,
                    degraded: true,
                }
            }
        }
    }

    /// Render the generation prompt. Pure: reads memory, writes nothing.
    ///
    /// History is included only for follow-ups.
    pub fn augment(
        &self,
        query: &str,
        retrieval: &Retrieval,
        classification: &Classification,
        memory: &ConversationMemory,
    ) -> AppResult<BuiltPrompt> {
        let passages = retrieval
            .passages
            .iter()
            .enumerate()
            .map(|(i, p)| ContextPassage {
                number: i + 1,
                document_id: p.source.document_id.clone(),
                chunk_id: p.source.chunk_id.clone(),
                page: p.page,
                text: p.text.clone(),
            })
            .collect();

        let history = if classification.is_follow_up() {
            memory
                .recent(HISTORY_TURNS)
                .into_iter()
                .map(|exchange| HistoryTurn {
                    query: exchange.query().to_string(),
                    answer: exchange.answer().to_string(),
                })
                .collect()
        } else {
            Vec::new()
        };

        let context = PromptContext {
            query: query.trim().to_string(),
            passages,
            history,
            follow_up: classification.is_follow_up(),
        };

        build_prompt(&self.prompt, &context)
    }

    /// Ask the LLM for an answer. Blank completions count as failures.
    pub async fn generate(&self, prompt: &BuiltPrompt) -> AppResult<String> {
        let mut request = LlmRequest::new(prompt.user.clone(), self.options.model.clone())
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.max_tokens);

        if let Some(system) = &prompt.system {
            request = request.with_system(system.clone());
        }

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AppError::Generation(format!("LLM request failed: {}", e)))?;

        tracing::debug!(
            "Generation finished (model: {}, {} prompt tokens, {} completion tokens)",
            response.model,
            response.usage.prompt_tokens,
            response.usage.completion_tokens
        );

        let answer = response.content.trim();
        if answer.is_empty() {
            return Err(AppError::Generation(format!(
                "{} returned an empty answer",
                self.llm.provider_name()
            )));
        }

        Ok(answer.to_string())
    }

    /// Run one conversation turn against `session`.
    ///
    /// On error the session's memory and cache entries are exactly as they
    /// were before the call and the session stays usable.
    pub async fn ask(&self, session: &mut Session, query: &str) -> AppResult<TurnOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Other("Query is empty".to_string()));
        }

        let span = tracing::info_span!("turn", session = %session.id, turn = session.turn_number());
        let result = self.run_turn(session, query).instrument(span).await;

        if result.is_err() {
            session.failed_turns += 1;
        }
        result
    }

    async fn run_turn(&self, session: &mut Session, query: &str) -> AppResult<TurnOutcome> {
        let started = Instant::now();

        let classification = session.detector.classify(query, &session.memory);
        let retrieval = self
            .retrieve(query, &classification, &session.memory, &session.cache)
            .await;

        let prompt = self.augment(query, &retrieval, &classification, &session.memory)?;
        tracing::debug!(
            "Prompt built ({} passages, {} history turns)",
            prompt.metadata.passages_included,
            prompt.metadata.history_turns
        );

        let answer = match self.generate(&prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Turn failed: {}", e);
                return Err(e);
            }
        };

        // Commit
        if retrieval.cache_hit {
            session.cache.record_hit(&retrieval.query);
        } else {
            session.cache.record_miss(&retrieval.query);
        }
        if retrieval.needs_caching() {
            session.cache.put(&retrieval.query, retrieval.passages.clone());
        }

        let sources: Vec<SourceRef> = retrieval.passages.iter().map(|p| p.source.clone()).collect();
        session.memory.append(Exchange::new(
            query,
            retrieval.query.clone(),
            answer.clone(),
            sources.clone(),
            classification.kind,
        ));
        session.queries_processed += 1;

        tracing::info!(
            "Answered {} query ({}, {} passages, cache {}) in {:?}",
            classification.kind,
            classification.rule.as_str(),
            sources.len(),
            if retrieval.cache_hit { "hit" } else { "miss" },
            started.elapsed()
        );

        Ok(TurnOutcome {
            grounded: retrieval.is_grounded(),
            answer,
            sources,
            classification,
            cache_hit: retrieval.cache_hit,
            retrieval_query: retrieval.query,
        })
    }
}
