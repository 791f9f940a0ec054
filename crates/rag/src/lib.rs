//! Conversational retrieval-augmented answering.
//!
//! A [`Session`] owns the per-conversation state (bounded memory of past
//! exchanges and a retrieval cache). A [`RagPipeline`] is shared across
//! sessions and runs each turn as retrieve, augment, generate:
//!
//! 1. [`FollowUpDetector`] classifies the query against the session memory
//! 2. follow-ups are rewritten with the previous topic before retrieval
//! 3. the [`ResultCache`] is consulted, then the [`VectorStoreClient`]
//! 4. the prompt is rendered with passages (and history for follow-ups)
//! 5. the LLM answers and the exchange is recorded

pub mod cache;
pub mod followup;
pub mod memory;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod text;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use cache::{normalize_query, CacheEntry, CacheStats, ResultCache};
pub use followup::{Classification, FollowUpDetector, FollowUpRule, QueryKind};
pub use memory::{ConversationMemory, Exchange};
pub use pipeline::{PipelineOptions, RagPipeline, Retrieval, TurnOutcome};
pub use session::{Session, SessionCommand};
pub use store::{create_store, VectorStoreClient};
pub use types::{Passage, SourceRef};
