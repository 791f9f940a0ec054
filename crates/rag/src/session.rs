//! Per-conversation state and the session command surface.

use crate::cache::ResultCache;
use crate::followup::FollowUpDetector;
use crate::memory::ConversationMemory;
use chrono::{DateTime, Utc};
use docchat_core::SessionConfig;
use uuid::Uuid;

/// State of one conversation.
///
/// Memory and cache share the session lifecycle: they are created together
/// and cleared together. Sessions are never shared between users.
#[derive(Debug)]
pub struct Session {
    pub(crate) id: Uuid,
    pub(crate) memory: ConversationMemory,
    pub(crate) cache: ResultCache,
    pub(crate) detector: FollowUpDetector,
    pub(crate) queries_processed: u64,
    pub(crate) failed_turns: u64,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(memory_capacity: usize, cache_capacity: usize) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            memory: ConversationMemory::new(memory_capacity),
            cache: ResultCache::new(cache_capacity),
            detector: FollowUpDetector::new(),
            queries_processed: 0,
            failed_turns: 0,
            started_at: Utc::now(),
        };
        tracing::debug!(
            "Started session {} (memory: {}, cache: {})",
            session.id,
            session.memory.capacity(),
            session.cache.capacity()
        );
        session
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.memory_capacity, config.cache_capacity)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Successful turns so far.
    pub fn queries_processed(&self) -> u64 {
        self.queries_processed
    }

    pub fn failed_turns(&self) -> u64 {
        self.failed_turns
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Number of the next turn, counting failed ones.
    pub fn turn_number(&self) -> u64 {
        self.queries_processed + self.failed_turns + 1
    }

    /// Forget the conversation: empties memory and cache together.
    pub fn clear(&mut self) {
        self.memory.clear();
        self.cache.clear();
        tracing::info!("Session {} cleared", self.id);
    }

    /// Verbatim memory contents for the `history` command.
    pub fn render_history(&self) -> String {
        self.memory.render()
    }

    /// Closing report for the `exit` command.
    pub fn summary(&self) -> String {
        if self.failed_turns == 0 {
            format!("Processed {} queries", self.queries_processed)
        } else {
            format!(
                "Processed {} queries ({} failed)",
                self.queries_processed, self.failed_turns
            )
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// One line of user input, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Reset memory and cache
    Clear,
    /// End the session
    Exit,
    /// Show conversation memory
    History,
    /// Blank line, ignored
    Empty,
    Query(String),
}

impl SessionCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();

        match trimmed.to_lowercase().as_str() {
            "" => Self::Empty,
            "clear" => Self::Clear,
            "exit" | "quit" => Self::Exit,
            "history" => Self::History,
            _ => Self::Query(trimmed.to_string()),
        }
    }
}
