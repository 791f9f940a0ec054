//! Bounded conversation memory.
//!
//! Holds the last N exchanges of one session in chronological order. When an
//! append would exceed N, the oldest exchange is dropped.

use crate::followup::QueryKind;
use crate::types::SourceRef;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of exchanges remembered per session.
pub const DEFAULT_MEMORY_CAPACITY: usize = 3;

/// One recorded query/answer/sources triple.
///
/// Fields are private: an exchange cannot change after it is recorded.
#[derive(Debug, Clone, Serialize)]
pub struct Exchange {
    query: String,
    retrieval_query: String,
    answer: String,
    sources: Vec<SourceRef>,
    kind: QueryKind,
    timestamp: DateTime<Utc>,
}

impl Exchange {
    pub fn new(
        query: impl Into<String>,
        retrieval_query: impl Into<String>,
        answer: impl Into<String>,
        sources: Vec<SourceRef>,
        kind: QueryKind,
    ) -> Self {
        Self {
            query: query.into(),
            retrieval_query: retrieval_query.into(),
            answer: answer.into(),
            sources,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// The query as the user typed it.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// The query actually sent to retrieval (rewritten for follow-ups).
    pub fn retrieval_query(&self) -> &str {
        &self.retrieval_query
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn sources(&self) -> &[SourceRef] {
        &self.sources
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// FIFO log of at most `capacity` exchanges.
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    capacity: usize,
    exchanges: VecDeque<Exchange>,
}

impl ConversationMemory {
    /// Create an empty memory. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            exchanges: VecDeque::with_capacity(capacity),
        }
    }

    /// Add an exchange at the tail, returning the evicted head if any.
    pub fn append(&mut self, exchange: Exchange) -> Option<Exchange> {
        self.exchanges.push_back(exchange);

        if self.exchanges.len() > self.capacity {
            let evicted = self.exchanges.pop_front();
            if let Some(ref old) = evicted {
                tracing::debug!("Evicted oldest exchange: {}", old.query());
            }
            evicted
        } else {
            None
        }
    }

    /// The last `k` exchanges, most recent last. `k` larger than the
    /// current size returns everything.
    pub fn recent(&self, k: usize) -> Vec<&Exchange> {
        let skip = self.exchanges.len().saturating_sub(k);
        self.exchanges.iter().skip(skip).collect()
    }

    pub fn last(&self) -> Option<&Exchange> {
        self.exchanges.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter()
    }

    pub fn clear(&mut self) {
        self.exchanges.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Full text of every remembered exchange, oldest first.
    pub fn render(&self) -> String {
        if self.exchanges.is_empty() {
            return "(no conversation history)\n".to_string();
        }

        let mut out = String::new();

        for (i, exchange) in self.exchanges.iter().enumerate() {
            out.push_str(&format!(
                "[{}] {} ({})\n",
                i + 1,
                exchange.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                exchange.kind.as_str()
            ));
            out.push_str(&format!("Q: {}\n", exchange.query));
            if exchange.retrieval_query != exchange.query {
                out.push_str(&format!("Searched: {}\n", exchange.retrieval_query));
            }
            out.push_str(&format!("A: {}\n", exchange.answer));

            if exchange.sources.is_empty() {
                out.push_str("Sources: none\n");
            } else {
                let sources: Vec<String> = exchange
                    .sources
                    .iter()
                    .map(|s| format!("{}#{} ({:.2})", s.document_id, s.chunk_id, s.score))
                    .collect();
                out.push_str(&format!("Sources: {}\n", sources.join(", ")));
            }
        }

        out
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}
