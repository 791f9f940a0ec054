//! Prompt types for docchat.

use serde::{Deserialize, Serialize};

/// Sentence the default template emits when retrieval found nothing.
pub const NO_CONTEXT_MARKER: &str = "No relevant context was found in the documents.";

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// System message sent alongside the rendered template
    #[serde(default)]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// One retrieved passage as the template sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextPassage {
    /// 1-based citation number
    pub number: usize,
    pub document_id: String,
    pub chunk_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub text: String,
}

/// One earlier exchange as the template sees it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryTurn {
    pub query: String,
    pub answer: String,
}

/// Everything a template can reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptContext {
    /// The user's question as typed
    pub query: String,

    /// Retrieved passages, best first
    pub passages: Vec<ContextPassage>,

    /// Prior exchanges, oldest first; empty for fresh topics
    pub history: Vec<HistoryTurn>,

    /// Whether the question continues the previous topic
    pub follow_up: bool,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuiltPromptMetadata {
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    #[serde(rename = "passagesIncluded")]
    pub passages_included: usize,

    #[serde(rename = "historyTurns")]
    pub history_turns: usize,

    #[serde(rename = "followUp")]
    pub follow_up: bool,
}
