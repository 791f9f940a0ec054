//! Prompt system for docchat.
//!
//! This crate turns retrieved passages, recent conversation turns and the
//! current question into the text sent to the language model:
//! - YAML prompt definitions with a built-in default (`rag.answer`)
//! - Handlebars template rendering
//! - Workspace overrides under `.docchat/prompts/`

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{default_prompt, list_prompts, load_prompt, DEFAULT_PROMPT_ID};
pub use types::{
    BuiltPrompt, BuiltPromptMetadata, ContextPassage, HistoryTurn, PromptContext,
    PromptDefinition, NO_CONTEXT_MARKER,
};
