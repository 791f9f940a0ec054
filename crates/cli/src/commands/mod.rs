//! Command handlers for the docchat CLI.

pub mod ask;
pub mod chat;
pub mod prompts;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use prompts::PromptsCommand;

#[cfg(test)]
pub(crate) mod fakes;
