//! Prompt builder: renders a definition against a `PromptContext`.
//!
//! Rendering is pure. The same definition and context always produce the
//! same prompt text.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptContext, PromptDefinition};
use docchat_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde::Serialize;

/// Build a prompt from a definition and the turn's context.
///
/// # Example
/// ```no_run
/// use docchat_prompt::{build_prompt, default_prompt, PromptContext};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let context = PromptContext {
///     query: "How can I return a product?".to_string(),
///     ..Default::default()
/// };
/// let built = build_prompt(&default_prompt(), &context)?;
/// println!("{}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    context: &PromptContext,
) -> AppResult<BuiltPrompt> {
    tracing::debug!(
        "Building prompt '{}' ({} passages, {} history turns, follow_up: {})",
        definition.id,
        context.passages.len(),
        context.history.len(),
        context.follow_up
    );

    let user = render_template(&definition.template, context)?;

    Ok(BuiltPrompt {
        system: definition.system.clone(),
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            passages_included: context.passages.len(),
            history_turns: context.history.len(),
            follow_up: context.follow_up,
        },
    })
}

/// Render a Handlebars template with any serializable data.
fn render_template<T: Serialize>(template: &str, data: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text prompt: no HTML escaping
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", data)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}
