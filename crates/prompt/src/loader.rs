//! Prompt loader: workspace YAML overrides with a built-in fallback.

use crate::types::PromptDefinition;
use docchat_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

/// Identifier of the prompt used to answer a conversation turn.
pub const DEFAULT_PROMPT_ID: &str = "rag.answer";

const DEFAULT_SYSTEM: &str = "You are a document assistant answering questions about the user's document collection.

Instructions:
- Answer only from the numbered context passages provided
- Cite passages by their number in square brackets, e.g. [1]
- If the context does not contain the answer, state: \"I could not find this information in the available documents.\"
- Keep your response concise and factual
";

const DEFAULT_TEMPLATE: &str = "{{#if follow_up}}This question continues the conversation below. Briefly acknowledge the continuity (for example \"As we discussed earlier\") before answering.

{{/if}}{{#if history}}Conversation so far:
{{#each history}}User: {{query}}
Assistant: {{answer}}
{{/each}}
{{/if}}Relevant context from documents:
{{#if passages}}{{#each passages}}[{{number}}] {{document_id}}#{{chunk_id}}{{#if page}} (page {{page}}){{/if}}
{{text}}

{{/each}}{{else}}No relevant context was found in the documents.

{{/if}}Question: {{query}}
";

/// The built-in answer prompt.
pub fn default_prompt() -> PromptDefinition {
    PromptDefinition {
        id: DEFAULT_PROMPT_ID.to_string(),
        title: "Grounded conversational answer".to_string(),
        api_version: "1.0".to_string(),
        system: Some(DEFAULT_SYSTEM.to_string()),
        template: DEFAULT_TEMPLATE.to_string(),
    }
}

/// Load a prompt definition by ID.
///
/// Looks for `<workspace>/.docchat/prompts/<id>.yml` first. When no override
/// exists, the built-in definition is returned for `rag.answer`; any other id
/// is an error.
///
/// # Example
/// ```no_run
/// use docchat_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = prompts_dir(workspace_path).join(format!("{}.yml", prompt_id));

    if !prompt_file.exists() {
        if prompt_id == DEFAULT_PROMPT_ID {
            tracing::debug!("Using built-in prompt '{}'", prompt_id);
            return Ok(default_prompt());
        }

        return Err(AppError::Prompt(format!(
            "Prompt file not found: {:?}",
            prompt_file
        )));
    }

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt override: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// List the prompt overrides present in the workspace.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<String>> {
    let dir = prompts_dir(workspace_path);

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut prompt_ids = Vec::new();

    for entry in walkdir::WalkDir::new(&dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("yml") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                prompt_ids.push(stem.to_string());
            }
        }
    }

    prompt_ids.sort();
    Ok(prompt_ids)
}

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(".docchat").join("prompts")
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.trim().is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
