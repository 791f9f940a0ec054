//! Prompts command handler.
//!
//! Lists the answer prompt in effect and any workspace prompt overrides.

use clap::Args;
use docchat_core::{config::AppConfig, AppResult};
use docchat_prompt::{list_prompts, load_prompt, DEFAULT_PROMPT_ID};
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// List available prompts
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing prompts command");

        let entries = collect(&config.workspace)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else {
            for entry in &entries {
                println!("{}", entry);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct PromptEntry {
    id: String,
    title: String,
    overridden: bool,
}

impl fmt::Display for PromptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = if self.overridden { "workspace" } else { "built-in" };
        write!(f, "{:<12} {} ({})", self.id, self.title, origin)
    }
}

/// The default prompt first, then every other override, by id.
fn collect(workspace: &Path) -> AppResult<Vec<PromptEntry>> {
    let overrides = list_prompts(workspace)?;

    let default = load_prompt(workspace, DEFAULT_PROMPT_ID)?;
    let mut entries = vec![PromptEntry {
        id: default.id,
        title: default.title,
        overridden: overrides.iter().any(|id| id == DEFAULT_PROMPT_ID),
    }];

    for id in overrides.iter().filter(|id| *id != DEFAULT_PROMPT_ID) {
        let def = load_prompt(workspace, id)?;
        entries.push(PromptEntry {
            id: def.id,
            title: def.title,
            overridden: true,
        });
    }

    Ok(entries)
}
