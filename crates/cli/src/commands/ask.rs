//! Ask command handler.
//!
//! Answers a single question in a fresh session.

use clap::Args;
use docchat_core::{config::AppConfig, AppResult};
use docchat_rag::{RagPipeline, Session, TurnOutcome};

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Passages retrieved for the question (overrides session.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.session.top_k = top_k;
            config.validate()?;
        }

        let pipeline = RagPipeline::from_config(&config)?;
        let mut session = Session::from_config(&config.session);
        let outcome = pipeline.ask(&mut session, &self.query).await?;

        if self.json {
            println!("{}", format_json(&outcome)?);
        } else {
            println!("{}", format_text(&outcome));
        }

        Ok(())
    }
}

/// Structured output for `--json`.
fn format_json(outcome: &TurnOutcome) -> AppResult<String> {
    let output = serde_json::json!({
        "answer": outcome.answer,
        "sources": outcome.sources,
        "cacheHit": outcome.cache_hit,
        "followUp": outcome.is_follow_up(),
        "grounded": outcome.grounded,
    });

    Ok(serde_json::to_string_pretty(&output)?)
}

fn format_text(outcome: &TurnOutcome) -> String {
    let mut text = outcome.answer.clone();

    if !outcome.sources.is_empty() {
        text.push_str("\n\nSources:");
        for source in &outcome.sources {
            text.push_str(&format!("\n  - {}#{}", source.document_id, source.chunk_id));
        }
    }

    text
}
