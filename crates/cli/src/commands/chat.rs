//! Chat command handler.
//!
//! Runs one interactive conversation session over stdin/stdout. Answers go
//! to stdout; logs go to stderr.

use clap::Args;
use docchat_core::{config::AppConfig, AppResult};
use docchat_rag::{RagPipeline, Session, SessionCommand, TurnOutcome};
use std::io::{self, BufRead, Write};

/// Start an interactive conversation
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Passages retrieved per question (overrides session.topK)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let mut config = config.clone();
        if let Some(top_k) = self.top_k {
            config.session.top_k = top_k;
            config.validate()?;
        }

        let pipeline = RagPipeline::from_config(&config)?;
        let mut session = Session::from_config(&config.session);
        tracing::debug!("Chat session {} started", session.id());

        let stdin = io::stdin();
        let stdout = io::stdout();
        run_session(&pipeline, &mut session, stdin.lock(), stdout.lock()).await
    }
}

/// Read commands and queries from `input` until `exit` or end of input.
pub async fn run_session<R: BufRead, W: Write>(
    pipeline: &RagPipeline,
    session: &mut Session,
    mut input: R,
    mut output: W,
) -> AppResult<()> {
    writeln!(
        output,
        "Ask a question about your documents. Commands: history, clear, exit"
    )?;

    let mut line = String::new();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        match SessionCommand::parse(&line) {
            SessionCommand::Empty => continue,
            SessionCommand::Exit => break,
            SessionCommand::Clear => {
                session.clear();
                writeln!(output, "Conversation cleared.")?;
            }
            SessionCommand::History => {
                write!(output, "{}", session.render_history())?;
            }
            SessionCommand::Query(query) => match pipeline.ask(session, &query).await {
                Ok(outcome) => print_outcome(&mut output, &outcome)?,
                Err(e) if e.is_recoverable() => {
                    writeln!(output, "Error: {}", e)?;
                }
                Err(e) => return Err(e),
            },
        }
    }

    writeln!(output, "{}", session.summary())?;
    Ok(())
}

fn print_outcome<W: Write>(output: &mut W, outcome: &TurnOutcome) -> AppResult<()> {
    if outcome.cache_hit {
        writeln!(output, "(using cached results)")?;
    }
    if outcome.is_follow_up() {
        writeln!(output, "(follow-up)")?;
    }

    writeln!(output, "{}", outcome.answer)?;

    if !outcome.sources.is_empty() {
        writeln!(output, "Sources:")?;
        for source in &outcome.sources {
            writeln!(
                output,
                "  - {}#{} ({:.2})",
                source.document_id, source.chunk_id, source.score
            )?;
        }
    }
    writeln!(output)?;

    Ok(())
}
