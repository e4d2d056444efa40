//! Reelscope CLI: analyze a short video and pick a cover frame.
//!
//! Set GEMINI_API_KEY (and optionally the other settings) in the
//! environment or a `.env` file.

use anyhow::Context;
use clap::{Parser, Subcommand};
use reelscope_cli::{
    format_progress, format_structured, init_tracing, mime_from_extension, offline_parser,
    LogFormat,
};
use reelscope_core::{AnalysisConfig, Config, JobOutcome};
use reelscope_remote::ProgressReporter;
use reelscope_worker::JobOrchestrator;
use serde::Serialize;
use std::path::PathBuf;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "reelscope", about = "Short-video analysis with Gemini")]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a video, wait for the analysis and extract a cover frame
    Analyze {
        /// Path to the video file
        file: PathBuf,
        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
        /// File containing a custom analysis prompt
        #[arg(long)]
        prompt_file: Option<PathBuf>,
        /// Where to write the cover frame (format follows the extension)
        #[arg(long)]
        thumbnail_out: Option<PathBuf>,
        /// Print a JSON summary instead of the full text
        #[arg(long)]
        json: bool,
    },
    /// Extract structured fields from a saved analysis text
    Parse {
        /// Path to the analysis text
        text_file: PathBuf,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Analyze {
            file,
            mime,
            prompt_file,
            thumbnail_out,
            json,
        } => {
            let config = Config::from_env().context(
                "Failed to load configuration. Set GEMINI_API_KEY in the environment or .env",
            )?;
            tracing::debug!(config = ?config.as_analysis(), "Configuration loaded");

            let mime = match mime {
                Some(mime) => mime,
                None => mime_from_extension(&file)
                    .map(|m| m.to_string())
                    .with_context(|| {
                        format!("Cannot guess MIME type of {}; pass --mime", file.display())
                    })?,
            };

            let prompt = match prompt_file {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("Failed to read prompt {}", path.display()))?,
                ),
                None => None,
            };

            let orchestrator =
                JobOrchestrator::from_config(config).context("Failed to set up pipeline")?;

            let (tx, mut rx) = mpsc::unbounded_channel();
            let printer = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    eprintln!("{}", format_progress(&event));
                }
            });

            let outcome = orchestrator
                .run_job(
                    &file,
                    &mime,
                    prompt.as_deref(),
                    ProgressReporter::new(Some(tx)),
                )
                .await;
            let _ = printer.await;

            if let Some(out) = &thumbnail_out {
                match outcome.thumbnail() {
                    Some(thumbnail) => {
                        thumbnail
                            .save(out)
                            .with_context(|| format!("Failed to save {}", out.display()))?;
                        tracing::info!(
                            path = %out.display(),
                            at_secs = thumbnail.timestamp_secs,
                            "Cover frame saved"
                        );
                    }
                    None if outcome.is_success() => {
                        tracing::warn!("No cover frame could be extracted");
                    }
                    None => {}
                }
            }

            if json {
                print_json(&outcome.summary())?;
            } else if let JobOutcome::Success { analysis, thumbnail } = &outcome {
                println!("{}\n", analysis.text);
                println!("{}", format_structured(&analysis.structured));
                if let Some(thumbnail) = thumbnail {
                    println!(
                        "Cover frame:    {:.1}s ({}x{})",
                        thumbnail.timestamp_secs,
                        thumbnail.width(),
                        thumbnail.height()
                    );
                }
            }

            if let JobOutcome::Failure { kind, message } = outcome {
                anyhow::bail!("Analysis failed [{}]: {}", kind.error_code(), message);
            }
        }
        Commands::Parse { text_file } => {
            let text = tokio::fs::read_to_string(&text_file)
                .await
                .with_context(|| format!("Failed to read {}", text_file.display()))?;
            let config = AnalysisConfig::parsing_from_env()
                .context("Failed to load parser configuration")?;
            let parser = offline_parser(config)?;
            print_json(&parser.parse(&text))?;
        }
    }

    Ok(())
}
