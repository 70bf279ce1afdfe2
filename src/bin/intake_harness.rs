use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use resume_intake_lib::core::models::ParseRequest;
use resume_intake_lib::core::service::CoreService;

#[derive(Parser)]
#[command(name = "intake_harness", about = "Runs the resume intake pipeline on local files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the text and profile links extracted from a PDF or DOCX resume
    Document { file: PathBuf },
    /// Normalize a saved AI analysis against the resume it describes
    Analyze { file: PathBuf, ai_response: PathBuf },
    /// Parse an AI-written candidate listing
    Candidates {
        text_file: PathBuf,
        #[arg(long, default_value = "")]
        role: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value_t = 10)]
        max: usize,
        /// JSON object mapping candidate names to enhancement payloads
        #[arg(long)]
        enhancements: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    Registry::default()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or(EnvFilter::new("resume_intake_lib=info,intake_harness=info")),
        )
        .init();

    let cli = Cli::parse();
    let core = CoreService::new().await?;

    let output = match cli.command {
        Command::Document { file } => {
            let bytes = read_bytes(&file).await?;
            let extraction = core.extract_document(file_name(&file), &bytes)?;
            serde_json::to_value(extraction)?
        }
        Command::Analyze { file, ai_response } => {
            let bytes = read_bytes(&file).await?;
            let response = read_text(&ai_response).await?;
            let analysis = core
                .analyze_resume(file_name(&file), &bytes, &response)
                .await?;
            serde_json::to_value(analysis)?
        }
        Command::Candidates {
            text_file,
            role,
            location,
            max,
            enhancements,
        } => {
            let text = read_text(&text_file).await?;
            let request = ParseRequest::new(role, location, max);
            let mut records = core.parse_candidates(&text, &request).await;
            tracing::info!(count = records.len(), "parsed candidates");

            if let Some(path) = enhancements {
                let replies: HashMap<String, Value> = serde_json::from_str(&read_text(&path).await?)
                    .with_context(|| format!("invalid enhancements file {}", path.display()))?;

                records = core
                    .enhance_candidates(
                        records,
                        |candidate| {
                            let reply = replies.get(&candidate.name).map(Value::to_string);
                            async move {
                                reply.ok_or_else(|| {
                                    anyhow::anyhow!("no enhancement for {}", candidate.name)
                                })
                            }
                        },
                        &CancellationToken::new(),
                    )
                    .await;
            }

            serde_json::to_value(records)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|v| v.to_str())
}

async fn read_bytes(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn read_text(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}
