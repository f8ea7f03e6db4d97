use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use reply_assist::config::PipelineConfig;
use reply_assist::email::EmailInput;
use reply_assist::embeddings::{EmbeddingConfig, create_embedder};
use reply_assist::error::{ConfigError, Result};
use reply_assist::llm::{LlmConfig, create_provider};
use reply_assist::pipeline::{EmailPipeline, PipelineOutcome, Tone};
use reply_assist::retrieval::{ReferenceCorpora, SimilarityIndex};

/// Draft a reviewed reply to an email.
#[derive(Debug, Parser)]
#[command(name = "reply-assist", version, long_about = None)]
struct Args {
    /// Use the casual drafter instead of the professional one
    #[arg(long)]
    casual: bool,

    /// Print the best policy and example match for QUERY, then exit
    #[arg(long, value_name = "QUERY")]
    rank: Option<String>,

    /// Email to answer: plain text or RFC 5322 (reads stdin when omitted)
    file: Option<PathBuf>,
}

impl Args {
    fn tone(&self) -> Tone {
        if self.casual {
            Tone::Casual
        } else {
            Tone::Professional
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries only the JSON outcome.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // Exit code 2 is reserved for an exhausted revision budget.
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "reply-assist failed");
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let tone = args.tone();

    let embedding_config = EmbeddingConfig::from_env()?;
    let embedder = create_embedder(&embedding_config)?;

    let corpora = match std::env::var("REPLY_ASSIST_CORPUS_PATH") {
        Ok(path) => ReferenceCorpora::from_json_file(Path::new(&path), embedder).await?,
        Err(_) => ReferenceCorpora::builtin(embedder).await?,
    };

    if let Some(query) = args.rank {
        print_best_matches(&corpora, &query).await?;
        return Ok(ExitCode::SUCCESS);
    }

    let pipeline_config = PipelineConfig::from_env()?;
    let llm_config = LlmConfig::from_env()?;
    let llm = create_provider(&llm_config)?;

    info!(
        model = %llm_config.model,
        embedder = ?embedding_config.backend,
        tone = %tone,
        "Starting reply-assist v{}",
        env!("CARGO_PKG_VERSION")
    );

    let raw = read_input(args.file.as_ref()).await?;
    let email = EmailInput::parse(&raw)?;

    let pipeline = EmailPipeline::builder(llm, Arc::new(corpora))
        .config(pipeline_config)
        .build()?;
    let outcome = pipeline.process_email(&email.content(), tone).await;

    let json = serde_json::to_string_pretty(&outcome)
        .map_err(|e| ConfigError::ParseError(format!("cannot render outcome: {e}")))?;
    println!("{json}");

    Ok(match outcome {
        PipelineOutcome::Success(_) => ExitCode::SUCCESS,
        PipelineOutcome::Failed { .. } => ExitCode::from(2),
        PipelineOutcome::Error { .. } => ExitCode::from(1),
    })
}

async fn read_input(file: Option<&PathBuf>) -> Result<String> {
    let raw = match file {
        Some(path) => tokio::fs::read_to_string(path).await.map_err(ConfigError::Io)?,
        None => tokio::task::spawn_blocking(|| {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map(|_| buf)
        })
        .await
        .map_err(|e| ConfigError::Io(std::io::Error::other(e)))?
        .map_err(ConfigError::Io)?,
    };
    Ok(raw)
}

/// Print the best match per corpus with its score.
async fn print_best_matches(corpora: &ReferenceCorpora, query: &str) -> Result<()> {
    let mut report = serde_json::Map::new();
    for index in [corpora.policies(), corpora.examples()] {
        report.insert(index.name().to_string(), best_match(index, query).await?);
    }
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| ConfigError::ParseError(format!("cannot render matches: {e}")))?;
    println!("{json}");
    Ok(())
}

async fn best_match(index: &SimilarityIndex, query: &str) -> Result<serde_json::Value> {
    let ranked = index.rank(query).await?;
    Ok(match ranked.first() {
        Some(hit) => serde_json::json!({ "label": hit.label, "score": hit.score }),
        None => serde_json::json!({ "label": null, "message": index.sentinel() }),
    })
}
