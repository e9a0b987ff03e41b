//! Lektor development CLI.
//!
//! A thin harness for exercising the pipeline locally; the library is the
//! product and is normally invoked in-process by request handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use lektor::config::Settings;
use lektor::orchestrator::Orchestrator;
use lektor::rag::SummaryType;
use lektor::LektorError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "lektor", about = "Lecture-video RAG pipeline (dev harness)")]
struct Cli {
    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a configuration file.
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a transcript and print it.
    Transcript {
        /// Video URL or id.
        input: String,
    },

    /// Acquire a transcript and index it for retrieval.
    Ingest {
        /// Video URL or id.
        input: String,
    },

    /// Ask a question about an indexed video.
    Ask {
        /// Video URL or id.
        input: String,
        /// The question.
        question: String,
    },

    /// Summarize a video with retrieval-backed context.
    Summarize {
        /// Video URL or id.
        input: String,
        /// Summary type: brief, bullet, or detailed.
        #[arg(long, default_value = "detailed")]
        summary_type: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lektor={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;

    let orchestrator = Orchestrator::new(settings)?;

    match &cli.command {
        Commands::Transcript { input } => {
            let (video_id, transcript) = orchestrator.acquire_transcript(input).await?;
            eprintln!("Transcript for {}:", video_id);
            println!("{}", transcript);
        }

        Commands::Ingest { input } => {
            let report = orchestrator.ingest_video(input).await?;
            println!(
                "Indexed {} chunks for {}",
                report.chunks_indexed, report.video_id
            );
        }

        Commands::Ask { input, question } => {
            match orchestrator.ask_video(input, question).await {
                Ok(answer) => {
                    println!("{}", answer.answer);
                    if !answer.sources.is_empty() {
                        println!("\n--- Sources ---");
                        for source in &answer.sources {
                            println!(
                                "\n[chunk {} | similarity {:.2}]\n{}",
                                source.chunk_id, source.similarity, source.preview
                            );
                        }
                    }
                }
                Err(LektorError::NotIndexed(video_id)) => {
                    eprintln!(
                        "Video {} is not indexed yet. Run `lektor ingest {}` first.",
                        video_id, input
                    );
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Summarize { input, summary_type } => {
            let summary_type: SummaryType = summary_type
                .parse()
                .map_err(|e: String| LektorError::InvalidInput(e))?;
            let summary = orchestrator.summarize_video(input, summary_type).await?;
            println!("{}", summary.text);
        }
    }

    Ok(())
}
