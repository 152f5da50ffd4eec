use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use quillwright::core::{config::AppPaths, logging};
use quillwright::{ConfigService, WritingAssistant};

#[derive(Parser)]
#[command(name = "quillwright")]
#[command(about = "Personal writing-style RAG assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Override the config file location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest every .txt file in a directory into the corpus index
    Ingest {
        /// Directory containing the corpus
        dir: PathBuf,
        /// Clear the index and re-embed everything
        #[arg(long)]
        reprocess: bool,
    },
    /// Add (or re-index) a single text file
    Add {
        /// Path to the .txt file
        file: PathBuf,
    },
    /// Generate new text in the user's voice
    Generate {
        /// The writing request
        query: String,
        /// Explicit style adjustment (e.g. "more formal")
        #[arg(long)]
        style: Option<String>,
        /// Restrict retrieved examples to one content type
        #[arg(long, value_name = "TYPE")]
        content_type: Option<String>,
        /// Number of style examples to retrieve
        #[arg(long, value_name = "COUNT")]
        top_k: Option<usize>,
        /// Wait for the full response instead of streaming tokens
        #[arg(long)]
        no_stream: bool,
    },
    /// Search the corpus without generating
    Search {
        query: String,
        #[arg(long, value_name = "COUNT")]
        top_k: Option<usize>,
        #[arg(long, value_name = "TYPE")]
        content_type: Option<String>,
    },
    /// Show corpus statistics
    Stats,
    /// Export the indexed corpus to a JSON snapshot
    Export {
        /// Output file
        file: PathBuf,
    },
    /// Import a JSON snapshot (re-embeds its chunks)
    Import {
        /// Snapshot file
        file: PathBuf,
    },
    /// Delete everything from the corpus index
    Clear,
    /// Check language model connectivity and show configuration
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        std::env::set_var("QUILLWRIGHT_CONFIG_PATH", path);
    }

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);
    let config_service = ConfigService::new(paths);

    let assistant = WritingAssistant::from_config(&config_service)
        .await
        .context("failed to initialize assistant")?;

    match cli.command {
        Commands::Ingest { dir, reprocess } => {
            let count = assistant.ingest_directory(&dir, reprocess).await?;
            println!("Indexed {} chunks from {}", count, dir.display());
        }
        Commands::Add { file } => {
            let count = assistant.add_file(&file).await?;
            println!("Indexed {} chunks from {}", count, file.display());
        }
        Commands::Generate {
            query,
            style,
            content_type,
            top_k,
            no_stream,
        } => {
            if no_stream {
                let content = assistant
                    .generate(&query, style.as_deref(), top_k, content_type.as_deref())
                    .await?;
                println!("{}", content);
            } else {
                let mut rx = assistant
                    .generate_streaming(&query, style.as_deref(), top_k, content_type.as_deref())
                    .await?;
                let mut stdout = std::io::stdout();
                while let Some(token) = rx.recv().await {
                    let token = token?;
                    stdout.write_all(token.as_bytes())?;
                    stdout.flush()?;
                }
                println!();
            }
        }
        Commands::Search {
            query,
            top_k,
            content_type,
        } => {
            let results = assistant
                .retrieve(&query, top_k, content_type.as_deref())
                .await?;
            if results.is_empty() {
                println!("No matches.");
            }
            for result in results {
                println!(
                    "{:.3}  [{}] {} ({} #{})",
                    result.score,
                    result.chunk.content_type,
                    result.chunk.title,
                    result.chunk.source_file,
                    result.chunk.chunk_index,
                );
            }
        }
        Commands::Stats => {
            let stats = assistant.stats().await?;
            println!(
                "{} chunks from {} files",
                stats.total_chunks, stats.source_files
            );
            for (kind, count) in &stats.chunks_by_type {
                println!("  {:<12} {}", kind, count);
            }
        }
        Commands::Export { file } => {
            let count = assistant.export_state(&file).await?;
            println!("Exported {} chunks to {}", count, file.display());
        }
        Commands::Import { file } => {
            let count = assistant.import_state(&file).await?;
            println!("Imported {} chunks from {}", count, file.display());
        }
        Commands::Clear => {
            assistant.clear().await?;
            println!("Corpus index cleared.");
        }
        Commands::Status => {
            let healthy = assistant.llm().health_check().await?;
            let provider = assistant.llm().name();
            println!(
                "{}: {}",
                provider,
                if healthy { "reachable" } else { "unreachable" }
            );
            println!(
                "{}",
                serde_yaml::to_string(&config_service.redacted())
                    .unwrap_or_else(|_| "<unprintable config>".to_string())
            );
        }
    }

    Ok(())
}
