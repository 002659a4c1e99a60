use clap::{Parser, Subcommand};
use ragmark_embed::OllamaProvider;
use ragmark_retriever::{
    config::RagConfig,
    retrieval::{
        context::ContextRetriever, indexer::Indexer, prompt::build_chat_prompt,
        source::DirectorySource,
    },
    storage::{DocumentStore, sqlite_store::SqliteStore},
};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Index a directory of documents and retrieve context for questions about it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database file (overrides the config file)
    #[arg(long)]
    db: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize the database
    Init,
    /// Index every new or modified document under a directory
    Sync {
        /// Directory containing .md and .txt documents
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
    /// Print the context retrieved for a query
    Context {
        query: String,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Print the chat prompt assembled for a question
    Prompt {
        question: String,
        /// Leave the retrieved context out of the prompt
        #[arg(long)]
        no_context: bool,
    },
    /// Keyword search over titles, text and summaries
    Search {
        query: String,
        /// Maximum number of results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Show database statistics
    Stats {
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum OutputFormat {
    Summary,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

#[derive(Serialize)]
struct ChunkOutput {
    path: String,
    index: i64,
    text: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = RagConfig::load_or_default(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.database.path = db;
    }

    let store = Arc::new(SqliteStore::open(&config.database.path).await?);

    match args.command {
        Commands::Init => {
            println!(
                "Initialized database at {}",
                config.database.path.display()
            );
        }
        Commands::Sync { dir } => {
            let embedder = Arc::new(OllamaProvider::new(config.embed.clone())?);
            let indexer = Indexer::new(store, embedder);
            let source = DirectorySource::new(&dir);
            let report = indexer.index(&source).await?;

            println!("Indexed {}:", source.root().display());
            println!("  Reindexed: {}", report.reindexed);
            println!("  Up to date: {}", report.up_to_date);
            println!("  Chunks written: {}", report.chunks_written);
            println!("  Failed: {}", report.failures.len());
            for failure in &report.failures {
                println!("    {}: {}", failure.path, failure.error);
            }
            if !report.is_clean() {
                anyhow::bail!("{} documents failed to index", report.failures.len());
            }
        }
        Commands::Context { query, format } => {
            let embedder = Arc::new(OllamaProvider::new(config.embed.clone())?);
            let retriever = ContextRetriever::with_config(store, embedder, config.retrieval);
            let chunks = retriever.get_context(&query).await?;

            match format {
                OutputFormat::Json => {
                    let output: Vec<ChunkOutput> = chunks
                        .into_iter()
                        .map(|chunk| ChunkOutput {
                            path: chunk.path,
                            index: chunk.index,
                            text: chunk.text,
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&output)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} context chunks:", chunks.len());
                    for chunk in chunks {
                        println!("  {}#{} | {}", chunk.path, chunk.index, chunk.text);
                    }
                }
            }
        }
        Commands::Prompt {
            question,
            no_context,
        } => {
            let chunks = if no_context {
                Vec::new()
            } else {
                let embedder = Arc::new(OllamaProvider::new(config.embed.clone())?);
                ContextRetriever::with_config(store, embedder, config.retrieval)
                    .get_context(&question)
                    .await?
            };
            print!("{}", build_chat_prompt(&chunks, &question));
        }
        Commands::Search {
            query,
            limit,
            format,
        } => {
            let matches = store.search_fulltext(&query, limit).await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&matches)?);
                }
                OutputFormat::Summary => {
                    println!("Found {} documents:", matches.len());
                    for hit in matches {
                        println!("  {:.3} | {} | {}", hit.rank, hit.path, hit.title);
                        println!("      {}", hit.snippet);
                    }
                }
            }
        }
        Commands::Stats { format } => {
            let stats = store.stats().await?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&stats)?);
                }
                OutputFormat::Summary => {
                    println!("Database Statistics:");
                    println!("  Documents: {}", stats.documents);
                    println!("  Full-text entries: {}", stats.fulltext_entries);
                    println!("  Chunks: {}", stats.chunks);
                    println!("  Embeddings: {}", stats.embeddings);
                }
            }
        }
    }
    Ok(())
}
