//! # corpus-qa CLI (`cqa`)
//!
//! ```bash
//! cqa --config ./config/cqa.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cqa init` | Create the SQLite index and run schema migrations |
//! | `cqa ingest <file.pdf>` | Extract, chunk, embed, and index a document |
//! | `cqa ask "<question>"` | Answer a question against the indexed corpus |
//! | `cqa delete <document-id>` | Remove all chunks of a document |
//! | `cqa status` | Show corpus-level and per-document chunk counts |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use corpus_qa::config;
use corpus_qa::embedding;
use corpus_qa::extract::PdfExtractor;
use corpus_qa::index::SqliteIndex;
use corpus_qa::llm::OllamaClient;
use corpus_qa::pipeline::Pipeline;

/// corpus-qa — retrieval-augmented question answering over a local PDF
/// corpus.
#[derive(Parser)]
#[command(
    name = "cqa",
    about = "Retrieval-augmented question answering over a local PDF corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the index schema.
    ///
    /// Creates the SQLite database file and the chunk table. Idempotent —
    /// running it multiple times is safe.
    Init,

    /// Ingest a PDF document into the corpus.
    ///
    /// Extracts page texts, splits them into overlapping chunks, embeds
    /// them, and upserts into the index. Re-ingesting the same file inserts
    /// nothing new.
    Ingest {
        /// Path to the PDF file.
        file: PathBuf,
    },

    /// Ask a question against the indexed corpus.
    Ask {
        /// The question text.
        question: String,
        /// Also print the chunk ids the context was assembled from.
        #[arg(long)]
        sources: bool,
    },

    /// Delete all chunks of a document.
    ///
    /// A document id is the uploaded file's name (e.g. `rules.pdf`).
    /// Deleting an unknown id is a no-op.
    Delete {
        /// Document id to remove.
        document_id: String,
    },

    /// Show corpus statistics.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            SqliteIndex::open(&cfg.db.path).await?;
            println!("Index initialized successfully.");
        }
        Commands::Ingest { file } => {
            let pipeline = build_pipeline(&cfg).await?;
            let report = pipeline.ingest_file(&PdfExtractor, &file).await?;
            println!("ingest {}", report.document_id);
            println!("  chunks: {}", report.chunk_count);
            println!("  inserted: {}", report.inserted);
            println!("  skipped: {}", report.skipped);
            if report.stale > 0 {
                println!("  stale: {} (delete and re-ingest to refresh)", report.stale);
            }
            println!("ok");
        }
        Commands::Ask { question, sources } => {
            let pipeline = build_pipeline(&cfg).await?;
            let answer = pipeline.ask(&question).await?;
            println!("{}", answer.text);
            if sources {
                for chunk_id in &answer.sources {
                    println!("  source: {chunk_id}");
                }
            }
        }
        Commands::Delete { document_id } => {
            let index = SqliteIndex::open(&cfg.db.path).await?;
            let removed = corpus_qa::index::VectorIndex::delete_document(&index, &document_id).await?;
            println!("delete {document_id}");
            println!("  chunks removed: {removed}");
            println!("ok");
        }
        Commands::Status => {
            let index = SqliteIndex::open(&cfg.db.path).await?;
            let stats = corpus_qa::index::VectorIndex::stats(&index).await?;
            println!("documents: {}", stats.documents);
            println!("chunks: {}", stats.chunks);
            for (document_id, count) in index.document_counts().await? {
                println!("  {document_id}: {count} chunks");
            }
        }
    }

    Ok(())
}

async fn build_pipeline(cfg: &config::Config) -> Result<Pipeline> {
    let index = SqliteIndex::open(&cfg.db.path).await?;
    let embedder = embedding::create_provider(&cfg.embedding)?;
    let llm = OllamaClient::new(&cfg.llm)?;
    Ok(Pipeline::new(
        Box::new(index),
        embedder,
        Box::new(llm),
        cfg,
    ))
}
