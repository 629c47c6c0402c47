//! Graph RAG CLI - main entry point
//!
//! The index lives in memory, so every subcommand loads and ingests the
//! document directory before acting.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use graph_rag::commands::{self, DEFAULT_QUESTIONS};
use graph_rag::visualize::render_graph_text;
use graph_rag::{Config, SearchOptions};

#[derive(Parser)]
#[command(name = "graph_rag")]
#[command(about = "Graph-augmented retrieval over Markdown documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to graphrag.yml (defaults to ./graphrag.yml or ../graphrag.yml)
    #[arg(long, global = true, env = "GRAPHRAG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents and print index statistics
    Index {
        /// Directory with .md/.markdown/.txt files
        #[arg(short, long, env = "GRAPHRAG_DOCS_DIR", default_value = "docs")]
        dir: PathBuf,
    },

    /// Run a single query
    Query {
        /// Directory with .md/.markdown/.txt files
        #[arg(short, long, env = "GRAPHRAG_DOCS_DIR", default_value = "docs")]
        dir: PathBuf,

        /// Query text
        #[arg(short, long)]
        query: String,

        /// Retrieval mode: similarity | traversal | mmr
        #[arg(short, long, default_value = "mmr")]
        mode: String,

        /// Number of results (overrides config)
        #[arg(short, long)]
        k: Option<usize>,

        /// Maximum graph depth (overrides config)
        #[arg(long)]
        depth: Option<usize>,

        /// MMR relevance/diversity trade-off in [0, 1] (overrides config)
        #[arg(long)]
        lambda_mult: Option<f32>,

        /// Also print the concatenated context block
        #[arg(long, default_value_t = false)]
        context: bool,
    },

    /// Compare similarity search with MMR graph traversal
    Compare {
        /// Directory with .md/.markdown/.txt files
        #[arg(short, long, env = "GRAPHRAG_DOCS_DIR", default_value = "docs")]
        dir: PathBuf,

        /// Questions to run (repeatable; defaults to the built-in sample questions)
        #[arg(long = "question")]
        questions: Vec<String>,
    },

    /// Print chunks with their links and graph neighbours
    Visualize {
        /// Directory with .md/.markdown/.txt files
        #[arg(short, long, env = "GRAPHRAG_DOCS_DIR", default_value = "docs")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("graph_rag=info".parse()?))
        .init();

    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::new(),
    };

    execute_command(cli.command, config).await
}

async fn execute_command(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Index { dir } => {
            let rag = commands::build_from_dir(&config, &dir).await?;
            println!(
                "Indexed {} documents into {} chunks ({} edges)",
                rag.document_count(),
                rag.len(),
                rag.edge_count()
            );
        }
        Commands::Query {
            dir,
            query,
            mode,
            k,
            depth,
            lambda_mult,
            context,
        } => {
            let rag = commands::build_from_dir(&config, &dir).await?;
            let mode = commands::mode_from_str(&mode);

            let mut opts = SearchOptions::from_config(&config);
            if let Some(k) = k {
                opts = opts.with_k(k);
            }
            if let Some(depth) = depth {
                opts = opts.with_depth(depth);
            }
            if let Some(lambda_mult) = lambda_mult {
                opts = opts.with_lambda_mult(lambda_mult);
            }

            info!(
                "Running query '{}' with mode {} (top {}, depth {})",
                query, mode, opts.k, opts.depth
            );
            let hits = rag.search(&query, mode, &opts).await?;
            println!("{}", commands::format_hits(&query, &hits));
            if context {
                println!("--- context ---\n{}", commands::format_context(&hits));
            }
        }
        Commands::Compare { dir, questions } => {
            let rag = commands::build_from_dir(&config, &dir).await?;
            let questions = if questions.is_empty() {
                DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
            } else {
                questions
            };

            let opts = SearchOptions::from_config(&config);
            for comparison in commands::compare(&rag, &questions, &opts).await? {
                println!("{}", commands::format_comparison(&comparison));
            }
        }
        Commands::Visualize { dir } => {
            let rag = commands::build_from_dir(&config, &dir).await?;
            println!("{}", render_graph_text(rag.chunks(), rag.graph()));
        }
    }

    Ok(())
}
