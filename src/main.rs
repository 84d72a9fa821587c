//! jurisearch: hybrid lexical + semantic retrieval for legal corpora

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::OutputFormat;
use jurisearch::config::{Config, LogFormat, LoggingConfig, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "jurisearch")]
#[command(about = "Hybrid BM25 + vector retrieval with adaptive rank fusion")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Data directory (overrides storage.data_dir)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Index a JSONL corpus of {"id", "text", "metadata"} records
    Index {
        /// Path to the corpus file
        path: PathBuf,

        /// Stop after this many documents
        #[arg(long)]
        max_docs: Option<usize>,
    },

    /// Remove documents by id
    Remove {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Search the index
    Search {
        /// Search query
        query: String,

        /// Number of results (defaults to retrieval.default_top_k)
        #[arg(short, long)]
        top_k: Option<usize>,

        /// Timeout in milliseconds (defaults to retrieval.timeout_ms)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show index statistics
    Stats {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn init_logging(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = config.level.raised(verbose);
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    match config.format {
        LogFormat::Json => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Text => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Init { path, force } => commands::init_config(path, force).await,
        Commands::Index { path, max_docs } => commands::index_corpus(config, path, max_docs).await,
        Commands::Remove { ids } => commands::remove_documents(config, ids).await,
        Commands::Search {
            query,
            top_k,
            timeout_ms,
            format,
        } => commands::search_index(config, query, top_k, timeout_ms, format).await,
        Commands::Stats { format } => commands::show_stats(config, format).await,
    }
}
