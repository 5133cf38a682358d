//! ragroute CLI, the main entry point.
//!
//! Commands:
//! - `serve`     start the HTTP API
//! - `query`     answer one question through the router
//! - `classify`  show how a question would be routed
//! - `add`       store text or a file's paragraphs
//! - `search`    semantic search over stored documents
//! - `documents`, `stats`, `delete`, `clear`  manage an owner's documents
//! - `config`    show, locate, validate, or initialise configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "ragroute",
    about = "ragroute: route questions to a language model, local documents, or Wikipedia",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.ragroute/config.toml
    #[arg(short, long, global = true, env = "RAGROUTE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Answer a question
    Query {
        question: String,

        /// Owner namespace to search
        #[arg(short, long, default_value = ragroute_core::DEFAULT_OWNER)]
        user: String,

        /// Force a strategy (llm_direct, rag_local, rag_then_web, web_search)
        #[arg(short, long)]
        strategy: Option<String>,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify a question without answering it
    Classify {
        question: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Store a document, or every paragraph of a text file
    Add {
        /// Text to store (omit when using --file)
        content: Option<String>,

        /// Read paragraphs from this file
        #[arg(short, long, conflicts_with = "content")]
        file: Option<PathBuf>,

        #[arg(short, long, default_value = ragroute_core::DEFAULT_OWNER)]
        user: String,

        /// Document source (manual, file, web, conversation)
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Search stored documents
    Search {
        query: String,

        #[arg(short, long, default_value = ragroute_core::DEFAULT_OWNER)]
        user: String,

        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: usize,

        /// Minimum similarity (defaults to routing.min_score)
        #[arg(long)]
        min_score: Option<f32>,
    },

    /// List stored documents
    Documents {
        #[arg(short, long, default_value = ragroute_core::DEFAULT_OWNER)]
        user: String,

        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Show document counts for an owner
    Stats {
        #[arg(short, long, default_value = ragroute_core::DEFAULT_OWNER)]
        user: String,
    },

    /// Delete one document
    Delete {
        id: String,

        #[arg(short, long, default_value = ragroute_core::DEFAULT_OWNER)]
        user: String,
    },

    /// Delete every document of an owner
    Clear {
        #[arg(short, long, default_value = ragroute_core::DEFAULT_OWNER)]
        user: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Load and validate the configuration
    Validate,
    /// Write a default config file if none exists
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(config_path, port, host).await?,
        Commands::Query {
            question,
            user,
            strategy,
            json,
        } => commands::query::run(config_path, &question, &user, strategy.as_deref(), json).await?,
        Commands::Classify { question, json } => commands::classify::run(&question, json)?,
        Commands::Add {
            content,
            file,
            user,
            source,
        } => commands::add::run(config_path, content, file, &user, source.as_deref()).await?,
        Commands::Search {
            query,
            user,
            top_k,
            min_score,
        } => commands::documents::search(config_path, &query, &user, top_k, min_score).await?,
        Commands::Documents { user, limit } => commands::documents::list(config_path, &user, limit).await?,
        Commands::Stats { user } => commands::documents::stats(config_path, &user).await?,
        Commands::Delete { id, user } => commands::documents::delete(config_path, &id, &user).await?,
        Commands::Clear { user } => commands::documents::clear(config_path, &user).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Path => commands::config_cmd::path(config_path),
            ConfigAction::Validate => commands::config_cmd::validate(config_path)?,
            ConfigAction::Init => commands::config_cmd::init(config_path)?,
        },
    }

    Ok(())
}
