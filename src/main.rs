//! Binary entry point for toolscout.
//!
//! Provides the CLI: run the Telegram gateway, query the pipeline one-shot,
//! rebuild the vector collection, or inspect status.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr/print_stdout in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use secrecy::SecretString;

use toolscout::config::{BOT_TOKEN_ENV, ToolscoutConfig};
use toolscout::gateway::{BotGateway, ServiceContext, TelegramApi};
use toolscout::index::{COLLECTION_NAME, DiskVectorStore, KnowledgeIndex};
use toolscout::ingest::{build_documents, load_tool_records};
use toolscout::llm::RetryPolicy;
use toolscout::observability::{self, InitOptions};

/// Toolscout - Telegram assistant bot for pentesting tool guidance.
#[derive(Parser)]
#[command(name = "toolscout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot.
    Serve,

    /// Ask the answer pipeline a question without the bot.
    Ask {
        /// The question.
        question: String,
    },

    /// Translate text without the bot.
    Translate {
        /// The text to translate.
        text: String,
    },

    /// Discard and rebuild the vector collection.
    Reindex,

    /// Show configuration and index status.
    Status,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    // Load .env before reading configuration from the environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match ToolscoutConfig::load_from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load configuration: {e}");
                return ExitCode::FAILURE;
            },
        },
        None => ToolscoutConfig::load_default(),
    };

    let expose_metrics = matches!(cli.command, Commands::Serve);
    if let Err(e) = observability::init_from_config(
        &config.observability,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    ) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: ToolscoutConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Serve => cmd_serve(config),
        Commands::Ask { question } => cmd_ask(config, &question),
        Commands::Translate { text } => cmd_translate(config, &text),
        Commands::Reindex => cmd_reindex(&config),
        Commands::Status => cmd_status(&config),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "toolscout", &mut std::io::stdout());
            Ok(())
        },
    }
}

/// Runs the Telegram gateway. A missing bot token is fatal here.
fn cmd_serve(config: ToolscoutConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(token) = config.telegram.bot_token.clone() else {
        return Err(format!("{BOT_TOKEN_ENV} not set; the bot cannot start").into());
    };

    // Blocking model clients must be constructed and used outside the
    // async runtime; the index reconciliation runs here, before the
    // gateway accepts traffic.
    let context = Arc::new(ServiceContext::initialize(config));
    let api = TelegramApi::new(token, context.config.telegram.api_url.clone());
    let gateway = BotGateway::new(api, context);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(gateway.run())?;
    Ok(())
}

/// One-shot pipeline query from the CLI.
fn cmd_ask(config: ToolscoutConfig, question: &str) -> Result<(), Box<dyn std::error::Error>> {
    let context = ServiceContext::initialize(config);
    println!("{}", context.pipeline.answer(question));
    Ok(())
}

/// One-shot translation from the CLI.
fn cmd_translate(config: ToolscoutConfig, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let context = ServiceContext::initialize(config);
    println!("{}", context.translator.translate(text));
    Ok(())
}

/// Discards and rebuilds the vector collection.
fn cmd_reindex(config: &ToolscoutConfig) -> Result<(), Box<dyn std::error::Error>> {
    let Some(api_key) = config.llm.api_key.clone() else {
        return Err(format!("{} not set", toolscout::config::API_KEY_ENV).into());
    };

    let records = load_tool_records(&config.data_file)?;
    let documents = build_documents(&records);

    let policy = RetryPolicy {
        max_retries: config.llm.max_retries.unwrap_or(2),
        backoff_ms: config.llm.retry_backoff_ms.unwrap_or(250),
    };
    let embedder = build_embedder(config, api_key, policy);

    let index = KnowledgeIndex::rebuild(&config.index_dir, documents, embedder, config.top_k)?;
    println!(
        "Rebuilt collection '{COLLECTION_NAME}' with {} documents",
        index.count()
    );
    Ok(())
}

/// Prints configuration and index status.
fn cmd_status(config: &ToolscoutConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Knowledge base: {}", config.data_file.display());
    println!("Index dir:      {}", config.index_dir.display());
    println!("Top-k:          {}", config.top_k);
    println!(
        "Gemini key:     {}",
        if config.llm.api_key.is_some() {
            "configured"
        } else {
            "missing"
        }
    );
    println!(
        "Bot token:      {}",
        if config.telegram.bot_token.is_some() {
            "configured"
        } else {
            "missing"
        }
    );

    if DiskVectorStore::exists(&config.index_dir, COLLECTION_NAME) {
        match DiskVectorStore::open(&config.index_dir, COLLECTION_NAME) {
            Ok(store) => println!(
                "Collection:     '{COLLECTION_NAME}' with {} documents ({} dims)",
                store.count(),
                store.dimensions()
            ),
            Err(e) => println!("Collection:     unreadable ({e})"),
        }
    } else {
        println!("Collection:     not built yet");
    }
    Ok(())
}

/// Builds the embedding client for index maintenance commands.
fn build_embedder(
    config: &ToolscoutConfig,
    api_key: SecretString,
    policy: RetryPolicy,
) -> Arc<toolscout::embedding::GeminiEmbedder> {
    let mut embedder = toolscout::embedding::GeminiEmbedder::new()
        .with_api_key(api_key)
        .with_retry_policy(policy);
    if let Some(ref model) = config.llm.embedding_model {
        embedder = embedder.with_model(model.clone());
    }
    if let Some(ref base_url) = config.llm.base_url {
        embedder = embedder.with_endpoint(base_url.clone());
    }
    Arc::new(embedder)
}
