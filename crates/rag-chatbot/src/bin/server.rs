//! RAG chatbot binary
//!
//! Run with: cargo run -p rag-chatbot --bin rag-chatbot-server -- serve

use clap::{Args, Parser, Subcommand};
use rag_chatbot::{config::RagConfig, server::RagServer, RagContext};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rag-chatbot-server", version, about = "RAG chatbot over a prebuilt vector index")]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args)]
struct Overrides {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Vector index file
    #[arg(long, global = true)]
    index: Option<PathBuf>,
    /// Chunk list (JSON array of strings)
    #[arg(long, global = true)]
    chunks: Option<PathBuf>,
    /// Generation model
    #[arg(long, global = true)]
    model: Option<String>,
    /// Ollama base URL
    #[arg(long, global = true)]
    ollama_url: Option<String>,
    #[arg(long, global = true)]
    host: Option<String>,
    #[arg(long, global = true)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the web UI and JSON API (default)
    Serve,
    /// Answer a single question and exit
    Ask {
        question: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
}

impl Overrides {
    fn into_config(self) -> anyhow::Result<RagConfig> {
        let mut config = match &self.config {
            Some(path) => RagConfig::from_file(path)?,
            None => RagConfig::default(),
        };

        if let Some(index) = self.index {
            config.index.path = index;
        }
        if let Some(chunks) = self.chunks {
            config.index.chunks_path = chunks;
        }
        if let Some(model) = self.model {
            config.llm.generate_model = model;
        }
        if let Some(url) = self.ollama_url {
            config.llm.base_url = url;
        }
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_chatbot=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = cli.overrides.into_config()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Index: {}", config.index.path.display());
    tracing::info!("  - Chunks: {}", config.index.chunks_path.display());
    tracing::info!(
        "  - Embedding model: {} ({:?})",
        config.embeddings.model,
        config.embeddings.backend
    );
    tracing::info!("  - LLM model: {}", config.llm.generate_model);

    let context = RagContext::load(&config).await?;
    check_providers(&context, &config).await;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let server = RagServer::new(config, context);

            println!("\nRAG chatbot running");
            println!("  UI: http://{}", server.address());
            println!("  API: POST http://{}/api/query", server.address());
            println!("\nPress Ctrl+C to stop\n");

            server.start().await?;
        }
        Command::Ask { question, top_k } => {
            let top_k = top_k.unwrap_or(config.retrieval.top_k);
            let result = context.answer(&question, top_k).await?;

            println!("Response:\n{}\n", result.answer);
            println!("Source Chunks Used:");
            for chunk in &result.sources {
                println!(
                    "  Chunk {} (score {:.4}): {}",
                    chunk.rank, chunk.score, chunk.content
                );
            }
        }
    }

    Ok(())
}

async fn check_providers(context: &RagContext, config: &RagConfig) {
    tracing::info!("Checking Ollama at {}...", config.llm.base_url);
    match context.llm().health_check().await {
        Ok(true) => tracing::info!("Ollama is running"),
        _ => {
            tracing::warn!("Ollama not available at {}", config.llm.base_url);
            tracing::warn!(
                "  Start it with `ollama serve` and pull the model: ollama pull {}",
                context.llm().model()
            );
        }
    }

    let embedder = context.embedder();
    if !matches!(embedder.health_check().await, Ok(true)) {
        tracing::warn!("Embedder '{}' failed its health check", embedder.name());
    }
}
