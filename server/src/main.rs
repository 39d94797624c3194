use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use engine::persist::load_documents;
use engine::{EngineConfig, SearchEngine};
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Corpus path (JSON, JSONL, or a directory of them)
    #[arg(long, default_value = "./documents.json")]
    corpus: PathBuf,
    /// Engine configuration file (JSON); defaults plus DOCSEARCH_* env vars otherwise
    #[arg(long)]
    config: Option<PathBuf>,
    /// Dense embedding artifact; overrides the configured path
    #[arg(long)]
    embeddings: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
    /// Abort startup if fitting takes longer than this
    #[arg(long, default_value_t = 300)]
    init_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::from_env()?,
    };
    if let Some(path) = args.embeddings.clone() {
        config.embeddings_path = Some(path);
    }

    let corpus = args.corpus.clone();
    let build = tokio::task::spawn_blocking(move || -> Result<SearchEngine> {
        let documents = load_documents(&corpus)?;
        Ok(SearchEngine::build(documents, config, None)?)
    });
    let engine = tokio::time::timeout(Duration::from_secs(args.init_timeout_secs), build)
        .await
        .with_context(|| format!("engine initialization exceeded {}s", args.init_timeout_secs))?
        .context("engine initialization task panicked")??;

    let app: Router = build_app(Arc::new(engine));
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
