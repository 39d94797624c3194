use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use engine::persist::{load_documents, save_embeddings, EmbeddingArtifact};
use engine::{result_statistics, ComparisonRequest, EngineConfig, Method, SearchEngine, SearchRequest};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Fit, inspect and query the document search engine offline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct EngineArgs {
    /// Corpus path (file or directory)
    #[arg(long)]
    corpus: PathBuf,
    /// Engine configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Dense embedding artifact
    #[arg(long)]
    embeddings: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit every method and print the engine status as JSON
    Inspect {
        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Convert a JSON array (or JSONL) of vectors into the binary embedding artifact
    PackEmbeddings {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Run one query and print the response as JSON
    Search {
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(long)]
        query: String,
        #[arg(long, default_value = "tfidf")]
        method: String,
        #[arg(long)]
        n_results: Option<i64>,
        /// Exact-match filter, repeatable: --filter course=data-engineering-zoomcamp
        #[arg(long = "filter", value_parser = parse_pair)]
        filters: Vec<(String, String)>,
        /// Field boost, repeatable: --boost question=3
        #[arg(long = "boost", value_parser = parse_pair)]
        boosts: Vec<(String, String)>,
    },
    /// Run one query through several methods and print the comparison report
    Compare {
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(long)]
        query: String,
        /// Methods to compare; every available method when omitted
        #[arg(long = "method")]
        methods: Vec<String>,
        #[arg(long)]
        top_k: Option<usize>,
    },
}

#[derive(Serialize)]
struct InspectReport {
    generated_at: String,
    #[serde(flatten)]
    status: engine::EngineStatus,
    courses: Vec<String>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { engine } => {
            let engine = build_engine(&engine)?;
            let report = InspectReport {
                generated_at: time::OffsetDateTime::now_utc()
                    .format(&time::format_description::well_known::Rfc3339)
                    .unwrap_or_default(),
                status: engine.status(),
                courses: engine.available_courses(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::PackEmbeddings { input, output } => pack_embeddings(&input, &output)?,
        Commands::Search { engine, query, method, n_results, filters, boosts } => {
            let engine = build_engine(&engine)?;
            let boost = boosts
                .into_iter()
                .map(|(k, v)| Ok((k, v.parse::<f32>().with_context(|| format!("boost {v:?} is not a number"))?)))
                .collect::<Result<BTreeMap<_, _>>>()?;
            let request = SearchRequest {
                query,
                method,
                n_results,
                boost,
                filters: filters.into_iter().collect(),
                query_vector: None,
            };
            let response = engine.search(&request)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            println!("{}", serde_json::to_string_pretty(&result_statistics(&response.results))?);
        }
        Commands::Compare { engine, query, methods, top_k } => {
            let engine = build_engine(&engine)?;
            let report = engine.compare(&ComparisonRequest { query, methods, top_k, ..ComparisonRequest::default() });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))
}

fn build_engine(args: &EngineArgs) -> Result<SearchEngine> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::from_env()?,
    };
    if let Some(path) = &args.embeddings {
        config.embeddings_path = Some(path.clone());
    }
    let documents = load_documents(&args.corpus)?;
    let engine = SearchEngine::build(documents, config, None)?;
    if !engine.available_methods().contains(&Method::Bert) {
        tracing::warn!(embeddings = %engine.status().embeddings.describe(), "bert disabled");
    }
    Ok(engine)
}

fn pack_embeddings(input: &Path, output: &Path) -> Result<()> {
    let rows = read_vectors(input)?;
    if rows.is_empty() {
        bail!("{} holds no vectors", input.display());
    }
    let artifact = EmbeddingArtifact::from_rows(rows)?;
    save_embeddings(output, &artifact)?;
    tracing::info!(
        num_docs = artifact.num_docs,
        dimension = artifact.dimension,
        output = %output.display(),
        "embedding artifact written"
    );
    Ok(())
}

fn read_vectors(path: &Path) -> Result<Vec<Vec<f32>>> {
    let reader = BufReader::new(File::open(path).with_context(|| format!("opening {}", path.display()))?);
    if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let mut rows = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            rows.push(serde_json::from_str(&line).with_context(|| format!("line {}", i + 1))?);
        }
        Ok(rows)
    } else {
        Ok(serde_json::from_reader(reader)?)
    }
}
