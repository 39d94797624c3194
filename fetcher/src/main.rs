use anyhow::{bail, Context, Result};
use clap::Parser;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

const DEFAULT_SOURCE: &str = "https://github.com/alexeygrigorev/llm-rag-workshop/raw/main/notebooks/documents.json";

#[derive(Parser, Debug)]
#[command(name = "fetcher")]
#[command(about = "Download the course FAQ dataset and flatten it into a corpus file")]
struct Cli {
    /// Dataset URL (nested `[{course, documents: [...]}]` JSON)
    #[arg(long, default_value = DEFAULT_SOURCE)]
    url: String,
    /// Output JSON file path
    #[arg(long, default_value = "./data/documents.json")]
    output: String,
    /// Request timeout seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// User-Agent string
    #[arg(long, default_value = "docsearch-fetcher/0.1")]
    user_agent: String,
}

#[derive(Debug, Deserialize)]
struct CourseGroup {
    course: String,
    documents: Vec<Map<String, Value>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();
    let url = Url::parse(&args.url).with_context(|| format!("invalid url {}", args.url))?;

    let client = Client::builder()
        .user_agent(args.user_agent.clone())
        .redirect(reqwest::redirect::Policy::limited(5))
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()?;

    let start = Instant::now();
    let resp = client.get(url.clone()).header(header::ACCEPT, "application/json").send().await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned {status}");
    }
    let groups: Vec<CourseGroup> = resp.json().await.context("decoding course dataset")?;
    let documents = flatten(groups);
    tracing::info!(%url, num_docs = documents.len(), elapsed_ms = start.elapsed().as_millis() as u64, "downloaded dataset");

    write_documents(Path::new(&args.output), &documents)?;
    tracing::info!(output = %args.output, "corpus written");
    Ok(())
}

/// Copies each group's course name into its documents and gives documents
/// without an id their position in the flattened list.
fn flatten(groups: Vec<CourseGroup>) -> Vec<Value> {
    let mut out = Vec::new();
    for group in groups {
        for mut doc in group.documents {
            doc.insert("course".into(), Value::String(group.course.clone()));
            if !doc.contains_key("id") {
                doc.insert("id".into(), Value::String(out.len().to_string()));
            }
            out.push(Value::Object(doc));
        }
    }
    out
}

fn write_documents(path: &Path, documents: &[Value]) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut w, documents)?;
    w.flush()?;
    Ok(())
}
