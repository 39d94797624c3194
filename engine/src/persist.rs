use crate::document::Document;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const EMBEDDING_ARTIFACT_VERSION: u32 = 1;

/// Binary dense-embedding artifact: one row per document, corpus order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingArtifact {
    pub version: u32,
    pub num_docs: u32,
    pub dimension: u32,
    /// Row-major, `num_docs * dimension` values.
    pub data: Vec<f32>,
}

impl EmbeddingArtifact {
    pub fn from_rows(rows: Vec<Vec<f32>>) -> anyhow::Result<Self> {
        let dimension = rows.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            anyhow::bail!("embedding rows must be non-empty");
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != dimension) {
            anyhow::bail!("row {i} has dimension {}, expected {dimension}", row.len());
        }
        Ok(Self {
            version: EMBEDDING_ARTIFACT_VERSION,
            num_docs: rows.len() as u32,
            dimension: dimension as u32,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Structural checks that do not depend on the corpus.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.version != EMBEDDING_ARTIFACT_VERSION {
            return Err(format!("unsupported artifact version {}", self.version));
        }
        if self.dimension == 0 {
            return Err("artifact dimension is zero".into());
        }
        let expected = self.num_docs as usize * self.dimension as usize;
        if self.data.len() != expected {
            return Err(format!("artifact holds {} values, header implies {expected}", self.data.len()));
        }
        if self.data.iter().any(|v| !v.is_finite()) {
            return Err("artifact contains non-finite values".into());
        }
        Ok(())
    }
}

pub fn save_embeddings(path: &Path, artifact: &EmbeddingArtifact) -> anyhow::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut f = File::create(path)?;
    let bytes = bincode::serialize(artifact)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_embeddings(path: &Path) -> anyhow::Result<EmbeddingArtifact> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let artifact = bincode::deserialize(&buf)?;
    Ok(artifact)
}

/// Document as it appears in input files; every field is optional.
#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default, alias = "doc_id")]
    id: Option<serde_json::Value>,
    #[serde(default)]
    question: String,
    #[serde(default)]
    section: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    course: String,
}

/// `{course, documents: [...]}` grouping used by the published FAQ dataset.
#[derive(Debug, Deserialize)]
struct CourseGroup {
    course: String,
    documents: Vec<RawDocument>,
}

/// Loads documents from a JSON / JSONL file or a directory of them.
/// Documents without an id receive their corpus position, suffixed when an
/// explicit id already uses that value.
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let files = corpus_files(path)?;
    let mut raw = Vec::new();
    for file in &files {
        read_file(file, &mut raw).map_err(|e| SearchError::Initialization(format!("{}: {e:#}", file.display())))?;
    }
    let explicit: Vec<Option<String>> = raw.iter_mut().map(|r| explicit_id(r.id.take())).collect();
    let mut taken: HashSet<String> = explicit.iter().flatten().cloned().collect();
    let documents = raw
        .into_iter()
        .zip(explicit)
        .enumerate()
        .map(|(pos, (r, id))| Document {
            id: id.unwrap_or_else(|| fallback_id(pos, &mut taken)),
            question: r.question,
            section: r.section,
            text: r.text,
            course: r.course,
        })
        .collect::<Vec<_>>();
    tracing::info!(files = files.len(), num_docs = documents.len(), "loaded documents");
    Ok(documents)
}

fn explicit_id(raw: Option<serde_json::Value>) -> Option<String> {
    match raw {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

fn fallback_id(pos: usize, taken: &mut HashSet<String>) -> String {
    let mut id = pos.to_string();
    let mut n = 1;
    while taken.contains(&id) {
        id = format!("{pos}-{n}");
        n += 1;
    }
    taken.insert(id.clone());
    id
}

fn corpus_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(SearchError::Initialization(format!("corpus path not found: {}", path.display())));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")))
        .collect();
    files.sort();
    Ok(files)
}

fn read_file(file: &Path, out: &mut Vec<RawDocument>) -> anyhow::Result<()> {
    let reader = BufReader::new(File::open(file)?);
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            out.push(serde_json::from_str(&line)?);
        }
        return Ok(());
    }
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(items) => {
            for item in items {
                if item.get("documents").is_some() {
                    let group: CourseGroup = serde_json::from_value(item)?;
                    out.extend(group.documents.into_iter().map(|mut d| {
                        d.course = group.course.clone();
                        d
                    }));
                } else {
                    out.push(serde_json::from_value(item)?);
                }
            }
        }
        obj @ serde_json::Value::Object(_) => out.push(serde_json::from_value(obj)?),
        _ => anyhow::bail!("expected a JSON array or object"),
    }
    Ok(())
}
