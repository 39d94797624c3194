use crate::error::{ensure_dimension, Result, SearchError};
use ndarray::Array2;
use crate::persist::{load_embeddings, EmbeddingArtifact};
use serde::Serialize;
use std::path::Path;

/// Encodes query text into the pre-computed embedding space. Implementations
/// must apply the same transformation that produced the document vectors.
pub trait QueryEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

/// Availability of the dense method, decided once at startup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EmbeddingStatus {
    Loaded { dimension: usize },
    /// No artifact configured, or the configured file does not exist.
    Unavailable,
    LoadFailed { reason: String },
}

impl EmbeddingStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Loaded { dimension } => format!("loaded ({dimension} dimensions)"),
            Self::Unavailable => "no embedding artifact configured".into(),
            Self::LoadFailed { reason } => format!("embedding artifact failed to load: {reason}"),
        }
    }
}

/// Pre-computed document embeddings in corpus order.
pub struct DenseStore {
    vectors: Array2<f32>,
}

impl DenseStore {
    /// Attempts to load the artifact; never fails the caller. Problems are
    /// reported through the returned status.
    pub fn open(path: Option<&Path>, num_docs: usize) -> (Option<Self>, EmbeddingStatus) {
        let Some(path) = path else {
            tracing::info!("no embedding artifact configured; dense method disabled");
            return (None, EmbeddingStatus::Unavailable);
        };
        if !path.exists() {
            tracing::warn!(path = %path.display(), "embedding artifact not found; dense method disabled");
            return (None, EmbeddingStatus::Unavailable);
        }
        let loaded = load_embeddings(path)
            .map_err(|e| format!("{e:#}"))
            .and_then(|artifact| Self::from_artifact(artifact, num_docs));
        match loaded {
            Ok(store) => {
                let dimension = store.dimension();
                tracing::info!(path = %path.display(), dimension, num_docs, "loaded dense embeddings");
                (Some(store), EmbeddingStatus::Loaded { dimension })
            }
            Err(reason) => {
                tracing::warn!(path = %path.display(), %reason, "dense embeddings unavailable");
                (None, EmbeddingStatus::LoadFailed { reason })
            }
        }
    }

    pub fn from_artifact(artifact: EmbeddingArtifact, num_docs: usize) -> std::result::Result<Self, String> {
        artifact.check()?;
        if artifact.num_docs as usize != num_docs {
            return Err(format!("artifact has {} rows, corpus has {num_docs} documents", artifact.num_docs));
        }
        let shape = (artifact.num_docs as usize, artifact.dimension as usize);
        let vectors = Array2::from_shape_vec(shape, artifact.data)
            .map_err(|e| format!("artifact shape does not match its data: {e}"))?;
        Ok(Self { vectors })
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn len(&self) -> usize {
        self.vectors.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.nrows() == 0
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    /// A caller-supplied vector of the wrong length is a bad request.
    pub fn check_supplied(&self, query: &[f32]) -> Result<()> {
        if query.len() != self.dimension() {
            return Err(SearchError::InvalidParameter(format!(
                "query_vector has {} dimensions, embeddings have {}",
                query.len(),
                self.dimension()
            )));
        }
        Ok(())
    }

    /// An embedder producing the wrong length means the model and the
    /// artifact disagree.
    pub fn check_embedded(&self, query: &[f32]) -> Result<()> {
        ensure_dimension(self.dimension(), query.len())
    }
}
