//! Per-method document representations and the query encoder that maps query
//! text into each of them.

use crate::config::{EngineConfig, TfidfScoring};
use crate::dense::{DenseStore, EmbeddingStatus, QueryEmbedder};
use crate::document::{CorpusIndex, Field};
use crate::error::{ensure_dimension, Result, SearchError};
use crate::method::Method;
use crate::sparse::{Nmf, SparseMatrix, SparseVector, TfidfVectorizer, TruncatedSvd};
use ndarray::Array2;
use std::sync::Arc;

/// Maps a TF-IDF query vector into a latent space.
pub trait Projector: Send + Sync {
    fn project(&self, q: &SparseVector) -> Result<Vec<f32>>;
    fn n_components(&self) -> usize;
}

impl Projector for TruncatedSvd {
    fn project(&self, q: &SparseVector) -> Result<Vec<f32>> {
        self.transform(q)
    }

    fn n_components(&self) -> usize {
        TruncatedSvd::n_components(self)
    }
}

impl Projector for Nmf {
    fn project(&self, q: &SparseVector) -> Result<Vec<f32>> {
        self.transform(q)
    }

    fn n_components(&self) -> usize {
        Nmf::n_components(self)
    }
}

/// One vectorizer and its document matrix for a single text field.
#[derive(Debug)]
pub struct FieldVectors {
    pub field: Field,
    pub vectorizer: TfidfVectorizer,
    pub matrix: SparseMatrix,
}

/// Concatenated-text TF-IDF: vocabulary and idf are fitted over the joined
/// retrieval text, and a document's vector is `normalize(Σ boost_f · w_f)`
/// where `w_f` holds field f's weights in that vocabulary.
///
/// Sublinear tf is taken per field. A term that shows up in two fields
/// contributes `1 + ln(c)` twice, so the neutral-boost vector is not the
/// tf-idf of the joined string.
#[derive(Debug)]
pub struct ConcatenatedVectors {
    pub vectorizer: TfidfVectorizer,
    /// Un-normalized per-field weights in the shared vocabulary.
    pub fields: Vec<(Field, SparseMatrix)>,
    /// normalize(Σ w_f): the document vector with every boost at 1.0
    pub combined: SparseMatrix,
}

#[derive(Debug)]
pub enum TfidfIndex {
    FieldWeighted(Vec<FieldVectors>),
    Concatenated(ConcatenatedVectors),
}

impl TfidfIndex {
    fn fit(corpus: &CorpusIndex, config: &EngineConfig) -> Result<Self> {
        match config.tfidf_scoring {
            TfidfScoring::FieldWeighted => {
                let mut fields = Vec::with_capacity(corpus.text_fields().len());
                for &field in corpus.text_fields() {
                    let (vectorizer, matrix) =
                        TfidfVectorizer::fit_transform(&corpus.field_values(field), &config.vectorizer)?;
                    tracing::info!(%field, vocab = vectorizer.dim(), "fitted field vectorizer");
                    fields.push(FieldVectors { field, vectorizer, matrix });
                }
                if fields.iter().all(|f| f.vectorizer.dim() == 0) {
                    return Err(SearchError::Initialization("every field vectorizer has an empty vocabulary".into()));
                }
                Ok(Self::FieldWeighted(fields))
            }
            TfidfScoring::Concatenated => {
                // keep vocabulary and idf only; document rows are rebuilt per field below
                let (vectorizer, _) = TfidfVectorizer::fit_transform(corpus.retrieval_texts(), &config.vectorizer)?;
                if vectorizer.dim() == 0 {
                    return Err(SearchError::Initialization("concatenated vectorizer has an empty vocabulary".into()));
                }
                let dim = vectorizer.dim();
                let mut fields = Vec::new();
                for &field in corpus.text_fields() {
                    let rows = corpus.field_values(field).into_iter().map(|t| vectorizer.raw_weights(t)).collect();
                    fields.push((field, SparseMatrix::new(dim, rows)?));
                }
                let combined_rows = (0..corpus.len())
                    .map(|pos| {
                        SparseVector::weighted_sum(dim, fields.iter().map(|(_, m)| (1.0, m.row(pos))))
                            .map(SparseVector::normalized)
                    })
                    .collect::<Result<Vec<_>>>()?;
                let combined = SparseMatrix::new(dim, combined_rows)?;
                tracing::info!(vocab = dim, "fitted concatenated vectorizer");
                Ok(Self::Concatenated(ConcatenatedVectors { vectorizer, fields, combined }))
            }
        }
    }

    fn encode(&self, text: &str) -> QueryVector {
        match self {
            Self::FieldWeighted(fields) => {
                QueryVector::Fields(fields.iter().map(|f| (f.field, f.vectorizer.transform(text))).collect())
            }
            Self::Concatenated(c) => QueryVector::Sparse(c.vectorizer.transform(text)),
        }
    }

    /// Sum of vocabulary sizes across the fitted vectorizers.
    pub fn dimension(&self) -> usize {
        match self {
            Self::FieldWeighted(fields) => fields.iter().map(|f| f.vectorizer.dim()).sum(),
            Self::Concatenated(c) => c.vectorizer.dim(),
        }
    }

    fn n_rows(&self) -> usize {
        match self {
            Self::FieldWeighted(fields) => fields.first().map(|f| f.matrix.n_rows()).unwrap_or(0),
            Self::Concatenated(c) => c.combined.n_rows(),
        }
    }
}

/// Latent model plus its document vectors (`n_docs × k`).
pub struct LatentIndex<P: Projector> {
    pub model: P,
    pub documents: Array2<f32>,
}

/// A query encoded into one method's space.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryVector {
    /// One sparse vector per text field (field-weighted TF-IDF).
    Fields(Vec<(Field, SparseVector)>),
    Sparse(SparseVector),
    Dense(Vec<f32>),
}

impl QueryVector {
    /// True when the query carries no signal in this space.
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Fields(parts) => parts.iter().all(|(_, v)| v.is_empty()),
            Self::Sparse(v) => v.is_empty(),
            Self::Dense(v) => v.iter().all(|x| *x == 0.0),
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            Self::Fields(parts) => parts.iter().map(|(_, v)| v.dim()).sum(),
            Self::Sparse(v) => v.dim(),
            Self::Dense(v) => v.len(),
        }
    }
}

/// All fitted representations. Built once, then only read.
pub struct Representations {
    pub tfidf: TfidfIndex,
    /// Vectorizer over the latent field; SVD and NMF both factorize its matrix.
    pub latent_vectorizer: TfidfVectorizer,
    pub svd: LatentIndex<TruncatedSvd>,
    pub nmf: LatentIndex<Nmf>,
    pub dense: Option<DenseStore>,
    pub embedding_status: EmbeddingStatus,
    embedder: Option<Arc<dyn QueryEmbedder>>,
}

impl Representations {
    pub fn build(corpus: &CorpusIndex, config: &EngineConfig, embedder: Option<Arc<dyn QueryEmbedder>>) -> Result<Self> {
        let tfidf = TfidfIndex::fit(corpus, config)?;

        let (mut latent_vectorizer, mut latent_matrix) =
            TfidfVectorizer::fit_transform(&corpus.field_values(config.latent_field), &config.vectorizer)?;
        if latent_vectorizer.dim() == 0 {
            tracing::warn!(field = %config.latent_field, "latent field has no vocabulary; factorizing the retrieval text instead");
            (latent_vectorizer, latent_matrix) =
                TfidfVectorizer::fit_transform(corpus.retrieval_texts(), &config.vectorizer)?;
        }
        let (svd_model, svd_docs) =
            TruncatedSvd::fit_transform(&latent_matrix, config.svd_components, config.svd_iterations, config.seed)?;
        let (nmf_model, nmf_docs) = Nmf::fit_transform(
            &latent_matrix,
            config.nmf_components,
            config.nmf_iterations,
            config.nmf_tolerance,
            config.seed,
        )?;

        let (dense, embedding_status) = DenseStore::open(config.embeddings_path.as_deref(), corpus.len());

        let reps = Self {
            tfidf,
            latent_vectorizer,
            svd: LatentIndex { model: svd_model, documents: svd_docs },
            nmf: LatentIndex { model: nmf_model, documents: nmf_docs },
            dense,
            embedding_status,
            embedder,
        };
        reps.check_alignment(corpus.len())?;
        Ok(reps)
    }

    /// Every enabled method must hold exactly one vector per document.
    pub(crate) fn check_alignment(&self, num_docs: usize) -> Result<()> {
        let mut counts = vec![
            ("tfidf", self.tfidf.n_rows()),
            ("svd", self.svd.documents.nrows()),
            ("nmf", self.nmf.documents.nrows()),
        ];
        if let Some(dense) = &self.dense {
            counts.push(("bert", dense.len()));
        }
        for (method, rows) in counts {
            if rows != num_docs {
                return Err(SearchError::Initialization(format!(
                    "{method} holds {rows} document vectors for {num_docs} documents"
                )));
            }
        }
        Ok(())
    }

    pub fn is_available(&self, method: Method) -> bool {
        match method {
            Method::Bert => self.dense.is_some(),
            _ => true,
        }
    }

    /// Dimensionality of the method's document vectors.
    pub fn dimension(&self, method: Method) -> Option<usize> {
        match method {
            Method::Tfidf => Some(self.tfidf.dimension()),
            Method::Svd => Some(self.svd.model.n_components()),
            Method::Nmf => Some(self.nmf.model.n_components()),
            Method::Bert => self.dense.as_ref().map(DenseStore::dimension),
        }
    }

    /// Encodes a query for `method` with the already-fitted state.
    pub fn encode(&self, method: Method, text: &str, query_vector: Option<&[f32]>) -> Result<QueryVector> {
        let encoded = match method {
            Method::Tfidf => self.tfidf.encode(text),
            Method::Svd => QueryVector::Dense(self.svd.model.project(&self.latent_vectorizer.transform(text))?),
            Method::Nmf => QueryVector::Dense(self.nmf.model.project(&self.latent_vectorizer.transform(text))?),
            Method::Bert => {
                let store = self.dense.as_ref().ok_or_else(|| SearchError::MethodUnavailable {
                    method: method.to_string(),
                    reason: self.embedding_status.describe(),
                })?;
                let vector = match (query_vector, &self.embedder) {
                    (Some(v), _) => {
                        store.check_supplied(v)?;
                        v.to_vec()
                    }
                    (None, Some(embedder)) => {
                        let v = embedder.embed(text).map_err(|e| SearchError::MethodUnavailable {
                            method: method.to_string(),
                            reason: format!("{e:#}"),
                        })?;
                        store.check_embedded(&v)?;
                        v
                    }
                    (None, None) => {
                        return Err(SearchError::InvalidParameter(
                            "bert needs a query_vector: no query embedder is registered".into(),
                        ))
                    }
                };
                QueryVector::Dense(vector)
            }
        };
        if let Some(expected) = self.dimension(method) {
            ensure_dimension(expected, encoded.dimension())?;
        }
        Ok(encoded)
    }

    /// Document-side view for scoring.
    pub fn documents(&self, method: Method) -> Result<DocumentVectors<'_>> {
        match method {
            Method::Tfidf => Ok(DocumentVectors::Tfidf(&self.tfidf)),
            Method::Svd => Ok(DocumentVectors::Dense(&self.svd.documents)),
            Method::Nmf => Ok(DocumentVectors::Dense(&self.nmf.documents)),
            Method::Bert => self.dense.as_ref().map(|d| DocumentVectors::Dense(d.vectors())).ok_or_else(|| {
                SearchError::MethodUnavailable { method: method.to_string(), reason: self.embedding_status.describe() }
            }),
        }
    }
}

pub enum DocumentVectors<'a> {
    Tfidf(&'a TfidfIndex),
    Dense(&'a Array2<f32>),
}
