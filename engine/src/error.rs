//! Error taxonomy for the retrieval engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// No documents were supplied at initialization.
    #[error("corpus is empty: no documents to index")]
    CorpusEmpty,
    /// Fitted models could not be built or loaded.
    #[error("initialization failed: {0}")]
    Initialization(String),
    /// The method name is not one of tfidf, svd, nmf, bert.
    #[error("unsupported search method: {0}")]
    UnsupportedMethod(String),
    /// The method exists but its state is not loaded in this process.
    #[error("method {method} is unavailable: {reason}")]
    MethodUnavailable { method: String, reason: String },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Encoded query and fitted document vectors disagree on dimensionality.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl SearchError {
    /// Fatal errors mean the shared fitted state is unusable or inconsistent.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CorpusEmpty | Self::Initialization(_) | Self::DimensionMismatch { .. }
        )
    }

    /// Short machine-readable name, used in API error bodies and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CorpusEmpty => "corpus_empty",
            Self::Initialization(_) => "initialization",
            Self::UnsupportedMethod(_) => "unsupported_method",
            Self::MethodUnavailable { .. } => "method_unavailable",
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
        }
    }
}

pub(crate) fn ensure_dimension(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SearchError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
