use crate::error::SearchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of retrieval methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Tfidf,
    Svd,
    Nmf,
    Bert,
}

impl Method {
    pub const ALL: [Method; 4] = [Method::Tfidf, Method::Svd, Method::Nmf, Method::Bert];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Tfidf => "tfidf",
            Method::Svd => "svd",
            Method::Nmf => "nmf",
            Method::Bert => "bert",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Method::Tfidf => "TF-IDF + Cosine Similarity",
            Method::Svd => "SVD + Dimensionality Reduction",
            Method::Nmf => "NMF + Matrix Factorization",
            Method::Bert => "BERT + Semantic Search",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Method::Tfidf => "Per-field TF-IDF vectors scored with cosine similarity",
            Method::Svd => "TF-IDF reduced to dense latent components with truncated SVD",
            Method::Nmf => "TF-IDF factorized into non-negative latent topics",
            Method::Bert => "Cosine similarity over pre-computed dense embeddings",
        }
    }

    pub fn supports_boost(&self) -> bool {
        matches!(self, Method::Tfidf)
    }

    pub fn supports_filters(&self) -> bool {
        true
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tfidf" => Ok(Method::Tfidf),
            "svd" => Ok(Method::Svd),
            "nmf" => Ok(Method::Nmf),
            "bert" => Ok(Method::Bert),
            _ => Err(SearchError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Catalog entry describing one method to API and dashboard clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodInfo {
    pub method: Method,
    pub name: &'static str,
    pub description: &'static str,
    pub supports_boost: bool,
    pub supports_filters: bool,
    pub available: bool,
    pub dimension: Option<usize>,
}
