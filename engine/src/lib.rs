//! Multi-method document retrieval: TF-IDF, SVD, NMF and pre-computed dense
//! embeddings over one fixed corpus, with field boosts, exact-match filters
//! and head-to-head method comparison.

pub mod compare;
pub mod config;
pub mod dense;
pub mod document;
pub mod engine;
pub mod error;
pub mod linalg;
pub mod method;
pub mod persist;
pub mod query;
pub mod ranker;
pub mod representation;
pub mod sparse;
pub mod stats;
pub mod tokenizer;

pub use compare::{ComparisonReport, ComparisonRequest, MethodOutcome, MethodRun, PairOverlap};
pub use config::{EngineConfig, TfidfScoring, VectorizerParams};
pub use dense::{EmbeddingStatus, QueryEmbedder};
pub use document::{CorpusIndex, Document, Field};
pub use engine::{EngineStatus, SearchEngine, SearchHit, SearchResponse};
pub use error::{Result, SearchError};
pub use method::{Method, MethodInfo};
pub use query::SearchRequest;
pub use ranker::SearchResult;
pub use stats::{result_statistics, ResultStatistics};
