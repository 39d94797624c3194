use crate::config::EngineConfig;
use crate::dense::{EmbeddingStatus, QueryEmbedder};
use crate::document::{CorpusIndex, Document};
use crate::error::Result;
use crate::method::{Method, MethodInfo};
use crate::query::{Query, SearchRequest};
use crate::ranker::{admitted, rank, score_candidates, SearchResult};
use crate::representation::{QueryVector, Representations};
use crate::tokenizer::Analyzer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub result: SearchResult,
    pub document: Document,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub method: Method,
    pub results: Vec<SearchHit>,
    /// Number of hits returned.
    pub total_results: usize,
    /// Number of matching candidates before truncation to `n_results`.
    pub total_hits: usize,
    /// Seconds spent encoding, scoring and ranking.
    pub execution_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
    pub ready: bool,
    pub num_docs: usize,
    pub methods: Vec<Method>,
    pub dimensions: BTreeMap<Method, usize>,
    pub embeddings: EmbeddingStatus,
}

/// Read-only search context. Built once from the corpus and configuration,
/// then shared (typically behind an `Arc`) by every concurrent query.
pub struct SearchEngine {
    config: EngineConfig,
    corpus: CorpusIndex,
    analyzer: Analyzer,
    reps: Representations,
}

impl SearchEngine {
    pub fn build(
        documents: Vec<Document>,
        config: EngineConfig,
        embedder: Option<Arc<dyn QueryEmbedder>>,
    ) -> Result<Self> {
        let start = Instant::now();
        config.validate()?;
        let corpus = CorpusIndex::load(documents, &config.text_fields, config.max_documents)?;
        let reps = Representations::build(&corpus, &config, embedder)?;
        let analyzer = Analyzer::from_params(&config.vectorizer);
        tracing::info!(
            num_docs = corpus.len(),
            tfidf_dim = reps.tfidf.dimension(),
            embeddings = %reps.embedding_status.describe(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search engine ready"
        );
        Ok(Self { config, corpus, analyzer, reps })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn corpus(&self) -> &CorpusIndex {
        &self.corpus
    }

    pub fn representations(&self) -> &Representations {
        &self.reps
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.corpus.get(id)
    }

    /// True when the corpus is non-empty and every enabled method holds one
    /// fitted vector per document.
    pub fn is_ready(&self) -> bool {
        !self.corpus.is_empty() && self.reps.check_alignment(self.corpus.len()).is_ok()
    }

    pub fn available_methods(&self) -> Vec<Method> {
        Method::ALL.iter().copied().filter(|m| self.reps.is_available(*m)).collect()
    }

    pub fn available_courses(&self) -> Vec<String> {
        self.corpus.courses()
    }

    pub fn method_catalog(&self) -> Vec<MethodInfo> {
        Method::ALL
            .iter()
            .map(|&m| MethodInfo {
                method: m,
                name: m.display_name(),
                description: m.description(),
                supports_boost: m.supports_boost(),
                supports_filters: m.supports_filters(),
                available: self.reps.is_available(m),
                dimension: self.reps.dimension(m),
            })
            .collect()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            ready: self.is_ready(),
            num_docs: self.corpus.len(),
            methods: self.available_methods(),
            dimensions: Method::ALL
                .iter()
                .filter_map(|&m| self.reps.dimension(m).map(|d| (m, d)))
                .collect(),
            embeddings: self.reps.embedding_status.clone(),
        }
    }

    /// Encodes `text` for `method` with the fitted state.
    pub fn encode(&self, method: Method, text: &str) -> Result<QueryVector> {
        self.reps.encode(method, text, None)
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let query = request.validate(&self.config)?;
        self.run(&query)
    }

    pub fn run(&self, query: &Query) -> Result<SearchResponse> {
        let start = Instant::now();
        if !self.reps.is_available(query.method) {
            // surfaces MethodUnavailable with the recorded load status
            self.reps.documents(query.method)?;
        }
        if !query.method.supports_boost() && !query.boost.is_neutral() {
            tracing::debug!(method = %query.method, "boosts ignored for method without field scoring");
        }

        let (ranked, total_hits) = if self.is_blank(query) {
            (Vec::new(), 0)
        } else {
            let encoded = self.reps.encode(query.method, &query.text, query.query_vector.as_deref())?;
            let positions = admitted(&self.corpus, &query.filters);
            if encoded.is_zero() || positions.is_empty() {
                (Vec::new(), 0)
            } else {
                let docs = self.reps.documents(query.method)?;
                let scored = score_candidates(&docs, &encoded, &query.boost, &positions)?;
                let ranking = rank(scored, &self.corpus, query.n_results);
                (ranking.results, ranking.total_hits)
            }
        };
        Ok(self.respond(query, ranked, total_hits, start))
    }

    /// Nothing left to match after normalization. A dense query with an
    /// explicit vector does not depend on its text.
    fn is_blank(&self, query: &Query) -> bool {
        match query.method {
            Method::Bert => query.query_vector.is_none() && query.text.trim().is_empty(),
            _ => self.analyzer.terms(&query.text).is_empty(),
        }
    }

    fn respond(
        &self,
        query: &Query,
        ranked: Vec<(usize, SearchResult)>,
        total_hits: usize,
        start: Instant,
    ) -> SearchResponse {
        let results: Vec<SearchHit> = ranked
            .into_iter()
            .filter_map(|(pos, result)| self.corpus.document(pos).map(|d| SearchHit { result, document: d.clone() }))
            .collect();
        let execution_time = start.elapsed().as_secs_f64();
        tracing::debug!(method = %query.method, hits = results.len(), total_hits, execution_time, "search complete");
        SearchResponse {
            query: query.text.clone(),
            method: query.method,
            total_results: results.len(),
            total_hits,
            results,
            execution_time,
        }
    }
}
