use crate::document::Field;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How TF-IDF combines per-field evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TfidfScoring {
    /// One vectorizer per text field; score is the boost-weighted sum of
    /// per-field cosine similarities.
    FieldWeighted,
    /// One vectorizer over the retrieval text; boosts reweight each field's
    /// terms inside a single document vector before one cosine.
    Concatenated,
}

impl std::str::FromStr for TfidfScoring {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "field_weighted" => Ok(Self::FieldWeighted),
            "concatenated" => Ok(Self::Concatenated),
            other => Err(SearchError::Initialization(format!("unknown tfidf scoring mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VectorizerParams {
    /// Minimum number of documents a term must occur in.
    pub min_df: usize,
    /// Terms occurring in more than this share of documents are dropped.
    pub max_df_ratio: f32,
    pub max_features: Option<usize>,
    pub ngram_range: (usize, usize),
    /// ln(1 + N/df) instead of ln(N/df)
    pub smooth_idf: bool,
    /// 1 + ln(tf) instead of raw counts
    pub sublinear_tf: bool,
    pub stopwords: bool,
    pub stemming: bool,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            min_df: 1,
            max_df_ratio: 1.0,
            max_features: None,
            ngram_range: (1, 1),
            smooth_idf: false,
            sublinear_tf: true,
            stopwords: true,
            stemming: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub text_fields: Vec<Field>,
    pub tfidf_scoring: TfidfScoring,
    pub vectorizer: VectorizerParams,
    /// Field whose TF-IDF matrix the SVD and NMF factorizers are fitted on.
    pub latent_field: Field,
    pub svd_components: usize,
    pub svd_iterations: usize,
    pub nmf_components: usize,
    pub nmf_iterations: usize,
    pub nmf_tolerance: f32,
    pub seed: u64,
    pub default_n_results: usize,
    pub max_n_results: usize,
    pub max_documents: usize,
    pub case_insensitive_filters: bool,
    /// Pre-computed dense embeddings; `None` disables the bert method.
    pub embeddings_path: Option<PathBuf>,
    pub comparison_top_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            text_fields: vec![Field::Section, Field::Question, Field::Text],
            tfidf_scoring: TfidfScoring::FieldWeighted,
            vectorizer: VectorizerParams::default(),
            latent_field: Field::Text,
            svd_components: 16,
            svd_iterations: 7,
            nmf_components: 16,
            nmf_iterations: 200,
            nmf_tolerance: 1e-4,
            seed: 42,
            default_n_results: 10,
            max_n_results: 100,
            max_documents: 1_000_000,
            case_insensitive_filters: false,
            embeddings_path: None,
            comparison_top_k: 5,
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `DOCSEARCH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Initialization(format!("reading config {}: {e}", path.display())))?;
        let cfg: Self = serde_json::from_str(&raw)
            .map_err(|e| SearchError::Initialization(format!("parsing config {}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>) -> Result<Option<T>> {
            match raw {
                None => Ok(None),
                Some(v) => v
                    .trim()
                    .parse()
                    .map(Some)
                    .map_err(|_| SearchError::Initialization(format!("{key} has invalid value {v:?}"))),
            }
        }

        if let Some(v) = parsed("DOCSEARCH_MIN_DF", lookup("DOCSEARCH_MIN_DF"))? {
            self.vectorizer.min_df = v;
        }
        if let Some(v) = parsed("DOCSEARCH_MAX_FEATURES", lookup("DOCSEARCH_MAX_FEATURES"))? {
            self.vectorizer.max_features = Some(v);
        }
        if let Some(v) = parsed("DOCSEARCH_SMOOTH_IDF", lookup("DOCSEARCH_SMOOTH_IDF"))? {
            self.vectorizer.smooth_idf = v;
        }
        if let Some(v) = parsed("DOCSEARCH_SVD_COMPONENTS", lookup("DOCSEARCH_SVD_COMPONENTS"))? {
            self.svd_components = v;
        }
        if let Some(v) = parsed("DOCSEARCH_NMF_COMPONENTS", lookup("DOCSEARCH_NMF_COMPONENTS"))? {
            self.nmf_components = v;
        }
        if let Some(v) = parsed("DOCSEARCH_SEED", lookup("DOCSEARCH_SEED"))? {
            self.seed = v;
        }
        if let Some(v) = parsed("DOCSEARCH_DEFAULT_N_RESULTS", lookup("DOCSEARCH_DEFAULT_N_RESULTS"))? {
            self.default_n_results = v;
        }
        if let Some(v) = parsed("DOCSEARCH_MAX_N_RESULTS", lookup("DOCSEARCH_MAX_N_RESULTS"))? {
            self.max_n_results = v;
        }
        if let Some(v) = parsed("DOCSEARCH_TFIDF_SCORING", lookup("DOCSEARCH_TFIDF_SCORING"))? {
            self.tfidf_scoring = v;
        }
        if let Some(v) = lookup("DOCSEARCH_EMBEDDINGS") {
            self.embeddings_path = Some(PathBuf::from(v));
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(SearchError::Initialization(msg));
        if self.text_fields.is_empty() {
            return bad("text_fields must name at least one field".into());
        }
        if self.text_fields.contains(&Field::Id) {
            return bad("the id field cannot be vectorized".into());
        }
        let (lo, hi) = self.vectorizer.ngram_range;
        if lo == 0 || lo > hi {
            return bad(format!("invalid ngram_range ({lo}, {hi})"));
        }
        if !(self.vectorizer.max_df_ratio > 0.0 && self.vectorizer.max_df_ratio <= 1.0) {
            return bad(format!("max_df_ratio must be in (0, 1], got {}", self.vectorizer.max_df_ratio));
        }
        if self.vectorizer.max_features == Some(0) {
            return bad("max_features must be positive".into());
        }
        if self.svd_components == 0 || self.nmf_components == 0 {
            return bad("component counts must be positive".into());
        }
        if self.svd_iterations == 0 || self.nmf_iterations == 0 {
            return bad("iteration counts must be positive".into());
        }
        if self.max_n_results == 0 || self.default_n_results == 0 || self.default_n_results > self.max_n_results {
            return bad(format!(
                "default_n_results ({}) must be in 1..={}",
                self.default_n_results, self.max_n_results
            ));
        }
        if self.comparison_top_k == 0 {
            return bad("comparison_top_k must be positive".into());
        }
        Ok(())
    }
}
