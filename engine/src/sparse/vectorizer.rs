use super::{SparseMatrix, SparseVector, TermId};
use crate::config::VectorizerParams;
use crate::error::Result;
use crate::tokenizer::Analyzer;
use std::collections::{BTreeMap, HashMap, HashSet};

/// TF-IDF vectorizer. The vocabulary, idf weights and analyzer are fixed at
/// fit time and reused unchanged for every query.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    analyzer: Analyzer,
    vocabulary: HashMap<String, TermId>,
    terms: Vec<String>,
    idf: Vec<f32>,
    sublinear_tf: bool,
}

impl TfidfVectorizer {
    /// Fits on `texts` and returns the vectorizer with the L2-normalized
    /// document-term matrix, one row per text in input order.
    pub fn fit_transform<S: AsRef<str>>(texts: &[S], params: &VectorizerParams) -> Result<(Self, SparseMatrix)> {
        let analyzer = Analyzer::from_params(params);
        let analyzed: Vec<Vec<String>> = texts.iter().map(|t| analyzer.terms(t.as_ref())).collect();

        // term -> (document frequency, total count); BTreeMap keeps fitting deterministic
        let mut stats: BTreeMap<&str, (u32, u64)> = BTreeMap::new();
        for doc_terms in &analyzed {
            let mut seen: HashSet<&str> = HashSet::new();
            for term in doc_terms {
                let entry = stats.entry(term.as_str()).or_insert((0, 0));
                entry.1 += 1;
                if seen.insert(term.as_str()) {
                    entry.0 += 1;
                }
            }
        }

        let n = texts.len().max(1);
        let max_df = params.max_df_ratio * n as f32;
        let mut kept: Vec<(&str, u32, u64)> = stats
            .into_iter()
            .filter(|(_, (df, _))| *df as usize >= params.min_df && *df as f32 <= max_df)
            .map(|(term, (df, count))| (term, df, count))
            .collect();
        if let Some(limit) = params.max_features {
            if kept.len() > limit {
                kept.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| a.0.cmp(b.0)));
                kept.truncate(limit);
                kept.sort_by(|a, b| a.0.cmp(b.0));
            }
        }

        // every kept term in every text (a single text, say) leaves ln(N/df) = 0
        // for the whole vocabulary and nothing could ever score
        let saturated = !kept.is_empty() && kept.iter().all(|(_, df, _)| *df as usize >= n);
        let smooth = params.smooth_idf || saturated;
        if saturated && !params.smooth_idf {
            tracing::warn!(num_texts = texts.len(), vocab = kept.len(), "every term occurs in every text; using smoothed idf");
        }

        let mut vocabulary = HashMap::with_capacity(kept.len());
        let mut terms = Vec::with_capacity(kept.len());
        let mut idf = Vec::with_capacity(kept.len());
        for (tid, (term, df, _)) in kept.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), tid as TermId);
            terms.push(term.to_string());
            let ratio = n as f32 / df.max(1) as f32;
            idf.push(if smooth { (1.0 + ratio).ln() } else { ratio.ln() });
        }
        if terms.is_empty() {
            tracing::warn!(num_texts = texts.len(), min_df = params.min_df, "vectorizer fitted an empty vocabulary");
        }

        let vectorizer = Self { analyzer, vocabulary, terms, idf, sublinear_tf: params.sublinear_tf };
        let rows = analyzed.iter().map(|t| vectorizer.weigh(t).normalized()).collect();
        let matrix = SparseMatrix::new(vectorizer.dim(), rows)?;
        tracing::debug!(vocab = vectorizer.dim(), nnz = matrix.nnz(), "fitted tf-idf vectorizer");
        Ok((vectorizer, matrix))
    }

    pub fn dim(&self) -> usize {
        self.terms.len()
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.vocabulary.get(term).copied()
    }

    pub fn term(&self, id: TermId) -> Option<&str> {
        self.terms.get(id as usize).map(String::as_str)
    }

    pub fn idf(&self, id: TermId) -> Option<f32> {
        self.idf.get(id as usize).copied()
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// L2-normalized tf-idf vector of `text` in the fitted vocabulary.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.raw_weights(text).normalized()
    }

    /// Un-normalized tf-idf weights; out-of-vocabulary terms are ignored.
    pub fn raw_weights(&self, text: &str) -> SparseVector {
        self.weigh(&self.analyzer.terms(text))
    }

    fn weigh(&self, terms: &[String]) -> SparseVector {
        let mut counts: HashMap<TermId, u32> = HashMap::new();
        for term in terms {
            if let Some(&tid) = self.vocabulary.get(term) {
                *counts.entry(tid).or_insert(0) += 1;
            }
        }
        let pairs = counts
            .into_iter()
            .map(|(tid, c)| {
                let tf = if self.sublinear_tf { 1.0 + (c as f32).ln() } else { c as f32 };
                (tid, tf * self.idf[tid as usize])
            })
            .collect();
        SparseVector::from_pairs(self.dim(), pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> VectorizerParams {
        VectorizerParams { stemming: false, ..VectorizerParams::default() }
    }

    #[test]
    fn single_text_falls_back_to_smoothed_idf() {
        let (v, m) = TfidfVectorizer::fit_transform(&["install python"], &params()).unwrap();
        let expected = 2f32.ln();
        assert_eq!(v.idf(v.term_id("python").unwrap()), Some(expected));
        assert_eq!(m.row(0).nnz(), 2);
        let q = v.transform("install python");
        assert!((q.cosine(m.row(0)).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn vocabulary_is_sorted_and_idf_is_unsmoothed() {
        let texts = ["install python", "install java", "install python docker"];
        let (v, m) = TfidfVectorizer::fit_transform(&texts, &params()).unwrap();
        assert_eq!(v.dim(), 4);
        assert_eq!(v.term(0), Some("docker"));
        assert_eq!(v.term_id("python"), Some(3));
        // present everywhere -> ln(1) = 0
        assert_eq!(v.idf(v.term_id("install").unwrap()), Some(0.0));
        assert_eq!(m.n_rows(), 3);
        assert!(m.row(1).iter().all(|(t, _)| v.term(t) == Some("java")));
    }

    #[test]
    fn min_df_and_max_features_prune_vocabulary() {
        let texts = ["a1 shared", "b1 shared", "shared shared c1"];
        let p = VectorizerParams { min_df: 2, ..params() };
        let (v, _) = TfidfVectorizer::fit_transform(&texts, &p).unwrap();
        assert_eq!(v.dim(), 1);
        assert_eq!(v.term(0), Some("shared"));

        let p = VectorizerParams { max_features: Some(1), smooth_idf: true, ..params() };
        let (v, _) = TfidfVectorizer::fit_transform(&texts, &p).unwrap();
        assert_eq!(v.term(0), Some("shared"));
    }

    #[test]
    fn query_encoding_never_grows_vocabulary() {
        let texts = ["spark cluster", "kafka stream"];
        let (v, _) = TfidfVectorizer::fit_transform(&texts, &params()).unwrap();
        let q = v.transform("spark unknownterm");
        assert_eq!(q.dim(), v.dim());
        assert_eq!(q.nnz(), 1);
        assert!((q.norm() - 1.0).abs() < 1e-6);
        assert!(v.transform("nothing matches").is_empty());
    }

    #[test]
    fn sublinear_tf_dampens_repeats() {
        let texts = ["kafka kafka kafka spark", "other"];
        let (v, _) = TfidfVectorizer::fit_transform(&texts, &params()).unwrap();
        let raw = v.raw_weights("kafka kafka kafka");
        let (_, w) = raw.iter().next().unwrap();
        let idf = v.idf(v.term_id("kafka").unwrap()).unwrap();
        assert!((w - (1.0 + 3f32.ln()) * idf).abs() < 1e-6);
    }
}
