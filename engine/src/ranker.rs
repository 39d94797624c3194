//! Scoring, boosting, filtering and ordering of candidates.

use crate::document::{CorpusIndex, DocPos};
use crate::error::{ensure_dimension, Result, SearchError};
use crate::linalg::cosine;
use crate::query::{Boosts, Filters};
use crate::representation::{DocumentVectors, QueryVector, TfidfIndex};
use crate::sparse::SparseVector;
use ndarray::{Array2, ArrayView1};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document_id: String,
    pub score: f32,
    /// 0-based position in the ranked list.
    pub rank: usize,
}

/// Ranked output plus the number of candidates before truncation.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub results: Vec<(DocPos, SearchResult)>,
    pub total_hits: usize,
}

/// Positions of the documents that pass `filters`, in corpus order.
pub fn admitted(corpus: &CorpusIndex, filters: &Filters) -> Vec<DocPos> {
    (0..corpus.len())
        .filter(|&pos| filters.is_empty() || corpus.document(pos).map(|d| filters.matches(d)).unwrap_or(false))
        .collect()
}

/// Similarity of the query to each document in `positions`, in the order given.
pub fn score_candidates(
    docs: &DocumentVectors<'_>,
    query: &QueryVector,
    boost: &Boosts,
    positions: &[DocPos],
) -> Result<Vec<(DocPos, f32)>> {
    match (docs, query) {
        (DocumentVectors::Tfidf(TfidfIndex::FieldWeighted(fields)), QueryVector::Fields(parts)) => {
            let mut scores = vec![0.0f32; positions.len()];
            for (fv, (field, q)) in fields.iter().zip(parts) {
                debug_assert_eq!(fv.field, *field);
                let b = boost.get(fv.field);
                if b == 0.0 || q.is_empty() {
                    continue;
                }
                for (score, &pos) in scores.iter_mut().zip(positions) {
                    *score += b * fv.matrix.row(pos).cosine(q)?;
                }
            }
            Ok(positions.iter().copied().zip(scores).collect())
        }
        (DocumentVectors::Tfidf(TfidfIndex::Concatenated(c)), QueryVector::Sparse(q)) => {
            if boost.is_neutral() {
                return positions.iter().map(|&pos| c.combined.row(pos).cosine(q).map(|s| (pos, s))).collect();
            }
            let dim = c.vectorizer.dim();
            positions
                .iter()
                .map(|&pos| {
                    let doc = SparseVector::weighted_sum(dim, c.fields.iter().map(|(f, m)| (boost.get(*f), m.row(pos))))?;
                    doc.cosine(q).map(|s| (pos, s))
                })
                .collect()
        }
        (DocumentVectors::Dense(matrix), QueryVector::Dense(q)) => score_dense(matrix, q, positions),
        _ => Err(SearchError::Initialization(
            "query vector kind does not match the method's document vectors".into(),
        )),
    }
}

fn score_dense(matrix: &Array2<f32>, q: &[f32], positions: &[DocPos]) -> Result<Vec<(DocPos, f32)>> {
    ensure_dimension(matrix.ncols(), q.len())?;
    let q = ArrayView1::from(q);
    Ok(positions.iter().map(|&pos| (pos, cosine(matrix.row(pos), q))).collect())
}

/// Keeps positive scores, sorts by descending score with corpus order
/// breaking ties, and truncates to `n_results`.
pub fn rank(mut candidates: Vec<(DocPos, f32)>, corpus: &CorpusIndex, n_results: usize) -> Ranking {
    candidates.retain(|(_, s)| s.is_finite() && *s > 0.0);
    // stable sort: equal scores keep their incoming corpus order
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    let total_hits = candidates.len();
    candidates.truncate(n_results);
    let results = candidates
        .into_iter()
        .enumerate()
        .map(|(rank, (pos, score))| {
            let document_id = corpus.document(pos).map(|d| d.id.clone()).unwrap_or_default();
            (pos, SearchResult { document_id, score, rank })
        })
        .collect();
    Ranking { results, total_hits }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Field};
    use ndarray::arr2;
    use std::collections::BTreeMap;

    fn corpus() -> CorpusIndex {
        let docs = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, id)| Document {
                id: id.to_string(),
                question: String::new(),
                section: String::new(),
                text: "x".into(),
                course: if i % 2 == 0 { "even".into() } else { "odd".into() },
            })
            .collect();
        CorpusIndex::load(docs, &[Field::Text], 100).unwrap()
    }

    fn ids(r: &Ranking) -> Vec<&str> {
        r.results.iter().map(|(_, s)| s.document_id.as_str()).collect()
    }

    fn scored(scores: &[f32]) -> Vec<(DocPos, f32)> {
        scores.iter().copied().enumerate().collect()
    }

    #[test]
    fn ties_keep_corpus_order() {
        let c = corpus();
        let r = rank(scored(&[0.5, 0.9, 0.5, 0.5]), &c, 10);
        assert_eq!(ids(&r), vec!["b", "a", "c", "d"]);
        assert_eq!(r.results[3].1.rank, 3);
    }

    #[test]
    fn zero_scores_are_dropped() {
        let c = corpus();
        let r = rank(scored(&[0.1, 0.0, -0.2, 0.3]), &c, 10);
        assert_eq!(ids(&r), vec!["d", "a"]);
        assert_eq!(r.total_hits, 2);
    }

    #[test]
    fn filters_narrow_candidates_before_scoring() {
        let c = corpus();
        let raw: BTreeMap<String, String> = [("course".to_string(), "even".to_string())].into_iter().collect();
        let filters = Filters::parse(&raw, false).unwrap();
        let positions = admitted(&c, &filters);
        assert_eq!(positions, vec![0, 2]);

        let m = arr2(&[[1.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        let docs = DocumentVectors::Dense(&m);
        let s = score_candidates(&docs, &QueryVector::Dense(vec![1.0, 0.0]), &Boosts::default(), &positions).unwrap();
        assert_eq!(s, vec![(0, 1.0), (2, 0.0)]);
        let r = rank(s, &c, 10);
        assert_eq!(ids(&r), vec!["a"]);
        assert_eq!(r.total_hits, 1);
    }

    #[test]
    fn nothing_admitted_scores_nothing() {
        let c = corpus();
        let raw: BTreeMap<String, String> = [("course".to_string(), "none".to_string())].into_iter().collect();
        let filters = Filters::parse(&raw, false).unwrap();
        assert!(admitted(&c, &filters).is_empty());
        assert_eq!(admitted(&c, &Filters::default()), vec![0, 1, 2, 3]);
    }

    #[test]
    fn truncation_reports_total_hits() {
        let c = corpus();
        let r = rank(scored(&[0.4, 0.3, 0.2, 0.1]), &c, 2);
        assert_eq!(ids(&r), vec!["a", "b"]);
        assert_eq!(r.total_hits, 4);
    }

    #[test]
    fn dense_scoring_checks_dimension() {
        let m = arr2(&[[1.0, 0.0], [0.0, 1.0]]);
        let docs = DocumentVectors::Dense(&m);
        let all = [0, 1];
        let s = score_candidates(&docs, &QueryVector::Dense(vec![1.0, 0.0]), &Boosts::default(), &all).unwrap();
        assert_eq!(s, vec![(0, 1.0), (1, 0.0)]);
        let err = score_candidates(&docs, &QueryVector::Dense(vec![1.0, 0.0, 0.0]), &Boosts::default(), &all).unwrap_err();
        assert_eq!(err, SearchError::DimensionMismatch { expected: 2, actual: 3 });
    }
}
