//! Head-to-head comparison of retrieval methods on one query.

use crate::engine::{SearchEngine, SearchHit};
use crate::error::SearchError;
use crate::method::Method;
use crate::query::SearchRequest;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub query: String,
    /// Methods to run, in report order. Empty means every available method.
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub n_results: Option<i64>,
    #[serde(default)]
    pub boost: BTreeMap<String, f32>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub query_vector: Option<Vec<f32>>,
    /// Depth of the id sets used for agreement metrics.
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodRun {
    Completed {
        results: Vec<SearchHit>,
        total_hits: usize,
        execution_time: f64,
    },
    Failed {
        error: &'static str,
        reason: String,
        execution_time: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodOutcome {
    pub method: String,
    #[serde(flatten)]
    pub run: MethodRun,
}

impl MethodOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.run, MethodRun::Completed { .. })
    }

    pub fn results(&self) -> Option<&[SearchHit]> {
        match &self.run {
            MethodRun::Completed { results, .. } => Some(results),
            MethodRun::Failed { .. } => None,
        }
    }

    pub fn execution_time(&self) -> f64 {
        match &self.run {
            MethodRun::Completed { execution_time, .. } | MethodRun::Failed { execution_time, .. } => *execution_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairOverlap {
    pub left: String,
    pub right: String,
    /// |A ∩ B| / |A ∪ B| over the top-k document ids; 1.0 when both are empty.
    pub jaccard: f32,
    pub shared: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub query: String,
    pub top_k: usize,
    pub outcomes: Vec<MethodOutcome>,
    pub overlaps: Vec<PairOverlap>,
    /// Ids present in the top-k of every completed method, in the order the
    /// first completed method ranked them.
    pub consensus: Vec<String>,
}

impl ComparisonReport {
    pub fn outcome(&self, method: &str) -> Option<&MethodOutcome> {
        self.outcomes.iter().find(|o| o.method == method)
    }

    pub fn fastest(&self) -> Option<&MethodOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.is_completed())
            .min_by(|a, b| a.execution_time().total_cmp(&b.execution_time()))
    }
}

impl SearchEngine {
    /// Runs every requested method independently. A failing method is
    /// recorded in its outcome; it never aborts the others.
    pub fn compare(&self, request: &ComparisonRequest) -> ComparisonReport {
        let methods: Vec<String> = if request.methods.is_empty() {
            self.available_methods().iter().map(Method::to_string).collect()
        } else {
            // duplicates are judged on the parsed method; unknown names on their raw text
            let (mut seen, mut seen_raw) = (HashSet::new(), HashSet::new());
            request
                .methods
                .iter()
                .filter(|m| match m.parse::<Method>() {
                    Ok(method) => seen.insert(method),
                    Err(_) => seen_raw.insert(m.as_str()),
                })
                .cloned()
                .collect()
        };
        let top_k = request.top_k.unwrap_or(self.config().comparison_top_k).max(1);

        let outcomes: Vec<MethodOutcome> = methods
            .into_iter()
            .map(|method| {
                let search = SearchRequest {
                    query: request.query.clone(),
                    method: method.clone(),
                    n_results: request.n_results,
                    boost: request.boost.clone(),
                    filters: request.filters.clone(),
                    query_vector: request.query_vector.clone(),
                };
                let start = Instant::now();
                let run = match self.search(&search) {
                    Ok(resp) => MethodRun::Completed {
                        results: resp.results,
                        total_hits: resp.total_hits,
                        execution_time: start.elapsed().as_secs_f64(),
                    },
                    Err(err) => {
                        log_failure(&method, &err);
                        MethodRun::Failed {
                            error: err.kind(),
                            reason: err.to_string(),
                            execution_time: start.elapsed().as_secs_f64(),
                        }
                    }
                };
                MethodOutcome { method, run }
            })
            .collect();

        let top_ids: Vec<(&str, Vec<&str>)> = outcomes
            .iter()
            .filter_map(|o| {
                o.results()
                    .map(|hits| (o.method.as_str(), hits.iter().take(top_k).map(|h| h.result.document_id.as_str()).collect()))
            })
            .collect();

        let mut overlaps = Vec::new();
        for (i, (left, a)) in top_ids.iter().enumerate() {
            for (right, b) in &top_ids[i + 1..] {
                let (score, shared) = jaccard(a, b);
                overlaps.push(PairOverlap { left: left.to_string(), right: right.to_string(), jaccard: score, shared });
            }
        }

        let consensus = match top_ids.split_first() {
            Some(((_, first), rest)) => first
                .iter()
                .filter(|id| rest.iter().all(|(_, ids)| ids.contains(*id)))
                .map(|id| id.to_string())
                .collect(),
            None => Vec::new(),
        };

        ComparisonReport { query: request.query.clone(), top_k, outcomes, overlaps, consensus }
    }
}

fn log_failure(method: &str, err: &SearchError) {
    if err.is_fatal() {
        tracing::error!(method, error = %err, "method failed with an integrity error during comparison");
    } else {
        tracing::warn!(method, error = %err, "method failed during comparison");
    }
}

/// Jaccard index and intersection size of two id lists treated as sets.
pub fn jaccard(a: &[&str], b: &[&str]) -> (f32, usize) {
    let a: HashSet<&str> = a.iter().copied().collect();
    let b: HashSet<&str> = b.iter().copied().collect();
    let union = a.union(&b).count();
    let shared = a.intersection(&b).count();
    if union == 0 {
        return (1.0, 0);
    }
    (shared as f32 / union as f32, shared)
}
