use crate::engine::SearchHit;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRange {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
}

/// Summary of a result list for dashboards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultStatistics {
    pub total_results: usize,
    pub score_range: Option<ScoreRange>,
    pub courses: BTreeMap<String, usize>,
    pub sections: BTreeMap<String, usize>,
}

pub fn result_statistics(hits: &[SearchHit]) -> ResultStatistics {
    let mut courses = BTreeMap::new();
    let mut sections = BTreeMap::new();
    for hit in hits {
        *courses.entry(hit.document.course.clone()).or_insert(0) += 1;
        *sections.entry(hit.document.section.clone()).or_insert(0) += 1;
    }
    let score_range = (!hits.is_empty()).then(|| {
        let scores = hits.iter().map(|h| h.result.score);
        ScoreRange {
            min: scores.clone().fold(f32::INFINITY, f32::min),
            max: scores.clone().fold(f32::NEG_INFINITY, f32::max),
            mean: scores.sum::<f32>() / hits.len() as f32,
        }
    });
    ResultStatistics { total_results: hits.len(), score_range, courses, sections }
}
