use crate::config::EngineConfig;
use crate::document::{Document, Field};
use crate::error::{Result, SearchError};
use crate::method::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_method() -> String {
    Method::Tfidf.to_string()
}

/// Search request as received from the API or dashboard layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Falls back to the configured default when absent.
    #[serde(default)]
    pub n_results: Option<i64>,
    #[serde(default)]
    pub boost: BTreeMap<String, f32>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    /// Pre-encoded query for the dense method.
    #[serde(default)]
    pub query_vector: Option<Vec<f32>>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, method: Method) -> Self {
        Self { query: query.into(), method: method.to_string(), ..Self::default() }
    }

    pub fn with_n_results(mut self, n: i64) -> Self {
        self.n_results = Some(n);
        self
    }

    pub fn with_boost(mut self, field: &str, multiplier: f32) -> Self {
        self.boost.insert(field.to_string(), multiplier);
        self
    }

    pub fn with_filter(mut self, field: &str, value: &str) -> Self {
        self.filters.insert(field.to_string(), value.to_string());
        self
    }

    pub fn with_query_vector(mut self, vector: Vec<f32>) -> Self {
        self.query_vector = Some(vector);
        self
    }

    /// Validates the request against the engine configuration.
    pub fn validate(&self, config: &EngineConfig) -> Result<Query> {
        let method: Method = self.method.parse()?;
        let n_results = match self.n_results {
            None => config.default_n_results,
            Some(n) if n <= 0 => {
                return Err(SearchError::InvalidParameter(format!("n_results must be positive, got {n}")))
            }
            Some(n) if n as u64 > config.max_n_results as u64 => {
                return Err(SearchError::InvalidParameter(format!(
                    "n_results must be at most {}, got {n}",
                    config.max_n_results
                )))
            }
            Some(n) => n as usize,
        };
        let boost = Boosts::parse(&self.boost, &config.text_fields)?;
        let filters = Filters::parse(&self.filters, config.case_insensitive_filters)?;
        Ok(Query {
            text: self.query.clone(),
            method,
            n_results,
            boost,
            filters,
            query_vector: self.query_vector.clone(),
        })
    }
}

/// A validated query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub method: Method,
    pub n_results: usize,
    pub boost: Boosts,
    pub filters: Filters,
    pub query_vector: Option<Vec<f32>>,
}

/// Per-field multipliers; unlisted fields weigh 1.0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boosts {
    weights: BTreeMap<Field, f32>,
}

impl Boosts {
    pub fn parse(raw: &BTreeMap<String, f32>, text_fields: &[Field]) -> Result<Self> {
        let mut weights = BTreeMap::new();
        for (name, &mult) in raw {
            let field: Field = name.parse()?;
            if !text_fields.contains(&field) {
                return Err(SearchError::InvalidParameter(format!("field {field} is not a searchable text field")));
            }
            if !mult.is_finite() || mult < 0.0 {
                return Err(SearchError::InvalidParameter(format!(
                    "boost for {field} must be a finite non-negative number, got {mult}"
                )));
            }
            weights.insert(field, mult);
        }
        Ok(Self { weights })
    }

    pub fn get(&self, field: Field) -> f32 {
        self.weights.get(&field).copied().unwrap_or(1.0)
    }

    /// True when every multiplier is 1.0.
    pub fn is_neutral(&self) -> bool {
        self.weights.values().all(|&w| w == 1.0)
    }
}

/// Exact-match attribute constraints. Matching is case-sensitive unless the
/// engine is configured otherwise; "Data-Engineering" does not match
/// "data-engineering" by default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    conditions: Vec<(Field, String)>,
    case_insensitive: bool,
}

impl Filters {
    pub fn parse(raw: &BTreeMap<String, String>, case_insensitive: bool) -> Result<Self> {
        let conditions = raw
            .iter()
            .map(|(name, value)| Ok((name.parse::<Field>()?, value.clone())))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { conditions, case_insensitive })
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            let actual = doc.field(*field);
            if self.case_insensitive {
                actual.to_lowercase() == expected.to_lowercase()
            } else {
                actual == expected
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(course: &str) -> Document {
        Document {
            id: "1".into(),
            question: "q".into(),
            section: "s".into(),
            text: "t".into(),
            course: course.into(),
        }
    }

    #[test]
    fn n_results_bounds() {
        let cfg = EngineConfig::default();
        let req = SearchRequest::new("python", Method::Tfidf);
        assert_eq!(req.validate(&cfg).unwrap().n_results, 10);
        for bad in [0, -3, 101] {
            let err = req.clone().with_n_results(bad).validate(&cfg).unwrap_err();
            assert!(matches!(err, SearchError::InvalidParameter(_)), "{bad}");
        }
        assert_eq!(req.with_n_results(100).validate(&cfg).unwrap().n_results, 100);
    }

    #[test]
    fn unknown_method_is_unsupported() {
        let mut req = SearchRequest::new("python", Method::Tfidf);
        req.method = "elastic".into();
        assert_eq!(
            req.validate(&EngineConfig::default()).unwrap_err(),
            SearchError::UnsupportedMethod("elastic".into())
        );
    }

    #[test]
    fn boosts_validate_fields_and_values() {
        let cfg = EngineConfig::default();
        let q = SearchRequest::new("x", Method::Tfidf).with_boost("question", 3.0).validate(&cfg).unwrap();
        assert_eq!(q.boost.get(Field::Question), 3.0);
        assert_eq!(q.boost.get(Field::Text), 1.0);
        assert!(!q.boost.is_neutral());

        for (field, mult) in [("course", 2.0), ("title", 2.0), ("text", -1.0), ("text", f32::NAN)] {
            let err = SearchRequest::new("x", Method::Tfidf).with_boost(field, mult).validate(&cfg).unwrap_err();
            assert!(matches!(err, SearchError::InvalidParameter(_)), "{field} {mult}");
        }
    }

    #[test]
    fn filters_are_case_sensitive_by_default() {
        let raw: BTreeMap<String, String> = [("course".to_string(), "Data".to_string())].into_iter().collect();
        let strict = Filters::parse(&raw, false).unwrap();
        assert!(!strict.matches(&doc("data")));
        assert!(strict.matches(&doc("Data")));
        let loose = Filters::parse(&raw, true).unwrap();
        assert!(loose.matches(&doc("data")));
    }

    #[test]
    fn unknown_filter_field_is_invalid() {
        let raw: BTreeMap<String, String> = [("lang".to_string(), "en".to_string())].into_iter().collect();
        assert!(matches!(Filters::parse(&raw, false), Err(SearchError::InvalidParameter(_))));
    }
}
