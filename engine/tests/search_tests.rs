mod common;

use common::*;
use engine::{EngineConfig, Method, SearchEngine, SearchError, SearchRequest, TfidfScoring};
use std::sync::Arc;
use std::thread;

#[test]
fn course_filter_excludes_textual_matches() {
    let docs = vec![
        doc("doc1", "install python", "", "", "de"),
        doc("doc2", "install java", "", "", "de"),
        doc("doc3", "install python", "", "", "ml"),
    ];
    let engine = SearchEngine::build(docs, EngineConfig::default(), None).unwrap();
    let req = SearchRequest::new("install python", Method::Tfidf).with_filter("course", "de").with_n_results(5);
    let resp = engine.search(&req).unwrap();
    assert_eq!(ids(&resp.results), vec!["doc1"]);
    assert_eq!(resp.total_results, 1);
}

#[test]
fn retrieval_text_ranks_its_document_first() {
    let config = EngineConfig { svd_components: 8, ..small_config() };
    let engine = SearchEngine::build(faq(), config, None).unwrap();
    let text = engine.corpus().retrieval_text(5).to_string();
    for method in [Method::Tfidf, Method::Svd] {
        let resp = engine.search(&SearchRequest::new(text.clone(), method)).unwrap();
        assert_eq!(resp.results[0].result.document_id, "d5", "{method}");
        assert_eq!(resp.results[0].result.rank, 0);
    }
    let nmf = engine.search(&SearchRequest::new(text, Method::Nmf)).unwrap();
    assert!(nmf.results.iter().any(|h| h.result.document_id == "d5"));
}

#[test]
fn single_document_corpus_matches_its_own_text() {
    let docs = vec![doc("only", "install python", "", "", "de")];
    let engine = SearchEngine::build(docs, EngineConfig::default(), None).unwrap();
    assert!(engine.is_ready());
    for method in [Method::Tfidf, Method::Svd] {
        let resp = engine.search(&SearchRequest::new("install python", method)).unwrap();
        assert_eq!(ids(&resp.results), vec!["only"], "{method}");
        assert_eq!(resp.results[0].result.rank, 0);
    }
}

#[test]
fn filters_excluding_everything_return_nothing() {
    let engine = engine();
    for method in [Method::Tfidf, Method::Svd, Method::Nmf] {
        let req = SearchRequest::new("python docker", method).with_filter("course", "ops");
        let resp = engine.search(&req).unwrap();
        assert!(resp.results.is_empty(), "{method}");
        assert_eq!(resp.total_hits, 0);
    }
}

#[test]
fn concurrent_searches_match_sequential_ones() {
    let engine = Arc::new(engine());
    let queries = ["python install", "docker containers", "kafka broker", "homework deadline"];
    let methods = [Method::Tfidf, Method::Svd, Method::Nmf];
    let expected: Vec<Vec<_>> = queries
        .iter()
        .map(|q| methods.iter().map(|&m| engine.search(&SearchRequest::new(*q, m)).unwrap().results).collect())
        .collect();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let idx = i % queries.len();
                let results: Vec<_> = methods
                    .iter()
                    .map(|&m| engine.search(&SearchRequest::new(queries[idx], m)).unwrap().results)
                    .collect();
                (idx, results)
            })
        })
        .collect();
    for handle in handles {
        let (idx, results) = handle.join().unwrap();
        assert_eq!(results, expected[idx]);
    }
}

#[test]
fn results_are_ordered_and_bounded() {
    let engine = engine();
    let resp = engine.search(&SearchRequest::new("python docker setup", Method::Tfidf).with_n_results(2)).unwrap();
    assert_eq!(resp.results.len(), resp.total_hits.min(2));
    assert_eq!(resp.total_results, resp.results.len());
    for pair in resp.results.windows(2) {
        assert!(pair[0].result.score >= pair[1].result.score);
        assert_eq!(pair[0].result.rank + 1, pair[1].result.rank);
    }
    assert!(resp.results.iter().all(|h| h.result.score > 0.0));
}

#[test]
fn filters_hold_for_every_result() {
    let engine = engine();
    for method in [Method::Tfidf, Method::Svd, Method::Nmf] {
        let req = SearchRequest::new("python setup", method).with_filter("course", "ml").with_n_results(10);
        let resp = engine.search(&req).unwrap();
        assert!(resp.results.iter().all(|h| h.document.course == "ml"), "{method}");
    }
    let none = engine.search(&SearchRequest::new("python", Method::Tfidf).with_filter("course", "ML")).unwrap();
    assert!(none.results.is_empty());
}

#[test]
fn repeated_searches_are_identical() {
    let engine = engine();
    for method in [Method::Tfidf, Method::Svd, Method::Nmf] {
        let req = SearchRequest::new("homework deadline", method);
        let a = engine.search(&req).unwrap();
        let b = engine.search(&req).unwrap();
        assert_eq!(a.results, b.results, "{method}");
    }
}

#[test]
fn stopword_only_query_returns_nothing() {
    let engine = engine();
    for method in [Method::Tfidf, Method::Svd, Method::Nmf] {
        let resp = engine.search(&SearchRequest::new("the and of", method)).unwrap();
        assert!(resp.results.is_empty(), "{method}");
        assert_eq!(resp.total_hits, 0);
    }
    let resp = engine.search(&SearchRequest::new("   ", Method::Tfidf)).unwrap();
    assert!(resp.results.is_empty());
}

#[test]
fn unknown_vocabulary_returns_nothing() {
    let engine = engine();
    let resp = engine.search(&SearchRequest::new("zzyzx quuxplor", Method::Tfidf)).unwrap();
    assert!(resp.results.is_empty());
}

#[test]
fn invalid_requests_are_rejected() {
    let engine = engine();
    let mut req = SearchRequest::new("python", Method::Tfidf);
    req.method = "bm25".into();
    assert!(matches!(engine.search(&req), Err(SearchError::UnsupportedMethod(_))));

    let err = engine.search(&SearchRequest::new("python", Method::Tfidf).with_n_results(0)).unwrap_err();
    assert!(matches!(err, SearchError::InvalidParameter(_)));

    let err = engine.search(&SearchRequest::new("python", Method::Tfidf).with_filter("language", "en")).unwrap_err();
    assert!(matches!(err, SearchError::InvalidParameter(_)));
}

#[test]
fn method_names_are_case_insensitive() {
    let engine = engine();
    let mut req = SearchRequest::new("docker", Method::Tfidf);
    req.method = " TFIDF ".into();
    assert_eq!(engine.search(&req).unwrap().method, Method::Tfidf);
}

#[test]
fn bert_without_artifact_is_unavailable() {
    let engine = engine();
    let err = engine.search(&SearchRequest::new("python", Method::Bert)).unwrap_err();
    assert!(matches!(err, SearchError::MethodUnavailable { .. }));
    assert!(!err.is_fatal());
    assert_eq!(engine.available_methods(), vec![Method::Tfidf, Method::Svd, Method::Nmf]);
}

#[test]
fn encoded_queries_match_document_dimensions() {
    let engine = engine();
    let status = engine.status();
    for document in engine.corpus().documents() {
        for method in [Method::Tfidf, Method::Svd, Method::Nmf] {
            let encoded = engine.encode(method, &document.text).unwrap();
            assert_eq!(encoded.dimension(), status.dimensions[&method], "{method} {}", document.id);
        }
    }
    assert_eq!(status.dimensions[&Method::Svd], 4);
    assert!(!status.dimensions.contains_key(&Method::Bert));
}

#[test]
fn status_and_catalog_describe_the_engine() {
    let engine = engine();
    assert!(engine.is_ready());
    let status = engine.status();
    assert_eq!(status.num_docs, 8);
    assert!(!status.embeddings.is_loaded());
    assert_eq!(engine.available_courses(), vec!["de", "ml"]);

    let catalog = engine.method_catalog();
    assert_eq!(catalog.len(), 4);
    let bert = catalog.iter().find(|m| m.method == Method::Bert).unwrap();
    assert!(!bert.available);
    assert!(catalog.iter().filter(|m| m.supports_boost).all(|m| m.method == Method::Tfidf));
}

#[test]
fn empty_corpus_fails_to_build() {
    let err = SearchEngine::build(Vec::new(), EngineConfig::default(), None).err().unwrap();
    assert_eq!(err, SearchError::CorpusEmpty);
    assert!(err.is_fatal());
}

#[test]
fn document_lookup_by_id() {
    let engine = engine();
    assert_eq!(engine.document("d3").map(|d| d.course.as_str()), Some("ml"));
    assert!(engine.document("missing").is_none());
}

fn kafka_corpus() -> Vec<engine::Document> {
    vec![
        doc("y", "kafka", "", "", "de"),
        doc("x", "kafka", "", "kafka", "de"),
        doc("z", "spark", "", "hive", "de"),
    ]
}

fn scoring_config(scoring: TfidfScoring) -> EngineConfig {
    EngineConfig { text_fields: question_and_text(), tfidf_scoring: scoring, ..small_config() }
}

#[test]
fn field_weighted_scoring_sums_boosted_field_cosines() {
    let engine = SearchEngine::build(kafka_corpus(), scoring_config(TfidfScoring::FieldWeighted), None).unwrap();
    let resp = engine.search(&SearchRequest::new("kafka", Method::Tfidf)).unwrap();
    assert_eq!(ids(&resp.results), vec!["x", "y"]);
    assert!((resp.results[0].result.score - 2.0).abs() < 1e-5);
    assert!((resp.results[1].result.score - 1.0).abs() < 1e-5);

    let boosted = engine.search(&SearchRequest::new("kafka", Method::Tfidf).with_boost("question", 3.0)).unwrap();
    assert!((boosted.results[0].result.score - 4.0).abs() < 1e-5);

    let muted = engine.search(&SearchRequest::new("kafka", Method::Tfidf).with_boost("question", 0.0)).unwrap();
    assert_eq!(ids(&muted.results), vec!["x"]);
}

#[test]
fn concatenated_scoring_is_a_single_cosine() {
    let engine = SearchEngine::build(kafka_corpus(), scoring_config(TfidfScoring::Concatenated), None).unwrap();
    let resp = engine.search(&SearchRequest::new("kafka", Method::Tfidf).with_boost("question", 3.0)).unwrap();
    assert_eq!(resp.results.len(), 2);
    for hit in &resp.results {
        assert!((hit.result.score - 1.0).abs() < 1e-5, "{}", hit.result.score);
    }
}

#[test]
fn concatenated_boost_reweights_field_contributions() {
    let docs = vec![
        doc("a", "kafka", "", "spark", "de"),
        doc("b", "spark", "", "kafka", "de"),
        doc("c", "hive", "", "flink", "de"),
    ];
    let engine = SearchEngine::build(docs, scoring_config(TfidfScoring::Concatenated), None).unwrap();
    let by_question = engine.search(&SearchRequest::new("kafka", Method::Tfidf).with_boost("question", 5.0)).unwrap();
    assert_eq!(ids(&by_question.results), vec!["a", "b"]);
    let by_text = engine.search(&SearchRequest::new("kafka", Method::Tfidf).with_boost("text", 5.0)).unwrap();
    assert_eq!(ids(&by_text.results), vec!["b", "a"]);
}

#[test]
fn concatenated_vector_sums_field_weights() {
    let docs = vec![doc("p", "kafka spark", "", "kafka", "de"), doc("z", "flink", "", "hive", "de")];
    let engine = SearchEngine::build(docs, scoring_config(TfidfScoring::Concatenated), None).unwrap();
    let resp = engine.search(&SearchRequest::new("kafka", Method::Tfidf)).unwrap();
    assert_eq!(ids(&resp.results), vec!["p"]);
    // kafka from each field (weight 2·idf) against spark (idf), all idf equal
    let per_field = 2.0 / 5f32.sqrt();
    assert!((resp.results[0].result.score - per_field).abs() < 1e-5, "{}", resp.results[0].result.score);
    // tf-idf of the joined string would take 1 + ln 2 for kafka instead
    let tf = 1.0 + 2f32.ln();
    let joined = tf / (tf * tf + 1.0).sqrt();
    assert!((resp.results[0].result.score - joined).abs() > 1e-2);
}

#[test]
fn scoring_modes_rank_differently_for_same_boosts() {
    let docs = vec![
        doc("p", "kafka spark", "", "kafka hive", "de"),
        doc("r", "kafka", "", "", "de"),
        doc("z", "flink", "", "flink", "de"),
    ];
    let req = SearchRequest::new("kafka", Method::Tfidf);

    let weighted = SearchEngine::build(docs.clone(), scoring_config(TfidfScoring::FieldWeighted), None).unwrap();
    assert_eq!(ids(&weighted.search(&req).unwrap().results), vec!["p", "r"]);

    let single = SearchEngine::build(docs, scoring_config(TfidfScoring::Concatenated), None).unwrap();
    assert_eq!(ids(&single.search(&req).unwrap().results), vec!["r", "p"]);
}
