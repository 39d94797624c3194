mod common;

use common::*;
use engine::{ComparisonRequest, MethodRun};

fn request(query: &str, methods: &[&str]) -> ComparisonRequest {
    ComparisonRequest {
        query: query.into(),
        methods: methods.iter().map(|m| m.to_string()).collect(),
        ..ComparisonRequest::default()
    }
}

#[test]
fn failing_methods_do_not_abort_the_others() {
    let engine = engine();
    let report = engine.compare(&request("python install", &["tfidf", "bert", "elastic", "svd"]));

    assert_eq!(report.outcomes.len(), 4);
    assert!(report.outcome("tfidf").unwrap().is_completed());
    assert!(report.outcome("svd").unwrap().is_completed());
    match &report.outcome("bert").unwrap().run {
        MethodRun::Failed { error, .. } => assert_eq!(*error, "method_unavailable"),
        other => panic!("bert should fail, got {other:?}"),
    }
    match &report.outcome("elastic").unwrap().run {
        MethodRun::Failed { error, .. } => assert_eq!(*error, "unsupported_method"),
        other => panic!("elastic should fail, got {other:?}"),
    }
    // only completed methods are paired
    assert_eq!(report.overlaps.len(), 1);
    assert_eq!(report.overlaps[0].left, "tfidf");
    assert_eq!(report.overlaps[0].right, "svd");
}

#[test]
fn empty_method_list_runs_every_available_method() {
    let engine = engine();
    let report = engine.compare(&request("docker", &[]));
    let names: Vec<&str> = report.outcomes.iter().map(|o| o.method.as_str()).collect();
    assert_eq!(names, vec!["tfidf", "svd", "nmf"]);
    assert_eq!(report.overlaps.len(), 3);
    assert!(report.fastest().is_some());
}

#[test]
fn duplicate_methods_run_once() {
    let engine = engine();
    let report = engine.compare(&request("docker", &["tfidf", "tfidf"]));
    assert_eq!(report.outcomes.len(), 1);
}

#[test]
fn duplicates_are_judged_on_the_parsed_method() {
    let engine = engine();
    let report = engine.compare(&request("docker", &["tfidf", "TFIDF", " Tfidf ", "svd"]));
    let names: Vec<&str> = report.outcomes.iter().map(|o| o.method.as_str()).collect();
    assert_eq!(names, vec!["tfidf", "svd"]);
    assert_eq!(report.overlaps.len(), 1);

    let report = engine.compare(&request("docker", &["elastic", "elastic", "Elastic"]));
    assert_eq!(report.outcomes.len(), 2);
}

#[test]
fn repeated_comparisons_agree() {
    let engine = engine();
    let req = request("python docker setup", &["tfidf", "svd", "nmf"]);
    let first = engine.compare(&req);
    let second = engine.compare(&req);
    for (a, b) in first.outcomes.iter().zip(&second.outcomes) {
        assert_eq!(a.method, b.method);
        assert_eq!(a.results(), b.results(), "{}", a.method);
    }
    assert_eq!(first.overlaps, second.overlaps);
    assert_eq!(first.consensus, second.consensus);
}

#[test]
fn consensus_is_shared_top_k() {
    let engine = engine();
    let mut req = request("Kafka broker is not reachable", &["tfidf", "tfidf"]);
    req.top_k = Some(3);
    let report = engine.compare(&req);
    assert_eq!(report.top_k, 3);
    let tfidf = report.outcome("tfidf").unwrap().results().unwrap();
    let expected: Vec<String> = tfidf.iter().take(3).map(|h| h.result.document_id.clone()).collect();
    assert_eq!(report.consensus, expected);
}

#[test]
fn invalid_parameters_fail_every_method() {
    let engine = engine();
    let mut req = request("python", &["tfidf", "nmf"]);
    req.n_results = Some(-1);
    let report = engine.compare(&req);
    assert!(report.outcomes.iter().all(|o| !o.is_completed()));
    assert!(report.consensus.is_empty());
    assert!(report.fastest().is_none());
}
