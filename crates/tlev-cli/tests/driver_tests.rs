use serde_json::{Value, json};
use std::io::Write;
use std::time::Duration;

use super::driver::{Driver, QueryReport, load_document, parse_document};
use tlev_common::diagnostics::DiagnosticKind;
use tlev_solver::{Document, Engine, EvalOptions};

fn document(value: Value) -> Document {
    serde_json::from_value(value).expect("valid document")
}

fn prelude_driver() -> Driver {
    Driver::new(Engine::with_prelude().expect("prelude installs"), EvalOptions::default())
}

fn prim(name: &str) -> Value {
    json!({ "kind": "primitive", "name": name })
}

fn r(name: &str) -> Value {
    json!({ "kind": "ref", "name": name })
}

fn mixed_document() -> Document {
    document(json!({
        "aliases": [
            {
                "name": "Wrap",
                "params": [{ "name": "T" }],
                "body": { "kind": "object", "properties": [{ "name": "value", "type": r("T") }] }
            },
            {
                "name": "Chain",
                "params": [{ "name": "T" }],
                "body": { "kind": "object", "properties": [
                    { "name": "next", "type": { "kind": "ref", "name": "Chain", "args": [r("T")] } }
                ] }
            }
        ],
        "queries": [
            {
                "query": "evaluate",
                "name": "pick",
                "expr": { "kind": "ref", "name": "Pick", "args": [
                    { "kind": "object", "properties": [
                        { "name": "a", "type": prim("string") },
                        { "name": "b", "type": prim("number") }
                    ] },
                    { "kind": "string", "value": "a" }
                ] }
            },
            {
                "query": "assignable",
                "source": { "kind": "object", "properties": [{ "name": "id", "type": prim("string") }] },
                "target": { "kind": "object", "properties": [{ "name": "id", "type": prim("number") }] }
            },
            {
                "query": "instantiate",
                "alias": "Wrap",
                "hints": [{
                    "pattern": { "kind": "array", "element": r("T") },
                    "actual": { "kind": "array", "element": prim("string") }
                }]
            },
            {
                "query": "match",
                "pattern": { "kind": "array", "element": { "kind": "infer", "name": "U" } },
                "subject": { "kind": "array", "element": prim("boolean") }
            },
            {
                "query": "call",
                "type_params": [{ "name": "T" }],
                "params": [{ "name": "items", "type": { "kind": "array", "element": r("T") } }],
                "returns": r("T"),
                "args": [{ "kind": "array", "element": prim("number") }]
            },
            {
                "query": "write_property",
                "object": { "kind": "object", "properties": [
                    { "name": "id", "type": prim("number"), "readonly": true }
                ] },
                "property": "id",
                "value": prim("number")
            },
            {
                "query": "evaluate",
                "expr": { "kind": "ref", "name": "Chain", "args": [prim("string")] },
                "options": { "full_expansion": true, "recursion_limit": 5 }
            }
        ]
    }))
}

fn error_kind(report: &QueryReport) -> Option<DiagnosticKind> {
    report.error.as_ref().map(|d| d.kind)
}

#[test]
fn runs_every_query_in_order() {
    let driver = prelude_driver();
    let reports = driver.run(&mixed_document()).expect("document runs");

    assert_eq!(reports.len(), 7);
    assert!(reports.iter().enumerate().all(|(i, r)| r.index == i));

    assert_eq!(reports[0].name.as_deref(), Some("pick"));
    assert_eq!(reports[0].query, "evaluate");
    assert_eq!(reports[0].result.as_deref(), Some("{ a: string }"));

    assert_eq!(error_kind(&reports[1]), Some(DiagnosticKind::TypeMismatch));
    assert_eq!(reports[1].error.as_ref().map(|d| d.path.to_string()), Some(".id".to_string()));

    assert_eq!(reports[2].result.as_deref(), Some("{ value: string }"));
    assert_eq!(reports[2].bindings.get("T").map(String::as_str), Some("string"));

    assert_eq!(reports[3].bindings.get("U").map(String::as_str), Some("boolean"));

    assert_eq!(reports[4].result.as_deref(), Some("number"));
    assert_eq!(reports[4].bindings.get("T").map(String::as_str), Some("number"));

    assert_eq!(error_kind(&reports[5]), Some(DiagnosticKind::TypeMismatch));
    assert_eq!(error_kind(&reports[6]), Some(DiagnosticKind::RecursionLimitExceeded));
}

#[test]
fn lazy_expansion_is_the_default() {
    let driver = prelude_driver();
    let mut doc = mixed_document();
    doc.queries.truncate(0);
    doc.queries.push(
        serde_json::from_value(json!({
            "query": "evaluate",
            "expr": { "kind": "ref", "name": "Chain", "args": [prim("string")] }
        }))
        .expect("valid query"),
    );
    let reports = driver.run(&doc).expect("document runs");
    assert!(reports[0].is_ok());
    assert_eq!(
        reports[0].result.as_deref(),
        Some("{ next: Chain<string> }")
    );
}

#[test]
fn alias_errors_abort_the_run() {
    let driver = prelude_driver();
    let doc = document(json!({
        "aliases": [{ "name": "Bad", "body": { "kind": "ref", "name": "Missing", "args": [prim("string")] } }],
        "queries": []
    }));
    let err = driver.run(&doc).expect_err("unknown alias reference");
    assert!(err.to_string().contains("failed to declare aliases"));
}

#[test]
fn unknown_alias_is_reported_per_query() {
    let driver = Driver::new(Engine::new(), EvalOptions::default());
    let doc = document(json!({
        "queries": [{ "query": "instantiate", "alias": "Nope" }]
    }));
    let reports = driver.run(&doc).expect("document runs");
    assert_eq!(error_kind(&reports[0]), Some(DiagnosticKind::UnresolvedReference));
}

#[test]
fn global_timeout_applies_to_each_query() {
    let driver = Driver::new(Engine::new(), EvalOptions::default()).with_timeout(Some(Duration::ZERO));
    let doc = document(json!({
        "queries": [{
            "query": "evaluate",
            "expr": { "kind": "array", "element": prim("string") }
        }]
    }));
    let reports = driver.run(&doc).expect("document runs");
    assert_eq!(error_kind(&reports[0]), Some(DiagnosticKind::Timeout));
}

#[test]
fn loads_documents_from_files() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{ "queries": [{{ "query": "evaluate", "expr": {{ "kind": "primitive", "name": "string" }} }}] }}"#
    )
    .expect("write document");

    let doc = load_document(Some(file.path())).expect("document loads");
    assert_eq!(doc.queries.len(), 1);
    assert!(doc.aliases.is_empty());

    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("missing.json");
    let err = load_document(Some(&missing)).expect_err("missing file");
    assert!(err.to_string().contains("failed to read"));
}

#[test]
fn rejects_malformed_documents() {
    assert!(parse_document("{ \"queries\": [{ \"query\": \"explode\" }] }").is_err());
    assert!(parse_document("not json").is_err());
}
