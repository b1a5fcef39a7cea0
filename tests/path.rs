//! End-to-end coverage of the JSONPath parser/compiler/evaluator pipeline.

use jbson::{
    json::read_document,
    path::{self, error::PathError},
    raw::RawDocument,
};

fn sample_store() -> Vec<u8> {
    read_document(
        r#"{
            "arr": [
                {"value": 2010},
                {"value": 2012},
                {"value": 2013},
                {"value": 2015}
            ]
        }"#,
    )
    .unwrap()
}

#[test]
fn bare_root_selects_the_whole_document() {
    let bytes = sample_store();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let results = path::select(doc, "$").unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_document().unwrap().as_bytes(), doc.as_bytes());
}

#[test]
fn selects_a_single_field() {
    let bytes = sample_store();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let results = path::select(doc, "$.arr[0].value").unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_i32(), Some(2010));
}

#[test]
fn wildcard_selects_all_children() {
    let bytes = sample_store();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let results = path::select(doc, "$.arr[*]").unwrap();
    assert_eq!(results.len(), 4);
}

#[test]
fn bracketed_union_selects_named_indices() {
    let bytes = sample_store();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let results = path::select(doc, "$.arr[0, 2]").unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_document().unwrap().get("value").unwrap().unwrap().as_i32(), Some(2010));
    assert_eq!(results[1].as_document().unwrap().get("value").unwrap().unwrap().as_i32(), Some(2013));
}

#[test]
fn filter_expression_with_conjunction() {
    let bytes = sample_store();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let results = path::select(
        doc,
        "$.arr[?((@.value < 2014) && (@.value > 2012))].value",
    )
    .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_i32(), Some(2013));
}

#[test]
fn filter_is_idempotent() {
    let bytes = sample_store();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let expr = "$.arr[?(@.value > 2012)].value";
    let first: Vec<i32> = path::select(doc, expr)
        .unwrap()
        .into_iter()
        .map(|v| v.as_i32().unwrap())
        .collect();
    let second: Vec<i32> = path::select(doc, expr)
        .unwrap()
        .into_iter()
        .map(|v| v.as_i32().unwrap())
        .collect();
    assert_eq!(first, second);
}

#[test]
fn recursive_descent_is_reserved() {
    let bytes = sample_store();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let err = path::select(doc, "$..value").unwrap_err();
    assert!(matches!(
        err,
        PathError::Unimplemented {
            feature: "op_recurse"
        }
    ));
}

#[test]
fn malformed_path_reports_parse_error() {
    let bytes = sample_store();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let err = path::select(doc, "arr.value").unwrap_err();
    assert!(matches!(err, PathError::Parse { .. }));
}
