//! End-to-end coverage of the JSON reader/writer, including extended-JSON shapes.

use jbson::{
    json::{read_document, write_document},
    raw::RawDocument,
};

#[test]
fn reads_plain_json_object() {
    let bytes = read_document(r#"{"name": "ruby", "count": 3, "active": true}"#).unwrap();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    assert_eq!(doc.get("name").unwrap().unwrap().as_str(), Some("ruby"));
    assert_eq!(doc.get("count").unwrap().unwrap().as_i32(), Some(3));
    assert_eq!(doc.get("active").unwrap().unwrap().as_bool(), Some(true));
}

#[test]
fn reads_extended_json_date_and_writes_it_back() {
    let bytes = read_document(r#"{"created": {"$date": 1577836800000}}"#).unwrap();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    assert_eq!(
        doc.get("created").unwrap().unwrap().as_datetime_millis(),
        Some(1577836800000)
    );

    let json = write_document(doc).unwrap();
    assert!(json.contains("\"$date\":1577836800000"));
}

#[test]
fn reads_oid_and_writer_round_trips_it() {
    let bytes = read_document(r#"{"_id": {"$oid": "507f1f77bcf86cd799439011"}}"#).unwrap();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let oid = doc.get("_id").unwrap().unwrap().as_object_id().unwrap();
    assert_eq!(oid.to_hex(), "507f1f77bcf86cd799439011");

    let json = write_document(doc).unwrap();
    assert!(json.contains("507f1f77bcf86cd799439011"));
}

#[test]
fn scoped_javascript_always_writes_scope_key() {
    use jbson::raw::builder::DocumentBuilder;

    let mut builder = DocumentBuilder::new();
    builder
        .append_javascript_with_scope("fn", "function() {}", &DocumentBuilder::new().into_raw_document_buf())
        .unwrap();
    let bytes = builder.finish();
    let doc = RawDocument::from_bytes(&bytes).unwrap();

    let json = write_document(doc).unwrap();
    assert!(json.contains("\"$scope\":{}"));
}

#[test]
fn round_trips_nested_objects_and_arrays() {
    let input = r#"{"items": [{"n": 1}, {"n": 2}], "label": "pair"}"#;
    let bytes = read_document(input).unwrap();
    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let items = doc.get("items").unwrap().unwrap().as_array().unwrap();
    let ns: Vec<i32> = items
        .iter()
        .map(|v| v.unwrap().as_document().unwrap().get("n").unwrap().unwrap().as_i32().unwrap())
        .collect();
    assert_eq!(ns, vec![1, 2]);
}

#[test]
fn rejects_malformed_json() {
    assert!(read_document(r#"{"a": }"#).is_err());
}
