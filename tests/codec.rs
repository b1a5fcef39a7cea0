//! End-to-end coverage of the byte codec / document view / builder / validator stack.

use jbson::raw::{builder::DocumentBuilder, validator, Level, RawDocument};
use jbson::ElementType;

#[test]
fn minimal_document_round_trips() {
    let builder = DocumentBuilder::new();
    let bytes = builder.finish();
    assert_eq!(bytes, vec![5, 0, 0, 0, 0]);

    let doc = RawDocument::from_bytes(&bytes).unwrap();
    assert!(doc.is_empty());
    assert!(doc.iter().next().is_none());
}

#[test]
fn string_element_round_trips() {
    let mut builder = DocumentBuilder::new();
    builder.append_str("greeting", "hello").unwrap();
    let bytes = builder.finish();

    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let value = doc.get("greeting").unwrap().unwrap();
    assert_eq!(value.as_str(), Some("hello"));
    assert_eq!(value.element_type(), ElementType::String);
}

#[test]
fn nested_document_and_array_round_trip() {
    let mut inner = DocumentBuilder::new();
    inner.append_i32("x", 1).unwrap();
    let inner = inner.into_raw_document_buf();

    let mut arr = jbson::raw::ArrayBuilder::new();
    arr.append_i32(1);
    arr.append_i32(2);
    let arr = arr.into_raw_array_buf();

    let mut root = DocumentBuilder::new();
    root.append_document("child", &inner).unwrap();
    root.append_array("list", &arr).unwrap();
    let bytes = root.finish();

    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let child = doc.get("child").unwrap().unwrap().as_document().unwrap();
    assert_eq!(child.get("x").unwrap().unwrap().as_i32(), Some(1));

    let list = doc.get("list").unwrap().unwrap().as_array().unwrap();
    let values: Vec<i32> = list.iter().map(|v| v.unwrap().as_i32().unwrap()).collect();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn invalid_type_tag_is_rejected() {
    // length(4) + tag(0x00, unknown) + key "a\0" + 2 trailing bytes + terminator
    let mut bytes = vec![0u8; 4];
    bytes.push(0x00);
    bytes.extend(b"a\0");
    bytes.push(0);
    bytes.push(0);
    let len = bytes.len() as i32;
    bytes[0..4].copy_from_slice(&len.to_le_bytes());

    let doc = RawDocument::from_bytes(&bytes).unwrap();
    let first = doc.iter().next().unwrap();
    assert!(first.is_err());
    assert!(!validator::valid(doc, Level::ELEMENT_CONSTRUCT, false));
}

#[test]
fn validator_accepts_well_formed_document_and_checks_size() {
    let mut builder = DocumentBuilder::new();
    builder.append_i32("a", 1).unwrap();
    let bytes = builder.finish();
    let doc = RawDocument::from_bytes(&bytes).unwrap();

    assert!(validator::valid(doc, Level::ALL, true));
    assert!(validator::valid(doc, Level::BSON_SIZE, true));
}
