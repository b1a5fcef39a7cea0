//! Property tests for the codec/document round-trip, using an arbitrary-value strategy scaled
//! down to the scalar types this builder exposes directly.

use jbson::raw::{builder::DocumentBuilder, RawDocument};
use proptest::prelude::*;

proptest! {
    #[test]
    fn string_values_round_trip(s in "[^\0]{0,64}") {
        let mut b = DocumentBuilder::new();
        b.append_str("v", &s).unwrap();
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        prop_assert_eq!(doc.get("v").unwrap().unwrap().as_str(), Some(s.as_str()));
    }

    #[test]
    fn i32_values_round_trip(v in any::<i32>()) {
        let mut b = DocumentBuilder::new();
        b.append_i32("v", v).unwrap();
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        prop_assert_eq!(doc.get("v").unwrap().unwrap().as_i32(), Some(v));
    }

    #[test]
    fn i64_values_round_trip(v in any::<i64>()) {
        let mut b = DocumentBuilder::new();
        b.append_i64("v", v).unwrap();
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        prop_assert_eq!(doc.get("v").unwrap().unwrap().as_i64(), Some(v));
    }

    #[test]
    fn f64_values_round_trip(v in any::<f64>()) {
        let mut b = DocumentBuilder::new();
        b.append_f64("v", v).unwrap();
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let got = doc.get("v").unwrap().unwrap().as_f64().unwrap();
        prop_assert!(got == v || (got.is_nan() && v.is_nan()));
    }

    #[test]
    fn bool_values_round_trip(v in any::<bool>()) {
        let mut b = DocumentBuilder::new();
        b.append_bool("v", v).unwrap();
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        prop_assert_eq!(doc.get("v").unwrap().unwrap().as_bool(), Some(v));
    }

    #[test]
    fn key_order_is_preserved(keys in prop::collection::vec("[a-z]{1,8}", 1..8)) {
        let mut b = DocumentBuilder::new();
        for (i, k) in keys.iter().enumerate() {
            // Builder has no dedup; duplicate keys are legal on the wire, first-match wins on get().
            b.append_i32(k, i as i32).unwrap();
        }
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let observed: Vec<&str> = doc.iter().map(|r| r.unwrap().0).collect();
        prop_assert_eq!(observed, keys);
    }
}
