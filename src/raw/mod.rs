//! Borrowed/owned views over BSON document buffers: the byte codec, element views, document
//! views, the owned builder, and the validator.

pub mod array;
pub mod builder;
pub mod codec;
pub mod cstr;
pub mod doc;
pub mod document_buf;
pub mod elem;
pub mod validator;

pub use array::{ArrayIter, RawArray, RawArrayBuf};
pub use builder::{ArrayBuilder, DocumentBuilder, Savepoint};
pub use codec::{MIN_CODE_WITH_SCOPE_SIZE, MIN_DOCUMENT_SIZE};
pub use cstr::{cstr, CStr, CString};
pub use doc::{Iter, RawDocument};
pub use document_buf::RawDocumentBuf;
pub use elem::{
    RawBinary, RawBinaryRef, RawBson, RawBsonRef, RawDbPointer, RawDbPointerRef,
    RawJavaScriptCodeWithScope, RawJavaScriptCodeWithScopeRef, RawRegex, RawRegexRef, RawTimestamp,
};
pub use validator::{valid, Level, MAX_BSON_SIZE};

/// The byte-ordering used when comparing element names (e.g. by the path evaluator or by
/// `Level::ARRAY_INDICES`). Replaces the source implementation's dependence on the process
/// locale with an explicit, caller-supplied choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NameOrdering {
    /// Plain `&str` ordering (`Ord` on UTF-8 bytes). The default, and the only ordering this
    /// crate implements; `Collated` is reserved for a caller-supplied collation table.
    #[default]
    ByteWise,
    /// Reserved: locale-aware collation supplied by the caller. Not implemented.
    Collated,
}

impl NameOrdering {
    pub fn compare(self, a: &str, b: &str) -> std::cmp::Ordering {
        match self {
            NameOrdering::ByteWise => a.cmp(b),
            NameOrdering::Collated => a.cmp(b),
        }
    }
}

/// The full element-ordering comparator used to present a document as an ordered set: compare by
/// `(name, tag)`; when both are equal, compare values — strings via `ordering`, doubles
/// numerically, everything else by their encoded bytes.
pub fn compare_elements(
    ordering: NameOrdering,
    a_name: &str,
    a_value: elem::RawBsonRef<'_>,
    b_name: &str,
    b_value: elem::RawBsonRef<'_>,
) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match ordering.compare(a_name, b_name) {
        Ordering::Equal => {}
        unequal => return unequal,
    }

    match a_value.element_type().tag().cmp(&b_value.element_type().tag()) {
        Ordering::Equal => {}
        unequal => return unequal,
    }

    match (a_value, b_value) {
        (elem::RawBsonRef::Double(a), elem::RawBsonRef::Double(b)) => {
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (elem::RawBsonRef::String(a), elem::RawBsonRef::String(b)) => ordering.compare(a, b),
        (a, b) => encoded_value_bytes(a).cmp(&encoded_value_bytes(b)),
    }
}

/// Encodes a value's raw element bytes (tag and name excluded) for the lexicographic fallback arm
/// of [`compare_elements`].
fn encoded_value_bytes(value: elem::RawBsonRef<'_>) -> Vec<u8> {
    let mut doc = builder::DocumentBuilder::new();
    doc.append_raw_bson("", &value.to_raw_bson())
        .expect("any RawBson value can be re-encoded");
    let bytes = doc.finish();
    // `bytes` is `len(4) + tag(1) + ""-key-nul(1) + value... + trailing document NUL(1)`.
    bytes[6..bytes.len() - 1].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_by_name_first() {
        assert_eq!(
            compare_elements(
                NameOrdering::ByteWise,
                "a",
                elem::RawBsonRef::Int32(5),
                "b",
                elem::RawBsonRef::Int32(1)
            ),
            std::cmp::Ordering::Less
        );
    }

    #[test]
    fn compares_doubles_numerically_when_name_and_tag_match() {
        assert_eq!(
            compare_elements(
                NameOrdering::ByteWise,
                "a",
                elem::RawBsonRef::Double(1.5),
                "a",
                elem::RawBsonRef::Double(2.5)
            ),
            std::cmp::Ordering::Less
        );
    }

    #[test]
    fn falls_back_to_encoded_bytes_for_other_types() {
        assert_eq!(
            compare_elements(
                NameOrdering::ByteWise,
                "a",
                elem::RawBsonRef::Int32(1),
                "a",
                elem::RawBsonRef::Int32(2)
            ),
            std::cmp::Ordering::Less
        );
    }
}
