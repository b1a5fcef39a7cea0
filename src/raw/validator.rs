//! Structural/content validation over a document buffer.

use crate::{
    error::{Error, Result},
    raw::doc::RawDocument,
};

/// An OR-combinable set of validation checks. Mirrors the crate's preference for small explicit
/// option types (see [`crate::json::reader::ReaderOptions`]) rather than a single boolean.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Level(u8);

impl Level {
    /// Every declared size (document/array/string/binary/code_w_scope length prefixes) is
    /// internally consistent.
    pub const DATA_SIZE: Level = Level(1 << 0);
    /// The overall document size fits the BSON wire format's size limits.
    pub const BSON_SIZE: Level = Level(1 << 1);
    /// Every element's type tag is one of the known [`crate::spec::ElementType`] tags.
    pub const ELEMENT_CONSTRUCT: Level = Level(1 << 2);
    /// Every string-family value is valid UTF-8.
    pub const UNICODE_VALID: Level = Level(1 << 3);
    /// Every array's keys are `"0"`, `"1"`, … in ascending order with no gaps.
    pub const ARRAY_INDICES: Level = Level(1 << 4);

    /// All checks.
    pub const ALL: Level = Level(
        Self::DATA_SIZE.0
            | Self::BSON_SIZE.0
            | Self::ELEMENT_CONSTRUCT.0
            | Self::UNICODE_VALID.0
            | Self::ARRAY_INDICES.0,
    );

    pub const NONE: Level = Level(0);

    pub fn contains(self, flag: Level) -> bool {
        self.0 & flag.0 == flag.0
    }
}

impl std::ops::BitOr for Level {
    type Output = Level;

    fn bitor(self, rhs: Level) -> Level {
        Level(self.0 | rhs.0)
    }
}

/// The maximum size of a BSON document permitted by [`Level::BSON_SIZE`] (16 MiB, matching the
/// MongoDB wire protocol limit).
pub const MAX_BSON_SIZE: i32 = 16 * 1024 * 1024;

/// Checks `doc` against every check selected in `level`. Iterating a [`RawDocument`] already
/// performs [`Level::DATA_SIZE`]/[`Level::ELEMENT_CONSTRUCT`]/[`Level::UNICODE_VALID`] validation
/// as a side effect of decoding each value, so this function's job is to additionally check
/// [`Level::BSON_SIZE`] and [`Level::ARRAY_INDICES`], and to recurse into nested
/// documents/arrays when `recurse` is true.
///
/// Returns `false` on any structural error encountered while iterating, rather than propagating
/// it — a validation routine reports soundness, it doesn't raise.
pub fn valid(doc: &RawDocument, level: Level, recurse: bool) -> bool {
    check(doc, level, recurse).is_ok()
}

fn check(doc: &RawDocument, level: Level, recurse: bool) -> Result<()> {
    if level.contains(Level::BSON_SIZE) && doc.as_bytes().len() as i32 > MAX_BSON_SIZE {
        return Err(Error::invalid_document_size(format!(
            "document of {} bytes exceeds the {MAX_BSON_SIZE} byte limit",
            doc.as_bytes().len()
        )));
    }

    for (index, item) in doc.iter().enumerate() {
        let (key, value) = item?;

        if level.contains(Level::ARRAY_INDICES) {
            // Only meaningful when `doc` is itself being treated as an array; a plain document's
            // keys are not required to be numeric, so this check is opt-in and applied by the
            // caller when it knows `doc` represents an array.
            if let Ok(parsed) = key.parse::<usize>() {
                if parsed != index {
                    return Err(Error::invalid_element_size(format!(
                        "array index out of order: expected {index}, got {parsed}"
                    ))
                    .with_key(key));
                }
            }
        }

        if recurse {
            if let Some(inner) = value.as_document() {
                check(inner, level, recurse)?;
            } else if let Some(inner) = value.as_array() {
                check(inner.as_document(), level, recurse)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::builder::{ArrayBuilder, DocumentBuilder};

    #[test]
    fn accepts_well_formed_document() {
        let mut b = DocumentBuilder::new();
        b.append_str("a", "x").unwrap();
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert!(valid(doc, Level::ALL, true));
    }

    #[test]
    fn rejects_out_of_order_array_indices() {
        let mut b = ArrayBuilder::new();
        b.append_str("a");
        b.append_str("b");
        let mut bytes = b.finish();
        // Swap the two element-name bytes '0' and '1' to desynchronize the index.
        let pos0 = bytes.iter().position(|&b| b == b'0').unwrap();
        let pos1 = bytes.iter().position(|&b| b == b'1').unwrap();
        bytes.swap(pos0, pos1);
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert!(!valid(doc, Level::ARRAY_INDICES, false));
    }

    #[test]
    fn invalid_type_tag_reports_false_rather_than_erroring() {
        // First element's type-tag byte is 0x00, which is not a known ElementType tag.
        let mut bytes = vec![0u8; 8];
        bytes[4] = 0x00;
        bytes[5] = b'a';
        let total = bytes.len() as i32;
        bytes[0..4].copy_from_slice(&total.to_le_bytes());
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert!(!valid(doc, Level::ELEMENT_CONSTRUCT, false));
    }
}
