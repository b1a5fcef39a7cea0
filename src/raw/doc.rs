//! A borrowed, iterable view over a length-prefixed BSON document buffer.

use crate::{
    error::{Error, Result},
    raw::{
        codec::{read_cstr, read_i32, MIN_CODE_WITH_SCOPE_SIZE, MIN_DOCUMENT_SIZE},
        elem::RawBsonRef,
        RawDocumentBuf,
    },
    spec::ElementType,
};

/// A borrowed slice of a BSON document, akin to `str` for `String`.
///
/// This is an unsized type; it is always used behind a reference. Iterating over it yields either
/// an error or a `(key, value)` pair, lazily parsed and borrowing from the original buffer without
/// copying.
#[derive(PartialEq, Eq)]
#[repr(transparent)]
pub struct RawDocument {
    data: [u8],
}

impl RawDocument {
    /// Validates only the envelope: the buffer is at least [`MIN_DOCUMENT_SIZE`] bytes, its
    /// leading length prefix matches the buffer length exactly, and the final byte is the
    /// document-terminating NUL. Element contents are parsed lazily during iteration.
    pub fn from_bytes<D: AsRef<[u8]> + ?Sized>(data: &D) -> Result<&RawDocument> {
        let data = data.as_ref();

        if (data.len() as i64) < MIN_DOCUMENT_SIZE as i64 {
            return Err(Error::invalid_document_size("document too short"));
        }

        let length = read_i32(data)?;
        if data.len() as i32 != length {
            return Err(Error::invalid_document_size(format!(
                "declared length {length} does not match buffer length {}",
                data.len()
            )));
        }

        if data[data.len() - 1] != 0 {
            return Err(Error::invalid_document_size(
                "document is not NUL-terminated",
            ));
        }

        Ok(Self::new_unchecked(data))
    }

    pub(crate) fn new_unchecked<D: AsRef<[u8]> + ?Sized>(data: &D) -> &RawDocument {
        // Safety: RawDocument is repr(transparent) over [u8].
        unsafe { &*(data.as_ref() as *const [u8] as *const RawDocument) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.len() as i32 == MIN_DOCUMENT_SIZE
    }

    /// Looks up a key by linear scan. O(n) in the number of preceding elements.
    pub fn get(&self, key: &str) -> Result<Option<RawBsonRef<'_>>> {
        for item in self.iter() {
            let (k, v) = item?;
            if k == key {
                return Ok(Some(v));
            }
        }
        Ok(None)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: RawIter::new(self),
        }
    }

    pub fn to_owned(&self) -> RawDocumentBuf {
        RawDocumentBuf::from_bytes_unchecked(self.data.to_vec())
    }

    /// Materializes every `(key, value)` pair sorted by the full element ordering: name, then
    /// tag, then value (numeric `<` for doubles, `ordering`-driven comparison for strings,
    /// encoded-byte comparison otherwise). Presents a document as an ordered set regardless of
    /// its wire order.
    pub fn elements_sorted(
        &self,
        ordering: crate::raw::NameOrdering,
    ) -> Result<Vec<(&str, RawBsonRef<'_>)>> {
        let mut items: Vec<(&str, RawBsonRef<'_>)> = self.iter().collect::<Result<_>>()?;
        items.sort_by(|(a_key, a_value), (b_key, b_value)| {
            crate::raw::compare_elements(ordering, a_key, *a_value, b_key, *b_value)
        });
        Ok(items)
    }

    fn read_cstr_at(&self, start_at: usize) -> Result<(&str, usize)> {
        read_cstr(&self.data[start_at..])
    }
}

impl std::fmt::Debug for RawDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawDocument")
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}

impl<'a> IntoIterator for &'a RawDocument {
    type Item = Result<(&'a str, RawBsonRef<'a>)>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// An iterator over `(key, value)` pairs in a [`RawDocument`].
pub struct Iter<'a> {
    inner: RawIter<'a>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = Result<(&'a str, RawBsonRef<'a>)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|r| r.map(|elem| (elem.key, elem.value)))
    }
}

struct RawElement<'a> {
    key: &'a str,
    value: RawBsonRef<'a>,
}

/// A lower-level iterator that tracks the byte offset and short-circuits to `None` forever after
/// the first error (a malformed document can never become well-formed partway through).
struct RawIter<'a> {
    doc: &'a RawDocument,
    offset: usize,
    valid: bool,
}

impl<'a> RawIter<'a> {
    fn new(doc: &'a RawDocument) -> Self {
        Self {
            doc,
            offset: 4,
            valid: true,
        }
    }

    fn verify_enough_bytes(&self, start: usize, num_bytes: usize) -> Result<()> {
        let end = start
            .checked_add(num_bytes)
            .ok_or_else(|| Error::invalid_element_size("size overflow"))?;
        if self.doc.data.get(start..end).is_none() {
            return Err(Error::invalid_element_size(format!(
                "element claims {num_bytes} bytes but only {} remain",
                self.doc.data.len().saturating_sub(start)
            )));
        }
        Ok(())
    }

    fn next_document_len(&self, starting_at: usize) -> Result<usize> {
        self.verify_enough_bytes(starting_at, MIN_DOCUMENT_SIZE as usize)?;
        let size = read_i32(&self.doc.data[starting_at..])? as usize;
        if (size as i64) < MIN_DOCUMENT_SIZE as i64 {
            return Err(Error::invalid_document_size(format!(
                "embedded document too small: {size} bytes"
            )));
        }
        self.verify_enough_bytes(starting_at, size)?;
        if self.doc.data[starting_at + size - 1] != 0 {
            return Err(Error::invalid_document_size(
                "embedded document not NUL-terminated",
            ));
        }
        Ok(size)
    }

    fn next_len_prefixed_len(&self, starting_at: usize) -> Result<usize> {
        self.verify_enough_bytes(starting_at, 4)?;
        let len = read_i32(&self.doc.data[starting_at..])?;
        if len < 1 {
            return Err(Error::invalid_element_size(format!(
                "string length must be at least 1, got {len}"
            )));
        }
        Ok(4 + len as usize)
    }
}

impl<'a> Iterator for RawIter<'a> {
    type Item = Result<RawElement<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.valid {
            return None;
        }
        if self.offset == self.doc.data.len() - 1 {
            return if self.doc.data[self.offset] == 0 {
                None
            } else {
                self.valid = false;
                Some(Err(Error::invalid_document_size(
                    "document not NUL-terminated",
                )))
            };
        }
        if self.offset >= self.doc.data.len() {
            self.valid = false;
            return Some(Err(Error::invalid_element_size(
                "iteration ran past the end of the document",
            )));
        }

        let tag = self.doc.data[self.offset];
        let (key, key_bytes) = match self.doc.read_cstr_at(self.offset + 1) {
            Ok(v) => v,
            Err(e) => {
                self.valid = false;
                return Some(Err(e));
            }
        };
        let value_start = self.offset + 1 + key_bytes;

        let result = (|| -> Result<(ElementType, usize)> {
            let kind = ElementType::from_tag(tag)
                .ok_or_else(|| Error::invalid_element_type(tag).with_key(key))?;

            let size = match kind {
                ElementType::Boolean => 1,
                ElementType::Int32 => 4,
                ElementType::Int64 | ElementType::Double | ElementType::DateTime | ElementType::Timestamp => 8,
                ElementType::ObjectId => 12,
                ElementType::Null | ElementType::Undefined | ElementType::MinKey | ElementType::MaxKey => 0,
                ElementType::String | ElementType::JavaScriptCode | ElementType::Symbol => {
                    self.next_len_prefixed_len(value_start)?
                }
                ElementType::EmbeddedDocument | ElementType::Array => {
                    self.next_document_len(value_start)?
                }
                ElementType::Binary => {
                    self.verify_enough_bytes(value_start, 4)?;
                    let len = read_i32(&self.doc.data[value_start..])?;
                    if len < 0 {
                        return Err(Error::invalid_element_size("binary length cannot be negative"));
                    }
                    4 + 1 + len as usize
                }
                ElementType::RegularExpression => {
                    let (pattern, pattern_bytes) = self.doc.read_cstr_at(value_start)?;
                    let (_options, options_bytes) =
                        self.doc.read_cstr_at(value_start + pattern_bytes)?;
                    let _ = pattern;
                    pattern_bytes + options_bytes
                }
                ElementType::DbPointer => self.next_len_prefixed_len(value_start)? + 12,
                ElementType::JavaScriptCodeWithScope => {
                    self.verify_enough_bytes(value_start, MIN_CODE_WITH_SCOPE_SIZE as usize)?;
                    let len = read_i32(&self.doc.data[value_start..])?;
                    if (len as i64) < MIN_CODE_WITH_SCOPE_SIZE as i64 {
                        return Err(Error::invalid_element_size(
                            "code_w_scope shorter than the minimum valid size",
                        ));
                    }
                    len as usize
                }
            };

            self.verify_enough_bytes(value_start, size)?;
            Ok((kind, size))
        })();

        match result {
            Ok((kind, size)) => {
                let value_bytes = &self.doc.data[value_start..value_start + size];
                let value = match RawBsonRef::decode(kind, value_bytes) {
                    Ok(v) => v,
                    Err(e) => {
                        self.valid = false;
                        return Some(Err(e.with_key(key)));
                    }
                };
                self.offset = value_start + size;
                Some(Ok(RawElement { key, value }))
            }
            Err(e) => {
                self.valid = false;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::raw::builder::DocumentBuilder;

    use super::*;

    #[test]
    fn iterates_empty_document() {
        let mut b = DocumentBuilder::new();
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert!(doc.iter().next().is_none());
        assert!(doc.is_empty());
    }

    #[test]
    fn finds_key_by_scan() {
        let mut b = DocumentBuilder::new();
        b.append_str("a", "x").unwrap();
        b.append_str("b", "y").unwrap();
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert_eq!(doc.get("b").unwrap().unwrap().as_str(), Some("y"));
        assert!(doc.get("c").unwrap().is_none());
    }

    #[test]
    fn rejects_invalid_tag() {
        let bad = [9u8, 0, 0, 0, 0x00, b'a', 0, 0];
        assert!(RawDocument::from_bytes(&bad).is_err() || RawDocument::from_bytes(&bad).unwrap().iter().next().unwrap().is_err());
    }

    #[test]
    fn elements_sorted_orders_by_name() {
        let mut b = DocumentBuilder::new();
        b.append_i32("c", 1).unwrap();
        b.append_i32("a", 2).unwrap();
        b.append_i32("b", 3).unwrap();
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let keys: Vec<&str> = doc
            .elements_sorted(crate::raw::NameOrdering::ByteWise)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn stops_after_first_error() {
        // two elements, first has an invalid type tag
        let mut bytes = vec![0u8; 4];
        bytes.push(0x00); // invalid tag
        bytes.extend(b"a\0");
        bytes.push(0x08); // boolean
        bytes.extend(b"b\0");
        bytes.push(1);
        bytes.push(0);
        let len = bytes.len() as i32;
        bytes[0..4].copy_from_slice(&len.to_le_bytes());

        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let mut it = doc.iter();
        assert!(it.next().unwrap().is_err());
        assert!(it.next().is_none());
    }
}
