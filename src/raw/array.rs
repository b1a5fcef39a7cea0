//! A BSON array is wire-identical to a document whose keys are `"0"`, `"1"`, … in order.
//! `RawArray`/`RawArrayBuf` are thin wrappers enforcing the array-shaped access pattern.

use std::{collections::HashSet, ops::Deref};

use crate::{
    error::{Error, Result},
    raw::{doc::RawDocument, document_buf::RawDocumentBuf, elem::RawBsonRef},
};

#[derive(PartialEq, Eq)]
#[repr(transparent)]
pub struct RawArray {
    doc: RawDocument,
}

impl RawArray {
    pub fn from_document(doc: &RawDocument) -> &RawArray {
        // Safety: RawArray is repr(transparent) over RawDocument.
        unsafe { &*(doc as *const RawDocument as *const RawArray) }
    }

    pub fn as_document(&self) -> &RawDocument {
        &self.doc
    }

    pub fn iter(&self) -> ArrayIter<'_> {
        ArrayIter {
            inner: self.doc.iter(),
        }
    }

    pub fn get(&self, index: usize) -> Result<Option<RawBsonRef<'_>>> {
        self.doc.get(&index.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    pub fn to_owned(&self) -> RawArrayBuf {
        RawArrayBuf {
            doc: self.doc.to_owned(),
        }
    }

    /// Finds the element at `index` — an alias for [`RawArray::get`], matching the source's
    /// `find(index)` naming.
    pub fn find(&self, index: usize) -> Result<Option<RawBsonRef<'_>>> {
        self.get(index)
    }

    /// Materializes this array's values sorted by the natural (decimal) order of their index
    /// names, checking that every name parses as a non-negative integer and that no two elements
    /// share an index. Errors rather than silently dropping or reordering a malformed array.
    pub fn to_sorted_sequence(&self) -> Result<Vec<RawBsonRef<'_>>> {
        let mut indexed: Vec<(usize, RawBsonRef<'_>)> = Vec::new();
        let mut seen = HashSet::new();

        for item in self.doc.iter() {
            let (key, value) = item?;
            let index: usize = key.parse().map_err(|_| {
                Error::invalid_element_size(format!("array index {key:?} is not a decimal integer"))
                    .with_key(key)
            })?;
            if !seen.insert(index) {
                return Err(
                    Error::invalid_element_size(format!("duplicate array index {index}"))
                        .with_key(key),
                );
            }
            indexed.push((index, value));
        }

        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, value)| value).collect())
    }
}

impl std::fmt::Debug for RawArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RawArray").field(&self.doc.as_bytes()).finish()
    }
}

impl<'a> IntoIterator for &'a RawArray {
    type Item = Result<RawBsonRef<'a>>;
    type IntoIter = ArrayIter<'a>;

    fn into_iter(self) -> ArrayIter<'a> {
        self.iter()
    }
}

/// Iterates the values of a [`RawArray`], discarding the numeric keys.
pub struct ArrayIter<'a> {
    inner: crate::raw::doc::Iter<'a>,
}

impl<'a> Iterator for ArrayIter<'a> {
    type Item = Result<RawBsonRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|r| r.map(|(_, v)| v))
    }
}

/// An owned BSON array buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct RawArrayBuf {
    doc: RawDocumentBuf,
}

impl RawArrayBuf {
    pub fn new() -> Self {
        Self {
            doc: RawDocumentBuf::new(),
        }
    }

    pub(crate) fn from_document_buf(doc: RawDocumentBuf) -> Self {
        Self { doc }
    }

    pub fn as_raw_array(&self) -> &RawArray {
        RawArray::from_document(&self.doc)
    }

    pub fn into_document_buf(self) -> RawDocumentBuf {
        self.doc
    }
}

impl Default for RawArrayBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for RawArrayBuf {
    type Target = RawArray;

    fn deref(&self) -> &RawArray {
        self.as_raw_array()
    }
}

impl std::fmt::Debug for RawArrayBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RawArrayBuf").field(&self.doc).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::builder::{ArrayBuilder, DocumentBuilder};

    #[test]
    fn iterates_in_order() {
        let mut b = ArrayBuilder::new();
        b.append_i32(1);
        b.append_i32(2);
        b.append_i32(3);
        let arr = b.finish();
        let values: Vec<i32> = RawArray::from_document(RawDocument::from_bytes(&arr).unwrap())
            .iter()
            .map(|v| v.unwrap().as_i32().unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn to_sorted_sequence_orders_by_natural_index() {
        let mut inner = DocumentBuilder::new();
        inner.append_i32("2", 20).unwrap();
        inner.append_i32("0", 0).unwrap();
        inner.append_i32("1", 10).unwrap();
        let bytes = inner.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let arr = RawArray::from_document(doc);

        let values: Vec<i32> = arr
            .to_sorted_sequence()
            .unwrap()
            .into_iter()
            .map(|v| v.as_i32().unwrap())
            .collect();
        assert_eq!(values, vec![0, 10, 20]);
    }

    #[test]
    fn to_sorted_sequence_rejects_duplicate_index() {
        let mut inner = DocumentBuilder::new();
        inner.append_i32("0", 1).unwrap();
        inner.append_i32("0", 2).unwrap();
        let bytes = inner.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let arr = RawArray::from_document(doc);
        assert!(arr.to_sorted_sequence().is_err());
    }
}
