//! An owned BSON document buffer.

use std::ops::Deref;

use crate::{
    error::Result,
    raw::{builder::DocumentBuilder, doc::RawDocument},
};

/// An owned BSON document buffer. Derefs to [`RawDocument`] for iteration/lookup.
#[derive(Clone, PartialEq, Eq)]
pub struct RawDocumentBuf {
    data: Vec<u8>,
}

impl RawDocumentBuf {
    /// An empty document: just the 5-byte envelope.
    pub fn new() -> Self {
        DocumentBuilder::new().into_raw_document_buf()
    }

    /// Validates and wraps an owned buffer; see [`RawDocument::from_bytes`] for what is checked.
    pub fn decode_from_bytes(data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        RawDocument::from_bytes(&data)?;
        Ok(Self { data })
    }

    pub(crate) fn from_bytes_unchecked(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn as_raw_document(&self) -> &RawDocument {
        RawDocument::new_unchecked(&self.data)
    }
}

impl Default for RawDocumentBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for RawDocumentBuf {
    type Target = RawDocument;

    fn deref(&self) -> &RawDocument {
        self.as_raw_document()
    }
}

impl std::fmt::Debug for RawDocumentBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawDocumentBuf")
            .field("data", &hex::encode(&self.data))
            .finish()
    }
}

impl<'a> IntoIterator for &'a RawDocumentBuf {
    type Item = Result<(&'a str, crate::raw::RawBsonRef<'a>)>;
    type IntoIter = crate::raw::doc::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_raw_document().iter()
    }
}
