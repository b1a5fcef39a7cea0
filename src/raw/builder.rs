//! Incremental BSON document/array construction.
//!
//! Appends are infallible once a key validates; if a caller needs to undo a partially-built
//! sub-document (e.g. because building its contents failed), [`DocumentBuilder::savepoint`] /
//! [`DocumentBuilder::rollback`] truncate the buffer back to a previously recorded point, rather
//! than relying on exception-style unwinding.

use crate::{
    error::Result,
    oid::ObjectId,
    raw::{
        array::RawArrayBuf,
        cstr::CStr,
        document_buf::RawDocumentBuf,
        elem::{RawBinary, RawTimestamp},
    },
    spec::ElementType,
};

const LENGTH_PLACEHOLDER: [u8; 4] = 0i32.to_le_bytes();

/// Builds a single BSON document into an owned buffer.
pub struct DocumentBuilder {
    buf: Vec<u8>,
}

/// An offset into a [`DocumentBuilder`]'s buffer captured by [`DocumentBuilder::savepoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Savepoint(usize);

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend(LENGTH_PLACEHOLDER);
        Self { buf }
    }

    /// Records the current buffer length so a failed append sequence can be undone with
    /// [`rollback`](Self::rollback).
    pub fn savepoint(&self) -> Savepoint {
        Savepoint(self.buf.len())
    }

    /// Truncates the buffer back to a previously recorded [`Savepoint`], discarding every element
    /// appended since.
    pub fn rollback(&mut self, savepoint: Savepoint) {
        self.buf.truncate(savepoint.0);
    }

    fn key(&mut self, element_type: ElementType, name: &str) -> Result<()> {
        let name: &CStr = name.try_into()?;
        self.buf.push(element_type.tag());
        name.append_to(&mut self.buf);
        Ok(())
    }

    pub fn append_f64(&mut self, key: &str, value: f64) -> Result<()> {
        self.key(ElementType::Double, key)?;
        self.buf.extend(value.to_bits().to_le_bytes());
        Ok(())
    }

    pub fn append_str(&mut self, key: &str, value: &str) -> Result<()> {
        self.key(ElementType::String, key)?;
        crate::raw::codec::write_lenencoded(&mut self.buf, value);
        Ok(())
    }

    pub fn append_document(&mut self, key: &str, value: &RawDocumentBuf) -> Result<()> {
        self.key(ElementType::EmbeddedDocument, key)?;
        self.buf.extend(value.as_raw_document().as_bytes());
        Ok(())
    }

    pub fn append_array(&mut self, key: &str, value: &RawArrayBuf) -> Result<()> {
        self.key(ElementType::Array, key)?;
        self.buf.extend(value.as_raw_array().as_document().as_bytes());
        Ok(())
    }

    pub fn append_binary(&mut self, key: &str, value: &RawBinary) -> Result<()> {
        self.key(ElementType::Binary, key)?;
        self.buf.extend((value.bytes.len() as i32).to_le_bytes());
        self.buf.push(value.subtype.into());
        self.buf.extend(&value.bytes);
        Ok(())
    }

    pub fn append_undefined(&mut self, key: &str) -> Result<()> {
        self.key(ElementType::Undefined, key)
    }

    pub fn append_object_id(&mut self, key: &str, value: ObjectId) -> Result<()> {
        self.key(ElementType::ObjectId, key)?;
        self.buf.extend(value.bytes());
        Ok(())
    }

    pub fn append_bool(&mut self, key: &str, value: bool) -> Result<()> {
        self.key(ElementType::Boolean, key)?;
        self.buf.push(value as u8);
        Ok(())
    }

    pub fn append_datetime_millis(&mut self, key: &str, millis: i64) -> Result<()> {
        self.key(ElementType::DateTime, key)?;
        self.buf.extend(millis.to_le_bytes());
        Ok(())
    }

    pub fn append_null(&mut self, key: &str) -> Result<()> {
        self.key(ElementType::Null, key)
    }

    pub fn append_regex(&mut self, key: &str, pattern: &str, options: &str) -> Result<()> {
        self.key(ElementType::RegularExpression, key)?;
        let pattern: &CStr = pattern.try_into()?;
        let options: &CStr = options.try_into()?;
        pattern.append_to(&mut self.buf);
        options.append_to(&mut self.buf);
        Ok(())
    }

    pub fn append_db_pointer(&mut self, key: &str, namespace: &str, id: ObjectId) -> Result<()> {
        self.key(ElementType::DbPointer, key)?;
        crate::raw::codec::write_lenencoded(&mut self.buf, namespace);
        self.buf.extend(id.bytes());
        Ok(())
    }

    pub fn append_javascript(&mut self, key: &str, code: &str) -> Result<()> {
        self.key(ElementType::JavaScriptCode, key)?;
        crate::raw::codec::write_lenencoded(&mut self.buf, code);
        Ok(())
    }

    pub fn append_symbol(&mut self, key: &str, value: &str) -> Result<()> {
        self.key(ElementType::Symbol, key)?;
        crate::raw::codec::write_lenencoded(&mut self.buf, value);
        Ok(())
    }

    pub fn append_javascript_with_scope(
        &mut self,
        key: &str,
        code: &str,
        scope: &RawDocumentBuf,
    ) -> Result<()> {
        self.key(ElementType::JavaScriptCodeWithScope, key)?;
        let start = self.buf.len();
        self.buf.extend(LENGTH_PLACEHOLDER);
        crate::raw::codec::write_lenencoded(&mut self.buf, code);
        self.buf.extend(scope.as_raw_document().as_bytes());
        let total = (self.buf.len() - start) as i32;
        self.buf[start..start + 4].copy_from_slice(&total.to_le_bytes());
        Ok(())
    }

    pub fn append_i32(&mut self, key: &str, value: i32) -> Result<()> {
        self.key(ElementType::Int32, key)?;
        self.buf.extend(value.to_le_bytes());
        Ok(())
    }

    pub fn append_timestamp(&mut self, key: &str, value: RawTimestamp) -> Result<()> {
        self.key(ElementType::Timestamp, key)?;
        self.buf.extend(value.to_le_bytes());
        Ok(())
    }

    pub fn append_i64(&mut self, key: &str, value: i64) -> Result<()> {
        self.key(ElementType::Int64, key)?;
        self.buf.extend(value.to_le_bytes());
        Ok(())
    }

    pub fn append_min_key(&mut self, key: &str) -> Result<()> {
        self.key(ElementType::MinKey, key)
    }

    pub fn append_max_key(&mut self, key: &str) -> Result<()> {
        self.key(ElementType::MaxKey, key)
    }

    /// Appends an already-constructed [`RawBson`] value under `key`, dispatching to the
    /// appropriate typed `append_*` method. Used by the JSON reader and by document-to-document
    /// copies, where the value's shape is only known at runtime.
    pub fn append_raw_bson(&mut self, key: &str, value: &crate::raw::elem::RawBson) -> Result<()> {
        use crate::raw::elem::RawBson;
        match value {
            RawBson::Double(v) => self.append_f64(key, *v),
            RawBson::String(v) => self.append_str(key, v),
            RawBson::Document(v) => self.append_document(key, v),
            RawBson::Array(v) => self.append_array(key, v),
            RawBson::Binary(v) => self.append_binary(key, v),
            RawBson::Undefined => self.append_undefined(key),
            RawBson::ObjectId(v) => self.append_object_id(key, *v),
            RawBson::Boolean(v) => self.append_bool(key, *v),
            RawBson::DateTime(v) => self.append_datetime_millis(key, *v),
            RawBson::Null => self.append_null(key),
            RawBson::RegularExpression(v) => self.append_regex(key, &v.pattern, &v.options),
            RawBson::DbPointer(v) => self.append_db_pointer(key, &v.namespace, v.id),
            RawBson::JavaScriptCode(v) => self.append_javascript(key, v),
            RawBson::Symbol(v) => self.append_symbol(key, v),
            RawBson::JavaScriptCodeWithScope(v) => {
                self.append_javascript_with_scope(key, &v.code, &v.scope)
            }
            RawBson::Int32(v) => self.append_i32(key, *v),
            RawBson::Timestamp(v) => self.append_timestamp(key, *v),
            RawBson::Int64(v) => self.append_i64(key, *v),
            RawBson::MinKey => self.append_min_key(key),
            RawBson::MaxKey => self.append_max_key(key),
        }
    }

    /// NUL-terminates and back-patches the length prefix, returning the finished buffer.
    pub fn finish(mut self) -> Vec<u8> {
        self.buf.push(0);
        let len = (self.buf.len() as i32).to_le_bytes();
        self.buf[0..4].copy_from_slice(&len);
        self.buf
    }

    pub fn into_raw_document_buf(self) -> RawDocumentBuf {
        RawDocumentBuf::from_bytes_unchecked(self.finish())
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a BSON array: wire-identical to a document whose keys are `"0"`, `"1"`, … in order.
pub struct ArrayBuilder {
    inner: DocumentBuilder,
    next_index: usize,
}

impl ArrayBuilder {
    pub fn new() -> Self {
        Self {
            inner: DocumentBuilder::new(),
            next_index: 0,
        }
    }

    pub fn savepoint(&self) -> (Savepoint, usize) {
        (self.inner.savepoint(), self.next_index)
    }

    pub fn rollback(&mut self, savepoint: (Savepoint, usize)) {
        self.inner.rollback(savepoint.0);
        self.next_index = savepoint.1;
    }

    fn index_key(&mut self) -> String {
        let key = self.next_index.to_string();
        self.next_index += 1;
        key
    }

    /// Appends an already-constructed [`RawBson`] value; see
    /// [`DocumentBuilder::append_raw_bson`].
    pub fn append_raw_bson(&mut self, value: &crate::raw::elem::RawBson) -> Result<()> {
        let key = self.index_key();
        self.inner.append_raw_bson(&key, value)
    }

    pub fn append_f64(&mut self, value: f64) {
        let key = self.index_key();
        self.inner.append_f64(&key, value).expect("numeric keys always validate");
    }

    pub fn append_str(&mut self, value: &str) {
        let key = self.index_key();
        self.inner.append_str(&key, value).expect("numeric keys always validate");
    }

    pub fn append_document(&mut self, value: &RawDocumentBuf) {
        let key = self.index_key();
        self.inner.append_document(&key, value).expect("numeric keys always validate");
    }

    pub fn append_array(&mut self, value: &RawArrayBuf) {
        let key = self.index_key();
        self.inner.append_array(&key, value).expect("numeric keys always validate");
    }

    pub fn append_bool(&mut self, value: bool) {
        let key = self.index_key();
        self.inner.append_bool(&key, value).expect("numeric keys always validate");
    }

    pub fn append_null(&mut self) {
        let key = self.index_key();
        self.inner.append_null(&key).expect("numeric keys always validate");
    }

    pub fn append_i32(&mut self, value: i32) {
        let key = self.index_key();
        self.inner.append_i32(&key, value).expect("numeric keys always validate");
    }

    pub fn append_i64(&mut self, value: i64) {
        let key = self.index_key();
        self.inner.append_i64(&key, value).expect("numeric keys always validate");
    }

    pub fn finish(self) -> Vec<u8> {
        self.inner.finish()
    }

    pub fn into_raw_array_buf(self) -> RawArrayBuf {
        RawArrayBuf::from_document_buf(self.inner.into_raw_document_buf())
    }
}

impl Default for ArrayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::doc::RawDocument;

    #[test]
    fn builds_minimal_document() {
        let b = DocumentBuilder::new();
        let bytes = b.finish();
        assert_eq!(bytes, vec![5, 0, 0, 0, 0]);
    }

    #[test]
    fn rollback_discards_appended_elements() {
        let mut b = DocumentBuilder::new();
        b.append_str("a", "x").unwrap();
        let sp = b.savepoint();
        b.append_str("b", "y").unwrap();
        b.rollback(sp);
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert!(doc.get("b").unwrap().is_none());
        assert_eq!(doc.get("a").unwrap().unwrap().as_str(), Some("x"));
    }

    #[test]
    fn array_builder_keys_are_sequential() {
        let mut b = ArrayBuilder::new();
        b.append_str("a");
        b.append_str("b");
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert_eq!(doc.get("0").unwrap().unwrap().as_str(), Some("a"));
        assert_eq!(doc.get("1").unwrap().unwrap().as_str(), Some("b"));
    }
}
