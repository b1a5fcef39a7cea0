//! `jbson`: a BSON codec, a JSON ↔ BSON round-trip with MongoDB-style extended JSON, and a
//! JSONPath-style query engine.
//!
//! The crate is organized leaves-first:
//!
//! - [`spec`] — the wire type tags (`ElementType`, `BinarySubtype`).
//! - [`oid`] — `ObjectId` generation and parsing.
//! - [`raw`] — borrowed views ([`raw::RawDocument`], [`raw::RawArray`], [`raw::RawBsonRef`]) and
//!   owned buffers ([`raw::RawDocumentBuf`], [`raw::RawArrayBuf`], [`raw::RawBson`]) over the BSON
//!   wire format, plus the incremental builder ([`raw::DocumentBuilder`], [`raw::ArrayBuilder`])
//!   and the structural [`raw::valid`] validator.
//! - [`json`] — [`json::read_document`] parses JSON (with extended-JSON decoding) straight into a
//!   BSON buffer; [`json::write_document`] renders a [`raw::RawDocument`] back to extended JSON.
//! - [`path`] — [`path::select`] parses, compiles, and evaluates a JSONPath-style expression
//!   against a document.
//!
//! Nothing here materializes a document into an intermediate tree unless the caller asks for one
//! (via [`raw::RawBsonRef::to_raw_bson`] or [`path::evaluator::into_owned`]): documents are mostly
//! read by borrowing directly from the original byte buffer.
//!
//! # Example
//!
//! ```
//! use jbson::{json, path, raw::RawDocument};
//!
//! let bytes = json::read_document(r#"{"name": "ruby", "tags": ["red", "gem"]}"#).unwrap();
//! let doc = RawDocument::from_bytes(&bytes).unwrap();
//! assert_eq!(doc.get("name").unwrap().unwrap().as_str(), Some("ruby"));
//!
//! let matches = path::select(doc, "$.tags[0]").unwrap();
//! assert_eq!(matches[0].as_str(), Some("red"));
//! ```

pub mod error;
pub mod json;
pub mod oid;
pub mod path;
pub mod raw;
pub mod spec;

pub use error::{Error, ErrorKind};
pub use oid::ObjectId;
pub use raw::{RawArray, RawArrayBuf, RawBson, RawBsonRef, RawDocument, RawDocumentBuf};
pub use spec::{BinarySubtype, ElementType};
