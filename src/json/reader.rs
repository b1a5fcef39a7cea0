//! Streams JSON (+ extended JSON) text directly into a BSON buffer.
//!
//! The reader is a single-pass recursive-descent parser. Each JSON object or array is built with
//! a [`DocumentBuilder`]/[`ArrayBuilder`], which reserves a 4-byte length placeholder up front and
//! back-patches it once every member has been appended — the same reserve-then-patch technique
//! the underlying builder uses for every nested document, adapted here to also cover the
//! extended-JSON special forms.
//!
//! Extended-JSON detection happens on an object's first key: before opening a document frame, the
//! reader parses the first `"key": value` pair and checks whether `key` is one of the reserved
//! `$`-prefixed names (`$oid`, `$date`, `$timestamp`, `$regex`, `$binary`, `$ref`, `$undefined`,
//! `$minkey`, `$maxkey`). If so, the whole object collapses to a single scalar BSON value instead
//! of a nested document, and that value is appended directly into the *parent* frame.

use base64::Engine;

use crate::{
    json::error::{Expected, JsonError, JsonErrorKind, Result},
    oid::ObjectId,
    raw::{
        builder::{ArrayBuilder, DocumentBuilder},
        elem::{RawBinary, RawBson, RawDbPointer, RawRegex, RawTimestamp},
    },
    spec::BinarySubtype,
};

/// Options controlling the reader's leniency. Mirrors the crate's convention of small explicit
/// `Options` structs (see [`crate::raw::Level`]) instead of free-standing booleans.
#[derive(Clone, Copy, Debug)]
pub struct ReaderOptions {
    /// Whether a string *value* (never a key) may contain a literal NUL byte. Default: `false`,
    /// matching the BSON cstring/string conventions used elsewhere in this crate.
    pub allow_interior_nul_in_strings: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            allow_interior_nul_in_strings: false,
        }
    }
}

/// Parses `input` as a single JSON object and returns the BSON-encoded document bytes.
pub fn read_document(input: &str) -> Result<Vec<u8>> {
    read_document_with_options(input, ReaderOptions::default())
}

pub fn read_document_with_options(input: &str, options: ReaderOptions) -> Result<Vec<u8>> {
    let mut parser = Parser::new(input, options);
    parser.skip_ws();
    let value = match parser.peek() {
        Some(b'{') => parser.parse_object()?,
        Some(b'[') => parser.parse_array()?,
        _ => return Err(parser.error(JsonErrorKind::InvalidRootElement, Expected::Value)),
    };
    parser.skip_ws();
    if parser.pos != parser.bytes.len() {
        return Err(parser.error(JsonErrorKind::UnexpectedToken, Expected::EndOfInput));
    }
    match value {
        // A BSON array is wire-identical to a document, so an array root is returned using the
        // same buffer shape as an object root.
        Value::Document(bytes) | Value::Array(bytes) => Ok(bytes),
        Value::Scalar(_) => Err(parser.error(JsonErrorKind::InvalidRootElement, Expected::Value)),
    }
}

enum Value {
    Document(Vec<u8>),
    Array(Vec<u8>),
    Scalar(RawBson),
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
    options: ReaderOptions,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, options: ReaderOptions) -> Self {
        Parser {
            input,
            bytes: input.as_bytes(),
            pos: 0,
            options,
        }
    }

    fn error(&self, kind: JsonErrorKind, expected: Expected) -> JsonError {
        JsonError::new(kind, expected, self.input, self.pos)
    }

    fn wrap_bson_error(&self, e: crate::error::Error) -> JsonError {
        self.error(
            JsonErrorKind::InvalidExtendedJson {
                message: e.to_string(),
            },
            Expected::Value,
        )
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect_byte(&mut self, byte: u8, expected: Expected) -> Result<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(JsonErrorKind::UnexpectedToken, expected))
        }
    }

    fn expect_literal(&mut self, literal: &str, expected: Expected) -> Result<()> {
        if self.input[self.pos..].starts_with(literal) {
            self.pos += literal.len();
            Ok(())
        } else {
            Err(self.error(JsonErrorKind::UnexpectedToken, expected))
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_ws();
        match self.peek() {
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => Ok(Value::Scalar(RawBson::String(self.parse_json_string()?))),
            Some(b't') => {
                self.expect_literal("true", Expected::Value)?;
                Ok(Value::Scalar(RawBson::Boolean(true)))
            }
            Some(b'f') => {
                self.expect_literal("false", Expected::Value)?;
                Ok(Value::Scalar(RawBson::Boolean(false)))
            }
            Some(b'n') => {
                self.expect_literal("null", Expected::Value)?;
                Ok(Value::Scalar(RawBson::Null))
            }
            Some(b'-') | Some(b'0'..=b'9') => self.parse_number(),
            _ => Err(self.error(JsonErrorKind::UnexpectedToken, Expected::Value)),
        }
    }

    /// Parses a JSON string literal, decoding `\uXXXX` escapes including UTF-16 surrogate pairs.
    fn parse_json_string(&mut self) -> Result<String> {
        self.expect_byte(b'"', Expected::Value)?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error(JsonErrorKind::UnexpectedEndOfInput, Expected::Value)),
                Some(b'"') => return Ok(out),
                Some(b'\\') => match self.bump() {
                    Some(b'"') => out.push('"'),
                    Some(b'\\') => out.push('\\'),
                    Some(b'/') => out.push('/'),
                    Some(b'b') => out.push('\u{8}'),
                    Some(b'f') => out.push('\u{c}'),
                    Some(b'n') => out.push('\n'),
                    Some(b'r') => out.push('\r'),
                    Some(b't') => out.push('\t'),
                    Some(b'u') => {
                        let first = self.parse_hex4()?;
                        let ch = if (0xD800..=0xDBFF).contains(&first) {
                            self.expect_literal("\\u", Expected::Value)
                                .map_err(|_| self.error(JsonErrorKind::InvalidSurrogatePair, Expected::Value))?;
                            let second = self.parse_hex4()?;
                            if !(0xDC00..=0xDFFF).contains(&second) {
                                return Err(
                                    self.error(JsonErrorKind::InvalidSurrogatePair, Expected::Value)
                                );
                            }
                            let combined = 0x10000
                                + ((first as u32 - 0xD800) << 10)
                                + (second as u32 - 0xDC00);
                            char::from_u32(combined)
                                .ok_or_else(|| self.error(JsonErrorKind::InvalidSurrogatePair, Expected::Value))?
                        } else {
                            char::from_u32(first as u32)
                                .ok_or_else(|| self.error(JsonErrorKind::InvalidEscape, Expected::Value))?
                        };
                        out.push(ch);
                    }
                    _ => return Err(self.error(JsonErrorKind::InvalidEscape, Expected::Value)),
                },
                Some(b) if b < 0x20 => {
                    return Err(self.error(JsonErrorKind::UnexpectedToken, Expected::Value));
                }
                Some(b) if b < 0x80 => out.push(b as char),
                Some(b) => {
                    // Multi-byte UTF-8 sequence: back up and decode from the underlying &str.
                    self.pos -= 1;
                    let rest = &self.input[self.pos..];
                    let ch = rest
                        .chars()
                        .next()
                        .ok_or_else(|| self.error(JsonErrorKind::InvalidEscape, Expected::Value))?;
                    out.push(ch);
                    self.pos += ch.len_utf8();
                    let _ = b;
                }
            }
            if !self.options.allow_interior_nul_in_strings && out.ends_with('\0') {
                return Err(self.error(
                    JsonErrorKind::InvalidExtendedJson {
                        message: "string value contains an interior NUL".into(),
                    },
                    Expected::Value,
                ));
            }
        }
    }

    fn parse_hex4(&mut self) -> Result<u16> {
        let s = self
            .input
            .get(self.pos..self.pos + 4)
            .ok_or_else(|| self.error(JsonErrorKind::UnexpectedEndOfInput, Expected::Value))?;
        let v = u16::from_str_radix(s, 16)
            .map_err(|_| self.error(JsonErrorKind::InvalidEscape, Expected::Value))?;
        self.pos += 4;
        Ok(v)
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let mut is_float = false;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        let text = &self.input[start..self.pos];
        if text.is_empty() || text == "-" {
            return Err(self.error(JsonErrorKind::InvalidNumber, Expected::Value));
        }

        if !is_float {
            if let Ok(v) = text.parse::<i32>() {
                return Ok(Value::Scalar(RawBson::Int32(v)));
            }
            if let Ok(v) = text.parse::<i64>() {
                return Ok(Value::Scalar(RawBson::Int64(v)));
            }
        }
        let v: f64 = text
            .parse()
            .map_err(|_| self.error(JsonErrorKind::InvalidNumber, Expected::Value))?;
        Ok(Value::Scalar(RawBson::Double(v)))
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.expect_byte(b'[', Expected::Value)?;
        let mut builder = ArrayBuilder::new();
        self.skip_ws();
        if self.peek() == Some(b']') {
            self.pos += 1;
            return Ok(Value::Array(builder.finish()));
        }
        loop {
            let value = self.parse_value()?;
            self.append_array_value(&mut builder, value)?;
            self.skip_ws();
            match self.bump() {
                Some(b',') => {
                    self.skip_ws();
                    continue;
                }
                Some(b']') => break,
                _ => return Err(self.error(JsonErrorKind::UnexpectedToken, Expected::CommaOrEnd)),
            }
        }
        Ok(Value::Array(builder.finish()))
    }

    fn append_array_value(&self, builder: &mut ArrayBuilder, value: Value) -> Result<()> {
        match value {
            Value::Document(bytes) => builder.append_document(
                &crate::raw::document_buf::RawDocumentBuf::from_bytes_unchecked(bytes),
            ),
            Value::Array(bytes) => builder.append_array(&crate::raw::RawArrayBuf::from_document_buf(
                crate::raw::document_buf::RawDocumentBuf::from_bytes_unchecked(bytes),
            )),
            Value::Scalar(raw) => builder
                .append_raw_bson(&raw)
                .map_err(|e| self.wrap_bson_error(e))?,
        }
        Ok(())
    }

    fn parse_object(&mut self) -> Result<Value> {
        self.expect_byte(b'{', Expected::Value)?;
        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(Value::Document(DocumentBuilder::new().finish()));
        }

        let first_key = self.parse_json_string()?;
        self.skip_ws();
        self.expect_byte(b':', Expected::Colon)?;
        self.skip_ws();

        if let Some(scalar) = self.try_parse_extended_json(&first_key)? {
            return Ok(Value::Scalar(scalar));
        }

        let mut builder = DocumentBuilder::new();
        let first_value = self.parse_value()?;
        self.append_object_value(&mut builder, &first_key, first_value)?;

        loop {
            self.skip_ws();
            match self.bump() {
                Some(b'}') => break,
                Some(b',') => {
                    self.skip_ws();
                    let key = self.parse_json_string()?;
                    self.skip_ws();
                    self.expect_byte(b':', Expected::Colon)?;
                    self.skip_ws();
                    let value = self.parse_value()?;
                    self.append_object_value(&mut builder, &key, value)?;
                }
                _ => return Err(self.error(JsonErrorKind::UnexpectedToken, Expected::CommaOrEnd)),
            }
        }
        Ok(Value::Document(builder.finish()))
    }

    fn append_object_value(
        &self,
        builder: &mut DocumentBuilder,
        key: &str,
        value: Value,
    ) -> Result<()> {
        match value {
            Value::Document(bytes) => builder
                .append_document(
                    key,
                    &crate::raw::document_buf::RawDocumentBuf::from_bytes_unchecked(bytes),
                )
                .map_err(|e| self.wrap_bson_error(e)),
            Value::Array(bytes) => builder
                .append_array(
                    key,
                    &crate::raw::RawArrayBuf::from_document_buf(
                        crate::raw::document_buf::RawDocumentBuf::from_bytes_unchecked(bytes),
                    ),
                )
                .map_err(|e| self.wrap_bson_error(e)),
            Value::Scalar(raw) => builder
                .append_raw_bson(key, &raw)
                .map_err(|e| self.wrap_bson_error(e)),
        }
    }

    /// If `key` is one of the reserved legacy extended-JSON keys, parses the rest of the object
    /// (which must have exactly the shape that key requires) and returns the decoded scalar.
    /// Returns `Ok(None)` for an ordinary key, leaving the parser positioned right after the
    /// already-consumed `"key":`.
    fn try_parse_extended_json(&mut self, key: &str) -> Result<Option<RawBson>> {
        let scalar = match key {
            "$oid" => {
                let hex = self.parse_json_string()?;
                self.close_object()?;
                RawBson::ObjectId(
                    ObjectId::parse_str(&hex).map_err(|e| self.wrap_bson_error(e))?,
                )
            }
            "$undefined" => {
                self.expect_literal("true", Expected::Value)?;
                self.close_object()?;
                RawBson::Undefined
            }
            "$minkey" => {
                self.expect_literal("1", Expected::Value)?;
                self.close_object()?;
                RawBson::MinKey
            }
            "$maxkey" => {
                self.expect_literal("1", Expected::Value)?;
                self.close_object()?;
                RawBson::MaxKey
            }
            "$date" => {
                let value = self.parse_number()?;
                self.close_object()?;
                let millis = match value {
                    Value::Scalar(RawBson::Int32(v)) => v as i64,
                    Value::Scalar(RawBson::Int64(v)) => v,
                    _ => {
                        return Err(self.error(
                            JsonErrorKind::InvalidExtendedJson {
                                message: "$date must be an integer number of milliseconds".into(),
                            },
                            Expected::Value,
                        ))
                    }
                };
                RawBson::DateTime(millis)
            }
            "$timestamp" => {
                self.skip_ws();
                self.expect_byte(b'{', Expected::Value)?;
                self.skip_ws();
                let (mut t, mut i) = (None, None);
                loop {
                    self.skip_ws();
                    let field = self.parse_json_string()?;
                    self.skip_ws();
                    self.expect_byte(b':', Expected::Colon)?;
                    self.skip_ws();
                    let n = self.parse_u32_literal()?;
                    match field.as_str() {
                        "t" => t = Some(n),
                        "i" => i = Some(n),
                        _ => {
                            return Err(self.error(
                                JsonErrorKind::InvalidExtendedJson {
                                    message: "$timestamp fields must be \"t\" and \"i\"".into(),
                                },
                                Expected::Value,
                            ))
                        }
                    }
                    self.skip_ws();
                    match self.bump() {
                        Some(b',') => continue,
                        Some(b'}') => break,
                        _ => {
                            return Err(
                                self.error(JsonErrorKind::UnexpectedToken, Expected::CommaOrEnd)
                            )
                        }
                    }
                }
                let (t, i) = (
                    t.ok_or_else(|| {
                        self.error(
                            JsonErrorKind::InvalidExtendedJson {
                                message: "$timestamp missing \"t\"".into(),
                            },
                            Expected::Value,
                        )
                    })?,
                    i.ok_or_else(|| {
                        self.error(
                            JsonErrorKind::InvalidExtendedJson {
                                message: "$timestamp missing \"i\"".into(),
                            },
                            Expected::Value,
                        )
                    })?,
                );
                self.close_object()?;
                RawBson::Timestamp(RawTimestamp {
                    time: t,
                    increment: i,
                })
            }
            "$regex" => {
                let pattern = self.parse_json_string()?;
                self.skip_ws();
                self.expect_byte(b',', Expected::CommaOrEnd)?;
                self.skip_ws();
                self.expect_key("$options")?;
                self.skip_ws();
                self.expect_byte(b':', Expected::Colon)?;
                self.skip_ws();
                let options = self.parse_json_string()?;
                self.close_object()?;
                RawBson::RegularExpression(RawRegex { pattern, options })
            }
            "$ref" => {
                let namespace = self.parse_json_string()?;
                self.skip_ws();
                self.expect_byte(b',', Expected::CommaOrEnd)?;
                self.skip_ws();
                self.expect_key("$id")?;
                self.skip_ws();
                self.expect_byte(b':', Expected::Colon)?;
                self.skip_ws();
                let id_hex = self.parse_json_string()?;
                self.close_object()?;
                RawBson::DbPointer(RawDbPointer {
                    namespace,
                    id: ObjectId::parse_str(&id_hex).map_err(|e| self.wrap_bson_error(e))?,
                })
            }
            "$binary" => {
                let data = self.parse_json_string()?;
                self.skip_ws();
                self.expect_byte(b',', Expected::CommaOrEnd)?;
                self.skip_ws();
                self.expect_key("$type")?;
                self.skip_ws();
                self.expect_byte(b':', Expected::Colon)?;
                self.skip_ws();
                let subtype_hex = self.parse_json_string()?;
                self.close_object()?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(data.as_bytes())
                    .map_err(|e| {
                        self.error(
                            JsonErrorKind::InvalidExtendedJson {
                                message: format!("invalid base64 in $binary: {e}"),
                            },
                            Expected::Value,
                        )
                    })?;
                let subtype_byte = u8::from_str_radix(subtype_hex.trim_start_matches("0x"), 16)
                    .map_err(|_| {
                        self.error(
                            JsonErrorKind::InvalidExtendedJson {
                                message: "invalid $type hex byte in $binary".into(),
                            },
                            Expected::Value,
                        )
                    })?;
                RawBson::Binary(RawBinary {
                    subtype: BinarySubtype::from(subtype_byte),
                    bytes,
                })
            }
            _ => return Ok(None),
        };
        Ok(Some(scalar))
    }

    fn parse_u32_literal(&mut self) -> Result<u32> {
        match self.parse_number()? {
            Value::Scalar(RawBson::Int32(v)) if v >= 0 => Ok(v as u32),
            Value::Scalar(RawBson::Int64(v)) if (0..=u32::MAX as i64).contains(&v) => Ok(v as u32),
            _ => Err(self.error(JsonErrorKind::InvalidNumber, Expected::Value)),
        }
    }

    fn expect_key(&mut self, expected: &str) -> Result<()> {
        let key = self.parse_json_string()?;
        if key == expected {
            Ok(())
        } else {
            Err(self.error(
                JsonErrorKind::InvalidExtendedJson {
                    message: format!("expected key {expected:?}, found {key:?}"),
                },
                Expected::ObjectKey,
            ))
        }
    }

    fn close_object(&mut self) -> Result<()> {
        self.skip_ws();
        self.expect_byte(b'}', Expected::CommaOrEnd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::RawDocument;

    #[test]
    fn parses_plain_object() {
        let bytes = read_document(r#"{"a": 1, "b": "two", "c": true}"#).unwrap();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert_eq!(doc.get("a").unwrap().unwrap().as_i32(), Some(1));
        assert_eq!(doc.get("b").unwrap().unwrap().as_str(), Some("two"));
        assert_eq!(doc.get("c").unwrap().unwrap().as_bool(), Some(true));
    }

    #[test]
    fn parses_nested_array_and_object() {
        let bytes = read_document(r#"{"items": [1, 2, {"x": null}]}"#).unwrap();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let arr = doc.get("items").unwrap().unwrap().as_array().unwrap();
        let values: Vec<_> = arr.iter().map(|v| v.unwrap()).collect();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0].as_i32(), Some(1));
    }

    #[test]
    fn parses_oid_extended_json() {
        let bytes = read_document(r#"{"_id": {"$oid": "507f1f77bcf86cd799439011"}}"#).unwrap();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let oid = doc.get("_id").unwrap().unwrap().as_object_id().unwrap();
        assert_eq!(oid.to_hex(), "507f1f77bcf86cd799439011");
    }

    #[test]
    fn parses_date_extended_json() {
        let bytes = read_document(r#"{"when": {"$date": 1609459200000}}"#).unwrap();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert_eq!(
            doc.get("when").unwrap().unwrap().as_datetime_millis(),
            Some(1609459200000)
        );
    }

    #[test]
    fn parses_regex_extended_json() {
        let bytes = read_document(r#"{"re": {"$regex": "^a", "$options": "i"}}"#).unwrap();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let regex = doc.get("re").unwrap().unwrap().as_regex().unwrap();
        assert_eq!(regex.pattern, "^a");
        assert_eq!(regex.options, "i");
    }

    #[test]
    fn decodes_surrogate_pair_escape() {
        // U+1F600 GRINNING FACE, written as a \u escaped UTF-16 surrogate pair.
        let bytes = read_document("{\"s\": \"\\uD83D\\uDE00\"}").unwrap();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert_eq!(doc.get("s").unwrap().unwrap().as_str(), Some("\u{1F600}"));
    }

    #[test]
    fn number_without_fraction_becomes_int32_or_int64() {
        let bytes = read_document(r#"{"small": 7, "big": 9999999999}"#).unwrap();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        assert_eq!(doc.get("small").unwrap().unwrap().as_i32(), Some(7));
        assert_eq!(doc.get("big").unwrap().unwrap().as_i64(), Some(9999999999));
    }

    #[test]
    fn rejects_non_container_root() {
        assert!(read_document("42").is_err());
        assert!(read_document("\"hello\"").is_err());
    }

    #[test]
    fn accepts_array_root() {
        let bytes = read_document("[1, 2, 3]").unwrap();
        let doc = crate::raw::RawDocument::from_bytes(&bytes).unwrap();
        let arr = crate::raw::RawArray::from_document(doc);
        let values: Vec<i32> = arr.iter().map(|v| v.unwrap().as_i32().unwrap()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn reports_line_and_column_on_error() {
        let err = read_document("{\n  \"a\": }").unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn rejects_raw_control_character_in_string() {
        let raw = "{\"a\": \"line\u{1}break\"}";
        assert!(read_document(raw).is_err());
    }
}
