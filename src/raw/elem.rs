//! Typed views over a single BSON element.

use crate::{
    error::{Error, Result},
    oid::ObjectId,
    raw::{
        codec::{read_bool, read_cstr, read_f64, read_i32, read_i64, read_lenencoded, MIN_CODE_WITH_SCOPE_SIZE},
        RawArray, RawArrayBuf, RawDocument, RawDocumentBuf,
    },
    spec::{BinarySubtype, ElementType},
};

/// A borrowed `binary` value: a subtype tag plus a byte slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawBinaryRef<'a> {
    pub subtype: BinarySubtype,
    pub bytes: &'a [u8],
}

/// An owned `binary` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawBinary {
    pub subtype: BinarySubtype,
    pub bytes: Vec<u8>,
}

impl From<RawBinaryRef<'_>> for RawBinary {
    fn from(r: RawBinaryRef<'_>) -> Self {
        RawBinary {
            subtype: r.subtype,
            bytes: r.bytes.to_vec(),
        }
    }
}

/// A borrowed `regex` value: pattern and options, both NUL-terminated cstrings on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawRegexRef<'a> {
    pub pattern: &'a str,
    pub options: &'a str,
}

/// An owned `regex` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRegex {
    pub pattern: String,
    pub options: String,
}

impl From<RawRegexRef<'_>> for RawRegex {
    fn from(r: RawRegexRef<'_>) -> Self {
        RawRegex {
            pattern: r.pattern.to_owned(),
            options: r.options.to_owned(),
        }
    }
}

/// A borrowed `dbpointer` value (deprecated by the BSON spec, still round-tripped here).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawDbPointerRef<'a> {
    pub namespace: &'a str,
    pub id: ObjectId,
}

/// An owned `dbpointer` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawDbPointer {
    pub namespace: String,
    pub id: ObjectId,
}

impl From<RawDbPointerRef<'_>> for RawDbPointer {
    fn from(r: RawDbPointerRef<'_>) -> Self {
        RawDbPointer {
            namespace: r.namespace.to_owned(),
            id: r.id,
        }
    }
}

/// A borrowed `code_w_scope` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawJavaScriptCodeWithScopeRef<'a> {
    pub code: &'a str,
    pub scope: &'a RawDocument,
}

/// An owned `code_w_scope` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawJavaScriptCodeWithScope {
    pub code: String,
    pub scope: RawDocumentBuf,
}

impl From<RawJavaScriptCodeWithScopeRef<'_>> for RawJavaScriptCodeWithScope {
    fn from(r: RawJavaScriptCodeWithScopeRef<'_>) -> Self {
        RawJavaScriptCodeWithScope {
            code: r.code.to_owned(),
            scope: r.scope.to_owned(),
        }
    }
}

/// A BSON `timestamp`: an unsigned increment and an unsigned seconds-since-epoch time, both
/// little-endian u32 on the wire (increment first).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawTimestamp {
    pub time: u32,
    pub increment: u32,
}

impl RawTimestamp {
    pub(crate) fn from_le_bytes(buf: &[u8]) -> Result<Self> {
        let increment = read_i32(&buf[0..4])? as u32;
        let time = read_i32(&buf[4..8])? as u32;
        Ok(RawTimestamp { time, increment })
    }

    pub(crate) fn to_le_bytes(self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..4].copy_from_slice(&self.increment.to_le_bytes());
        out[4..8].copy_from_slice(&self.time.to_le_bytes());
        out
    }
}

/// A borrowed, typed view over one BSON element's value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawBsonRef<'a> {
    Double(f64),
    String(&'a str),
    Document(&'a RawDocument),
    Array(&'a RawArray),
    Binary(RawBinaryRef<'a>),
    Undefined,
    ObjectId(ObjectId),
    Boolean(bool),
    DateTime(i64),
    Null,
    RegularExpression(RawRegexRef<'a>),
    DbPointer(RawDbPointerRef<'a>),
    JavaScriptCode(&'a str),
    Symbol(&'a str),
    JavaScriptCodeWithScope(RawJavaScriptCodeWithScopeRef<'a>),
    Int32(i32),
    Timestamp(RawTimestamp),
    Int64(i64),
    MinKey,
    MaxKey,
}

macro_rules! as_accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        pub fn $name(&self) -> Option<$ty> {
            match *self {
                RawBsonRef::$variant(v) => Some(v),
                _ => None,
            }
        }
    };
}

impl<'a> RawBsonRef<'a> {
    /// The [`ElementType`] tag of this value.
    pub fn element_type(&self) -> ElementType {
        match self {
            RawBsonRef::Double(_) => ElementType::Double,
            RawBsonRef::String(_) => ElementType::String,
            RawBsonRef::Document(_) => ElementType::EmbeddedDocument,
            RawBsonRef::Array(_) => ElementType::Array,
            RawBsonRef::Binary(_) => ElementType::Binary,
            RawBsonRef::Undefined => ElementType::Undefined,
            RawBsonRef::ObjectId(_) => ElementType::ObjectId,
            RawBsonRef::Boolean(_) => ElementType::Boolean,
            RawBsonRef::DateTime(_) => ElementType::DateTime,
            RawBsonRef::Null => ElementType::Null,
            RawBsonRef::RegularExpression(_) => ElementType::RegularExpression,
            RawBsonRef::DbPointer(_) => ElementType::DbPointer,
            RawBsonRef::JavaScriptCode(_) => ElementType::JavaScriptCode,
            RawBsonRef::Symbol(_) => ElementType::Symbol,
            RawBsonRef::JavaScriptCodeWithScope(_) => ElementType::JavaScriptCodeWithScope,
            RawBsonRef::Int32(_) => ElementType::Int32,
            RawBsonRef::Timestamp(_) => ElementType::Timestamp,
            RawBsonRef::Int64(_) => ElementType::Int64,
            RawBsonRef::MinKey => ElementType::MinKey,
            RawBsonRef::MaxKey => ElementType::MaxKey,
        }
    }

    as_accessor!(as_f64, Double, f64);
    as_accessor!(as_str, String, &'a str);
    as_accessor!(as_document, Document, &'a RawDocument);
    as_accessor!(as_array, Array, &'a RawArray);
    as_accessor!(as_binary, Binary, RawBinaryRef<'a>);
    as_accessor!(as_object_id, ObjectId, ObjectId);
    as_accessor!(as_bool, Boolean, bool);
    as_accessor!(as_datetime_millis, DateTime, i64);
    as_accessor!(as_regex, RegularExpression, RawRegexRef<'a>);
    as_accessor!(as_db_pointer, DbPointer, RawDbPointerRef<'a>);
    as_accessor!(as_javascript, JavaScriptCode, &'a str);
    as_accessor!(as_symbol, Symbol, &'a str);
    as_accessor!(
        as_javascript_with_scope,
        JavaScriptCodeWithScope,
        RawJavaScriptCodeWithScopeRef<'a>
    );
    as_accessor!(as_i32, Int32, i32);
    as_accessor!(as_timestamp, Timestamp, RawTimestamp);
    as_accessor!(as_i64, Int64, i64);

    pub fn is_null(&self) -> bool {
        matches!(self, RawBsonRef::Null)
    }

    /// Checked typed extraction: fails with [`crate::error::ErrorKind::IncompatibleElementConversion`]
    /// when the runtime tag doesn't match `T`, rather than the `Option`-returning `as_*` accessors.
    pub fn value<T>(self) -> Result<T>
    where
        T: TryFrom<RawBsonRef<'a>, Error = Error>,
    {
        T::try_from(self)
    }

    /// Converts this view into an owned [`RawBson`].
    pub fn to_raw_bson(self) -> RawBson {
        match self {
            RawBsonRef::Double(v) => RawBson::Double(v),
            RawBsonRef::String(v) => RawBson::String(v.to_owned()),
            RawBsonRef::Document(v) => RawBson::Document(v.to_owned()),
            RawBsonRef::Array(v) => RawBson::Array(v.to_owned()),
            RawBsonRef::Binary(v) => RawBson::Binary(v.into()),
            RawBsonRef::Undefined => RawBson::Undefined,
            RawBsonRef::ObjectId(v) => RawBson::ObjectId(v),
            RawBsonRef::Boolean(v) => RawBson::Boolean(v),
            RawBsonRef::DateTime(v) => RawBson::DateTime(v),
            RawBsonRef::Null => RawBson::Null,
            RawBsonRef::RegularExpression(v) => RawBson::RegularExpression(v.into()),
            RawBsonRef::DbPointer(v) => RawBson::DbPointer(v.into()),
            RawBsonRef::JavaScriptCode(v) => RawBson::JavaScriptCode(v.to_owned()),
            RawBsonRef::Symbol(v) => RawBson::Symbol(v.to_owned()),
            RawBsonRef::JavaScriptCodeWithScope(v) => RawBson::JavaScriptCodeWithScope(v.into()),
            RawBsonRef::Int32(v) => RawBson::Int32(v),
            RawBsonRef::Timestamp(v) => RawBson::Timestamp(v),
            RawBsonRef::Int64(v) => RawBson::Int64(v),
            RawBsonRef::MinKey => RawBson::MinKey,
            RawBsonRef::MaxKey => RawBson::MaxKey,
        }
    }

    /// Decodes the element value starting at `data`, whose first byte is the element's value (the
    /// type tag and key have already been consumed). `size` is the exact length of the value in
    /// bytes, as computed by the document iterator.
    pub(crate) fn decode(kind: ElementType, data: &'a [u8]) -> Result<Self> {
        Ok(match kind {
            ElementType::Double => RawBsonRef::Double(read_f64(data)?),
            ElementType::String => RawBsonRef::String(read_lenencoded(data)?.0),
            ElementType::EmbeddedDocument => RawBsonRef::Document(RawDocument::from_bytes(data)?),
            ElementType::Array => {
                RawBsonRef::Array(RawArray::from_document(RawDocument::from_bytes(data)?))
            }
            ElementType::Undefined => RawBsonRef::Undefined,
            ElementType::ObjectId => RawBsonRef::ObjectId(read_object_id(data)?),
            ElementType::Boolean => RawBsonRef::Boolean(read_bool(data)?),
            ElementType::DateTime => RawBsonRef::DateTime(read_i64(data)?),
            ElementType::Null => RawBsonRef::Null,
            ElementType::RegularExpression => {
                let (pattern, n) = read_cstr(data)?;
                let (options, _) = read_cstr(&data[n..])?;
                RawBsonRef::RegularExpression(RawRegexRef { pattern, options })
            }
            ElementType::DbPointer => {
                let (namespace, n) = read_lenencoded(data)?;
                RawBsonRef::DbPointer(RawDbPointerRef {
                    namespace,
                    id: read_object_id(&data[n..])?,
                })
            }
            ElementType::Binary => {
                let len = read_i32(data)?;
                if len < 0 {
                    return Err(Error::invalid_element_size("binary length cannot be negative"));
                }
                let subtype = BinarySubtype::from(
                    *data
                        .get(4)
                        .ok_or_else(|| Error::invalid_element_size("missing binary subtype byte"))?,
                );
                let bytes = data
                    .get(5..5 + len as usize)
                    .ok_or_else(|| Error::invalid_element_size("binary value runs past end of buffer"))?;
                RawBsonRef::Binary(RawBinaryRef { subtype, bytes })
            }
            ElementType::JavaScriptCode => RawBsonRef::JavaScriptCode(read_lenencoded(data)?.0),
            ElementType::Symbol => RawBsonRef::Symbol(read_lenencoded(data)?.0),
            ElementType::JavaScriptCodeWithScope => {
                if data.len() < MIN_CODE_WITH_SCOPE_SIZE as usize {
                    return Err(Error::invalid_element_size(
                        "code_w_scope value shorter than the minimum valid size",
                    ));
                }
                let (code, code_len) = read_lenencoded(&data[4..])?;
                let scope = RawDocument::from_bytes(&data[4 + code_len..])?;
                RawBsonRef::JavaScriptCodeWithScope(RawJavaScriptCodeWithScopeRef { code, scope })
            }
            ElementType::Int32 => RawBsonRef::Int32(read_i32(data)?),
            ElementType::Timestamp => RawBsonRef::Timestamp(RawTimestamp::from_le_bytes(data)?),
            ElementType::Int64 => RawBsonRef::Int64(read_i64(data)?),
            ElementType::MinKey => RawBsonRef::MinKey,
            ElementType::MaxKey => RawBsonRef::MaxKey,
        })
    }
}

macro_rules! try_from_variant {
    ($variant:ident, $elem_type:ident, $ty:ty) => {
        impl<'a> TryFrom<RawBsonRef<'a>> for $ty {
            type Error = Error;

            fn try_from(value: RawBsonRef<'a>) -> Result<Self> {
                match value {
                    RawBsonRef::$variant(v) => Ok(v),
                    other => Err(Error::incompatible_element_conversion(
                        ElementType::$elem_type,
                        other.element_type(),
                    )),
                }
            }
        }
    };
}

try_from_variant!(Double, Double, f64);
try_from_variant!(String, String, &'a str);
try_from_variant!(Document, EmbeddedDocument, &'a RawDocument);
try_from_variant!(Array, Array, &'a RawArray);
try_from_variant!(Binary, Binary, RawBinaryRef<'a>);
try_from_variant!(ObjectId, ObjectId, ObjectId);
try_from_variant!(Boolean, Boolean, bool);
try_from_variant!(RegularExpression, RegularExpression, RawRegexRef<'a>);
try_from_variant!(DbPointer, DbPointer, RawDbPointerRef<'a>);
try_from_variant!(
    JavaScriptCodeWithScope,
    JavaScriptCodeWithScope,
    RawJavaScriptCodeWithScopeRef<'a>
);
try_from_variant!(Int32, Int32, i32);
try_from_variant!(Timestamp, Timestamp, RawTimestamp);
try_from_variant!(Int64, Int64, i64);

fn read_object_id(buf: &[u8]) -> Result<ObjectId> {
    let bytes: [u8; 12] = buf
        .get(0..12)
        .ok_or_else(|| Error::invalid_element_size("not enough bytes for an ObjectId"))?
        .try_into()
        .unwrap();
    Ok(ObjectId::from_bytes(bytes))
}

/// An owned, typed BSON value — the owned counterpart to [`RawBsonRef`].
#[derive(Clone, Debug, PartialEq)]
pub enum RawBson {
    Double(f64),
    String(String),
    Document(RawDocumentBuf),
    Array(RawArrayBuf),
    Binary(RawBinary),
    Undefined,
    ObjectId(ObjectId),
    Boolean(bool),
    DateTime(i64),
    Null,
    RegularExpression(RawRegex),
    DbPointer(RawDbPointer),
    JavaScriptCode(String),
    Symbol(String),
    JavaScriptCodeWithScope(RawJavaScriptCodeWithScope),
    Int32(i32),
    Timestamp(RawTimestamp),
    Int64(i64),
    MinKey,
    MaxKey,
}

impl RawBson {
    pub fn element_type(&self) -> ElementType {
        self.as_ref().element_type()
    }

    /// Borrows this owned value as a [`RawBsonRef`].
    pub fn as_ref(&self) -> RawBsonRef<'_> {
        match self {
            RawBson::Double(v) => RawBsonRef::Double(*v),
            RawBson::String(v) => RawBsonRef::String(v),
            RawBson::Document(v) => RawBsonRef::Document(v),
            RawBson::Array(v) => RawBsonRef::Array(v),
            RawBson::Binary(v) => RawBsonRef::Binary(RawBinaryRef {
                subtype: v.subtype,
                bytes: &v.bytes,
            }),
            RawBson::Undefined => RawBsonRef::Undefined,
            RawBson::ObjectId(v) => RawBsonRef::ObjectId(*v),
            RawBson::Boolean(v) => RawBsonRef::Boolean(*v),
            RawBson::DateTime(v) => RawBsonRef::DateTime(*v),
            RawBson::Null => RawBsonRef::Null,
            RawBson::RegularExpression(v) => RawBsonRef::RegularExpression(RawRegexRef {
                pattern: &v.pattern,
                options: &v.options,
            }),
            RawBson::DbPointer(v) => RawBsonRef::DbPointer(RawDbPointerRef {
                namespace: &v.namespace,
                id: v.id,
            }),
            RawBson::JavaScriptCode(v) => RawBsonRef::JavaScriptCode(v),
            RawBson::Symbol(v) => RawBsonRef::Symbol(v),
            RawBson::JavaScriptCodeWithScope(v) => {
                RawBsonRef::JavaScriptCodeWithScope(RawJavaScriptCodeWithScopeRef {
                    code: &v.code,
                    scope: &v.scope,
                })
            }
            RawBson::Int32(v) => RawBsonRef::Int32(*v),
            RawBson::Timestamp(v) => RawBsonRef::Timestamp(*v),
            RawBson::Int64(v) => RawBsonRef::Int64(*v),
            RawBson::MinKey => RawBsonRef::MinKey,
            RawBson::MaxKey => RawBsonRef::MaxKey,
        }
    }
}

impl<'a> From<RawBsonRef<'a>> for RawBson {
    fn from(r: RawBsonRef<'a>) -> Self {
        r.to_raw_bson()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn int32_decodes() {
        let data = 7i32.to_le_bytes();
        let v = RawBsonRef::decode(ElementType::Int32, &data).unwrap();
        assert_eq!(v.as_i32(), Some(7));
        assert_eq!(v.element_type(), ElementType::Int32);
    }

    #[test]
    fn wrong_accessor_returns_none() {
        let data = 7i32.to_le_bytes();
        let v = RawBsonRef::decode(ElementType::Int32, &data).unwrap();
        assert_eq!(v.as_str(), None);
    }

    #[test]
    fn typed_value_extracts_matching_type() {
        let data = 7i32.to_le_bytes();
        let v = RawBsonRef::decode(ElementType::Int32, &data).unwrap();
        assert_eq!(v.value::<i32>().unwrap(), 7);
    }

    #[test]
    fn typed_value_rejects_mismatched_type() {
        let data = 7i32.to_le_bytes();
        let v = RawBsonRef::decode(ElementType::Int32, &data).unwrap();
        let err = v.value::<bool>().unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::IncompatibleElementConversion {
                expected: ElementType::Boolean,
                actual: ElementType::Int32,
            }
        );
    }

    #[test]
    fn timestamp_round_trips() {
        let ts = RawTimestamp {
            time: 1000,
            increment: 2,
        };
        let bytes = ts.to_le_bytes();
        let decoded = RawTimestamp::from_le_bytes(&bytes).unwrap();
        assert_eq!(ts, decoded);
    }
}
