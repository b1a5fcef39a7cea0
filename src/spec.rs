//! The BSON wire type tags.

/// The one-byte tag identifying a BSON element's value shape.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ElementType {
    Double = 0x01,
    String = 0x02,
    EmbeddedDocument = 0x03,
    Array = 0x04,
    Binary = 0x05,
    Undefined = 0x06,
    ObjectId = 0x07,
    Boolean = 0x08,
    DateTime = 0x09,
    Null = 0x0A,
    RegularExpression = 0x0B,
    DbPointer = 0x0C,
    JavaScriptCode = 0x0D,
    Symbol = 0x0E,
    JavaScriptCodeWithScope = 0x0F,
    Int32 = 0x10,
    Timestamp = 0x11,
    Int64 = 0x12,
    MinKey = 0xFF,
    MaxKey = 0x7F,
}

impl ElementType {
    /// Looks up the variant for a raw tag byte. Returns `None` for any byte that isn't one of
    /// the known BSON element type tags.
    pub fn from_tag(tag: u8) -> Option<ElementType> {
        use ElementType::*;
        Some(match tag {
            0x01 => Double,
            0x02 => String,
            0x03 => EmbeddedDocument,
            0x04 => Array,
            0x05 => Binary,
            0x06 => Undefined,
            0x07 => ObjectId,
            0x08 => Boolean,
            0x09 => DateTime,
            0x0A => Null,
            0x0B => RegularExpression,
            0x0C => DbPointer,
            0x0D => JavaScriptCode,
            0x0E => Symbol,
            0x0F => JavaScriptCodeWithScope,
            0x10 => Int32,
            0x11 => Timestamp,
            0x12 => Int64,
            0xFF => MinKey,
            0x7F => MaxKey,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// True for the four tags that carry no value bytes at all.
    pub fn is_value_less(self) -> bool {
        matches!(
            self,
            ElementType::Null | ElementType::Undefined | ElementType::MinKey | ElementType::MaxKey
        )
    }
}

/// The subtype byte carried by BSON `binary` elements.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BinarySubtype {
    Generic,
    Function,
    BinaryOld,
    UuidOld,
    Uuid,
    Md5,
    UserDefined(u8),
}

impl From<BinarySubtype> for u8 {
    fn from(t: BinarySubtype) -> u8 {
        match t {
            BinarySubtype::Generic => 0x00,
            BinarySubtype::Function => 0x01,
            BinarySubtype::BinaryOld => 0x02,
            BinarySubtype::UuidOld => 0x03,
            BinarySubtype::Uuid => 0x04,
            BinarySubtype::Md5 => 0x05,
            BinarySubtype::UserDefined(x) => x,
        }
    }
}

impl From<u8> for BinarySubtype {
    fn from(t: u8) -> BinarySubtype {
        match t {
            0x00 => BinarySubtype::Generic,
            0x01 => BinarySubtype::Function,
            0x02 => BinarySubtype::BinaryOld,
            0x03 => BinarySubtype::UuidOld,
            0x04 => BinarySubtype::Uuid,
            0x05 => BinarySubtype::Md5,
            other => BinarySubtype::UserDefined(other),
        }
    }
}
