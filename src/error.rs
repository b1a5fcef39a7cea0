//! Error types for the BSON codec, views, builder and validator.

use thiserror::Error;

use crate::spec::ElementType;

/// The result type used throughout the BSON codec/view/builder layer.
pub type Result<T> = std::result::Result<T, Error>;

/// An error produced by the BSON codec, element/document views, the owned builder, or the
/// validator.
///
/// JSON parse failures and path-expression failures use their own error types, in
/// [`crate::json::error`] and [`crate::path::error`] respectively.
#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub key: Option<String>,
    pub index: Option<usize>,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(key) = self.key.as_deref() {
            write!(f, " (at key \"{key}\")")?;
        } else if let Some(index) = self.index {
            write!(f, " (at index {index})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The first byte of an element did not match a known [`ElementType`] tag.
    #[error("invalid element type tag: {tag:#04x}")]
    InvalidElementType { tag: u8 },

    /// An element, string, or document was too short for its declared or required size.
    #[error("invalid element size: {message}")]
    InvalidElementSize { message: String },

    /// A document's or array's leading length prefix disagreed with the buffer it was found in.
    #[error("invalid document size: {message}")]
    InvalidDocumentSize { message: String },

    /// A value was read via an accessor that didn't match the element's runtime type.
    #[error("cannot read a {expected:?} value from a {actual:?} element")]
    IncompatibleElementConversion {
        expected: ElementType,
        actual: ElementType,
    },

    /// A value was about to be stored/converted into a shape that can't represent it.
    #[error("cannot convert into a {expected:?} element: {message}")]
    IncompatibleTypeConversion {
        expected: ElementType,
        message: String,
    },

    /// A string-family value contained bytes that are not valid UTF-8.
    #[error("invalid UTF-8 in string-family value")]
    InvalidUtf8,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Error {
            kind,
            key: None,
            index: None,
        }
    }

    pub(crate) fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub(crate) fn invalid_element_type(tag: u8) -> Self {
        Self::new(ErrorKind::InvalidElementType { tag })
    }

    pub(crate) fn invalid_element_size(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidElementSize {
            message: message.into(),
        })
    }

    pub(crate) fn invalid_document_size(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidDocumentSize {
            message: message.into(),
        })
    }

    pub(crate) fn incompatible_element_conversion(expected: ElementType, actual: ElementType) -> Self {
        Self::new(ErrorKind::IncompatibleElementConversion { expected, actual })
    }

    pub(crate) fn incompatible_type_conversion(
        expected: ElementType,
        message: impl Into<String>,
    ) -> Self {
        Self::new(ErrorKind::IncompatibleTypeConversion {
            expected,
            message: message.into(),
        })
    }

    pub(crate) fn invalid_utf8() -> Self {
        Self::new(ErrorKind::InvalidUtf8)
    }
}
