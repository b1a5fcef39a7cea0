use core::str;

use crate::error::{Error, Result};

/// A borrowed BSON element name: zero or more UTF-8 encoded characters, excluding the NUL byte.
///
/// Unlike [`std::ffi::CStr`], this is required to be valid UTF-8 and does not include the NUL
/// terminator in the buffer. Construct one at compile time with [`cstr!`] or at runtime via
/// `TryFrom<&str>`.
#[derive(Debug)]
#[repr(transparent)]
pub struct CStr {
    data: [u8],
}

impl<'a> TryFrom<&'a str> for &'a CStr {
    type Error = Error;

    fn try_from(value: &str) -> Result<&CStr> {
        match validate_cstr(value) {
            Some(cs) => Ok(cs),
            None => Err(Error::invalid_element_size(format!(
                "element name contains an interior NUL: {value:?}"
            ))),
        }
    }
}

impl CStr {
    const fn from_str_unchecked(value: &str) -> &Self {
        // Safety: CStr is repr(transparent) over [u8], and the pointer came from a safe reference.
        unsafe { &*(value.as_bytes() as *const [u8] as *const CStr) }
    }

    /// Views the buffer as a Rust `&str`.
    pub fn as_str(&self) -> &str {
        // Safety: the only way to construct a CStr is from a valid &str.
        unsafe { str::from_utf8_unchecked(&self.data) }
    }

    pub fn len(&self) -> usize {
        self.as_str().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    pub(crate) fn append_to(&self, buf: &mut Vec<u8>) {
        buf.extend(&self.data);
        buf.push(0);
    }
}

impl PartialEq<&CStr> for &CStr {
    fn eq(&self, other: &&CStr) -> bool {
        self.as_str() == other.as_str()
    }
}

impl std::borrow::ToOwned for CStr {
    type Owned = CString;

    fn to_owned(&self) -> Self::Owned {
        self.into()
    }
}

impl AsRef<CStr> for CStr {
    fn as_ref(&self) -> &CStr {
        self
    }
}

impl AsRef<str> for CStr {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[doc(hidden)]
#[diagnostic::on_unimplemented(message = "the string literal contains a zero byte")]
pub trait ValidCStr {}
#[doc(hidden)]
pub struct IsValidCStr<const VALID: bool>;
#[doc(hidden)]
impl ValidCStr for IsValidCStr<true> {}

#[doc(hidden)]
pub const fn validate_cstr(text: &str) -> Option<&CStr> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == 0 {
            return None;
        }
        i += 1;
    }
    Some(CStr::from_str_unchecked(text))
}
#[doc(hidden)]
pub const fn assert_valid_cstr<T: ValidCStr>() {}

/// Constructs a `&'static CStr` from a literal, validated at compile time.
#[macro_export]
macro_rules! cstr {
    ($text:literal) => {{
        const VALIDATED: Option<&$crate::raw::CStr> = $crate::raw::cstr::validate_cstr($text);
        const VALID: bool = VALIDATED.is_some();
        $crate::raw::cstr::assert_valid_cstr::<$crate::raw::cstr::IsValidCStr<VALID>>();
        VALIDATED.unwrap()
    }};
}
pub use cstr;

/// An owned BSON element name. `CString` is to `CStr` as [`String`] is to [`prim@str`].
#[derive(Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct CString {
    data: String,
}

impl TryFrom<String> for CString {
    type Error = Error;

    fn try_from(data: String) -> Result<Self> {
        let _: &CStr = data.as_str().try_into()?;
        Ok(Self { data })
    }
}

impl TryFrom<&str> for CString {
    type Error = Error;

    fn try_from(data: &str) -> Result<Self> {
        let cs: &CStr = data.try_into()?;
        Ok(cs.into())
    }
}

impl CString {
    pub(crate) fn from_string_unchecked(data: String) -> Self {
        Self { data }
    }

    pub fn into_string(self) -> String {
        self.data
    }

    pub fn as_str(&self) -> &str {
        self.as_ref().as_str()
    }
}

impl From<&CStr> for CString {
    fn from(value: &CStr) -> Self {
        Self {
            data: value.as_str().into(),
        }
    }
}

impl AsRef<CStr> for CString {
    fn as_ref(&self) -> &CStr {
        CStr::from_str_unchecked(self.data.as_str())
    }
}

impl std::fmt::Debug for CString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.data.fmt(f)
    }
}

impl std::fmt::Display for CString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.data.fmt(f)
    }
}

impl std::borrow::Borrow<CStr> for CString {
    fn borrow(&self) -> &CStr {
        self.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_str() {
        let cs: &CStr = "hello".try_into().unwrap();
        assert_eq!(cs.as_str(), "hello");
    }

    #[test]
    fn rejects_interior_nul() {
        let res: Result<&CStr> = "hel\0lo".try_into();
        assert!(res.is_err());
    }

    #[test]
    fn macro_validates_at_compile_time() {
        let key: &CStr = cstr!("name");
        assert_eq!(key.as_str(), "name");
    }

    #[test]
    fn owned_round_trips() {
        let owned = CString::try_from("field").unwrap();
        assert_eq!(owned.as_str(), "field");
        let borrowed: &CStr = owned.as_ref();
        assert_eq!(borrowed.as_str(), "field");
    }
}
