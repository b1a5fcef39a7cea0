//! Little-endian scalar codec and C-string/length-prefixed-string decoding.

use simdutf8::basic::from_utf8;

use crate::error::{Error, Result};

/// The minimum size of a BSON document: a 4-byte length prefix plus a trailing NUL.
pub const MIN_DOCUMENT_SIZE: i32 = 5;

/// The minimum size of a scoped-JavaScript (`code_w_scope`) value: its own length prefix, the
/// code string's length prefix plus NUL, and an empty scope document.
pub const MIN_CODE_WITH_SCOPE_SIZE: i32 = 4 + 4 + 1 + MIN_DOCUMENT_SIZE;

pub fn read_i32(buf: &[u8]) -> Result<i32> {
    let bytes: [u8; 4] = buf
        .get(0..4)
        .ok_or_else(|| Error::invalid_element_size("not enough bytes for an i32"))?
        .try_into()
        .unwrap();
    Ok(i32::from_le_bytes(bytes))
}

pub fn read_i64(buf: &[u8]) -> Result<i64> {
    let bytes: [u8; 8] = buf
        .get(0..8)
        .ok_or_else(|| Error::invalid_element_size("not enough bytes for an i64"))?
        .try_into()
        .unwrap();
    Ok(i64::from_le_bytes(bytes))
}

pub fn read_u64(buf: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = buf
        .get(0..8)
        .ok_or_else(|| Error::invalid_element_size("not enough bytes for a u64"))?
        .try_into()
        .unwrap();
    Ok(u64::from_le_bytes(bytes))
}

pub fn read_f64(buf: &[u8]) -> Result<f64> {
    Ok(f64::from_bits(read_u64(buf)?))
}

pub fn read_bool(buf: &[u8]) -> Result<bool> {
    match buf.first() {
        Some(0) => Ok(false),
        Some(1) => Ok(true),
        Some(other) => Err(Error::invalid_element_size(format!(
            "invalid boolean byte: {other:#04x}"
        ))),
        None => Err(Error::invalid_element_size("not enough bytes for a bool")),
    }
}

/// Reads a NUL-terminated UTF-8 string (a BSON `cstring`) from the start of `buf`.
///
/// Returns the decoded string and the number of bytes consumed, including the terminator.
pub fn read_cstr(buf: &[u8]) -> Result<(&str, usize)> {
    let nul_at = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::invalid_element_size("cstring missing NUL terminator"))?;
    let s = from_utf8(&buf[..nul_at]).map_err(|_| Error::invalid_utf8())?;
    Ok((s, nul_at + 1))
}

/// Reads a length-prefixed UTF-8 `string` element (4-byte length including the trailing NUL,
/// followed by that many bytes).
///
/// Returns the decoded string (without the trailing NUL) and the total number of bytes consumed.
pub fn read_lenencoded(buf: &[u8]) -> Result<(&str, usize)> {
    let len = read_i32(buf)?;
    if len < 1 {
        return Err(Error::invalid_element_size(format!(
            "string length must be at least 1, got {len}"
        )));
    }
    let total = 4usize
        .checked_add(len as usize)
        .ok_or_else(|| Error::invalid_element_size("string length overflow"))?;
    let body = buf
        .get(4..total)
        .ok_or_else(|| Error::invalid_element_size("string body runs past end of buffer"))?;
    let (content, nul) = body
        .split_last()
        .ok_or_else(|| Error::invalid_element_size("string body is empty"))?;
    if *nul != 0 {
        return Err(Error::invalid_element_size(
            "string value missing trailing NUL",
        ));
    }
    let s = from_utf8(content).map_err(|_| Error::invalid_utf8())?;
    Ok((s, total))
}

/// Appends a little-endian `i32` length-prefixed, NUL-terminated string.
pub fn write_lenencoded(buf: &mut Vec<u8>, s: &str) {
    let len = s.len() as i32 + 1;
    buf.extend(len.to_le_bytes());
    buf.extend(s.as_bytes());
    buf.push(0);
}
