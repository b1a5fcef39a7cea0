//! Error types for the JSON reader/writer.

use thiserror::Error;

/// The result type used by the JSON reader/writer.
pub type Result<T> = std::result::Result<T, JsonError>;

/// What the parser was expecting when it failed, for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expected {
    Value,
    ObjectKey,
    Colon,
    CommaOrEnd,
    EndOfInput,
}

impl std::fmt::Display for Expected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Expected::Value => "a value",
            Expected::ObjectKey => "an object key",
            Expected::Colon => "':'",
            Expected::CommaOrEnd => "',' or a closing bracket",
            Expected::EndOfInput => "end of input",
        };
        f.write_str(s)
    }
}

/// A JSON (or extended-JSON) parse failure, carrying enough context to render a caret diagnostic.
#[derive(Clone, Debug, Error)]
#[error("JSON parse error at {line}:{column}: {kind} (expected {expected}) near {snippet:?}")]
pub struct JsonError {
    pub kind: JsonErrorKind,
    pub line: usize,
    pub column: usize,
    pub snippet: String,
    pub expected: Expected,
}

/// The specific shape of parse failure.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum JsonErrorKind {
    #[error("unexpected token")]
    UnexpectedToken,
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
    #[error("invalid number literal")]
    InvalidNumber,
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("invalid or incomplete \\u surrogate pair")]
    InvalidSurrogatePair,
    #[error("invalid extended-JSON shape: {message}")]
    InvalidExtendedJson { message: String },
    #[error("the root value of a BSON document must be a JSON object or array")]
    InvalidRootElement,
}

impl JsonError {
    pub(crate) fn new(
        kind: JsonErrorKind,
        expected: Expected,
        input: &str,
        byte_offset: usize,
    ) -> Self {
        let (line, column) = line_col(input, byte_offset);
        let snippet = snippet_around(input, byte_offset);
        JsonError {
            kind,
            line,
            column,
            snippet,
            expected,
        }
    }
}

fn line_col(input: &str, byte_offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for ch in input[..byte_offset.min(input.len())].chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

fn snippet_around(input: &str, byte_offset: usize) -> String {
    const RADIUS: usize = 16;
    let offset = byte_offset.min(input.len());
    let start = input[..offset]
        .char_indices()
        .rev()
        .take(RADIUS)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = input[offset..]
        .char_indices()
        .take(RADIUS)
        .last()
        .map(|(i, c)| offset + i + c.len_utf8())
        .unwrap_or(input.len());
    input[start..end].to_string()
}
