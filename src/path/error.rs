//! Error types for parsing, compiling, and evaluating path expressions.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PathError>;

/// A failure parsing, compiling, or evaluating a path expression.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("path parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("path compile error: {message}")]
    Compile { message: String },

    #[error("path evaluation error: {message}")]
    Evaluate { message: String },

    /// `op_recurse` / slice selectors are parsed but not executed — reserved for now.
    #[error("unimplemented path feature: {feature}")]
    Unimplemented { feature: &'static str },
}
