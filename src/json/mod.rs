//! The JSON reader and writer: a streaming JSON↔BSON round-trip with MongoDB-style
//! (legacy/shell-mode) extended JSON for the BSON types that plain JSON cannot represent.

pub mod error;
pub mod reader;
pub mod writer;

pub use error::JsonError;
pub use reader::{read_document, read_document_with_options, ReaderOptions};
pub use writer::{write_document, write_document_sorted};
