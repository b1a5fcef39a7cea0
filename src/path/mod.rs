//! A JSONPath-style query engine over BSON documents: parser → AST → bytecode
//! compiler → stack-VM evaluator. Supports field access, wildcards, bracketed unions, and
//! filter/eval expressions; recursive descent and slices are parsed but reserved.

pub mod ast;
pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod opcode;
pub mod parser;

pub use ast::{BinOp, Expr, Path, Segment, UnOp, UnionKey};
pub use error::PathError;
pub use opcode::Op;

use crate::raw::{RawBsonRef, RawDocument};

/// Parses, compiles, and evaluates `path` against `root` in one call, returning every element the
/// path selects.
pub fn select<'a>(root: &'a RawDocument, path: &str) -> error::Result<Vec<RawBsonRef<'a>>> {
    let ast = parser::parse_path(path)?;
    let code = compiler::compile_path(&ast);
    evaluator::evaluate(root, &code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::builder::{ArrayBuilder, DocumentBuilder};

    #[test]
    fn selects_end_to_end() {
        let mut item = DocumentBuilder::new();
        item.append_i32("value", 2013).unwrap();
        let item = item.into_raw_document_buf();

        let mut arr = ArrayBuilder::new();
        arr.append_document(&item);
        let arr = arr.into_raw_array_buf();

        let mut root = DocumentBuilder::new();
        root.append_array("arr", &arr).unwrap();
        let bytes = root.finish();

        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let results = select(doc, "$.arr[?((@.value < 2014) && (@.value > 2012))].value").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_i32(), Some(2013));
    }
}
