//! The path bytecode: a linear instruction stream the evaluator executes against a
//! working set of candidate elements, plus nested instruction streams for filter/eval
//! sub-expressions.

#[derive(Clone, Debug, PartialEq)]
pub enum UnionKey {
    Name(String),
    Index(i64),
}

/// An instruction in a compiled path or sub-expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    // --- path-selector instructions (operate on the working set of candidate elements) ---
    /// Narrows each candidate to its `name` field/array-index (dropping candidates missing it).
    Access(String),
    /// Expands each candidate to every one of its children.
    Wildcard,
    /// Reserved: recursive descent. Not executed; the evaluator returns
    /// [`crate::path::error::PathError::Unimplemented`].
    Recurse,
    /// Expands each candidate to the named/indexed members listed.
    Union(Vec<UnionKey>),
    /// Reserved: array slicing. Not executed.
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },
    /// Keeps, of each candidate's children, only those for which the embedded expression
    /// evaluates truthy.
    FilterExpr(Vec<Op>),
    /// Selects, of each candidate's children, the one named/indexed by the embedded expression's
    /// result.
    IndexExpr(Vec<Op>),
    /// Marks the end of the instruction stream; the evaluator returns the working set as-is.
    Return,

    // --- expression instructions (operate on a value stack, used inside FilterExpr/IndexExpr) ---
    Int(i64),
    Str(String),
    True,
    False,
    /// Pushes the element the filter/eval is currently testing (`@`).
    Load,
    /// Pushes the document root (`$`).
    RootLoad,
    /// Pops an element, pushes its `name` field/index (or `Missing` if absent).
    Field(String),
    /// Reserved: a scalar expression has no single value for `expr[*]` to expand to. Not
    /// executed; the evaluator returns [`crate::path::error::PathError::Unimplemented`].
    FieldWildcard,
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Pos,
    Not,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}
