//! The path expression AST.

/// A parsed path expression: a sequence of segments applied left to right, starting from the
/// document root.
#[derive(Clone, Debug, PartialEq)]
pub struct Path(pub Vec<Segment>);

/// One step of a path expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    /// `.name`
    Child(String),
    /// `.*` or `[*]`
    Wildcard,
    /// `..name` or `..*` — reserved, not evaluated.
    RecursiveDescent,
    /// `[0, "a", 3]` — a bracketed union of integer indices and/or quoted field names.
    Union(Vec<UnionKey>),
    /// `[start:end:step]` — reserved, not evaluated.
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },
    /// `[?(expr)]` — keep only children for which `expr` evaluates truthy.
    Filter(Expr),
    /// `[(expr)]` — compute the union key dynamically.
    Eval(Expr),
}

#[derive(Clone, Debug, PartialEq)]
pub enum UnionKey {
    Name(String),
    Index(i64),
}

/// A filter/eval sub-expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Int(i64),
    Str(String),
    Bool(bool),
    /// `@` — the element currently being tested.
    Current,
    /// `$` — the document root.
    Root,
    /// `expr.name`, `expr["name"]`, or `expr[index]`
    Field(Box<Expr>, String),
    /// `expr[*]` — reserved; a scalar expression has no single value to expand to.
    FieldWildcard(Box<Expr>),
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    UnOp(UnOp, Box<Expr>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Pos,
    Not,
}
