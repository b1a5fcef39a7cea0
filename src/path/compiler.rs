//! Lowers a path/expression AST to bytecode: a straightforward post-order walk, one
//! [`Op`] per AST node, with `Filter`/`Eval` segments compiling their sub-expression into its own
//! nested instruction stream.

use crate::path::{
    ast::{BinOp, Expr, Path, Segment, UnOp, UnionKey as AstUnionKey},
    opcode::{Op, UnionKey},
};

/// Compiles a parsed path into its bytecode form, terminated with [`Op::Return`].
pub fn compile_path(path: &Path) -> Vec<Op> {
    let mut code = Vec::new();
    for segment in &path.0 {
        compile_segment(segment, &mut code);
    }
    code.push(Op::Return);
    code
}

fn compile_segment(segment: &Segment, code: &mut Vec<Op>) {
    match segment {
        Segment::Child(name) => code.push(Op::Access(name.clone())),
        Segment::Wildcard => code.push(Op::Wildcard),
        Segment::RecursiveDescent => code.push(Op::Recurse),
        Segment::Union(keys) => code.push(Op::Union(
            keys.iter()
                .map(|k| match k {
                    AstUnionKey::Name(n) => UnionKey::Name(n.clone()),
                    AstUnionKey::Index(i) => UnionKey::Index(*i),
                })
                .collect(),
        )),
        Segment::Slice { start, end, step } => code.push(Op::Slice {
            start: *start,
            end: *end,
            step: *step,
        }),
        Segment::Filter(expr) => code.push(Op::FilterExpr(compile_expr(expr))),
        Segment::Eval(expr) => code.push(Op::IndexExpr(compile_expr(expr))),
    }
}

/// Compiles a filter/eval sub-expression into its own post-order instruction stream.
pub fn compile_expr(expr: &Expr) -> Vec<Op> {
    let mut code = Vec::new();
    compile_expr_into(expr, &mut code);
    code
}

fn compile_expr_into(expr: &Expr, code: &mut Vec<Op>) {
    match expr {
        Expr::Int(v) => code.push(Op::Int(*v)),
        Expr::Str(v) => code.push(Op::Str(v.clone())),
        Expr::Bool(true) => code.push(Op::True),
        Expr::Bool(false) => code.push(Op::False),
        Expr::Current => code.push(Op::Load),
        Expr::Root => code.push(Op::RootLoad),
        Expr::Field(base, name) => {
            compile_expr_into(base, code);
            code.push(Op::Field(name.clone()));
        }
        Expr::FieldWildcard(base) => {
            compile_expr_into(base, code);
            code.push(Op::FieldWildcard);
        }
        Expr::UnOp(op, inner) => {
            compile_expr_into(inner, code);
            code.push(match op {
                UnOp::Neg => Op::Neg,
                UnOp::Pos => Op::Pos,
                UnOp::Not => Op::Not,
            });
        }
        Expr::BinOp(op, lhs, rhs) => {
            compile_expr_into(lhs, code);
            compile_expr_into(rhs, code);
            code.push(match op {
                BinOp::Add => Op::Add,
                BinOp::Sub => Op::Sub,
                BinOp::Mul => Op::Mul,
                BinOp::Div => Op::Div,
                BinOp::Eq => Op::Eq,
                BinOp::Neq => Op::Neq,
                BinOp::Lt => Op::Lt,
                BinOp::Lte => Op::Lte,
                BinOp::Gt => Op::Gt,
                BinOp::Gte => Op::Gte,
                BinOp::And => Op::And,
                BinOp::Or => Op::Or,
            });
        }
    }
}
