//! The path bytecode evaluator: a stack machine that carries a *working set* of
//! candidate elements through the compiled path, narrowed/expanded/filtered by each instruction in
//! turn, plus a small value-stack machine for evaluating `FilterExpr`/`IndexExpr` bodies per
//! candidate.

use crate::{
    path::{
        error::{PathError, Result},
        opcode::{Op, UnionKey},
    },
    raw::{RawBson, RawBsonRef, RawDocument},
};

/// Runs a compiled path against `root`, returning every element the path selects.
pub fn evaluate<'a>(root: &'a RawDocument, code: &[Op]) -> Result<Vec<RawBsonRef<'a>>> {
    let mut working: Vec<RawBsonRef<'a>> = vec![RawBsonRef::Document(root)];

    for op in code {
        match op {
            Op::Return => break,
            Op::Access(name) => {
                working = working
                    .into_iter()
                    .filter_map(|c| child_by_name(c, name))
                    .collect();
            }
            Op::Wildcard => {
                working = working.into_iter().flat_map(all_children).collect();
            }
            Op::Recurse => return Err(PathError::Unimplemented { feature: "op_recurse" }),
            Op::Slice { .. } => return Err(PathError::Unimplemented { feature: "slice" }),
            Op::Union(keys) => {
                working = working
                    .into_iter()
                    .flat_map(|c| union_children(c, keys))
                    .collect();
            }
            Op::FilterExpr(body) => {
                let mut next = Vec::new();
                for candidate in &working {
                    for child in all_children(*candidate) {
                        if eval_truthy(root, child, body)? {
                            next.push(child);
                        }
                    }
                }
                working = next;
            }
            Op::IndexExpr(body) => {
                let mut next = Vec::new();
                for candidate in &working {
                    let key = eval_expr(root, *candidate, body)?;
                    if let Some(child) = index_by_value(*candidate, &key) {
                        next.push(child);
                    }
                }
                working = next;
            }
            _ => {
                return Err(PathError::Evaluate {
                    message: "encountered an expression instruction outside an expression context"
                        .into(),
                })
            }
        }
    }

    Ok(working)
}

fn child_by_name<'a>(candidate: RawBsonRef<'a>, name: &str) -> Option<RawBsonRef<'a>> {
    match candidate {
        RawBsonRef::Document(doc) => doc.get(name).ok().flatten(),
        RawBsonRef::Array(arr) => name.parse::<usize>().ok().and_then(|i| arr.get(i).ok().flatten()),
        _ => None,
    }
}

fn all_children<'a>(candidate: RawBsonRef<'a>) -> Vec<RawBsonRef<'a>> {
    match candidate {
        RawBsonRef::Document(doc) => doc
            .iter()
            .filter_map(|r| r.ok())
            .map(|(_, v)| v)
            .collect(),
        RawBsonRef::Array(arr) => arr.iter().filter_map(|r| r.ok()).collect(),
        _ => Vec::new(),
    }
}

fn union_children<'a>(candidate: RawBsonRef<'a>, keys: &[UnionKey]) -> Vec<RawBsonRef<'a>> {
    keys.iter()
        .filter_map(|k| match k {
            UnionKey::Name(name) => child_by_name(candidate, name),
            UnionKey::Index(i) => {
                let idx = usize::try_from(*i).ok()?;
                match candidate {
                    RawBsonRef::Array(arr) => arr.get(idx).ok().flatten(),
                    RawBsonRef::Document(doc) => doc.get(&idx.to_string()).ok().flatten(),
                    _ => None,
                }
            }
        })
        .collect()
}

fn index_by_value<'a>(candidate: RawBsonRef<'a>, key: &ExprValue<'a>) -> Option<RawBsonRef<'a>> {
    match key {
        ExprValue::Str(s) => child_by_name(candidate, s),
        ExprValue::Int(i) => {
            let idx = usize::try_from(*i).ok()?;
            match candidate {
                RawBsonRef::Array(arr) => arr.get(idx).ok().flatten(),
                RawBsonRef::Document(doc) => doc.get(&idx.to_string()).ok().flatten(),
                _ => None,
            }
        }
        _ => None,
    }
}

/// A value on the filter/eval expression stack. `Missing` is produced (not an error) by a
/// `Field` lookup against a candidate that lacks the named field, so comparisons against it
/// simply evaluate falsy rather than aborting the whole path evaluation.
#[derive(Clone, Debug)]
enum ExprValue<'a> {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Element(RawBsonRef<'a>),
    Missing,
}

fn eval_truthy<'a>(root: &'a RawDocument, current: RawBsonRef<'a>, body: &[Op]) -> Result<bool> {
    Ok(match eval_expr(root, current, body)? {
        ExprValue::Bool(b) => b,
        ExprValue::Missing => false,
        ExprValue::Element(e) => !matches!(e, RawBsonRef::Null),
        _ => true,
    })
}

fn eval_expr<'a>(root: &'a RawDocument, current: RawBsonRef<'a>, body: &[Op]) -> Result<ExprValue<'a>> {
    let mut stack: Vec<ExprValue<'a>> = Vec::new();

    for op in body {
        match op {
            Op::Int(v) => stack.push(ExprValue::Int(*v)),
            Op::Str(v) => stack.push(ExprValue::Str(v.clone())),
            Op::True => stack.push(ExprValue::Bool(true)),
            Op::False => stack.push(ExprValue::Bool(false)),
            Op::Load => stack.push(ExprValue::Element(current)),
            Op::RootLoad => stack.push(ExprValue::Element(RawBsonRef::Document(root))),
            Op::Field(name) => {
                let base = stack.pop().ok_or_else(stack_underflow)?;
                stack.push(field_lookup(base, name));
            }
            Op::FieldWildcard => return Err(PathError::Unimplemented { feature: "field_wildcard" }),
            Op::Neg => {
                let v = stack.pop().ok_or_else(stack_underflow)?;
                stack.push(numeric_unary(v, |i| i.checked_neg().map(ExprValue::Int), |f| ExprValue::Double(-f))?);
            }
            Op::Pos => {
                let v = stack.pop().ok_or_else(stack_underflow)?;
                stack.push(v);
            }
            Op::Not => {
                let v = stack.pop().ok_or_else(stack_underflow)?;
                stack.push(ExprValue::Bool(!truthy(&v)));
            }
            Op::And => {
                let rhs = stack.pop().ok_or_else(stack_underflow)?;
                let lhs = stack.pop().ok_or_else(stack_underflow)?;
                stack.push(ExprValue::Bool(truthy(&lhs) && truthy(&rhs)));
            }
            Op::Or => {
                let rhs = stack.pop().ok_or_else(stack_underflow)?;
                let lhs = stack.pop().ok_or_else(stack_underflow)?;
                stack.push(ExprValue::Bool(truthy(&lhs) || truthy(&rhs)));
            }
            Op::Add | Op::Sub | Op::Mul | Op::Div => {
                let rhs = stack.pop().ok_or_else(stack_underflow)?;
                let lhs = stack.pop().ok_or_else(stack_underflow)?;
                stack.push(arith(op, lhs, rhs)?);
            }
            Op::Eq | Op::Neq | Op::Lt | Op::Lte | Op::Gt | Op::Gte => {
                let rhs = stack.pop().ok_or_else(stack_underflow)?;
                let lhs = stack.pop().ok_or_else(stack_underflow)?;
                stack.push(ExprValue::Bool(compare(op, &lhs, &rhs)));
            }
            _ => {
                return Err(PathError::Evaluate {
                    message: "encountered a path-selector instruction inside an expression".into(),
                })
            }
        }
    }

    stack.pop().ok_or_else(stack_underflow)
}

fn stack_underflow() -> PathError {
    PathError::Evaluate {
        message: "expression stack underflow".into(),
    }
}

fn field_lookup<'a>(base: ExprValue<'a>, name: &str) -> ExprValue<'a> {
    match base {
        ExprValue::Element(e) => match child_by_name(e, name) {
            Some(v) => ExprValue::Element(v),
            None => ExprValue::Missing,
        },
        _ => ExprValue::Missing,
    }
}

fn truthy(v: &ExprValue<'_>) -> bool {
    match v {
        ExprValue::Bool(b) => *b,
        ExprValue::Int(i) => *i != 0,
        ExprValue::Double(d) => *d != 0.0,
        ExprValue::Str(s) => !s.is_empty(),
        ExprValue::Element(e) => !matches!(e, RawBsonRef::Null),
        ExprValue::Missing => false,
    }
}

fn as_f64(v: &ExprValue<'_>) -> Option<f64> {
    match v {
        ExprValue::Int(i) => Some(*i as f64),
        ExprValue::Double(d) => Some(*d),
        ExprValue::Element(e) => match e {
            RawBsonRef::Int32(i) => Some(*i as f64),
            RawBsonRef::Int64(i) => Some(*i as f64),
            RawBsonRef::Double(d) => Some(*d),
            _ => None,
        },
        _ => None,
    }
}

fn as_str<'a, 'b>(v: &'b ExprValue<'a>) -> Option<&'b str> {
    match v {
        ExprValue::Str(s) => Some(s.as_str()),
        ExprValue::Element(RawBsonRef::String(s)) => Some(s),
        _ => None,
    }
}

fn numeric_unary<'a>(
    v: ExprValue<'a>,
    int_op: impl Fn(i64) -> Option<ExprValue<'a>>,
    float_op: impl Fn(f64) -> ExprValue<'a>,
) -> Result<ExprValue<'a>> {
    match &v {
        ExprValue::Int(i) => int_op(*i).ok_or_else(|| PathError::Evaluate {
            message: "integer overflow".into(),
        }),
        _ => as_f64(&v)
            .map(float_op)
            .ok_or_else(|| PathError::Evaluate {
                message: "unary operator applied to a non-numeric value".into(),
            }),
    }
}

fn arith<'a>(op: &Op, lhs: ExprValue<'a>, rhs: ExprValue<'a>) -> Result<ExprValue<'a>> {
    if let (ExprValue::Int(a), ExprValue::Int(b)) = (&lhs, &rhs) {
        let result = match op {
            Op::Add => a.checked_add(*b),
            Op::Sub => a.checked_sub(*b),
            Op::Mul => a.checked_mul(*b),
            Op::Div => a.checked_div(*b),
            _ => unreachable!(),
        };
        return result.map(ExprValue::Int).ok_or_else(|| PathError::Evaluate {
            message: "integer arithmetic overflowed or divided by zero".into(),
        });
    }

    let a = as_f64(&lhs).ok_or_else(|| arith_type_error(&lhs))?;
    let b = as_f64(&rhs).ok_or_else(|| arith_type_error(&rhs))?;
    Ok(ExprValue::Double(match op {
        Op::Add => a + b,
        Op::Sub => a - b,
        Op::Mul => a * b,
        Op::Div => a / b,
        _ => unreachable!(),
    }))
}

fn arith_type_error(v: &ExprValue<'_>) -> PathError {
    let _ = v;
    PathError::Evaluate {
        message: "arithmetic operator applied to a non-numeric value".into(),
    }
}

fn compare(op: &Op, lhs: &ExprValue<'_>, rhs: &ExprValue<'_>) -> bool {
    if matches!(lhs, ExprValue::Missing) || matches!(rhs, ExprValue::Missing) {
        return matches!(op, Op::Neq);
    }

    if let (Some(a), Some(b)) = (as_str(lhs), as_str(rhs)) {
        return match op {
            Op::Eq => a == b,
            Op::Neq => a != b,
            Op::Lt => a < b,
            Op::Lte => a <= b,
            Op::Gt => a > b,
            Op::Gte => a >= b,
            _ => false,
        };
    }

    if let (Some(a), Some(b)) = (as_f64(lhs), as_f64(rhs)) {
        return match op {
            Op::Eq => a == b,
            Op::Neq => a != b,
            Op::Lt => a < b,
            Op::Lte => a <= b,
            Op::Gt => a > b,
            Op::Gte => a >= b,
            _ => false,
        };
    }

    matches!(op, Op::Neq)
}

/// Converts the selected [`RawBsonRef`] values into owned [`RawBson`], for callers that don't want
/// to borrow from `root`.
pub fn into_owned(values: Vec<RawBsonRef<'_>>) -> Vec<RawBson> {
    values.into_iter().map(RawBsonRef::to_raw_bson).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        path::{compiler::compile_path, parser::parse_path},
        raw::{
            builder::{ArrayBuilder, DocumentBuilder},
            RawDocument,
        },
    };

    fn build_sample() -> Vec<u8> {
        let mut arr_a = DocumentBuilder::new();
        arr_a.append_i32("value", 2010).unwrap();
        let arr_a = arr_a.into_raw_document_buf();

        let mut arr_b = DocumentBuilder::new();
        arr_b.append_i32("value", 2013).unwrap();
        let arr_b = arr_b.into_raw_document_buf();

        let mut arr = ArrayBuilder::new();
        arr.append_document(&arr_a);
        arr.append_document(&arr_b);
        let arr_buf = arr.into_raw_array_buf();

        let mut root = DocumentBuilder::new();
        root.append_array("arr", &arr_buf).unwrap();
        root.finish()
    }

    #[test]
    fn selects_child_field() {
        let bytes = build_sample();
        let root = RawDocument::from_bytes(&bytes).unwrap();
        let path = parse_path("$.arr").unwrap();
        let code = compile_path(&path);
        let result = evaluate(root, &code).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result[0].as_array().is_some());
    }

    #[test]
    fn filters_by_comparison() {
        let bytes = build_sample();
        let root = RawDocument::from_bytes(&bytes).unwrap();
        let path = parse_path("$.arr[?((@.value < 2014) && (@.value > 2012))].value").unwrap();
        let code = compile_path(&path);
        let result = evaluate(root, &code).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].as_i32(), Some(2013));
    }

    #[test]
    fn union_selects_both_indices() {
        let bytes = build_sample();
        let root = RawDocument::from_bytes(&bytes).unwrap();
        let path = parse_path("$.arr[0, 1]").unwrap();
        let code = compile_path(&path);
        let result = evaluate(root, &code).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn filter_can_index_into_a_nested_array() {
        let mut inner = ArrayBuilder::new();
        inner.append_i32(7);
        let inner = inner.into_raw_array_buf();

        let mut doc_a = DocumentBuilder::new();
        doc_a.append_array("nested", &inner).unwrap();
        let doc_a = doc_a.into_raw_document_buf();

        let mut arr = ArrayBuilder::new();
        arr.append_document(&doc_a);
        let arr_buf = arr.into_raw_array_buf();

        let mut root = DocumentBuilder::new();
        root.append_array("arr", &arr_buf).unwrap();
        let bytes = root.finish();

        let root = RawDocument::from_bytes(&bytes).unwrap();
        let path = parse_path("$.arr[?(@.nested[0] == 7)]").unwrap();
        let code = compile_path(&path);
        let result = evaluate(root, &code).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn field_wildcard_in_expression_is_unimplemented() {
        let bytes = build_sample();
        let root = RawDocument::from_bytes(&bytes).unwrap();
        let path = parse_path("$.arr[?(@.value[*])]").unwrap();
        let code = compile_path(&path);
        assert!(matches!(
            evaluate(root, &code),
            Err(PathError::Unimplemented { feature: "field_wildcard" })
        ));
    }

    #[test]
    fn recurse_is_unimplemented() {
        let bytes = build_sample();
        let root = RawDocument::from_bytes(&bytes).unwrap();
        let path = parse_path("$..value").unwrap();
        let code = compile_path(&path);
        assert!(matches!(
            evaluate(root, &code),
            Err(PathError::Unimplemented { feature: "op_recurse" })
        ));
    }
}
