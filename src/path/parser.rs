//! A recursive-descent parser for the path grammar:
//!
//! ```text
//! path       := '$' segment*
//! segment    := '.' name | '.' '*' | '..' name | '..' '*' | '[' bracket ']'?
//! bracket    := union | filter-expr | eval-expr | '*' | slice
//! union      := union-key (',' union-key)*
//! union-key  := integer | string
//! slice      := int? ':' int? (':' int?)?
//! filter-expr:= '?' '(' expr ')'
//! eval-expr  := '(' expr ')'
//! expr       := or-expr
//! or-expr    := and-expr ('||' and-expr)*
//! and-expr   := cmp-expr ('&&' cmp-expr)*
//! cmp-expr   := add-expr (('==' | '!=' | '<=' | '>=' | '<' | '>') add-expr)?
//! add-expr   := mul-expr (('+' | '-') mul-expr)*
//! mul-expr   := unary (('*' | '/') unary)*
//! unary      := ('!' | '-' | '+')? primary
//! primary    := int | string | 'true' | 'false' | ('@' | '$') field* | '(' expr ')'
//! field      := '.' name | '[' string ']' | '[' int ']' | '[' '*' ']'
//!
//! The trailing `]` closing a bracketed segment is tolerated rather than required, matching
//! lenient consumer patterns that omit it.
//! ```

use crate::path::{
    ast::{BinOp, Expr, Path, Segment, UnOp, UnionKey},
    error::{PathError, Result},
};

/// Parses a full path expression, e.g. `$.store.book[?(@.price < 10)].title`.
pub fn parse_path(input: &str) -> Result<Path> {
    let mut p = Parser::new(input);
    p.skip_ws();
    p.expect_byte(b'$')?;
    let mut segments = Vec::new();
    loop {
        p.skip_ws();
        if p.peek().is_none() {
            break;
        }
        segments.push(p.parse_segment()?);
    }
    Ok(Path(segments))
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn err(&self, message: impl Into<String>) -> PathError {
        PathError::Parse {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')) {
            self.pos += 1;
        }
    }

    fn expect_byte(&mut self, b: u8) -> Result<()> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.err(format!("expected '{}'", b as char)))
        }
    }

    fn try_consume(&mut self, b: u8) -> bool {
        if self.peek() == Some(b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn try_consume_str(&mut self, s: &str) -> bool {
        if self.input[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn parse_segment(&mut self) -> Result<Segment> {
        match self.peek() {
            Some(b'.') => {
                self.pos += 1;
                if self.peek() == Some(b'.') {
                    self.pos += 1;
                    if self.try_consume(b'*') {
                        Ok(Segment::RecursiveDescent)
                    } else {
                        let name = self.parse_name()?;
                        let _ = name;
                        Ok(Segment::RecursiveDescent)
                    }
                } else if self.try_consume(b'*') {
                    Ok(Segment::Wildcard)
                } else {
                    let name = self.parse_name()?;
                    Ok(Segment::Child(name))
                }
            }
            Some(b'[') => self.parse_bracket(),
            _ => Err(self.err("expected '.' or '['")),
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_' || c == b'$')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.err("expected a field name"));
        }
        Ok(self.input[start..self.pos].to_owned())
    }

    fn parse_bracket(&mut self) -> Result<Segment> {
        self.expect_byte(b'[')?;
        self.skip_ws();
        let segment = if self.peek() == Some(b'*') {
            self.pos += 1;
            Segment::Wildcard
        } else if self.peek() == Some(b'?') {
            self.pos += 1;
            self.skip_ws();
            self.expect_byte(b'(')?;
            let expr = self.parse_expr()?;
            self.skip_ws();
            self.expect_byte(b')')?;
            Segment::Filter(expr)
        } else if self.peek() == Some(b'(') {
            self.pos += 1;
            let expr = self.parse_expr()?;
            self.skip_ws();
            self.expect_byte(b')')?;
            Segment::Eval(expr)
        } else {
            self.parse_union_or_slice()?
        };
        self.skip_ws();
        self.try_consume(b']');
        Ok(segment)
    }

    /// Disambiguates a union (`0, 2, "a"`) from a slice (`1:3`, `::2`) by scanning ahead for a
    /// top-level `:` before the closing bracket.
    fn parse_union_or_slice(&mut self) -> Result<Segment> {
        if self.looks_like_slice() {
            self.parse_slice()
        } else {
            self.parse_union()
        }
    }

    fn looks_like_slice(&self) -> bool {
        let mut depth = 0i32;
        let mut i = self.pos;
        while let Some(c) = self.bytes.get(i) {
            match c {
                b'[' => depth += 1,
                b']' if depth == 0 => return false,
                b']' => depth -= 1,
                b':' if depth == 0 => return true,
                b',' if depth == 0 => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn parse_slice(&mut self) -> Result<Segment> {
        let start = self.parse_optional_int()?;
        self.skip_ws();
        self.expect_byte(b':')?;
        self.skip_ws();
        let end = self.parse_optional_int()?;
        self.skip_ws();
        let step = if self.try_consume(b':') {
            self.skip_ws();
            self.parse_optional_int()?
        } else {
            None
        };
        Ok(Segment::Slice { start, end, step })
    }

    fn parse_optional_int(&mut self) -> Result<Option<i64>> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == b'-' || c.is_ascii_digit() => self.parse_int().map(Some),
            _ => Ok(None),
        }
    }

    fn parse_int(&mut self) -> Result<i64> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(self.err("expected an integer"));
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| self.err("integer literal out of range"))
    }

    fn parse_union(&mut self) -> Result<Segment> {
        let mut keys = vec![self.parse_union_key()?];
        loop {
            self.skip_ws();
            if self.try_consume(b',') {
                self.skip_ws();
                keys.push(self.parse_union_key()?);
            } else {
                break;
            }
        }
        Ok(Segment::Union(keys))
    }

    fn parse_union_key(&mut self) -> Result<UnionKey> {
        match self.peek() {
            Some(b'"') | Some(b'\'') => self.parse_quoted_string().map(UnionKey::Name),
            Some(c) if c == b'-' || c.is_ascii_digit() => self.parse_int().map(UnionKey::Index),
            _ => Err(self.err("expected an index or a quoted field name")),
        }
    }

    /// Accepts either `"..."` or `'...'` — unlike strict JSONPath, single-quoted names are
    /// also allowed inside bracketed unions.
    fn parse_quoted_string(&mut self) -> Result<String> {
        let quote = self.bump().unwrap();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let s = self.input[start..self.pos].to_owned();
                self.pos += 1;
                return Ok(s);
            }
            if c == b'\\' {
                self.pos += 1;
            }
            self.pos += 1;
        }
        Err(self.err("unterminated quoted string"))
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and_expr()?;
        loop {
            self.skip_ws();
            if self.try_consume_str("||") {
                self.skip_ws();
                let rhs = self.parse_and_expr()?;
                lhs = Expr::BinOp(BinOp::Or, Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_cmp_expr()?;
        loop {
            self.skip_ws();
            if self.try_consume_str("&&") {
                self.skip_ws();
                let rhs = self.parse_cmp_expr()?;
                lhs = Expr::BinOp(BinOp::And, Box::new(lhs), Box::new(rhs));
            } else {
                break;
            }
        }
        Ok(lhs)
    }

    fn parse_cmp_expr(&mut self) -> Result<Expr> {
        let lhs = self.parse_add_expr()?;
        self.skip_ws();
        let op = if self.try_consume_str("==") {
            Some(BinOp::Eq)
        } else if self.try_consume_str("!=") {
            Some(BinOp::Neq)
        } else if self.try_consume_str("<=") {
            Some(BinOp::Lte)
        } else if self.try_consume_str(">=") {
            Some(BinOp::Gte)
        } else if self.peek() == Some(b'<') {
            self.pos += 1;
            Some(BinOp::Lt)
        } else if self.peek() == Some(b'>') {
            self.pos += 1;
            Some(BinOp::Gt)
        } else {
            None
        };
        match op {
            Some(op) => {
                self.skip_ws();
                let rhs = self.parse_add_expr()?;
                Ok(Expr::BinOp(op, Box::new(lhs), Box::new(rhs)))
            }
            None => Ok(lhs),
        }
    }

    fn parse_add_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_mul_expr()?;
        loop {
            self.skip_ws();
            let op = if self.peek() == Some(b'+') {
                Some(BinOp::Add)
            } else if self.peek() == Some(b'-') {
                Some(BinOp::Sub)
            } else {
                None
            };
            match op {
                Some(op) => {
                    self.pos += 1;
                    self.skip_ws();
                    let rhs = self.parse_mul_expr()?;
                    lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
                }
                None => break,
            }
        }
        Ok(lhs)
    }

    fn parse_mul_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            self.skip_ws();
            let op = if self.peek() == Some(b'*') {
                Some(BinOp::Mul)
            } else if self.peek() == Some(b'/') {
                Some(BinOp::Div)
            } else {
                None
            };
            match op {
                Some(op) => {
                    self.pos += 1;
                    self.skip_ws();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::BinOp(op, Box::new(lhs), Box::new(rhs));
                }
                None => break,
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.skip_ws();
        match self.peek() {
            Some(b'!') => {
                self.pos += 1;
                self.skip_ws();
                Ok(Expr::UnOp(UnOp::Not, Box::new(self.parse_unary()?)))
            }
            Some(b'-') => {
                self.pos += 1;
                self.skip_ws();
                Ok(Expr::UnOp(UnOp::Neg, Box::new(self.parse_unary()?)))
            }
            Some(b'+') => {
                self.pos += 1;
                self.skip_ws();
                Ok(Expr::UnOp(UnOp::Pos, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        self.skip_ws();
        match self.peek() {
            Some(b'(') => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.skip_ws();
                self.expect_byte(b')')?;
                Ok(inner)
            }
            Some(b'@') => {
                self.pos += 1;
                self.parse_field_chain(Expr::Current)
            }
            Some(b'$') => {
                self.pos += 1;
                self.parse_field_chain(Expr::Root)
            }
            Some(b'"') | Some(b'\'') => self.parse_quoted_string().map(Expr::Str),
            Some(c) if c.is_ascii_digit() || c == b'-' => self.parse_int().map(Expr::Int),
            _ if self.try_consume_str("true") => Ok(Expr::Bool(true)),
            _ if self.try_consume_str("false") => Ok(Expr::Bool(false)),
            _ => Err(self.err("expected a value expression")),
        }
    }

    fn parse_field_chain(&mut self, mut base: Expr) -> Result<Expr> {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(b'.'), Some(c)) if c.is_ascii_alphabetic() || c == b'_' => {
                    self.pos += 1;
                    let name = self.parse_name()?;
                    base = Expr::Field(Box::new(base), name);
                }
                (Some(b'['), Some(b'"')) | (Some(b'['), Some(b'\'')) => {
                    self.pos += 1;
                    let name = self.parse_quoted_string()?;
                    self.skip_ws();
                    self.expect_byte(b']')?;
                    base = Expr::Field(Box::new(base), name);
                }
                (Some(b'['), Some(b'*')) => {
                    self.pos += 2;
                    self.skip_ws();
                    self.expect_byte(b']')?;
                    base = Expr::FieldWildcard(Box::new(base));
                }
                (Some(b'['), Some(c)) if c.is_ascii_digit() || c == b'-' => {
                    self.pos += 1;
                    let index = self.parse_int()?;
                    self.skip_ws();
                    self.expect_byte(b']')?;
                    base = Expr::Field(Box::new(base), index.to_string());
                }
                _ => break,
            }
        }
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_child_chain() {
        let path = parse_path("$.a.b").unwrap();
        assert_eq!(
            path,
            Path(vec![
                Segment::Child("a".into()),
                Segment::Child("b".into())
            ])
        );
    }

    #[test]
    fn parses_wildcard_and_bracket_union() {
        let path = parse_path("$.arr[0, \"a\"]").unwrap();
        assert_eq!(
            path,
            Path(vec![
                Segment::Child("arr".into()),
                Segment::Union(vec![UnionKey::Index(0), UnionKey::Name("a".into())]),
            ])
        );
    }

    #[test]
    fn parses_filter_expression() {
        let path = parse_path("$.arr[?((@.value < 2014) && (@.value > 2012))].value").unwrap();
        match &path.0[1] {
            Segment::Filter(Expr::BinOp(BinOp::And, lhs, rhs)) => {
                assert!(matches!(**lhs, Expr::BinOp(BinOp::Lt, _, _)));
                assert!(matches!(**rhs, Expr::BinOp(BinOp::Gt, _, _)));
            }
            other => panic!("unexpected segment: {other:?}"),
        }
        assert_eq!(path.0[2], Segment::Child("value".into()));
    }

    #[test]
    fn parses_slice() {
        let path = parse_path("$.arr[1:3:2]").unwrap();
        assert_eq!(
            path.0[1],
            Segment::Slice {
                start: Some(1),
                end: Some(3),
                step: Some(2)
            }
        );
    }

    #[test]
    fn rejects_missing_dollar() {
        assert!(parse_path(".a").is_err());
    }

    #[test]
    fn parses_nested_index_inside_filter() {
        let path = parse_path("$.arr[?(@.nested[0] == 1)]").unwrap();
        match &path.0[1] {
            Segment::Filter(Expr::BinOp(BinOp::Eq, lhs, _)) => {
                assert_eq!(
                    **lhs,
                    Expr::Field(
                        Box::new(Expr::Field(Box::new(Expr::Current), "nested".into())),
                        "0".into()
                    )
                );
            }
            other => panic!("unexpected segment: {other:?}"),
        }
    }

    #[test]
    fn parses_wildcard_inside_filter() {
        let path = parse_path("$.arr[?(@.nested[*])]").unwrap();
        match &path.0[1] {
            Segment::Filter(Expr::FieldWildcard(inner)) => {
                assert_eq!(**inner, Expr::Field(Box::new(Expr::Current), "nested".into()));
            }
            other => panic!("unexpected segment: {other:?}"),
        }
    }

    #[test]
    fn tolerates_missing_trailing_bracket() {
        let path = parse_path("$.arr[0, 1").unwrap();
        assert_eq!(
            path.0[1],
            Segment::Union(vec![UnionKey::Index(0), UnionKey::Index(1)])
        );
    }
}
