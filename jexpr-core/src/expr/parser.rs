//! Recursive descent parser for Java expressions
//!
//! Converts expression strings to our AST. Precedence, lowest first:
//! assignment, `||`, `&&`, `|`, `^`, `&`, equality, relational and
//! `instanceof`, shifts, additive, multiplicative, unary and casts, postfix.

use std::ops::Range;

use super::ast::{BinOp, Expr, UnaryOp};
use super::error::EvalError;
use super::lexer::{decode_escapes, tokenize, Token};
use super::value::Value;

/// Nesting limit used by [`parse_expr`].
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Parse an expression string into our AST.
///
/// Returns `Ok(None)` for blank input and for the bare literal `null`.
pub fn parse_expr(input: &str) -> Result<Option<Expr>, EvalError> {
    parse_expr_with_depth(input, DEFAULT_MAX_DEPTH)
}

/// Like [`parse_expr`] with an explicit nesting limit.
pub fn parse_expr_with_depth(input: &str, max_depth: usize) -> Result<Option<Expr>, EvalError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() || (tokens.len() == 1 && tokens[0].0 == Token::Null) {
        return Ok(None);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
        source: input,
    };
    let expr = parser.parse_expression()?;
    if let Some((token, span)) = parser.tokens.get(parser.pos) {
        return Err(match token {
            Token::RBracket => EvalError::malformed_index("unexpected ']'"),
            Token::RParen => EvalError::syntax("unbalanced ')'", Some(span.start)),
            _ => EvalError::syntax(
                format!("unexpected '{}' after expression", &input[span.clone()]),
                Some(span.start),
            ),
        });
    }

    log::trace!("parsed {:?} as {}", input, expr);
    Ok(Some(expr))
}

/// Tokens that can begin the operand of a reference-type cast. `+` and `-`
/// are excluded so `(a) - b` stays a subtraction.
fn starts_cast_operand(token: &Token) -> bool {
    matches!(
        token,
        Token::Ident(_)
            | Token::This
            | Token::LParen
            | Token::Bang
            | Token::Tilde
            | Token::IntLit(_)
            | Token::FloatLit(_)
            | Token::CharLit(_)
            | Token::StrLit(_)
            | Token::True
            | Token::False
            | Token::Null
    )
}

struct Parser<'a> {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
    depth: usize,
    max_depth: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    /// Byte offset of the current token, or the end of input.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source.len())
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self) -> EvalError {
        match self.tokens.get(self.pos) {
            Some((Token::LBracket | Token::RBracket, _)) => {
                EvalError::malformed_index("malformed bracket syntax")
            }
            Some((_, span)) => EvalError::syntax(
                format!("unexpected '{}'", &self.source[span.clone()]),
                Some(span.start),
            ),
            None => EvalError::syntax("unexpected end of expression", Some(self.source.len())),
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, EvalError>) -> Result<T, EvalError> {
        if self.depth >= self.max_depth {
            return Err(EvalError::syntax(
                format!("expression nested deeper than {} levels", self.max_depth),
                Some(self.offset()),
            ));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn parse_expression(&mut self) -> Result<Expr, EvalError> {
        self.nested(Self::parse_assignment)
    }

    fn parse_assignment(&mut self) -> Result<Expr, EvalError> {
        let target = self.parse_or()?;
        if self.peek() != Some(&Token::Assign) {
            return Ok(target);
        }
        let at = self.offset();
        self.pos += 1;
        if !target.is_assignable() {
            return Err(EvalError::syntax(
                format!("cannot assign to '{}'", target),
                Some(at),
            ));
        }
        let value = self.parse_expression()?;
        Ok(Expr::Assign {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, EvalError>,
        ops: &[(Token, BinOp)],
    ) -> Result<Expr, EvalError> {
        let mut left = next(self)?;
        'outer: loop {
            for (token, op) in ops {
                if self.eat(token) {
                    let right = next(self)?;
                    left = Expr::Binary {
                        left: Box::new(left),
                        op: *op,
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Self::parse_and, &[(Token::OrOr, BinOp::Or)])
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Self::parse_bit_or, &[(Token::AndAnd, BinOp::And)])
    }

    fn parse_bit_or(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Self::parse_bit_xor, &[(Token::Pipe, BinOp::BitOr)])
    }

    fn parse_bit_xor(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Self::parse_bit_and, &[(Token::Caret, BinOp::BitXor)])
    }

    fn parse_bit_and(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(Self::parse_equality, &[(Token::Amp, BinOp::BitAnd)])
    }

    fn parse_equality(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            Self::parse_relational,
            &[(Token::EqEq, BinOp::Eq), (Token::NotEq, BinOp::Ne)],
        )
    }

    fn parse_relational(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.parse_shift()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::LtEq) => BinOp::Le,
                Some(Token::GtEq) => BinOp::Ge,
                Some(Token::InstanceOf) => {
                    self.pos += 1;
                    let ty = self.parse_type_name()?;
                    left = Expr::InstanceOf {
                        expr: Box::new(left),
                        ty,
                    };
                    continue;
                }
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.parse_shift()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
    }

    fn parse_shift(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            Self::parse_additive,
            &[
                (Token::Shl, BinOp::Shl),
                (Token::Shr, BinOp::Shr),
                (Token::UShr, BinOp::UShr),
            ],
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            Self::parse_multiplicative,
            &[(Token::Plus, BinOp::Add), (Token::Minus, BinOp::Sub)],
        )
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            Self::parse_unary,
            &[
                (Token::Star, BinOp::Mul),
                (Token::Slash, BinOp::Div),
                (Token::Percent, BinOp::Rem),
            ],
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        self.nested(Self::parse_unary_inner)
    }

    fn parse_unary_inner(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Some(Token::Minus) => {
                // The minimum int and long values only exist as negated literals.
                if let Some(Token::IntLit(text)) = self.peek_at(1) {
                    if let Some(value) = min_literal(text) {
                        self.pos += 2;
                        return self.parse_postfix(Expr::Literal(value));
                    }
                }
                UnaryOp::Neg
            }
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Tilde) => UnaryOp::BitNot,
            Some(Token::LParen) => {
                if let Some(cast) = self.try_cast()? {
                    return Ok(cast);
                }
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };
        self.pos += 1;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            expr: Box::new(operand),
        })
    }

    /// Count `[]` pairs following a type name.
    fn parse_dims(&mut self) -> String {
        let mut dims = String::new();
        while self.peek() == Some(&Token::LBracket) && self.peek_at(1) == Some(&Token::RBracket) {
            self.pos += 2;
            dims.push_str("[]");
        }
        dims
    }

    /// Dotted name starting at the current identifier.
    fn parse_dotted_name(&mut self) -> Option<String> {
        let Some(Token::Ident(first)) = self.peek().cloned() else {
            return None;
        };
        self.pos += 1;
        let mut name = first;
        while self.peek() == Some(&Token::Dot) {
            let Some(Token::Ident(next)) = self.peek_at(1).cloned() else {
                break;
            };
            self.pos += 2;
            name.push('.');
            name.push_str(&next);
        }
        Some(name)
    }

    fn parse_type_name(&mut self) -> Result<String, EvalError> {
        if let Some(primitive) = self.peek().and_then(Token::primitive_type_name) {
            self.pos += 1;
            return Ok(format!("{}{}", primitive, self.parse_dims()));
        }
        match self.parse_dotted_name() {
            Some(name) => Ok(format!("{}{}", name, self.parse_dims())),
            None => Err(self.unexpected()),
        }
    }

    /// At `(`: parse a cast if the parenthesized tokens form one, otherwise
    /// leave the position untouched.
    fn try_cast(&mut self) -> Result<Option<Expr>, EvalError> {
        let start = self.pos;
        self.pos += 1;

        if let Some(primitive) = self.peek().and_then(Token::primitive_type_name) {
            self.pos += 1;
            let ty = format!("{}{}", primitive, self.parse_dims());
            if !self.eat(&Token::RParen) {
                return Err(EvalError::syntax(
                    format!("expected ')' after cast to {}", ty),
                    Some(self.offset()),
                ));
            }
            let operand = self.parse_unary()?;
            return Ok(Some(Expr::Cast {
                ty,
                expr: Box::new(operand),
            }));
        }

        if let Some(name) = self.parse_dotted_name() {
            let ty = format!("{}{}", name, self.parse_dims());
            let operand_follows = self.peek() == Some(&Token::RParen)
                && self
                    .peek_at(1)
                    .map_or(false, starts_cast_operand);
            if operand_follows {
                self.pos += 1;
                let operand = self.parse_unary()?;
                return Ok(Some(Expr::Cast {
                    ty,
                    expr: Box::new(operand),
                }));
            }
        }

        self.pos = start;
        Ok(None)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let Some((token, span)) = self.tokens.get(self.pos).cloned() else {
            return Err(self.unexpected());
        };
        let expr = match token {
            Token::IntLit(text) => {
                self.pos += 1;
                Expr::Literal(int_literal(&text, span.start)?)
            }
            Token::FloatLit(text) => {
                self.pos += 1;
                Expr::Literal(float_literal(&text, span.start)?)
            }
            Token::CharLit(body) => {
                self.pos += 1;
                let units = decode_escapes(&body).map_err(|e| EvalError::syntax(e, Some(span.start)))?;
                match units.as_slice() {
                    [unit] => Expr::Literal(Value::Char(*unit)),
                    _ => {
                        return Err(EvalError::syntax(
                            format!("invalid character literal '{}'", body),
                            Some(span.start),
                        ))
                    }
                }
            }
            Token::StrLit(body) => {
                self.pos += 1;
                let units = decode_escapes(&body).map_err(|e| EvalError::syntax(e, Some(span.start)))?;
                Expr::Literal(Value::Str(String::from_utf16_lossy(&units)))
            }
            Token::True => {
                self.pos += 1;
                Expr::Literal(Value::Boolean(true))
            }
            Token::False => {
                self.pos += 1;
                Expr::Literal(Value::Boolean(false))
            }
            Token::Null => {
                self.pos += 1;
                Expr::Literal(Value::Null)
            }
            Token::This => {
                self.pos += 1;
                Expr::Identifier("this".to_string())
            }
            Token::Ident(name) => {
                self.pos += 1;
                if self.peek() == Some(&Token::LParen) {
                    let args = self.parse_arguments()?;
                    return Ok(Expr::MethodCall {
                        target: None,
                        name,
                        args,
                    });
                }
                let mut segments = vec![name];
                // Stop before a segment that is called as a method.
                while self.peek() == Some(&Token::Dot) && self.peek_at(2) != Some(&Token::LParen) {
                    let Some(Token::Ident(next)) = self.peek_at(1).cloned() else {
                        break;
                    };
                    self.pos += 2;
                    segments.push(next);
                }
                if segments.len() == 1 {
                    Expr::Identifier(segments.remove(0))
                } else {
                    Expr::QualifiedName(segments)
                }
            }
            Token::LParen => {
                self.pos += 1;
                if self.peek() == Some(&Token::RParen) {
                    return Err(EvalError::syntax("empty parentheses", Some(span.start)));
                }
                let inner = self.parse_expression()?;
                if !self.eat(&Token::RParen) {
                    return Err(match self.peek() {
                        Some(Token::RBracket) => EvalError::malformed_index("unexpected ']'"),
                        _ => EvalError::syntax("unbalanced '('", Some(span.start)),
                    });
                }
                Expr::Grouping(Box::new(inner))
            }
            _ => return Err(self.unexpected()),
        };
        Ok(expr)
    }

    fn parse_postfix(&mut self, mut expr: Expr) -> Result<Expr, EvalError> {
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let Some(Token::Ident(member)) = self.advance() else {
                        return Err(EvalError::syntax(
                            "expected member name after '.'",
                            Some(self.offset()),
                        ));
                    };
                    expr = if self.peek() == Some(&Token::LParen) {
                        let args = self.parse_arguments()?;
                        Expr::MethodCall {
                            target: Some(Box::new(expr)),
                            name: member,
                            args,
                        }
                    } else {
                        Expr::FieldAccess {
                            target: Box::new(expr),
                            member,
                        }
                    };
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    if self.peek() == Some(&Token::RBracket) {
                        return Err(EvalError::malformed_index("empty brackets"));
                    }
                    let index = self.parse_expression()?;
                    if !self.eat(&Token::RBracket) {
                        return Err(EvalError::malformed_index("missing ']'"));
                    }
                    expr = Expr::ArrayAccess {
                        target: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    /// Parenthesized argument list; the current token is `(`.
    fn parse_arguments(&mut self) -> Result<Vec<Expr>, EvalError> {
        let open = self.offset();
        self.pos += 1;
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                Some(Token::RBracket) => return Err(EvalError::malformed_index("unexpected ']'")),
                Some(_) => {
                    self.pos -= 1;
                    return Err(EvalError::syntax(
                        "expected ',' or ')' in argument list",
                        Some(self.offset()),
                    ));
                }
                None => return Err(EvalError::syntax("unbalanced '('", Some(open))),
            }
        }
    }
}

/// `2147483648` or `9223372036854775808L` directly after a minus sign.
fn min_literal(text: &str) -> Option<Value> {
    match text {
        "2147483648" => Some(Value::Int(i32::MIN)),
        "9223372036854775808L" | "9223372036854775808l" => Some(Value::Long(i64::MIN)),
        _ => None,
    }
}

fn int_literal(text: &str, position: usize) -> Result<Value, EvalError> {
    let out_of_range = || {
        EvalError::syntax(
            format!("integer literal '{}' out of range", text),
            Some(position),
        )
    };
    let (digits, long) = match text.strip_suffix(|c: char| c == 'l' || c == 'L') {
        Some(digits) => (digits, true),
        None => (text, false),
    };
    let (radix, digits) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    let magnitude = u64::from_str_radix(digits, radix).map_err(|e| {
        EvalError::syntax(
            format!("invalid integer literal '{}': {}", text, e),
            Some(position),
        )
    })?;

    if radix == 10 {
        if !long && magnitude <= i32::MAX as u64 {
            return Ok(Value::Int(magnitude as i32));
        }
        if magnitude <= i64::MAX as u64 {
            return Ok(Value::Long(magnitude as i64));
        }
        return Err(out_of_range());
    }

    // Hex and octal literals denote the two's complement bit pattern.
    if !long && magnitude <= u32::MAX as u64 {
        Ok(Value::Int(magnitude as u32 as i32))
    } else {
        Ok(Value::Long(magnitude as i64))
    }
}

fn float_literal(text: &str, position: usize) -> Result<Value, EvalError> {
    let invalid = |_| {
        EvalError::syntax(
            format!("invalid floating literal '{}'", text),
            Some(position),
        )
    };
    if let Some(body) = text.strip_suffix(|c: char| c == 'f' || c == 'F') {
        return body.parse::<f32>().map(Value::Float).map_err(invalid);
    }
    let body = text.strip_suffix(|c: char| c == 'd' || c == 'D').unwrap_or(text);
    body.parse::<f64>().map(Value::Double).map_err(invalid)
}
