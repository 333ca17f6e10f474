//! AST definitions for supported expressions

use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::Value;

/// Supported expression AST
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal: 42, 1.5f, 'c', "hello", true
    Literal(Value),

    /// Bare name: x, this
    Identifier(String),

    /// Dotted name: java.lang.Integer.MAX_VALUE, point.x
    QualifiedName(Vec<String>),

    /// Unary operation: -a, !b, ~c
    Unary { op: UnaryOp, expr: Box<Expr> },

    /// Binary operation: a + b
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },

    /// Assignment: a = b
    Assign { target: Box<Expr>, value: Box<Expr> },

    /// Type cast: (int) a
    Cast { ty: String, expr: Box<Expr> },

    /// Type test: a instanceof String
    InstanceOf { expr: Box<Expr>, ty: String },

    /// Member of a non-name expression: foo().bar
    FieldAccess { target: Box<Expr>, member: String },

    /// Indexing: a[0]
    ArrayAccess { target: Box<Expr>, index: Box<Expr> },

    /// Call: foo(1), a.b(), Type.m()
    MethodCall {
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },

    /// Parenthesized: (a + b)
    Grouping(Box<Expr>),
}

impl Expr {
    /// True for expressions that can name a storage location.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expr::Identifier(_)
                | Expr::QualifiedName(_)
                | Expr::FieldAccess { .. }
                | Expr::ArrayAccess { .. }
        )
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Rem, // %

    // Comparison
    Eq, // ==
    Ne, // !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=

    // Logical
    And, // &&
    Or,  // ||

    // Bitwise
    BitAnd, // &
    BitOr,  // |
    BitXor, // ^
    Shl,    // <<
    Shr,    // >>
    UShr,   // >>>
}

impl BinOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::UShr => ">>>",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,    // -
    Plus,   // +
    Not,    // !
    BitNot, // ~
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

fn escape_units(units: impl Iterator<Item = u16>, quote: char) -> String {
    let mut out = String::new();
    for c in char::decode_utf16(units) {
        match c {
            Ok('\n') => out.push_str("\\n"),
            Ok('\t') => out.push_str("\\t"),
            Ok('\r') => out.push_str("\\r"),
            Ok('\\') => out.push_str("\\\\"),
            Ok(c) if c == quote => {
                out.push('\\');
                out.push(c);
            }
            Ok(c) if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            Ok(c) => out.push(c),
            Err(e) => out.push_str(&format!("\\u{:04x}", e.unpaired_surrogate())),
        }
    }
    out
}

fn fmt_literal(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Str(s) => write!(f, "\"{}\"", escape_units(s.encode_utf16(), '"')),
        Value::Char(c) => write!(f, "'{}'", escape_units(std::iter::once(*c), '\'')),
        Value::Long(v) => write!(f, "{}L", v),
        Value::Float(_) => write!(f, "{}f", value),
        other => write!(f, "{}", other),
    }
}

impl fmt::Display for Expr {
    /// Source form of the expression, fully parenthesized where the tree
    /// has explicit groupings.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => fmt_literal(value, f),
            Expr::Identifier(name) => write!(f, "{}", name),
            Expr::QualifiedName(segments) => write!(f, "{}", segments.join(".")),
            Expr::Unary { op, expr } => write!(f, "{}{}", op.as_str(), expr),
            Expr::Binary { left, op, right } => write!(f, "{} {} {}", left, op.as_str(), right),
            Expr::Assign { target, value } => write!(f, "{} = {}", target, value),
            Expr::Cast { ty, expr } => write!(f, "({}) {}", ty, expr),
            Expr::InstanceOf { expr, ty } => write!(f, "{} instanceof {}", expr, ty),
            Expr::FieldAccess { target, member } => write!(f, "{}.{}", target, member),
            Expr::ArrayAccess { target, index } => write!(f, "{}[{}]", target, index),
            Expr::MethodCall { target, name, args } => {
                if let Some(target) = target {
                    write!(f, "{}.", target)?;
                }
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expr::Grouping(inner) => write!(f, "({})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_source_form() {
        let expr = Expr::MethodCall {
            target: Some(Box::new(Expr::QualifiedName(vec![
                "java".to_string(),
                "lang".to_string(),
                "String".to_string(),
            ]))),
            name: "valueOf".to_string(),
            args: vec![Expr::Cast {
                ty: "int".to_string(),
                expr: Box::new(Expr::Literal(Value::Long(5))),
            }],
        };
        assert_eq!(expr.to_string(), "java.lang.String.valueOf((int) 5L)");
    }

    #[test]
    fn test_display_escapes_literals() {
        assert_eq!(
            Expr::Literal(Value::Str("a\"b\n".to_string())).to_string(),
            r#""a\"b\n""#
        );
        assert_eq!(Expr::Literal(Value::Char('\'' as u16)).to_string(), r"'\''");
        assert_eq!(Expr::Literal(Value::Float(1.5)).to_string(), "1.5f");
    }

    #[test]
    fn test_assignable_targets() {
        assert!(Expr::Identifier("x".to_string()).is_assignable());
        assert!(!Expr::Literal(Value::Int(1)).is_assignable());
        assert!(!Expr::Grouping(Box::new(Expr::Identifier("x".to_string()))).is_assignable());
    }
}
