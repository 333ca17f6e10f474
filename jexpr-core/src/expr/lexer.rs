//! Tokenizer for Java expressions using logos.
//!
//! Literal tokens keep their source text; typing and range checks happen in
//! the parser, which knows about the leading minus of `-2147483648`.

use std::ops::Range;

use logos::Logos;

use super::error::EvalError;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // === Keywords ===
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,
    #[token("this")]
    This,
    #[token("instanceof")]
    InstanceOf,

    // === Primitive type names ===
    #[token("boolean")]
    BooleanKw,
    #[token("byte")]
    ByteKw,
    #[token("char")]
    CharKw,
    #[token("short")]
    ShortKw,
    #[token("int")]
    IntKw,
    #[token("long")]
    LongKw,
    #[token("float")]
    FloatKw,
    #[token("double")]
    DoubleKw,
    #[token("void")]
    VoidKw,

    // === Literals ===
    #[regex(r"0[xX][0-9a-fA-F]+[lL]?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9]+[lL]?", |lex| lex.slice().to_string())]
    IntLit(String),

    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fFdD]?", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[fFdD]?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[fFdD]?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9]+[fFdD]", |lex| lex.slice().to_string())]
    FloatLit(String),

    // Body between the quotes, escapes still encoded
    #[regex(r"'([^'\\\n]|\\[0-7]{1,3}|\\u+[0-9a-fA-F]{4}|\\[^0-7u\n])'", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    CharLit(String),

    #[regex(r#""([^"\\\n]|\\[^\n])*""#, |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].to_string()
    })]
    StrLit(String),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),

    // === Delimiters ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,

    // === Operators ===
    #[token("=")]
    Assign,
    #[token("||")]
    OrOr,
    #[token("&&")]
    AndAnd,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("&")]
    Amp,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token(">>>")]
    UShr,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
}

impl Token {
    /// Java keyword for primitive type tokens, including `void`.
    pub fn primitive_type_name(&self) -> Option<&'static str> {
        match self {
            Token::BooleanKw => Some("boolean"),
            Token::ByteKw => Some("byte"),
            Token::CharKw => Some("char"),
            Token::ShortKw => Some("short"),
            Token::IntKw => Some("int"),
            Token::LongKw => Some("long"),
            Token::FloatKw => Some("float"),
            Token::DoubleKw => Some("double"),
            Token::VoidKw => Some("void"),
            _ => None,
        }
    }
}

/// Split `source` into tokens with their byte spans.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Range<usize>)>, EvalError> {
    let mut tokens = Vec::new();
    for (token, span) in Token::lexer(source).spanned() {
        match token {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                return Err(EvalError::syntax(
                    format!("unexpected character '{}'", &source[span.clone()]),
                    Some(span.start),
                ))
            }
        }
    }
    Ok(tokens)
}

/// Decode Java escape sequences into UTF-16 code units.
pub fn decode_escapes(body: &str) -> Result<Vec<u16>, String> {
    let mut units = Vec::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u16; 2];
            units.extend_from_slice(c.encode_utf16(&mut buf));
            continue;
        }
        let escaped = chars.next().ok_or("dangling '\\' in literal")?;
        let unit = match escaped {
            'b' => 0x08,
            't' => 0x09,
            'n' => 0x0a,
            'f' => 0x0c,
            'r' => 0x0d,
            '"' => 0x22,
            '\'' => 0x27,
            '\\' => 0x5c,
            'u' => {
                while chars.peek() == Some(&'u') {
                    chars.next();
                }
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 {
                    return Err(format!("invalid unicode escape '\\u{}'", hex));
                }
                u16::from_str_radix(&hex, 16)
                    .map_err(|_| format!("invalid unicode escape '\\u{}'", hex))?
            }
            '0'..='7' => {
                // Up to three octal digits, the first of which may only be 0-3
                // when three are present.
                let mut value = escaped.to_digit(8).unwrap_or(0);
                let max_digits = if escaped <= '3' { 3 } else { 2 };
                for _ in 1..max_digits {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                value as u16
            }
            other => return Err(format!("invalid escape sequence '\\{}'", other)),
        };
        units.push(unit);
    }
    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    #[test]
    fn test_operators_prefer_longest_match() {
        assert_eq!(
            kinds("a >>> 2 >> 1 >= b"),
            vec![
                Token::Ident("a".to_string()),
                Token::UShr,
                Token::IntLit("2".to_string()),
                Token::Shr,
                Token::IntLit("1".to_string()),
                Token::GtEq,
                Token::Ident("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds("0x1F 10L 1.5f .5 1e3 'a' \"hi\""),
            vec![
                Token::IntLit("0x1F".to_string()),
                Token::IntLit("10L".to_string()),
                Token::FloatLit("1.5f".to_string()),
                Token::FloatLit(".5".to_string()),
                Token::FloatLit("1e3".to_string()),
                Token::CharLit("a".to_string()),
                Token::StrLit("hi".to_string()),
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("this instanceof int integer $x"),
            vec![
                Token::This,
                Token::InstanceOf,
                Token::IntKw,
                Token::Ident("integer".to_string()),
                Token::Ident("$x".to_string()),
            ]
        );
    }

    #[test]
    fn test_member_access_is_not_a_float() {
        assert_eq!(
            kinds("arr[0].length"),
            vec![
                Token::Ident("arr".to_string()),
                Token::LBracket,
                Token::IntLit("0".to_string()),
                Token::RBracket,
                Token::Dot,
                Token::Ident("length".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_character_reports_position() {
        let err = tokenize("1 + #").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { position: Some(4), .. }));
    }

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_escapes(r"\n").unwrap(), vec![10]);
        assert_eq!(decode_escapes(r"\101").unwrap(), vec![65]);
        assert_eq!(decode_escapes(r"\0").unwrap(), vec![0]);
        assert_eq!(decode_escapes(r"Ab").unwrap(), vec![65, 98]);
        assert_eq!(decode_escapes(r"\'").unwrap(), vec![39]);
        assert!(decode_escapes(r"\q").is_err());
    }
}
