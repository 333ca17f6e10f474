//! Expression evaluation module
//!
//! Provides parsing and evaluation of Java expressions for debugging.

pub mod ast;
pub mod coerce;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod method;
pub mod parser;
pub mod resolve;
pub mod value;

pub use ast::Expr;
pub use error::{ErrorKind, EvalError};
pub use eval::Evaluator;
pub use parser::{parse_expr, parse_expr_with_depth};
pub use resolve::find_classes;
pub use value::{ArrayRef, Kind, ObjectRef, Value};
