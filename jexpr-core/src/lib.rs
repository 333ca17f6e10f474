//! jexpr Core Library
//!
//! Java expression evaluation for debuggers:
//! - Lexing and parsing of Java expressions
//! - Java typing rules: promotion, boxing, casts, overload resolution
//! - Evaluation against a suspended frame through the `FrameContext` trait
//! - JSON-RPC protocol types for jexpr-server

pub mod config;
pub mod expr;
pub mod frame;
pub mod protocol;

pub use config::EvalConfig;
pub use expr::{find_classes, parse_expr, ErrorKind, EvalError, Evaluator, Expr, Value};
pub use frame::{FrameContext, InvocationError, SnapshotFrame};
pub use protocol::{Request, Response};
