//! JSON-RPC Protocol definitions
//!
//! Defines the line-delimited protocol between a debugger front end and
//! jexpr-server.

use serde::{Deserialize, Serialize};

use crate::expr::error::{ErrorKind, EvalError};
use crate::expr::{Expr, Value};
use crate::frame::SnapshotFrame;

/// Request from the front end to jexpr-server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum Request {
    /// Replace the current frame
    #[serde(rename = "attach")]
    Attach { frame: SnapshotFrame },

    /// Evaluate an expression against the attached frame
    #[serde(rename = "eval")]
    Eval { expr: String },

    /// Parse an expression without evaluating it
    #[serde(rename = "parse")]
    Parse { expr: String },

    /// List loaded types matching a pattern
    #[serde(rename = "find_classes")]
    FindClasses { pattern: String },

    /// Shutdown the server
    #[serde(rename = "shutdown")]
    Shutdown,
}

/// Response from jexpr-server to the front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    EvalResult {
        value: Value,
        value_type: String,
        display: String,
    },
    Parsed {
        ast: Option<Expr>,
        text: Option<String>,
    },
    Classes {
        classes: Vec<String>,
    },
    Success {
        ok: bool,
    },
    Error {
        error: String,
        kind: Option<ErrorKind>,
    },
}

impl Response {
    pub fn success() -> Self {
        Response::Success { ok: true }
    }

    /// Failure outside expression evaluation, such as a malformed request.
    pub fn error(msg: impl Into<String>) -> Self {
        Response::Error {
            error: msg.into(),
            kind: None,
        }
    }

    pub fn eval_error(err: &EvalError) -> Self {
        Response::Error {
            error: err.to_string(),
            kind: Some(err.kind()),
        }
    }

    pub fn eval_result(value: Value) -> Self {
        Response::EvalResult {
            value_type: value.type_name(),
            display: value.to_string(),
            value,
        }
    }

    pub fn parsed(ast: Option<Expr>) -> Self {
        Response::Parsed {
            text: ast.as_ref().map(|e| e.to_string()),
            ast,
        }
    }

    pub fn classes(classes: Vec<String>) -> Self {
        Response::Classes { classes }
    }
}

/// JSON-RPC message wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcMessage<T> {
    pub jsonrpc: String,
    pub id: Option<u64>,
    #[serde(flatten)]
    pub content: T,
}

impl<T> RpcMessage<T> {
    pub fn new(id: u64, content: T) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            content,
        }
    }
}
