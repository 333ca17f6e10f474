//! Expression error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::frame::InvocationError;

/// Sub-kind tag shared by every evaluation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Syntax,
    UnknownIdentifier,
    NoSuchMethod,
    AmbiguousMethod,
    TypeMismatch,
    Arithmetic,
    InvalidCast,
    ImmutableTarget,
    IndexOutOfRange,
    Invocation,
}

#[derive(Error, Debug, Clone)]
pub enum EvalError {
    // Parse errors
    #[error("Syntax error: {message}{}", .position.map(|p| format!(" at offset {}", p)).unwrap_or_default())]
    Syntax {
        message: String,
        position: Option<usize>,
    },

    // Resolution errors
    #[error("Unknown identifier: '{name}'")]
    UnknownIdentifier { name: String },

    #[error("No method '{name}' applicable to arguments ({arguments})")]
    NoSuchMethod { name: String, arguments: String },

    #[error("Ambiguous call to '{name}' with arguments ({arguments})")]
    AmbiguousMethod { name: String, arguments: String },

    // Type errors
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Cannot apply operator '{op}' to types {left} and {right}")]
    InvalidOperation {
        op: String,
        left: String,
        right: String,
    },

    #[error("Cannot cast {found} to {target}")]
    InvalidCast { target: String, found: String },

    // Runtime errors
    #[error("Division by zero")]
    DivisionByZero,

    #[error("Cannot assign to '{name}'")]
    ImmutableTarget { name: String },

    #[error("Index out of bounds: index {index}, length {length}")]
    IndexOutOfBounds { index: i64, length: usize },

    #[error("Malformed index: {message}")]
    MalformedIndex { message: String },

    #[error(transparent)]
    Invocation(#[from] InvocationError),
}

impl EvalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Syntax { .. } => ErrorKind::Syntax,
            EvalError::UnknownIdentifier { .. } => ErrorKind::UnknownIdentifier,
            EvalError::NoSuchMethod { .. } => ErrorKind::NoSuchMethod,
            EvalError::AmbiguousMethod { .. } => ErrorKind::AmbiguousMethod,
            EvalError::TypeMismatch { .. } | EvalError::InvalidOperation { .. } => {
                ErrorKind::TypeMismatch
            }
            EvalError::InvalidCast { .. } => ErrorKind::InvalidCast,
            EvalError::DivisionByZero => ErrorKind::Arithmetic,
            EvalError::ImmutableTarget { .. } => ErrorKind::ImmutableTarget,
            EvalError::IndexOutOfBounds { .. } | EvalError::MalformedIndex { .. } => {
                ErrorKind::IndexOutOfRange
            }
            EvalError::Invocation(_) => ErrorKind::Invocation,
        }
    }

    pub fn syntax(message: impl Into<String>, position: Option<usize>) -> Self {
        EvalError::Syntax {
            message: message.into(),
            position,
        }
    }

    pub fn unknown_ident(name: impl Into<String>) -> Self {
        EvalError::UnknownIdentifier { name: name.into() }
    }

    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn invalid_operation(
        op: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        EvalError::InvalidOperation {
            op: op.into(),
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn invalid_cast(target: impl Into<String>, found: impl Into<String>) -> Self {
        EvalError::InvalidCast {
            target: target.into(),
            found: found.into(),
        }
    }

    pub fn malformed_index(message: impl Into<String>) -> Self {
        EvalError::MalformedIndex {
            message: message.into(),
        }
    }
}
