//! Frame context: the evaluator's only window into the debuggee
//!
//! A `FrameContext` is supplied by the host for one suspended stack frame.
//! It answers name lookups, reads and writes remote state, and performs
//! method invocations on the target's thread. The evaluator never caches
//! anything it learns from a frame.

pub mod invoke;
pub mod snapshot;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::value::{ArrayRef, ObjectRef, Value};

pub use invoke::call_with_timeout;
pub use snapshot::SnapshotFrame;

/// Failures reported by the frame context itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvocationError {
    #[error("Exception in debuggee: {type_name}: {message}")]
    TargetException { type_name: String, message: String },

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Debuggee disconnected")]
    Disconnected,

    #[error("Invocation timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// A visible local variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub value: Value,
    /// Declared type name, e.g. `int` or `java.lang.String`
    pub declared_type: String,
}

/// Declaration of a field, as reported for one owning type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub declaring_type: String,
    pub declared_type: String,
    pub is_static: bool,
    pub is_final: bool,
}

/// Where a field lives: on a class (static) or on an instance.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOwner {
    Static(String),
    Instance(ObjectRef),
}

/// Opaque handle for invoking a method through the frame context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodHandle(pub u64);

/// A method visible on some type, as a candidate for overload resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCandidate {
    pub name: String,
    pub declaring_type: String,
    pub params: Vec<String>,
    pub return_type: String,
    pub is_static: bool,
    pub is_constructor: bool,
    pub handle: MethodHandle,
}

impl MethodCandidate {
    /// `name(type, type)` rendering for diagnostics.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.params.join(", "))
    }
}

/// Capabilities of one suspended frame in the debuggee.
///
/// Type names are fully qualified Java names (`java.lang.String`,
/// `int[]`). Implementations decide their own invocation policy, such as
/// which other threads resume while a method runs.
pub trait FrameContext {
    /// Declaring type of the frame's method.
    fn current_type(&self) -> Option<String>;

    /// The `this` object, absent in static frames.
    fn this_object(&self) -> Option<ObjectRef>;

    fn lookup_local(&self, name: &str) -> Option<Variable>;

    /// Field declared directly on `owner_type` (supertypes are not searched).
    fn field(&self, owner_type: &str, name: &str) -> Option<FieldInfo>;

    fn lookup_static_field(&self, owner_type: &str, name: &str) -> Option<Value>;

    fn read_field(&self, object: &ObjectRef, name: &str) -> Result<Value, InvocationError>;

    fn array_length(&self, array: &ArrayRef) -> Result<usize, InvocationError>;

    fn read_array_element(&self, array: &ArrayRef, index: usize) -> Result<Value, InvocationError>;

    /// Loaded type with exactly this fully qualified name.
    fn find_type(&self, name: &str) -> Option<String>;

    /// Every loaded type name.
    fn all_types(&self) -> Vec<String>;

    /// The type itself followed by all superclasses and interfaces.
    fn type_hierarchy(&self, type_name: &str) -> Vec<String>;

    /// Methods named `name` declared on or inherited by `owner_type`.
    /// Constructors are listed under the name `<init>`.
    fn candidates(&self, owner_type: &str, name: &str) -> Vec<MethodCandidate>;

    /// Invoke a method on the target's thread; may block. The receiver is
    /// absent for static methods and constructors.
    fn invoke(
        &mut self,
        candidate: &MethodCandidate,
        receiver: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, InvocationError>;

    fn write_local(&mut self, name: &str, value: Value) -> Result<(), InvocationError>;

    fn write_field(
        &mut self,
        owner: &FieldOwner,
        name: &str,
        value: Value,
    ) -> Result<(), InvocationError>;

    fn write_array_element(
        &mut self,
        array: &ArrayRef,
        index: usize,
        value: Value,
    ) -> Result<(), InvocationError>;

    /// Primitive held by a wrapper object (`java.lang.Integer` and friends).
    fn unbox(&self, _object: &ObjectRef) -> Option<Value> {
        None
    }

    /// Remote identity comparison.
    fn same_object(&self, a: &ObjectRef, b: &ObjectRef) -> bool {
        a.id == b.id
    }
}
