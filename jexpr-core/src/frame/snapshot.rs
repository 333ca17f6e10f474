//! In-memory frame context loaded from a recorded snapshot
//!
//! A snapshot describes one suspended frame: its locals, the loaded types
//! with their fields and methods, and the objects and arrays reachable from
//! them. Method calls are answered from scripted results recorded per
//! method, so a snapshot can stand in for a live debuggee.

use std::collections::{BTreeMap, HashSet};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{
    call_with_timeout, FieldInfo, FieldOwner, FrameContext, InvocationError, MethodCandidate,
    MethodHandle, Variable,
};
use crate::expr::value::{ArrayRef, Kind, ObjectRef, Value};

fn default_timeout_ms() -> u64 {
    5000
}

fn default_return_type() -> String {
    "void".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub declared_type: String,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(rename = "final", default)]
    pub is_final: bool,
    /// Current value of a static field
    #[serde(default)]
    pub value: Option<Value>,
}

/// One recorded answer for a method call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedCall {
    /// Receiver the answer applies to; any receiver when absent
    #[serde(default)]
    pub receiver: Option<Value>,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub returns: Option<Value>,
    /// Exception type thrown in the debuggee instead of returning
    #[serde(default)]
    pub throws: Option<String>,
    #[serde(default)]
    pub delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodSnapshot {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default = "default_return_type")]
    pub return_type: String,
    #[serde(rename = "static", default)]
    pub is_static: bool,
    #[serde(default)]
    pub calls: Vec<ScriptedCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSnapshot {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldSnapshot>,
    #[serde(default)]
    pub methods: Vec<MethodSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Primitive held by a wrapper object
    #[serde(default)]
    pub boxed: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArraySnapshot {
    pub element_type: String,
    #[serde(default)]
    pub values: Vec<Value>,
}

/// A method call the snapshot answered.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub declaring_type: String,
    pub signature: String,
    pub receiver: Option<Value>,
    pub args: Vec<Value>,
}

/// Frame context backed entirely by recorded state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFrame {
    #[serde(default)]
    pub current_type: Option<String>,
    #[serde(default)]
    pub this: Option<ObjectRef>,
    #[serde(default)]
    pub locals: BTreeMap<String, Variable>,
    #[serde(default)]
    pub types: Vec<TypeSnapshot>,
    /// Keyed by the decimal handle id
    #[serde(default)]
    pub objects: BTreeMap<String, ObjectSnapshot>,
    #[serde(default)]
    pub arrays: BTreeMap<String, ArraySnapshot>,
    #[serde(default = "default_timeout_ms")]
    pub invocation_timeout_ms: u64,
    #[serde(skip)]
    invocations: Vec<RecordedCall>,
}

impl SnapshotFrame {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_invocation_timeout(mut self, timeout: Duration) -> Self {
        self.invocation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Calls answered so far, oldest first.
    pub fn invocations(&self) -> &[RecordedCall] {
        &self.invocations
    }

    fn type_snapshot(&self, name: &str) -> Option<&TypeSnapshot> {
        self.types.iter().find(|t| t.name == name)
    }

    fn type_snapshot_mut(&mut self, name: &str) -> Option<&mut TypeSnapshot> {
        self.types.iter_mut().find(|t| t.name == name)
    }

    fn array(&self, array: &ArrayRef) -> Result<&ArraySnapshot, InvocationError> {
        self.arrays
            .get(&array.id.to_string())
            .ok_or_else(|| InvocationError::Other(format!("invalid array id {}", array.id)))
    }

    // Handles pack the type index into the high half and the method index
    // into the low half.
    fn method(&self, handle: MethodHandle) -> Option<(&TypeSnapshot, &MethodSnapshot)> {
        let type_index = (handle.0 >> 32) as usize;
        let method_index = (handle.0 & 0xffff_ffff) as usize;
        let ty = self.types.get(type_index)?;
        Some((ty, ty.methods.get(method_index)?))
    }

    fn candidate(&self, type_index: usize, method_index: usize) -> MethodCandidate {
        let ty = &self.types[type_index];
        let method = &ty.methods[method_index];
        let is_constructor = method.name == "<init>";
        MethodCandidate {
            name: method.name.clone(),
            declaring_type: ty.name.clone(),
            params: method.params.clone(),
            return_type: if is_constructor {
                ty.name.clone()
            } else {
                method.return_type.clone()
            },
            is_static: method.is_static,
            is_constructor,
            handle: MethodHandle(((type_index as u64) << 32) | method_index as u64),
        }
    }
}

impl FrameContext for SnapshotFrame {
    fn current_type(&self) -> Option<String> {
        self.current_type.clone()
    }

    fn this_object(&self) -> Option<ObjectRef> {
        self.this.clone()
    }

    fn lookup_local(&self, name: &str) -> Option<Variable> {
        self.locals.get(name).cloned()
    }

    fn field(&self, owner_type: &str, name: &str) -> Option<FieldInfo> {
        let ty = self.type_snapshot(owner_type)?;
        let field = ty.fields.iter().find(|f| f.name == name)?;
        Some(FieldInfo {
            name: field.name.clone(),
            declaring_type: ty.name.clone(),
            declared_type: field.declared_type.clone(),
            is_static: field.is_static,
            is_final: field.is_final,
        })
    }

    fn lookup_static_field(&self, owner_type: &str, name: &str) -> Option<Value> {
        self.type_snapshot(owner_type)?
            .fields
            .iter()
            .find(|f| f.name == name && f.is_static)
            .map(|f| f.value.clone().unwrap_or(Value::Null))
    }

    fn read_field(&self, object: &ObjectRef, name: &str) -> Result<Value, InvocationError> {
        let snapshot = self
            .objects
            .get(&object.id.to_string())
            .ok_or_else(|| InvocationError::Other(format!("invalid object id {}", object.id)))?;
        snapshot.fields.get(name).cloned().ok_or_else(|| {
            InvocationError::Other(format!("{} has no field '{}'", snapshot.type_name, name))
        })
    }

    fn array_length(&self, array: &ArrayRef) -> Result<usize, InvocationError> {
        Ok(self.array(array)?.values.len())
    }

    fn read_array_element(&self, array: &ArrayRef, index: usize) -> Result<Value, InvocationError> {
        self.array(array)?
            .values
            .get(index)
            .cloned()
            .ok_or_else(|| InvocationError::Other(format!("index {} out of bounds", index)))
    }

    fn find_type(&self, name: &str) -> Option<String> {
        self.type_snapshot(name).map(|t| t.name.clone())
    }

    fn all_types(&self) -> Vec<String> {
        self.types.iter().map(|t| t.name.clone()).collect()
    }

    fn type_hierarchy(&self, type_name: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut pending = vec![type_name.to_string()];
        let mut seen = HashSet::new();
        while let Some(name) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            if let Some(ty) = self.type_snapshot(&name) {
                // Interfaces are pushed first so the superclass chain is visited first.
                pending.extend(ty.interfaces.iter().rev().cloned());
                pending.extend(ty.superclass.iter().cloned());
            }
            result.push(name);
        }
        result
    }

    fn candidates(&self, owner_type: &str, name: &str) -> Vec<MethodCandidate> {
        let owners = if name == "<init>" {
            vec![owner_type.to_string()]
        } else {
            self.type_hierarchy(owner_type)
        };

        let mut found: Vec<MethodCandidate> = Vec::new();
        for owner in owners {
            let Some(type_index) = self.types.iter().position(|t| t.name == owner) else {
                continue;
            };
            for (method_index, method) in self.types[type_index].methods.iter().enumerate() {
                if method.name != name {
                    continue;
                }
                // A method overridden lower in the hierarchy hides this one.
                if found.iter().any(|c| c.params == method.params) {
                    continue;
                }
                found.push(self.candidate(type_index, method_index));
            }
        }
        found
    }

    fn invoke(
        &mut self,
        candidate: &MethodCandidate,
        receiver: Option<&Value>,
        args: &[Value],
    ) -> Result<Value, InvocationError> {
        let (_, method) = self.method(candidate.handle).ok_or_else(|| {
            InvocationError::Other(format!("stale method handle for {}", candidate.signature()))
        })?;
        let call = method
            .calls
            .iter()
            .find(|call| {
                call.args.as_slice() == args
                    && match (&call.receiver, receiver) {
                        (None, _) => true,
                        (Some(expected), Some(actual)) => expected == actual,
                        (Some(_), None) => false,
                    }
            })
            .cloned()
            .ok_or_else(|| {
                InvocationError::Unsupported(format!(
                    "no recorded result for {}.{}",
                    candidate.declaring_type,
                    candidate.signature()
                ))
            })?;

        self.invocations.push(RecordedCall {
            declaring_type: candidate.declaring_type.clone(),
            signature: candidate.signature(),
            receiver: receiver.cloned(),
            args: args.to_vec(),
        });

        let outcome = match call.throws {
            Some(type_name) => Err(InvocationError::TargetException {
                type_name,
                message: format!("thrown by {}", candidate.signature()),
            }),
            None => Ok(call.returns.unwrap_or(Value::Null)),
        };
        if call.delay_ms == 0 {
            return outcome;
        }

        let delay = Duration::from_millis(call.delay_ms);
        call_with_timeout(Duration::from_millis(self.invocation_timeout_ms), move || {
            thread::sleep(delay);
            outcome
        })
    }

    fn write_local(&mut self, name: &str, value: Value) -> Result<(), InvocationError> {
        let variable = self
            .locals
            .get_mut(name)
            .ok_or_else(|| InvocationError::Other(format!("no local variable '{}'", name)))?;
        variable.value = value;
        Ok(())
    }

    fn write_field(
        &mut self,
        owner: &FieldOwner,
        name: &str,
        value: Value,
    ) -> Result<(), InvocationError> {
        match owner {
            FieldOwner::Static(type_name) => {
                let field = self
                    .type_snapshot_mut(type_name)
                    .and_then(|t| t.fields.iter_mut().find(|f| f.name == name && f.is_static))
                    .ok_or_else(|| {
                        InvocationError::Other(format!("{} has no static field '{}'", type_name, name))
                    })?;
                field.value = Some(value);
            }
            FieldOwner::Instance(object) => {
                let snapshot = self.objects.get_mut(&object.id.to_string()).ok_or_else(|| {
                    InvocationError::Other(format!("invalid object id {}", object.id))
                })?;
                snapshot.fields.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    fn write_array_element(
        &mut self,
        array: &ArrayRef,
        index: usize,
        value: Value,
    ) -> Result<(), InvocationError> {
        let snapshot = self
            .arrays
            .get_mut(&array.id.to_string())
            .ok_or_else(|| InvocationError::Other(format!("invalid array id {}", array.id)))?;
        let slot = snapshot
            .values
            .get_mut(index)
            .ok_or_else(|| InvocationError::Other(format!("index {} out of bounds", index)))?;
        *slot = value;
        Ok(())
    }

    fn unbox(&self, object: &ObjectRef) -> Option<Value> {
        Kind::from_wrapper_name(&object.type_name)?;
        self.objects.get(&object.id.to_string())?.boxed.clone()
    }
}
