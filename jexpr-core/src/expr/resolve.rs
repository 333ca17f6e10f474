//! Identifier and member resolution
//!
//! Names resolve to a value (optionally with the location it was read
//! from), a type reference for static access, or a package fragment that
//! may still grow into a qualified type name.

use super::coerce::hierarchy;
use super::error::EvalError;
use super::value::{ArrayRef, Value};
use crate::frame::{FieldInfo, FieldOwner, FrameContext};

/// Storage a value was read from, used as an assignment target.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    Local { name: String, declared_type: String },
    Field { owner: FieldOwner, field: FieldInfo },
    ArrayElement { array: ArrayRef, index: usize },
}

impl Location {
    pub fn declared_type(&self) -> String {
        match self {
            Location::Local { declared_type, .. } => declared_type.clone(),
            Location::Field { field, .. } => field.declared_type.clone(),
            Location::ArrayElement { array, .. } => array.element_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Value {
        value: Value,
        location: Option<Location>,
    },
    /// Fully qualified type name
    Type(String),
    /// Dotted prefix that names neither a value nor a type
    Package(String),
}

impl Resolved {
    pub fn value(value: Value) -> Self {
        Resolved::Value {
            value,
            location: None,
        }
    }

    /// The plain value, rejecting types and package fragments.
    pub fn into_value(self) -> Result<Value, EvalError> {
        match self {
            Resolved::Value { value, .. } => Ok(value),
            Resolved::Type(name) => Err(EvalError::type_mismatch("a value", format!("type {}", name))),
            Resolved::Package(name) => Err(EvalError::unknown_ident(name)),
        }
    }
}

/// Field declaration visible on `type_name`, searching its supertypes.
pub fn find_field(ctx: &dyn FrameContext, type_name: &str, name: &str) -> Option<FieldInfo> {
    hierarchy(ctx, type_name)
        .iter()
        .find_map(|owner| ctx.field(owner, name))
}

fn type_named(ctx: &dyn FrameContext, name: &str) -> Option<String> {
    ctx.find_type(name)
        .or_else(|| ctx.find_type(&format!("java.lang.{}", name)))
}

fn static_field(ctx: &dyn FrameContext, field: FieldInfo) -> Result<Resolved, EvalError> {
    let value = ctx
        .lookup_static_field(&field.declaring_type, &field.name)
        .ok_or_else(|| EvalError::unknown_ident(format!("{}.{}", field.declaring_type, field.name)))?;
    Ok(Resolved::Value {
        value,
        location: Some(Location::Field {
            owner: FieldOwner::Static(field.declaring_type.clone()),
            field,
        }),
    })
}

/// Resolve a bare identifier in the frame's scope.
pub fn resolve_identifier(ctx: &dyn FrameContext, name: &str) -> Result<Resolved, EvalError> {
    if name == "this" {
        return ctx
            .this_object()
            .map(|this| Resolved::value(Value::Object(this)))
            .ok_or_else(|| EvalError::unknown_ident("this"));
    }

    if let Some(variable) = ctx.lookup_local(name) {
        log::debug!("'{}' resolved to a local of type {}", name, variable.declared_type);
        return Ok(Resolved::Value {
            value: variable.value,
            location: Some(Location::Local {
                name: name.to_string(),
                declared_type: variable.declared_type,
            }),
        });
    }

    if let Some(current) = ctx.current_type() {
        if let Some(field) = find_field(ctx, &current, name) {
            log::debug!("'{}' resolved to a field of {}", name, field.declaring_type);
            if field.is_static {
                return static_field(ctx, field);
            }
            let Some(this) = ctx.this_object() else {
                log::debug!("instance field '{}' referenced from a static frame", name);
                return Err(EvalError::unknown_ident(name));
            };
            let value = ctx.read_field(&this, name)?;
            return Ok(Resolved::Value {
                value,
                location: Some(Location::Field {
                    owner: FieldOwner::Instance(this),
                    field,
                }),
            });
        }
    }

    if let Some(type_name) = type_named(ctx, name) {
        return Ok(Resolved::Type(type_name));
    }
    Ok(Resolved::Package(name.to_string()))
}

/// Resolve a dotted name, preferring the longest prefix that names a type.
pub fn resolve_qualified(ctx: &dyn FrameContext, segments: &[String]) -> Result<Resolved, EvalError> {
    let Some(first) = segments.first() else {
        return Err(EvalError::syntax("empty name", None));
    };
    for end in (2..=segments.len()).rev() {
        let candidate = segments[..end].join(".");
        if let Some(type_name) = ctx.find_type(&candidate) {
            let mut resolved = Resolved::Type(type_name);
            for member in &segments[end..] {
                resolved = resolve_member(ctx, resolved, member)?;
            }
            return Ok(resolved);
        }
    }

    let mut resolved = resolve_identifier(ctx, first)?;
    for member in &segments[1..] {
        resolved = resolve_member(ctx, resolved, member)?;
    }
    Ok(resolved)
}

/// Resolve `base.member` where `base` has already been resolved.
pub fn resolve_member(ctx: &dyn FrameContext, base: Resolved, member: &str) -> Result<Resolved, EvalError> {
    match base {
        Resolved::Package(prefix) => {
            let name = format!("{}.{}", prefix, member);
            Ok(match ctx.find_type(&name) {
                Some(type_name) => Resolved::Type(type_name),
                None => Resolved::Package(name),
            })
        }
        Resolved::Type(type_name) => match find_field(ctx, &type_name, member) {
            Some(field) if field.is_static => static_field(ctx, field),
            _ => Err(EvalError::unknown_ident(format!("{}.{}", type_name, member))),
        },
        Resolved::Value { value, .. } => member_of_value(ctx, value, member),
    }
}

fn member_of_value(ctx: &dyn FrameContext, value: Value, member: &str) -> Result<Resolved, EvalError> {
    if value.is_null() {
        return Err(EvalError::type_mismatch("an object", "null"));
    }
    match value {
        Value::Array(array) => {
            if member != "length" {
                return Err(EvalError::unknown_ident(format!("{}.{}", array.type_name(), member)));
            }
            let length = ctx.array_length(&array)?;
            Ok(Resolved::value(Value::Int(length as i32)))
        }
        Value::Object(object) => {
            let field = find_field(ctx, &object.type_name, member)
                .ok_or_else(|| EvalError::unknown_ident(format!("{}.{}", object.type_name, member)))?;
            if field.is_static {
                return static_field(ctx, field);
            }
            let value = ctx.read_field(&object, member)?;
            Ok(Resolved::Value {
                value,
                location: Some(Location::Field {
                    owner: FieldOwner::Instance(object),
                    field,
                }),
            })
        }
        Value::Str(_) => Err(EvalError::unknown_ident(format!("java.lang.String.{}", member))),
        other => Err(EvalError::type_mismatch("an object", other.type_name())),
    }
}

/// Resolve `array[index]` with already evaluated operands.
pub fn resolve_element(ctx: &dyn FrameContext, array: Value, index: Value) -> Result<Resolved, EvalError> {
    let array = match array {
        Value::Array(array) if !array.is_null() => array,
        other => return Err(EvalError::type_mismatch("an array", other.type_name())),
    };
    let index = match index {
        Value::Byte(_) | Value::Short(_) | Value::Char(_) | Value::Int(_) => {
            index.to_i64().unwrap_or_default()
        }
        other => {
            return Err(EvalError::malformed_index(format!(
                "index must be an int, found {}",
                other.type_name()
            )))
        }
    };
    let length = ctx.array_length(&array)?;
    if index < 0 || index as usize >= length {
        return Err(EvalError::IndexOutOfBounds { index, length });
    }
    let index = index as usize;
    let value = ctx.read_array_element(&array, index)?;
    Ok(Resolved::Value {
        value,
        location: Some(Location::ArrayElement { array, index }),
    })
}

/// Loaded types matching `pattern`: an exact name, `*Suffix` or `prefix*`.
pub fn find_classes(ctx: &dyn FrameContext, pattern: &str) -> Result<Vec<String>, EvalError> {
    let pattern = pattern.trim();
    if !pattern.contains('*') {
        return Ok(ctx.find_type(pattern).into_iter().collect());
    }
    let mut found: Vec<String> = if let Some(suffix) = pattern.strip_prefix('*').filter(|s| !s.contains('*')) {
        ctx.all_types().into_iter().filter(|t| t.ends_with(suffix)).collect()
    } else if let Some(prefix) = pattern.strip_suffix('*').filter(|p| !p.contains('*')) {
        ctx.all_types().into_iter().filter(|t| t.starts_with(prefix)).collect()
    } else {
        return Err(EvalError::syntax(
            format!("wildcard only allowed at the start or end of '{}'", pattern),
            pattern.find('*'),
        ));
    };
    found.sort();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::error::ErrorKind;
    use crate::expr::value::ObjectRef;
    use crate::frame::SnapshotFrame;

    fn frame(this: bool) -> SnapshotFrame {
        let mut frame = SnapshotFrame::from_json(
            r#"{
                "current_type": "demo.Widget",
                "this": {"id": 1, "type_name": "demo.Widget"},
                "locals": {
                    "count": {"value": {"Int": 2}, "declared_type": "int"},
                    "items": {"value": {"Array": {"id": 5, "element_type": "int"}}, "declared_type": "int[]"}
                },
                "types": [
                    {"name": "demo.Base", "fields": [
                        {"name": "LIMIT", "type": "int", "static": true, "final": true, "value": {"Int": 10}}
                    ]},
                    {"name": "demo.Widget", "superclass": "demo.Base", "fields": [
                        {"name": "size", "type": "int"},
                        {"name": "next", "type": "demo.Widget"}
                    ]},
                    {"name": "demo.util.Helper", "fields": [
                        {"name": "NAME", "type": "java.lang.String", "static": true, "value": {"Str": "helper"}}
                    ]},
                    {"name": "java.lang.Integer", "fields": [
                        {"name": "SIZE", "type": "int", "static": true, "final": true, "value": {"Int": 32}}
                    ]}
                ],
                "objects": {
                    "1": {"type": "demo.Widget", "fields": {"size": {"Int": 3}, "next": {"Object": {"id": 2, "type_name": "demo.Widget"}}}},
                    "2": {"type": "demo.Widget", "fields": {"size": {"Int": 4}, "next": {"Object": {"id": 0, "type_name": "demo.Widget"}}}}
                },
                "arrays": {"5": {"element_type": "int", "values": [{"Int": 7}, {"Int": 8}]}}
            }"#,
        )
        .unwrap();
        if !this {
            frame.this = None;
        }
        frame
    }

    fn segments(name: &str) -> Vec<String> {
        name.split('.').map(str::to_string).collect()
    }

    fn value_of(resolved: Resolved) -> Value {
        resolved.into_value().unwrap()
    }

    #[test]
    fn test_identifier_order() {
        let frame = frame(true);
        let local = resolve_identifier(&frame, "count").unwrap();
        assert!(matches!(
            local,
            Resolved::Value { location: Some(Location::Local { .. }), .. }
        ));
        assert_eq!(value_of(resolve_identifier(&frame, "size").unwrap()), Value::Int(3));
        assert_eq!(value_of(resolve_identifier(&frame, "LIMIT").unwrap()), Value::Int(10));
        assert_eq!(
            resolve_identifier(&frame, "Integer").unwrap(),
            Resolved::Type("java.lang.Integer".to_string())
        );
        assert_eq!(
            resolve_identifier(&frame, "demo").unwrap(),
            Resolved::Package("demo".to_string())
        );
        assert_eq!(
            value_of(resolve_identifier(&frame, "this").unwrap()),
            Value::Object(ObjectRef::new(1, "demo.Widget"))
        );
    }

    #[test]
    fn test_static_frame_rejects_instance_members() {
        let frame = frame(false);
        assert_eq!(
            resolve_identifier(&frame, "size").unwrap_err().kind(),
            ErrorKind::UnknownIdentifier
        );
        assert_eq!(
            resolve_identifier(&frame, "this").unwrap_err().kind(),
            ErrorKind::UnknownIdentifier
        );
        assert_eq!(value_of(resolve_identifier(&frame, "LIMIT").unwrap()), Value::Int(10));
    }

    #[test]
    fn test_qualified_names() {
        let frame = frame(true);
        assert_eq!(
            value_of(resolve_qualified(&frame, &segments("demo.util.Helper.NAME")).unwrap()),
            Value::Str("helper".to_string())
        );
        assert_eq!(
            value_of(resolve_qualified(&frame, &segments("Integer.SIZE")).unwrap()),
            Value::Int(32)
        );
        assert_eq!(
            value_of(resolve_qualified(&frame, &segments("next.size")).unwrap()),
            Value::Int(4)
        );
        assert_eq!(
            value_of(resolve_qualified(&frame, &segments("items.length")).unwrap()),
            Value::Int(2)
        );
        assert_eq!(
            resolve_qualified(&frame, &segments("demo.util")).unwrap(),
            Resolved::Package("demo.util".to_string())
        );
        assert_eq!(
            resolve_qualified(&frame, &segments("next.next.size")).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            resolve_qualified(&frame, &segments("count.size")).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            resolve_qualified(&frame, &segments("items.size")).unwrap_err().kind(),
            ErrorKind::UnknownIdentifier
        );
        assert_eq!(
            resolve_qualified(&frame, &segments("demo.Widget.size")).unwrap_err().kind(),
            ErrorKind::UnknownIdentifier
        );
    }

    #[test]
    fn test_results_must_be_values() {
        assert_eq!(
            Resolved::Type("demo.Widget".to_string()).into_value().unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            Resolved::Package("demo".to_string()).into_value().unwrap_err().kind(),
            ErrorKind::UnknownIdentifier
        );
    }

    #[test]
    fn test_array_elements() {
        let frame = frame(true);
        let items = Value::Array(ArrayRef::new(5, "int"));
        let element = resolve_element(&frame, items.clone(), Value::Char(1)).unwrap();
        assert_eq!(
            element,
            Resolved::Value {
                value: Value::Int(8),
                location: Some(Location::ArrayElement {
                    array: ArrayRef::new(5, "int"),
                    index: 1
                }),
            }
        );
        assert!(matches!(
            resolve_element(&frame, items.clone(), Value::Int(2)),
            Err(EvalError::IndexOutOfBounds { index: 2, length: 2 })
        ));
        assert_eq!(
            resolve_element(&frame, items.clone(), Value::Int(-1)).unwrap_err().kind(),
            ErrorKind::IndexOutOfRange
        );
        assert_eq!(
            resolve_element(&frame, items, Value::Long(0)).unwrap_err().kind(),
            ErrorKind::IndexOutOfRange
        );
        assert_eq!(
            resolve_element(&frame, Value::Null, Value::Int(0)).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            resolve_element(&frame, Value::Int(3), Value::Int(0)).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn test_find_classes() {
        let frame = frame(true);
        assert_eq!(find_classes(&frame, "demo.Widget").unwrap(), vec!["demo.Widget"]);
        assert_eq!(find_classes(&frame, "*Helper").unwrap(), vec!["demo.util.Helper"]);
        assert_eq!(
            find_classes(&frame, "demo.*").unwrap(),
            vec!["demo.Base", "demo.Widget", "demo.util.Helper"]
        );
        assert!(find_classes(&frame, "demo.Missing").unwrap().is_empty());
        assert_eq!(
            find_classes(&frame, "demo.*.Helper").unwrap_err().kind(),
            ErrorKind::Syntax
        );
    }
}
