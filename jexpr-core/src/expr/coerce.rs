//! Type coercion engine
//!
//! Java's numeric promotion, operator typing, casts and assignment
//! conversion over [`Value`]s. Reference-type questions (hierarchies,
//! identity, unboxing) go through the frame context.

use super::ast::{BinOp, UnaryOp};
use super::error::EvalError;
use super::value::{Kind, Value};
use crate::frame::FrameContext;

/// Simple names resolved against `java.lang` even when the frame has not
/// reported the type as loaded.
const JAVA_LANG_TYPES: &[&str] = &[
    "Object",
    "String",
    "CharSequence",
    "Comparable",
    "Number",
    "Boolean",
    "Byte",
    "Character",
    "Short",
    "Integer",
    "Long",
    "Float",
    "Double",
    "Cloneable",
];

const OBJECT: &str = "java.lang.Object";

/// Supertypes of core library types, used when the frame knows nothing
/// about them.
fn builtin_hierarchy(type_name: &str) -> Option<Vec<String>> {
    let parents: &[&str] = match type_name {
        "java.lang.String" => &[
            "java.io.Serializable",
            "java.lang.Comparable",
            "java.lang.CharSequence",
        ],
        "java.lang.Boolean" | "java.lang.Character" => {
            &["java.io.Serializable", "java.lang.Comparable"]
        }
        "java.lang.Byte" | "java.lang.Short" | "java.lang.Integer" | "java.lang.Long"
        | "java.lang.Float" | "java.lang.Double" => &[
            "java.lang.Number",
            "java.io.Serializable",
            "java.lang.Comparable",
        ],
        _ => return None,
    };
    let mut types = vec![type_name.to_string()];
    types.extend(parents.iter().map(|t| t.to_string()));
    types.push(OBJECT.to_string());
    Some(types)
}

/// The type followed by all of its supertypes, always ending in
/// `java.lang.Object` for reference types.
pub fn hierarchy(ctx: &dyn FrameContext, type_name: &str) -> Vec<String> {
    let mut types = ctx.type_hierarchy(type_name);
    if types.len() <= 1 {
        if let Some(builtin) = builtin_hierarchy(type_name) {
            return builtin;
        }
    }
    if types.is_empty() {
        types.push(type_name.to_string());
    }
    if !types.iter().any(|t| t == OBJECT) {
        types.push(OBJECT.to_string());
    }
    types
}

/// Fully qualify a written type name, keeping array dimensions.
pub fn qualify_type(ctx: &dyn FrameContext, written: &str) -> String {
    let written: String = written.chars().filter(|c| !c.is_whitespace()).collect();
    let base = written.trim_end_matches("[]");
    let dims = &written[base.len()..];
    if Kind::from_primitive_name(base).is_some() || base == "void" {
        return written.clone();
    }
    let qualified = ctx
        .find_type(base)
        .or_else(|| ctx.find_type(&format!("java.lang.{}", base)))
        .or_else(|| {
            JAVA_LANG_TYPES
                .contains(&base)
                .then(|| format!("java.lang.{}", base))
        })
        .unwrap_or_else(|| base.to_string());
    format!("{}{}", qualified, dims)
}

/// Whether a value of runtime type `from` may be used where `to` is
/// expected. Both names must be fully qualified.
pub fn type_assignable(ctx: &dyn FrameContext, from: &str, to: &str) -> bool {
    if from == to {
        return true;
    }
    if let Some(element) = from.strip_suffix("[]") {
        if matches!(to, OBJECT | "java.lang.Cloneable" | "java.io.Serializable") {
            return true;
        }
        let Some(target_element) = to.strip_suffix("[]") else {
            return false;
        };
        if Kind::from_primitive_name(element).is_some()
            || Kind::from_primitive_name(target_element).is_some()
        {
            return element == target_element;
        }
        return type_assignable(ctx, element, target_element);
    }
    if Kind::from_primitive_name(from).is_some() || Kind::from_primitive_name(to).is_some() {
        return false;
    }
    hierarchy(ctx, from).iter().any(|t| t == to)
}

/// Implicit widening between primitive kinds, identity included.
pub fn can_widen(from: Kind, to: Kind) -> bool {
    if from == to {
        return true;
    }
    if to == Kind::Char || from == Kind::Boolean || to == Kind::Boolean {
        return false;
    }
    match (from.numeric_rank(), to.numeric_rank()) {
        (Some(f), Some(t)) => f < t || (from == Kind::Char && to == Kind::Int),
        _ => false,
    }
}

/// Result kind of a binary numeric operation: the wider operand, with
/// `char` taking part as `int`.
pub fn binary_kind(left: Kind, right: Kind) -> Option<Kind> {
    let as_int = |k: Kind| if k == Kind::Char { Kind::Int } else { k };
    let (left, right) = (as_int(left), as_int(right));
    let (l, r) = (left.numeric_rank()?, right.numeric_rank()?);
    Some(if l >= r { left } else { right })
}

/// Java primitive conversion of a numeric value to `target`.
///
/// Floating to integral conversion saturates and maps NaN to zero; the
/// narrow integral kinds go through `int` first.
pub fn convert_numeric(value: &Value, target: Kind) -> Option<Value> {
    if let Some(i) = value.to_i64() {
        return Some(match target {
            Kind::Byte => Value::Byte(i as i8),
            Kind::Short => Value::Short(i as i16),
            Kind::Char => Value::Char(i as u16),
            Kind::Int => Value::Int(i as i32),
            Kind::Long => Value::Long(i),
            Kind::Float => Value::Float(i as f32),
            Kind::Double => Value::Double(i as f64),
            _ => return None,
        });
    }
    let f = match value {
        Value::Float(v) => *v as f64,
        Value::Double(v) => *v,
        _ => return None,
    };
    Some(match target {
        Kind::Byte => Value::Byte((f as i32) as i8),
        Kind::Short => Value::Short((f as i32) as i16),
        Kind::Char => Value::Char((f as i32) as u16),
        Kind::Int => Value::Int(f as i32),
        Kind::Long => Value::Long(f as i64),
        Kind::Float => Value::Float(f as f32),
        Kind::Double => Value::Double(f),
        _ => return None,
    })
}

fn operand_error(op: BinOp, left: &Value, right: &Value) -> EvalError {
    EvalError::invalid_operation(op.as_str(), left.type_name(), right.type_name())
}

/// Integral results are computed in 64 bits and truncated to `kind`.
fn integral_result(kind: Kind, value: i64) -> Value {
    convert_numeric(&Value::Long(value), kind).unwrap_or(Value::Long(value))
}

/// `+ - * / %` on numeric operands, and `+` as string concatenation.
pub fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if op == BinOp::Add && (matches!(left, Value::Str(_)) || matches!(right, Value::Str(_))) {
        return Ok(Value::Str(format!("{}{}", left, right)));
    }
    let kind = binary_kind(left.kind(), right.kind()).ok_or_else(|| operand_error(op, left, right))?;

    match kind {
        Kind::Float | Kind::Double => {
            let (l, r) = match (left.to_f64(), right.to_f64()) {
                (Some(l), Some(r)) => (l, r),
                _ => return Err(operand_error(op, left, right)),
            };
            if kind == Kind::Float {
                let (l, r) = (l as f32, r as f32);
                Ok(Value::Float(match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Rem => l % r,
                    _ => return Err(operand_error(op, left, right)),
                }))
            } else {
                Ok(Value::Double(match op {
                    BinOp::Add => l + r,
                    BinOp::Sub => l - r,
                    BinOp::Mul => l * r,
                    BinOp::Div => l / r,
                    BinOp::Rem => l % r,
                    _ => return Err(operand_error(op, left, right)),
                }))
            }
        }
        _ => {
            let (l, r) = match (left.to_i64(), right.to_i64()) {
                (Some(l), Some(r)) => (l, r),
                _ => return Err(operand_error(op, left, right)),
            };
            if matches!(op, BinOp::Div | BinOp::Rem) && r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            let result = match op {
                BinOp::Add => l.wrapping_add(r),
                BinOp::Sub => l.wrapping_sub(r),
                BinOp::Mul => l.wrapping_mul(r),
                BinOp::Div => l.wrapping_div(r),
                BinOp::Rem => l.wrapping_rem(r),
                _ => return Err(operand_error(op, left, right)),
            };
            Ok(integral_result(kind, result))
        }
    }
}

/// `& | ^` on two booleans or two integral values.
pub fn bitwise(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Value::Boolean(l), Value::Boolean(r)) = (left, right) {
        return Ok(Value::Boolean(match op {
            BinOp::BitAnd => l & r,
            BinOp::BitOr => l | r,
            BinOp::BitXor => l ^ r,
            _ => return Err(operand_error(op, left, right)),
        }));
    }
    let (l, r) = match (left.to_i64(), right.to_i64()) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(operand_error(op, left, right)),
    };
    let kind = binary_kind(left.kind(), right.kind()).ok_or_else(|| operand_error(op, left, right))?;
    let result = match op {
        BinOp::BitAnd => l & r,
        BinOp::BitOr => l | r,
        BinOp::BitXor => l ^ r,
        _ => return Err(operand_error(op, left, right)),
    };
    Ok(integral_result(kind, result))
}

/// `<< >> >>>`; the left operand is promoted to at least `int`.
pub fn shift(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (l, count) = match (left.to_i64(), right.to_i64()) {
        (Some(l), Some(r)) => (l, r),
        _ => return Err(operand_error(op, left, right)),
    };
    if left.kind() == Kind::Long {
        let n = (count & 0x3f) as u32;
        return Ok(Value::Long(match op {
            BinOp::Shl => l.wrapping_shl(n),
            BinOp::Shr => l.wrapping_shr(n),
            BinOp::UShr => ((l as u64) >> n) as i64,
            _ => return Err(operand_error(op, left, right)),
        }));
    }
    let l = l as i32;
    let n = (count & 0x1f) as u32;
    Ok(Value::Int(match op {
        BinOp::Shl => l.wrapping_shl(n),
        BinOp::Shr => l.wrapping_shr(n),
        BinOp::UShr => ((l as u32) >> n) as i32,
        _ => return Err(operand_error(op, left, right)),
    }))
}

/// `< <= > >=` on numeric operands. NaN compares false.
pub fn compare(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let kind = binary_kind(left.kind(), right.kind()).ok_or_else(|| operand_error(op, left, right))?;
    let ordering = if matches!(kind, Kind::Float | Kind::Double) {
        left.to_f64().partial_cmp(&right.to_f64())
    } else {
        left.to_i64().partial_cmp(&right.to_i64())
    };
    let Some(ordering) = ordering else {
        return Ok(Value::Boolean(false));
    };
    Ok(Value::Boolean(match op {
        BinOp::Lt => ordering.is_lt(),
        BinOp::Le => ordering.is_le(),
        BinOp::Gt => ordering.is_gt(),
        BinOp::Ge => ordering.is_ge(),
        _ => return Err(operand_error(op, left, right)),
    }))
}

/// Language-level `==`.
pub fn equals(ctx: &dyn FrameContext, left: &Value, right: &Value) -> Result<bool, EvalError> {
    if left.is_numeric() && right.is_numeric() {
        let kind = binary_kind(left.kind(), right.kind())
            .ok_or_else(|| operand_error(BinOp::Eq, left, right))?;
        return Ok(if matches!(kind, Kind::Float | Kind::Double) {
            left.to_f64() == right.to_f64() && left.to_f64().map_or(false, |v| !v.is_nan())
        } else {
            left.to_i64() == right.to_i64()
        });
    }
    match (left, right) {
        (Value::Boolean(l), Value::Boolean(r)) => Ok(l == r),
        (Value::Boolean(_), r) if r.is_numeric() => Err(operand_error(BinOp::Eq, left, right)),
        (l, Value::Boolean(_)) if l.is_numeric() => Err(operand_error(BinOp::Eq, left, right)),
        (l, r) if l.is_null() || r.is_null() => Ok(l.is_null() && r.is_null()),
        (Value::Str(l), Value::Str(r)) => Ok(l == r),
        (Value::Object(l), Value::Object(r)) => Ok(ctx.same_object(l, r)),
        (Value::Array(l), Value::Array(r)) => Ok(l.id == r.id),
        _ => Ok(false),
    }
}

/// `- + ~ !` on an already unboxed operand.
pub fn unary(op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
    let error = || EvalError::invalid_operation(op.as_str(), value.type_name(), "");
    match op {
        UnaryOp::Not => match value {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            _ => Err(error()),
        },
        UnaryOp::Plus => match value {
            Value::Char(c) => Ok(Value::Int(*c as i32)),
            v if v.is_numeric() => Ok(v.clone()),
            _ => Err(error()),
        },
        UnaryOp::Neg => match value {
            Value::Byte(v) => Ok(Value::Byte(v.wrapping_neg())),
            Value::Short(v) => Ok(Value::Short(v.wrapping_neg())),
            Value::Char(v) => Ok(Value::Int(-(*v as i32))),
            Value::Int(v) => Ok(Value::Int(v.wrapping_neg())),
            Value::Long(v) => Ok(Value::Long(v.wrapping_neg())),
            Value::Float(v) => Ok(Value::Float(-v)),
            Value::Double(v) => Ok(Value::Double(-v)),
            _ => Err(error()),
        },
        UnaryOp::BitNot => match value {
            Value::Byte(v) => Ok(Value::Byte(!v)),
            Value::Short(v) => Ok(Value::Short(!v)),
            Value::Char(v) => Ok(Value::Int(!(*v as i32))),
            Value::Int(v) => Ok(Value::Int(!v)),
            Value::Long(v) => Ok(Value::Long(!v)),
            _ => Err(error()),
        },
    }
}

/// Primitive held by a wrapper object, or the value itself.
pub fn unboxed(ctx: &dyn FrameContext, value: Value) -> Value {
    match &value {
        Value::Object(obj) if !obj.is_null() => ctx.unbox(obj).unwrap_or(value),
        _ => value,
    }
}

fn cast_to_primitive(value: &Value, target: Kind, written: &str) -> Result<Value, EvalError> {
    let invalid = || EvalError::invalid_cast(written, value.type_name());
    match value {
        Value::Boolean(_) if target == Kind::Boolean => Ok(value.clone()),
        v if v.is_numeric() && target != Kind::Boolean => {
            convert_numeric(v, target).ok_or_else(invalid)
        }
        _ => Err(invalid()),
    }
}

/// Explicit cast `(ty) value`.
pub fn cast(ctx: &dyn FrameContext, value: &Value, ty: &str) -> Result<Value, EvalError> {
    let ty = ty.trim();
    if ty == "void" {
        return Err(EvalError::invalid_cast(ty, value.type_name()));
    }
    if let Some(kind) = Kind::from_primitive_name(ty) {
        let value = unboxed(ctx, value.clone());
        return cast_to_primitive(&value, kind, ty);
    }
    if value.is_null() {
        return Ok(value.clone());
    }

    let target = qualify_type(ctx, ty);
    if let Some(kind) = Kind::from_wrapper_name(&target) {
        let value = unboxed(ctx, value.clone());
        return cast_to_primitive(&value, kind, ty);
    }
    if target == "java.lang.String" && value.kind().is_primitive() {
        return Ok(Value::Str(value.to_string()));
    }

    let compatible = match value {
        v if v.kind().is_primitive() => {
            let wrapper = v.kind().wrapper_name().unwrap_or(OBJECT);
            type_assignable(ctx, wrapper, &target)
        }
        v => type_assignable(ctx, &v.type_name(), &target),
    };
    if compatible {
        Ok(value.clone())
    } else {
        Err(EvalError::invalid_cast(target, value.type_name()))
    }
}

/// Convert `value` for storage in a location declared as `declared`.
pub fn assign_convert(ctx: &dyn FrameContext, value: Value, declared: &str) -> Result<Value, EvalError> {
    let declared = declared.trim();
    if let Some(target) = Kind::from_primitive_name(declared) {
        let value = unboxed(ctx, value);
        let mismatch = || EvalError::type_mismatch(declared, value.type_name());
        let source = value.kind();
        if !source.is_primitive() || (source == Kind::Boolean) != (target == Kind::Boolean) {
            return Err(mismatch());
        }
        if can_widen(source, target) {
            return convert_numeric(&value, target)
                .or_else(|| (source == target).then(|| value.clone()))
                .ok_or_else(mismatch);
        }
        if source.is_integral() && target.is_integral() {
            let converted = convert_numeric(&value, target).ok_or_else(mismatch)?;
            if converted.to_i64() == value.to_i64() {
                return Ok(converted);
            }
            return Err(EvalError::invalid_cast(declared, format!("{} {}", value.type_name(), value)));
        }
        return Err(mismatch());
    }

    if value.is_null() {
        return Ok(value);
    }
    let target = qualify_type(ctx, declared);
    let source = value.kind();
    if source.is_primitive() {
        if let Some(wrapped) = Kind::from_wrapper_name(&target) {
            if wrapped == source {
                return Ok(value);
            }
            // Constants narrow into Byte, Short and Character boxes.
            if source.is_integral() && wrapped.is_integral() {
                if let Some(converted) = convert_numeric(&value, wrapped) {
                    if converted.to_i64() == value.to_i64()
                        && matches!(wrapped, Kind::Byte | Kind::Short | Kind::Char)
                    {
                        return Ok(converted);
                    }
                }
            }
            return Err(EvalError::type_mismatch(target, value.type_name()));
        }
        let wrapper = source.wrapper_name().unwrap_or(OBJECT);
        if type_assignable(ctx, wrapper, &target) {
            return Ok(value);
        }
        return Err(EvalError::type_mismatch(target, value.type_name()));
    }

    if type_assignable(ctx, &value.type_name(), &target) {
        Ok(value)
    } else {
        Err(EvalError::type_mismatch(target, value.type_name()))
    }
}
