//! Expression evaluator
//!
//! Walks the AST against a frame context. The evaluator keeps no state
//! between calls; everything it knows about the debuggee comes from the
//! frame it is handed.

use super::ast::{BinOp, Expr};
use super::coerce::{self, unboxed};
use super::error::EvalError;
use super::method::{prepare_arguments, select_method};
use super::parser::parse_expr_with_depth;
use super::resolve::{
    resolve_element, resolve_identifier, resolve_member, resolve_qualified, Location, Resolved,
};
use super::value::Value;
use crate::config::EvalConfig;
use crate::frame::{FrameContext, InvocationError};

/// Expression evaluator
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Parse and evaluate `input`. Blank input and `null` evaluate to `Null`.
    pub fn evaluate_str(&self, input: &str, ctx: &mut dyn FrameContext) -> Result<Value, EvalError> {
        match parse_expr_with_depth(input, self.config.max_depth)? {
            Some(expr) => self.evaluate(&expr, ctx),
            None => Ok(Value::Null),
        }
    }

    /// Evaluate an expression
    pub fn evaluate(&self, expr: &Expr, ctx: &mut dyn FrameContext) -> Result<Value, EvalError> {
        self.resolve(expr, ctx)?.into_value()
    }

    fn value(&self, expr: &Expr, ctx: &mut dyn FrameContext) -> Result<Value, EvalError> {
        self.resolve(expr, ctx)?.into_value()
    }

    fn resolve(&self, expr: &Expr, ctx: &mut dyn FrameContext) -> Result<Resolved, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(Resolved::value(value.clone())),
            Expr::Identifier(name) => resolve_identifier(&*ctx, name),
            Expr::QualifiedName(segments) => resolve_qualified(&*ctx, segments),
            Expr::Grouping(inner) => self.resolve(inner, ctx),
            Expr::FieldAccess { target, member } => {
                let base = self.resolve(target, ctx)?;
                resolve_member(&*ctx, base, member)
            }
            Expr::ArrayAccess { target, index } => {
                let array = self.value(target, ctx)?;
                let index = self.value(index, ctx)?;
                let index = unboxed(&*ctx, index);
                resolve_element(&*ctx, array, index)
            }
            Expr::Unary { op, expr } => {
                let operand = self.value(expr, ctx)?;
                let operand = unboxed(&*ctx, operand);
                coerce::unary(*op, &operand).map(Resolved::value)
            }
            Expr::Binary { left, op, right } => {
                self.eval_binary(*op, left, right, ctx).map(Resolved::value)
            }
            Expr::Assign { target, value } => self.eval_assign(target, value, ctx).map(Resolved::value),
            Expr::Cast { ty, expr } => {
                let value = self.value(expr, ctx)?;
                coerce::cast(&*ctx, &value, ty).map(Resolved::value)
            }
            Expr::InstanceOf { expr, ty } => {
                let value = self.value(expr, ctx)?;
                if value.is_null() {
                    return Ok(Resolved::value(Value::Boolean(false)));
                }
                if value.kind().is_primitive() {
                    return Err(EvalError::type_mismatch("a reference", value.type_name()));
                }
                let target = coerce::qualify_type(&*ctx, ty);
                let result = coerce::type_assignable(&*ctx, &value.type_name(), &target);
                Ok(Resolved::value(Value::Boolean(result)))
            }
            Expr::MethodCall { target, name, args } => self
                .eval_call(target.as_deref(), name, args, ctx)
                .map(Resolved::value),
        }
    }

    /// Operand of `&&`, `||` or a condition: must be boolean.
    fn condition(&self, op: BinOp, expr: &Expr, ctx: &mut dyn FrameContext) -> Result<bool, EvalError> {
        let value = self.value(expr, ctx)?;
        let value = unboxed(&*ctx, value);
        value
            .to_bool()
            .ok_or_else(|| EvalError::invalid_operation(op.as_str(), value.type_name(), "boolean"))
    }

    fn eval_binary(
        &self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        ctx: &mut dyn FrameContext,
    ) -> Result<Value, EvalError> {
        if matches!(op, BinOp::And | BinOp::Or) {
            let l = self.condition(op, left, ctx)?;
            // Short-circuit: the right operand is never evaluated.
            if (op == BinOp::And) != l {
                return Ok(Value::Boolean(l));
            }
            return Ok(Value::Boolean(self.condition(op, right, ctx)?));
        }

        let l = self.value(left, ctx)?;
        let r = self.value(right, ctx)?;

        if matches!(op, BinOp::Eq | BinOp::Ne) {
            // Two wrapper objects compare by identity; mixed with a
            // primitive, the wrapper is unboxed.
            let (l, r) = match (l.kind().is_primitive(), r.kind().is_primitive()) {
                (true, false) => (l, unboxed(&*ctx, r)),
                (false, true) => (unboxed(&*ctx, l), r),
                _ => (l, r),
            };
            let equal = coerce::equals(&*ctx, &l, &r)?;
            return Ok(Value::Boolean(if op == BinOp::Eq { equal } else { !equal }));
        }

        let l = unboxed(&*ctx, l);
        let r = unboxed(&*ctx, r);
        match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                coerce::arithmetic(op, &l, &r)
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => coerce::bitwise(op, &l, &r),
            BinOp::Shl | BinOp::Shr | BinOp::UShr => coerce::shift(op, &l, &r),
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => coerce::compare(op, &l, &r),
            BinOp::And | BinOp::Or | BinOp::Eq | BinOp::Ne => Err(EvalError::invalid_operation(
                op.as_str(),
                l.type_name(),
                r.type_name(),
            )),
        }
    }

    fn eval_assign(&self, target: &Expr, value: &Expr, ctx: &mut dyn FrameContext) -> Result<Value, EvalError> {
        if !self.config.allow_assignment {
            return Err(EvalError::ImmutableTarget {
                name: target.to_string(),
            });
        }

        let value = self.value(value, ctx)?;
        let location = match self.resolve(target, ctx)? {
            Resolved::Value {
                location: Some(location),
                ..
            } => location,
            Resolved::Package(name) => return Err(EvalError::unknown_ident(name)),
            _ => {
                return Err(EvalError::ImmutableTarget {
                    name: target.to_string(),
                })
            }
        };

        if let Location::Field { field, .. } = &location {
            if field.is_final {
                return Err(EvalError::ImmutableTarget {
                    name: field.name.clone(),
                });
            }
        }
        let value = coerce::assign_convert(&*ctx, value, &location.declared_type())?;
        log::debug!("assigning {:?} to {}", value, target);
        match &location {
            Location::Local { name, .. } => ctx.write_local(name, value.clone())?,
            Location::Field { owner, field } => ctx.write_field(owner, &field.name, value.clone())?,
            Location::ArrayElement { array, index } => {
                ctx.write_array_element(array, *index, value.clone())?
            }
        }
        Ok(value)
    }

    fn eval_call(
        &self,
        target: Option<&Expr>,
        name: &str,
        args: &[Expr],
        ctx: &mut dyn FrameContext,
    ) -> Result<Value, EvalError> {
        if !self.config.allow_invocation {
            return Err(InvocationError::Unsupported("method invocation is disabled".to_string()).into());
        }

        let (owner, receiver, static_only) = match target {
            None => match (ctx.this_object(), ctx.current_type()) {
                (Some(this), _) => (this.type_name.clone(), Some(Value::Object(this)), false),
                (None, Some(current)) => (current, None, true),
                (None, None) => return Err(EvalError::unknown_ident(name)),
            },
            Some(target) => match self.resolve(target, ctx)? {
                Resolved::Type(type_name) => (type_name, None, true),
                Resolved::Package(prefix) => return Err(EvalError::unknown_ident(prefix)),
                Resolved::Value { value, .. } => {
                    if value.is_null() {
                        return Err(EvalError::type_mismatch("an object", "null"));
                    }
                    let owner = match &value {
                        Value::Object(object) => object.type_name.clone(),
                        Value::Str(_) => "java.lang.String".to_string(),
                        Value::Array(_) => "java.lang.Object".to_string(),
                        other => return Err(EvalError::type_mismatch("an object", other.type_name())),
                    };
                    (owner, Some(value), false)
                }
            },
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.value(arg, ctx)?);
        }

        let candidate = select_method(&*ctx, &owner, name, static_only, &values)?;
        let values = prepare_arguments(&*ctx, &candidate, values);
        let receiver = if candidate.is_static || candidate.is_constructor {
            None
        } else {
            receiver
        };
        log::debug!(
            "invoking {}.{} with {} argument(s)",
            candidate.declaring_type,
            candidate.signature(),
            values.len()
        );
        Ok(ctx.invoke(&candidate, receiver.as_ref(), &values)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::error::ErrorKind;
    use crate::frame::SnapshotFrame;

    fn frame() -> SnapshotFrame {
        SnapshotFrame::from_json(
            r#"{
                "current_type": "demo.Main",
                "locals": {
                    "count": {"value": {"Int": 1}, "declared_type": "int"},
                    "label": {"value": {"Str": "abc"}, "declared_type": "java.lang.String"}
                },
                "types": [
                    {"name": "demo.Main", "methods": [
                        {"name": "touch", "static": true, "return_type": "boolean",
                         "calls": [{"returns": {"Boolean": true}}]}
                    ]}
                ]
            }"#,
        )
        .unwrap()
    }

    fn eval(input: &str) -> Result<Value, EvalError> {
        Evaluator::new().evaluate_str(input, &mut frame())
    }

    fn eval_kind(input: &str) -> ErrorKind {
        eval(input).unwrap_err().kind()
    }

    #[test]
    fn test_arithmetic_scenarios() {
        assert_eq!(eval("1 + 1").unwrap(), Value::Int(2));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Value::Int(9));
        assert_eq!(eval("\"abc\" + 123").unwrap(), Value::Str("abc123".to_string()));
        assert_eq!(eval("~128").unwrap(), Value::Int(-129));
        assert_eq!(eval("1 / 0").unwrap_err().kind(), ErrorKind::Arithmetic);
        assert!(matches!(eval("0.0 / 0.0").unwrap(), Value::Double(v) if v.is_nan()));
        assert_eq!(eval("(boolean) 123").unwrap_err().kind(), ErrorKind::InvalidCast);
        assert_eq!(eval("'a' + 1").unwrap(), Value::Int(98));
        assert_eq!(eval("(byte) 1 + (byte) 2").unwrap(), Value::Byte(3));
        assert_eq!(eval("1L << 40 >>> 38").unwrap(), Value::Long(4));
        assert_eq!(eval("-2147483648 - 1").unwrap(), Value::Int(i32::MAX));
    }

    #[test]
    fn test_no_expression_is_null() {
        assert_eq!(eval("").unwrap(), Value::Null);
        assert_eq!(eval("null").unwrap(), Value::Null);
        assert_eq!(eval("null == null").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let mut frame = frame();
        let evaluator = Evaluator::new();
        assert_eq!(
            evaluator.evaluate_str("true && false", &mut frame).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            evaluator.evaluate_str("false && touch()", &mut frame).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            evaluator.evaluate_str("true || touch()", &mut frame).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            evaluator.evaluate_str("false && 1 / 0 == 0", &mut frame).unwrap(),
            Value::Boolean(false)
        );
        assert!(frame.invocations().is_empty());

        assert_eq!(
            evaluator.evaluate_str("false || touch()", &mut frame).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(frame.invocations().len(), 1);
    }

    #[test]
    fn test_logical_operands_must_be_boolean() {
        assert_eq!(eval_kind("1 && true"), ErrorKind::TypeMismatch);
        assert_eq!(eval_kind("null || false"), ErrorKind::TypeMismatch);
        assert_eq!(eval_kind("!5"), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let mut frame = frame();
        let evaluator = Evaluator::new();
        let first = evaluator.evaluate_str("label + count * 2", &mut frame).unwrap();
        let second = evaluator.evaluate_str("label + count * 2", &mut frame).unwrap();
        assert_eq!(first, Value::Str("abc2".to_string()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_assignment_writes_through_frame() {
        let mut frame = frame();
        let evaluator = Evaluator::new();
        assert_eq!(evaluator.evaluate_str("count = 'a'", &mut frame).unwrap(), Value::Int(97));
        assert_eq!(frame.lookup_local("count").unwrap().value, Value::Int(97));
        assert_eq!(
            evaluator.evaluate_str("count = 1.5", &mut frame).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            evaluator.evaluate_str("missing = 1", &mut frame).unwrap_err().kind(),
            ErrorKind::UnknownIdentifier
        );
    }

    #[test]
    fn test_side_effects_are_not_rolled_back() {
        let mut frame = frame();
        let evaluator = Evaluator::new();
        let err = evaluator
            .evaluate_str("(count = 5) == 5 && missing", &mut frame)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownIdentifier);
        assert_eq!(frame.lookup_local("count").unwrap().value, Value::Int(5));
    }

    #[test]
    fn test_config_switches() {
        let mut frame = frame();
        let locked = Evaluator::with_config(EvalConfig {
            allow_invocation: false,
            allow_assignment: false,
            ..EvalConfig::default()
        });
        assert_eq!(
            locked.evaluate_str("touch()", &mut frame).unwrap_err().kind(),
            ErrorKind::Invocation
        );
        assert_eq!(
            locked.evaluate_str("count = 2", &mut frame).unwrap_err().kind(),
            ErrorKind::ImmutableTarget
        );
        assert_eq!(frame.lookup_local("count").unwrap().value, Value::Int(1));

        let shallow = Evaluator::with_config(EvalConfig {
            max_depth: 4,
            ..EvalConfig::default()
        });
        assert_eq!(
            shallow.evaluate_str("((((((1))))))", &mut frame).unwrap_err().kind(),
            ErrorKind::Syntax
        );
    }

    #[test]
    fn test_types_and_packages_are_not_values() {
        assert_eq!(eval_kind("demo.Main"), ErrorKind::TypeMismatch);
        assert_eq!(eval_kind("demo"), ErrorKind::UnknownIdentifier);
        assert_eq!(eval_kind("nothing.here"), ErrorKind::UnknownIdentifier);
    }

    #[test]
    fn test_instanceof() {
        assert_eq!(eval("label instanceof String").unwrap(), Value::Boolean(true));
        assert_eq!(eval("label instanceof CharSequence").unwrap(), Value::Boolean(true));
        assert_eq!(eval("label instanceof Integer").unwrap(), Value::Boolean(false));
        assert_eq!(eval("null instanceof String").unwrap(), Value::Boolean(false));
        assert_eq!(eval_kind("count instanceof Object"), ErrorKind::TypeMismatch);
    }
}
