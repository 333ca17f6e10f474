//! Overload resolution for method and constructor calls
//!
//! Every argument is scored against the parameter it would bind to. Exact
//! and boxing matches are tried first; only when no candidate matches that
//! way are widening and supertype conversions considered.

use super::coerce::{can_widen, convert_numeric, type_assignable, unboxed};
use super::error::EvalError;
use super::value::{Kind, Value};
use crate::frame::{FrameContext, MethodCandidate};

const EXACT: u32 = 5;
const BOXING: u32 = 4;
const SUPERTYPE: u32 = 3;
const WIDENING: u32 = 2;
const NULL_REFERENCE: u32 = 1;

/// Score of passing `arg` to a parameter declared as `param`, or `None`
/// when the argument cannot bind.
pub fn score_argument(ctx: &dyn FrameContext, arg: &Value, param: &str) -> Option<u32> {
    let param_kind = Kind::from_primitive_name(param);
    if arg.is_null() {
        return param_kind.is_none().then_some(NULL_REFERENCE);
    }

    let kind = arg.kind();
    if kind.is_primitive() {
        return match param_kind {
            Some(target) if target == kind => Some(EXACT),
            Some(target) if can_widen(kind, target) => Some(WIDENING),
            Some(_) => None,
            None if Kind::from_wrapper_name(param) == Some(kind) => Some(BOXING),
            None => None,
        };
    }

    let type_name = arg.type_name();
    if let (Value::Object(_), Some(target)) = (arg, param_kind) {
        // Wrapper objects bind to primitives after unboxing.
        let boxed = Kind::from_wrapper_name(&type_name)?;
        return if boxed == target {
            Some(BOXING)
        } else if can_widen(boxed, target) {
            Some(WIDENING)
        } else {
            None
        };
    }
    if param_kind.is_some() {
        return None;
    }
    if type_name == param {
        Some(EXACT)
    } else if type_assignable(ctx, &type_name, param) {
        Some(SUPERTYPE)
    } else {
        None
    }
}

fn describe_arguments(args: &[Value]) -> String {
    args.iter()
        .map(|a| a.type_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pick the single best candidate named `name` on `owner_type`.
///
/// A name equal to the owner's simple name selects its constructors. With
/// `static_only` set (calls through a type) instance methods are ignored.
pub fn select_method(
    ctx: &dyn FrameContext,
    owner_type: &str,
    name: &str,
    static_only: bool,
    args: &[Value],
) -> Result<MethodCandidate, EvalError> {
    let simple_name = owner_type.rsplit('.').next().unwrap_or(owner_type);
    let constructor = name == simple_name;
    let lookup = if constructor { "<init>" } else { name };

    let mut exact: Vec<(u32, MethodCandidate)> = Vec::new();
    let mut fuzzy: Vec<(u32, MethodCandidate)> = Vec::new();
    for candidate in ctx.candidates(owner_type, lookup) {
        if candidate.params.len() != args.len()
            || candidate.is_constructor != constructor
            || (static_only && !candidate.is_static && !candidate.is_constructor)
        {
            continue;
        }
        let scores: Option<Vec<u32>> = args
            .iter()
            .zip(&candidate.params)
            .map(|(arg, param)| score_argument(ctx, arg, param))
            .collect();
        let Some(scores) = scores else {
            continue;
        };
        let total: u32 = scores.iter().sum();
        log::debug!("candidate {} scored {:?}", candidate.signature(), scores);
        if scores.iter().all(|s| *s >= BOXING) {
            exact.push((total, candidate));
        } else {
            fuzzy.push((total, candidate));
        }
    }

    let phase = if exact.is_empty() { fuzzy } else { exact };
    let Some(best) = phase.iter().map(|(total, _)| *total).max() else {
        return Err(EvalError::NoSuchMethod {
            name: format!("{}.{}", owner_type, name),
            arguments: describe_arguments(args),
        });
    };
    let mut winners = phase.into_iter().filter(|(total, _)| *total == best);
    let (Some((_, chosen)), None) = (winners.next(), winners.next()) else {
        return Err(EvalError::AmbiguousMethod {
            name: format!("{}.{}", owner_type, name),
            arguments: describe_arguments(args),
        });
    };
    log::debug!("selected {}.{}", chosen.declaring_type, chosen.signature());
    Ok(chosen)
}

/// Convert arguments to the primitive kinds the chosen method declares.
pub fn prepare_arguments(ctx: &dyn FrameContext, candidate: &MethodCandidate, args: Vec<Value>) -> Vec<Value> {
    args.into_iter()
        .zip(&candidate.params)
        .map(|(arg, param)| match Kind::from_primitive_name(param) {
            Some(target) => {
                let arg = unboxed(ctx, arg);
                if arg.kind() == target {
                    arg
                } else {
                    convert_numeric(&arg, target).unwrap_or(arg)
                }
            }
            None => arg,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::error::ErrorKind;
    use crate::expr::value::ObjectRef;
    use crate::frame::SnapshotFrame;

    fn frame() -> SnapshotFrame {
        SnapshotFrame::from_json(
            r#"{
                "types": [
                    {"name": "java.lang.Object", "methods": [
                        {"name": "equals", "params": ["java.lang.Object"], "return_type": "boolean"},
                        {"name": "toString", "return_type": "java.lang.String"}
                    ]},
                    {"name": "java.lang.String", "superclass": "java.lang.Object",
                     "interfaces": ["java.lang.CharSequence"], "methods": [
                        {"name": "valueOf", "params": ["int"], "static": true},
                        {"name": "valueOf", "params": ["long"], "static": true},
                        {"name": "valueOf", "params": ["char"], "static": true},
                        {"name": "valueOf", "params": ["float"], "static": true},
                        {"name": "valueOf", "params": ["double"], "static": true},
                        {"name": "valueOf", "params": ["java.lang.Object"], "static": true},
                        {"name": "valueOf", "params": ["boolean"], "static": true},
                        {"name": "substring", "params": ["int"]},
                        {"name": "<init>", "params": ["java.lang.String"]}
                    ]},
                    {"name": "java.lang.Character", "methods": [
                        {"name": "isDigit", "params": ["char"], "static": true},
                        {"name": "isDigit", "params": ["int"], "static": true}
                    ]},
                    {"name": "demo.Sink", "methods": [
                        {"name": "put", "params": ["java.lang.Integer"]},
                        {"name": "put", "params": ["java.lang.CharSequence"]},
                        {"name": "pair", "params": ["int", "long"]},
                        {"name": "pair", "params": ["long", "int"]}
                    ]}
                ],
                "objects": {"6": {"type": "java.lang.Integer", "boxed": {"Int": 6}}}
            }"#,
        )
        .unwrap()
    }

    fn select(owner: &str, name: &str, static_only: bool, args: &[Value]) -> Result<MethodCandidate, EvalError> {
        select_method(&frame(), owner, name, static_only, args)
    }

    #[test]
    fn test_argument_scores() {
        let frame = frame();
        assert_eq!(score_argument(&frame, &Value::Int(1), "int"), Some(EXACT));
        assert_eq!(score_argument(&frame, &Value::Int(1), "java.lang.Integer"), Some(BOXING));
        assert_eq!(score_argument(&frame, &Value::Int(1), "long"), Some(WIDENING));
        assert_eq!(score_argument(&frame, &Value::Int(1), "java.lang.Object"), None);
        assert_eq!(score_argument(&frame, &Value::Int(1), "short"), None);
        assert_eq!(
            score_argument(&frame, &Value::Str("s".into()), "java.lang.CharSequence"),
            Some(SUPERTYPE)
        );
        assert_eq!(score_argument(&frame, &Value::Null, "java.lang.String"), Some(NULL_REFERENCE));
        assert_eq!(score_argument(&frame, &Value::Null, "int"), None);
        let boxed = Value::Object(ObjectRef::new(6, "java.lang.Integer"));
        assert_eq!(score_argument(&frame, &boxed, "int"), Some(BOXING));
        assert_eq!(score_argument(&frame, &boxed, "double"), Some(WIDENING));
        assert_eq!(score_argument(&frame, &boxed, "java.lang.Number"), Some(SUPERTYPE));
    }

    #[test]
    fn test_exact_phase_wins() {
        let chosen = select("java.lang.Character", "isDigit", true, &[Value::Char('0' as u16)]).unwrap();
        assert_eq!(chosen.params, vec!["char"]);
        let chosen = select("java.lang.String", "valueOf", true, &[Value::Int(1)]).unwrap();
        assert_eq!(chosen.params, vec!["int"]);
    }

    #[test]
    fn test_fuzzy_phase_prefers_highest_total() {
        let chosen = select("java.lang.Character", "isDigit", true, &[Value::Byte(1)]).unwrap();
        assert_eq!(chosen.params, vec!["int"]);
        let chosen = select("demo.Sink", "put", false, &[Value::Str("s".into())]).unwrap();
        assert_eq!(chosen.params, vec!["java.lang.CharSequence"]);
    }

    #[test]
    fn test_ambiguous_widening() {
        let err = select("java.lang.String", "valueOf", true, &[Value::Short(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMethod);
        let err = select("demo.Sink", "pair", false, &[Value::Int(1), Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AmbiguousMethod);
    }

    #[test]
    fn test_no_such_method() {
        let err = select("java.lang.String", "substring", false, &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuchMethod);
        let err = select("java.lang.String", "equals", false, &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuchMethod);
        let err = select("java.lang.String", "substring", true, &[Value::Int(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuchMethod);
    }

    #[test]
    fn test_inherited_and_constructor_candidates() {
        let chosen = select("java.lang.String", "toString", false, &[]).unwrap();
        assert_eq!(chosen.declaring_type, "java.lang.Object");
        let chosen = select("java.lang.String", "String", true, &[Value::Str("x".into())]).unwrap();
        assert!(chosen.is_constructor);
    }

    #[test]
    fn test_prepare_arguments_converts_primitives() {
        let frame = frame();
        let chosen = select("java.lang.Character", "isDigit", true, &[Value::Byte(1)]).unwrap();
        assert_eq!(prepare_arguments(&frame, &chosen, vec![Value::Byte(1)]), vec![Value::Int(1)]);
        let chosen = select("java.lang.String", "valueOf", true, &[Value::Long(2)]).unwrap();
        let boxed = Value::Object(ObjectRef::new(6, "java.lang.Integer"));
        assert_eq!(prepare_arguments(&frame, &chosen, vec![boxed]), vec![Value::Long(6)]);
    }
}
