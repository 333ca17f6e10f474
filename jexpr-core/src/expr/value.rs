//! Value types for expression evaluation
//!
//! Represents every value an expression can produce, including opaque
//! handles to objects and arrays that live in the debuggee.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to an object in the target process.
///
/// The id is opaque to the evaluator; only the frame context knows what it
/// refers to. Id `0` never names a live referent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub id: u64,
    pub type_name: String,
}

impl ObjectRef {
    pub fn new(id: u64, type_name: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
        }
    }

    /// True when the handle does not refer to anything.
    pub fn is_null(&self) -> bool {
        self.id == 0
    }
}

/// Handle to an array in the target process, tagged with its element type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayRef {
    pub id: u64,
    pub element_type: String,
}

impl ArrayRef {
    pub fn new(id: u64, element_type: impl Into<String>) -> Self {
        Self {
            id,
            element_type: element_type.into(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.id == 0
    }

    /// Type name of the array itself, e.g. `char[]`.
    pub fn type_name(&self) -> String {
        format!("{}[]", self.element_type)
    }
}

/// Runtime value with Java typing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),

    // String held locally; the debuggee's string identity is not tracked
    Str(String),

    Object(ObjectRef),
    Array(ArrayRef),

    Null,
}

/// Type tag of a value.
///
/// The declaration order of the numeric kinds is not the widening order;
/// use [`Kind::numeric_rank`] for promotion decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Str,
    Object,
    Array,
    Null,
}

impl Kind {
    /// Position in the widening order `byte < short < int < long < float < double`.
    ///
    /// `char` ranks with `int` since it only widens from `int` upward.
    pub fn numeric_rank(self) -> Option<u8> {
        match self {
            Kind::Byte => Some(1),
            Kind::Short => Some(2),
            Kind::Char | Kind::Int => Some(3),
            Kind::Long => Some(4),
            Kind::Float => Some(5),
            Kind::Double => Some(6),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.numeric_rank().is_some()
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Kind::Byte | Kind::Char | Kind::Short | Kind::Int | Kind::Long
        )
    }

    pub fn is_primitive(self) -> bool {
        self == Kind::Boolean || self.is_numeric()
    }

    /// Java keyword for primitive kinds.
    pub fn primitive_name(self) -> Option<&'static str> {
        match self {
            Kind::Boolean => Some("boolean"),
            Kind::Byte => Some("byte"),
            Kind::Char => Some("char"),
            Kind::Short => Some("short"),
            Kind::Int => Some("int"),
            Kind::Long => Some("long"),
            Kind::Float => Some("float"),
            Kind::Double => Some("double"),
            _ => None,
        }
    }

    /// Fully qualified name of the wrapper class for primitive kinds.
    pub fn wrapper_name(self) -> Option<&'static str> {
        match self {
            Kind::Boolean => Some("java.lang.Boolean"),
            Kind::Byte => Some("java.lang.Byte"),
            Kind::Char => Some("java.lang.Character"),
            Kind::Short => Some("java.lang.Short"),
            Kind::Int => Some("java.lang.Integer"),
            Kind::Long => Some("java.lang.Long"),
            Kind::Float => Some("java.lang.Float"),
            Kind::Double => Some("java.lang.Double"),
            _ => None,
        }
    }

    /// Primitive kind named by a Java keyword.
    pub fn from_primitive_name(name: &str) -> Option<Kind> {
        match name {
            "boolean" => Some(Kind::Boolean),
            "byte" => Some(Kind::Byte),
            "char" => Some(Kind::Char),
            "short" => Some(Kind::Short),
            "int" => Some(Kind::Int),
            "long" => Some(Kind::Long),
            "float" => Some(Kind::Float),
            "double" => Some(Kind::Double),
            _ => None,
        }
    }

    /// Primitive kind boxed by a wrapper class, accepting simple or
    /// qualified names.
    pub fn from_wrapper_name(name: &str) -> Option<Kind> {
        let simple = name.strip_prefix("java.lang.").unwrap_or(name);
        match simple {
            "Boolean" => Some(Kind::Boolean),
            "Byte" => Some(Kind::Byte),
            "Character" => Some(Kind::Char),
            "Short" => Some(Kind::Short),
            "Integer" => Some(Kind::Int),
            "Long" => Some(Kind::Long),
            "Float" => Some(Kind::Float),
            "Double" => Some(Kind::Double),
            _ => None,
        }
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Boolean(_) => Kind::Boolean,
            Value::Byte(_) => Kind::Byte,
            Value::Char(_) => Kind::Char,
            Value::Short(_) => Kind::Short,
            Value::Int(_) => Kind::Int,
            Value::Long(_) => Kind::Long,
            Value::Float(_) => Kind::Float,
            Value::Double(_) => Kind::Double,
            Value::Str(_) => Kind::Str,
            Value::Object(_) => Kind::Object,
            Value::Array(_) => Kind::Array,
            Value::Null => Kind::Null,
        }
    }

    /// Java type name of this value
    pub fn type_name(&self) -> String {
        match self {
            Value::Str(_) => "java.lang.String".to_string(),
            Value::Object(obj) => obj.type_name.clone(),
            Value::Array(arr) => arr.type_name(),
            Value::Null => "null".to_string(),
            other => other
                .kind()
                .primitive_name()
                .unwrap_or("unknown")
                .to_string(),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    pub fn is_integral(&self) -> bool {
        self.kind().is_integral()
    }

    /// True for `Null` and for handles with no referent.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Object(obj) => obj.is_null(),
            Value::Array(arr) => arr.is_null(),
            _ => false,
        }
    }

    /// Integral value widened to i64
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::Char(v) => Some(*v as i64),
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Any numeric value widened to f64
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            other => other.to_i64().map(|v| v as f64),
        }
    }

    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Structural equality for tests and protocol round-trips. NaN equals
    /// NaN here; language-level `==` lives in the coercion engine.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits() || a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits() || a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

/// Render a floating value the way `String.valueOf(double)` does.
pub(crate) fn java_float_string(v: f64, shortest: String) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-3..1e7).contains(&magnitude) {
        // shortest is the `{:e}` rendering here, e.g. "1.5e10"
        let (mantissa, exponent) = shortest.split_once('e').unwrap_or((&shortest, "0"));
        let mantissa = if mantissa.contains('.') {
            mantissa.to_string()
        } else {
            format!("{}.0", mantissa)
        };
        return format!("{}E{}", mantissa, exponent);
    }
    if shortest.contains('.') {
        shortest
    } else {
        format!("{}.0", shortest)
    }
}

fn float_repr(v: f64, plain: String, scientific: String) -> String {
    let magnitude = v.abs();
    if magnitude != 0.0 && magnitude.is_finite() && !(1e-3..1e7).contains(&magnitude) {
        java_float_string(v, scientific)
    } else {
        java_float_string(v, plain)
    }
}

impl fmt::Display for Value {
    /// Printable form used by string concatenation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Char(v) => {
                let c = char::from_u32(*v as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
                write!(f, "{}", c)
            }
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(
                f,
                "{}",
                float_repr(*v as f64, format!("{}", v), format!("{:e}", v))
            ),
            Value::Double(v) => write!(
                f,
                "{}",
                float_repr(*v, format!("{}", v), format!("{:e}", v))
            ),
            Value::Str(v) => write!(f, "{}", v),
            Value::Object(obj) if obj.is_null() => write!(f, "null"),
            Value::Object(obj) => write!(f, "instance of {}(id={})", obj.type_name, obj.id),
            Value::Array(arr) if arr.is_null() => write!(f, "null"),
            Value::Array(arr) => write!(f, "instance of {}(id={})", arr.type_name(), arr.id),
            Value::Null => write!(f, "null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_names() {
        assert_eq!(Value::Int(42).type_name(), "int");
        assert_eq!(Value::Boolean(true).type_name(), "boolean");
        assert_eq!(Value::Str("hello".to_string()).type_name(), "java.lang.String");
        assert_eq!(Value::Array(ArrayRef::new(3, "char")).type_name(), "char[]");
        assert_eq!(Value::Null.type_name(), "null");
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Int(42)), "42");
        assert_eq!(format!("{}", Value::Boolean(true)), "true");
        assert_eq!(format!("{}", Value::Str("hello".to_string())), "hello");
        assert_eq!(format!("{}", Value::Char('a' as u16)), "a");
        assert_eq!(format!("{}", Value::Null), "null");
    }

    #[test]
    fn test_float_display_matches_java() {
        assert_eq!(Value::Double(1.0).to_string(), "1.0");
        assert_eq!(Value::Double(0.25).to_string(), "0.25");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
        assert_eq!(Value::Double(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Double(f64::NEG_INFINITY).to_string(), "-Infinity");
        assert_eq!(Value::Double(1.0e10).to_string(), "1.0E10");
        assert_eq!(Value::Double(1.5e-5).to_string(), "1.5E-5");
    }

    #[test]
    fn test_null_handles() {
        assert!(Value::Object(ObjectRef::new(0, "java.lang.Object")).is_null());
        assert!(!Value::Object(ObjectRef::new(9, "java.lang.Object")).is_null());
        assert!(Value::Null.is_null());
    }

    #[test]
    fn test_widening_ranks() {
        assert!(Kind::Byte.numeric_rank() < Kind::Short.numeric_rank());
        assert!(Kind::Long.numeric_rank() < Kind::Float.numeric_rank());
        assert_eq!(Kind::Char.numeric_rank(), Kind::Int.numeric_rank());
        assert_eq!(Kind::from_wrapper_name("Integer"), Some(Kind::Int));
        assert_eq!(Kind::from_wrapper_name("java.lang.Character"), Some(Kind::Char));
        assert_eq!(Kind::from_wrapper_name("java.lang.String"), None);
    }
}
