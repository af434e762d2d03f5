//! The GraphQL value model shared by the query algebra and the compiler.
//!
//! `Value` covers every literal shape a parsed operation can carry,
//! including the pre-elaboration untyped variants that the compiler is
//! required to eliminate. `Binding` pairs a value with an argument name.

mod binding;
mod error;

pub use binding::Binding;
pub use error::ConversionFailure;

use bigdecimal::{BigDecimal, FromPrimitive};
use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Ordered field map of an object literal. Field order is preserved as
/// written in the source operation.
pub type ValueObject = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Float(BigDecimal),
    String(String),
    Boolean(bool),
    Id(String),
    Enum(String),
    Null,
    /// An argument that was not supplied at all. Distinct from an explicit
    /// `null` for the purposes of required-argument and default handling.
    Absent,
    List(Vec<Value>),
    Object(ValueObject),
    /// A variable reference retained past elaboration, e.g. in a
    /// runtime-evaluated skip condition.
    Variable(String),
    /// Parser output: an identifier that may be an enum value but has not
    /// been checked against an input type yet.
    UntypedEnum(String),
    /// Parser output: a variable use that has not been resolved against
    /// the operation's variable definitions yet.
    UntypedVariable(String),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn id(s: impl Into<String>) -> Self {
        Value::Id(s.into())
    }

    pub fn float(f: f64) -> Option<Self> {
        BigDecimal::from_f64(f).map(Value::Float)
    }

    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Value::List(values.into_iter().collect())
    }

    pub fn object<K>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self
    where
        K: Into<String>,
    {
        Value::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Id(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<ValueObject> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    /// The value kind as written in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Boolean(_) => "Boolean",
            Value::Id(_) => "ID",
            Value::Enum(_) => "Enum",
            Value::Null => "Null",
            Value::Absent => "Absent",
            Value::List(_) => "List",
            Value::Object(_) => "Object",
            Value::Variable(_) => "Variable",
            Value::UntypedEnum(_) => "Enum",
            Value::UntypedVariable(_) => "Variable",
        }
    }

    /// True if this value or any value nested inside it is one of the
    /// pre-elaboration variants. Successful compilation leaves no such
    /// value reachable from the plan.
    pub fn has_untyped(&self) -> bool {
        match self {
            Value::UntypedEnum(_) | Value::UntypedVariable(_) => true,
            Value::List(vs) => vs.iter().any(Value::has_untyped),
            Value::Object(fields) => fields.values().any(Value::has_untyped),
            _ => false,
        }
    }
}

/// Compares two values of compatible scalar kinds. `None` for pairs that
/// have no defined ordering; null handling is the ordering selection's
/// concern, not ours.
pub fn cmp_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Float(x), Value::Float(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::Float(y)) => Some(BigDecimal::from(*x).cmp(y)),
        (Value::Float(x), Value::Int(y)) => Some(x.cmp(&BigDecimal::from(*y))),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Id(x), Value::Id(y)) => Some(x.cmp(y)),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        (Value::Enum(x), Value::Enum(y)) => Some(x.cmp(y)),
        (Value::List(xs), Value::List(ys)) => {
            for (x, y) in xs.iter().zip(ys.iter()) {
                match cmp_values(x, y)? {
                    Ordering::Equal => continue,
                    other => return Some(other),
                }
            }
            Some(xs.len().cmp(&ys.len()))
        }
        _ => None,
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<BigDecimal> for Value {
    fn from(d: BigDecimal) -> Self {
        Value::Float(d)
    }
}

impl TryFrom<Value> for i64 {
    type Error = ConversionFailure;

    fn try_from(value: Value) -> Result<i64, ConversionFailure> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(ConversionFailure::new(&other, "i64")),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = ConversionFailure;

    fn try_from(value: Value) -> Result<String, ConversionFailure> {
        match value {
            Value::String(s) | Value::Id(s) => Ok(s),
            other => Err(ConversionFailure::new(&other, "String")),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = ConversionFailure;

    fn try_from(value: Value) -> Result<bool, ConversionFailure> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(ConversionFailure::new(&other, "bool")),
        }
    }
}

impl fmt::Display for Value {
    /// Renders the value in GraphQL literal syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(d) => write!(f, "{d}"),
            Value::String(s) | Value::Id(s) => write!(f, "\"{}\"", escape(s)),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Enum(name) | Value::UntypedEnum(name) => f.write_str(name),
            Value::Null => f.write_str("null"),
            Value::Absent => f.write_str("<absent>"),
            Value::List(vs) => {
                f.write_str("[")?;
                for (i, v) in vs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Value::Object(fields) => {
                f.write_str("{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Value::Variable(name) | Value::UntypedVariable(name) => write!(f, "${name}"),
        }
    }
}

fn escape(s: &str) -> String {
    s.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            c => vec![c],
        })
        .collect()
}

impl Serialize for Value {
    /// Serializes to plain JSON shapes for logging and test fixtures.
    /// Variables serialize as their `$name` spelling, `Absent` as null.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(d) => d.serialize(serializer),
            Value::String(s) | Value::Id(s) => serializer.serialize_str(s),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Enum(name) | Value::UntypedEnum(name) => serializer.serialize_str(name),
            Value::Null | Value::Absent => serializer.serialize_none(),
            Value::List(vs) => {
                let mut seq = serializer.serialize_seq(Some(vs.len()))?;
                for v in vs {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Variable(name) | Value::UntypedVariable(name) => {
                serializer.serialize_str(&format!("${name}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_graphql_literals() {
        let value = Value::object([
            ("name", Value::string("Luke\"s")),
            ("ids", Value::list([Value::Int(1), Value::Int(2)])),
            ("mode", Value::Enum("NEWHOPE".to_owned())),
            ("limit", Value::UntypedVariable("n".to_owned())),
        ]);

        assert_eq!(
            value.to_string(),
            r#"{name: "Luke\"s", ids: [1, 2], mode: NEWHOPE, limit: $n}"#
        );
    }

    #[test]
    fn untyped_detection_is_recursive() {
        assert!(!Value::Int(1).has_untyped());
        assert!(Value::UntypedEnum("E".to_owned()).has_untyped());

        let nested = Value::object([("a", Value::list([Value::UntypedVariable("v".to_owned())]))]);
        assert!(nested.has_untyped());
    }

    #[test]
    fn lossy_casts_report_both_sides() {
        let err = i64::try_from(Value::string("4")).unwrap_err();
        assert_eq!(err.kind(), "String");
        assert_eq!(err.target(), "i64");
        assert_eq!(err.to_string(), "String value cannot be read as i64");

        assert_eq!(String::try_from(Value::id("1000")).unwrap(), "1000");
        assert!(bool::try_from(Value::Boolean(true)).unwrap());
    }

    #[test]
    fn mixed_numeric_comparison() {
        let half = Value::float(0.5).unwrap();
        assert_eq!(cmp_values(&Value::Int(1), &half), Some(Ordering::Greater));
        assert_eq!(cmp_values(&Value::Int(1), &Value::string("x")), None);
    }

    #[test]
    fn list_comparison_is_lexicographic() {
        let a = Value::list([Value::Int(1), Value::Int(2)]);
        let b = Value::list([Value::Int(1), Value::Int(3)]);
        let c = Value::list([Value::Int(1)]);

        assert_eq!(cmp_values(&a, &b), Some(Ordering::Less));
        assert_eq!(cmp_values(&a, &c), Some(Ordering::Greater));
    }
}
