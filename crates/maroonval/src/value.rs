use std::cmp::Ordering;
use std::fmt;

/// A boxed runtime value. The type universe is the two base types plus
/// their derived optionals; nothing is implicitly convertible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    U64(u64),
    Bool(bool),
    OptU64(Option<u64>),
    OptBool(Option<bool>),
}

impl Value {
    /// The runtime type name, as it appears in type-mismatch diagnostics
    /// and in argument-type checks.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::U64(_) => "U64",
            Value::Bool(_) => "BOOL",
            Value::OptU64(_) => "OPTIONAL_U64",
            Value::OptBool(_) => "OPTIONAL_BOOL",
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Value::OptU64(_) | Value::OptBool(_))
    }

    /// The empty optional of the named derived type, if there is one.
    pub fn none_of(type_name: &str) -> Option<Value> {
        match type_name {
            "OPTIONAL_U64" => Some(Value::OptU64(None)),
            "OPTIONAL_BOOL" => Some(Value::OptBool(None)),
            _ => None,
        }
    }

    /// Wraps a base value into its derived optional.
    pub fn some_of(inner: &Value) -> Option<Value> {
        match inner {
            Value::U64(v) => Some(Value::OptU64(Some(*v))),
            Value::Bool(v) => Some(Value::OptBool(Some(*v))),
            _ => None,
        }
    }

    /// The payload of a non-empty optional, re-boxed as its base type.
    pub fn unwrap_some(&self) -> Option<Value> {
        match self {
            Value::OptU64(Some(v)) => Some(Value::U64(*v)),
            Value::OptBool(Some(v)) => Some(Value::Bool(*v)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U64(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::OptU64(None) | Value::OptBool(None) => write!(f, "None"),
            Value::OptU64(Some(v)) => write!(f, "Some({})", v),
            Value::OptBool(Some(v)) => write!(f, "Some({})", v),
        }
    }
}

// Arithmetic is unsigned 64-bit, so it wraps. `None` means a non-`U64`
// operand; the caller owns the diagnostic since it knows the variable name.

pub fn u64_add(a: &Value, b: &Value) -> Option<Value> {
    Some(Value::U64(a.as_u64()?.wrapping_add(b.as_u64()?)))
}

pub fn u64_sub(a: &Value, b: &Value) -> Option<Value> {
    Some(Value::U64(a.as_u64()?.wrapping_sub(b.as_u64()?)))
}

pub fn u64_mul(a: &Value, b: &Value) -> Option<Value> {
    Some(Value::U64(a.as_u64()?.wrapping_mul(b.as_u64()?)))
}

pub fn u64_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    Some(a.as_u64()?.cmp(&b.as_u64()?))
}
