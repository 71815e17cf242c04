//! Dynamic values exchanged between converters, dispatch actions, and bound
//! fields.
//!
//! Converters produce a [`Value`]; dispatch actions combine values (`Add`
//! accumulates, `Append` pushes onto a list) and hand the result to a bound
//! field through the [`FieldValue`] conversion trait. Keeping this bridge
//! dynamic lets one registry entry type cover fields of different Rust types
//! without reflection.

use std::fmt;

use thiserror::Error;

/// A dynamically typed option value.
///
/// # Examples
///
/// ```
/// use optable::Value;
///
/// let a = Value::Int(23);
/// let b = Value::Int(32);
/// assert_eq!(a.add(b).unwrap(), Value::Int(55));
///
/// let mut libs = Value::List(vec![]);
/// libs.push(Value::Str("abc".into())).unwrap();
/// assert_eq!(libs, Value::List(vec![Value::Str("abc".into())]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(String),
    /// List of values (the target of `Append` options).
    List(Vec<Value>),
}

/// Errors from value combination or field conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The two operand types cannot be accumulated with `Add`.
    #[error("cannot add {rhs} to {lhs}")]
    Add {
        /// Type name of the current field value.
        lhs: &'static str,
        /// Type name of the resolved option value.
        rhs: &'static str,
    },
    /// `Append` was dispatched against a non-list field.
    #[error("cannot append to non-list value of type {0}")]
    Append(&'static str),
    /// Integer accumulation overflowed.
    #[error("integer overflow adding {rhs} to {lhs}")]
    Overflow {
        /// The current field value.
        lhs: i64,
        /// The resolved option value.
        rhs: i64,
    },
    /// A resolved value did not match the bound field's type.
    #[error("expected {expected} value, got {actual}")]
    Mismatch {
        /// Type the bound field expects.
        expected: &'static str,
        /// Type the resolved value actually has.
        actual: &'static str,
    },
}

impl Value {
    /// Returns the lowercase type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
        }
    }

    /// Accumulates `rhs` onto this value.
    ///
    /// Integers and floats add numerically (mixed operands widen to float),
    /// strings concatenate, lists extend. Anything else is a type error.
    pub fn add(self, rhs: Value) -> Result<Value, ValueError> {
        match (self, rhs) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(b)
                .map(Value::Int)
                .ok_or(ValueError::Overflow { lhs: a, rhs: b }),
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (Value::Int(a), Value::Float(b)) => Ok(Value::Float(a as f64 + b)),
            (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + b as f64)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Ok(Value::List(a))
            }
            (lhs, rhs) => Err(ValueError::Add {
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            }),
        }
    }

    /// Appends `item` to this value, which must be a list.
    pub fn push(&mut self, item: Value) -> Result<(), ValueError> {
        match self {
            Value::List(items) => {
                items.push(item);
                Ok(())
            }
            other => Err(ValueError::Append(other.type_name())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Conversion between a typed field and the dynamic [`Value`] carried through
/// dispatch.
///
/// Implemented for the field types a declaration can bind: `bool`, `i64`,
/// `f64`, `String`, and `Vec<V>` of any of those.
pub trait FieldValue: Sized {
    /// Wraps the field value into a dynamic [`Value`].
    fn into_value(self) -> Value;

    /// Extracts a field value, failing on type mismatch.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

impl FieldValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(ValueError::Mismatch {
                expected: "bool",
                actual: other.type_name(),
            }),
        }
    }
}

impl FieldValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Int(v) => Ok(v),
            other => Err(ValueError::Mismatch {
                expected: "int",
                actual: other.type_name(),
            }),
        }
    }
}

impl FieldValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f64),
            other => Err(ValueError::Mismatch {
                expected: "float",
                actual: other.type_name(),
            }),
        }
    }
}

impl FieldValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Str(v) => Ok(v),
            other => Err(ValueError::Mismatch {
                expected: "str",
                actual: other.type_name(),
            }),
        }
    }
}

impl<V: FieldValue> FieldValue for Vec<V> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(FieldValue::into_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::List(items) => items.into_iter().map(V::from_value).collect(),
            other => Err(ValueError::Mismatch {
                expected: "list",
                actual: other.type_name(),
            }),
        }
    }
}
