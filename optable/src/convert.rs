//! Argument-string converters for typed options.
//!
//! A [`Converter`] turns the raw argument string of a typed option into a
//! [`Value`]. Its type name also drives the default metavar shown in help
//! output (`int` → `INT`).

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

type ConvertFn = dyn Fn(&str) -> Result<Value, ConvertError> + Send + Sync;

/// Why a conversion did not produce a value.
#[derive(Debug)]
pub enum ConvertError {
    /// The argument string does not parse as the target type. Translated by
    /// the dispatcher into an invocation error naming the option and metavar.
    Invalid,
    /// Any other converter failure. Propagated to the caller unmodified.
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// A named string-to-[`Value`] conversion.
///
/// # Examples
///
/// ```
/// use optable::{Converter, Value};
///
/// let int = Converter::int();
/// assert_eq!(int.type_name(), "int");
/// assert_eq!(int.convert("42").unwrap(), Value::Int(42));
/// assert!(int.convert("foobly").is_err());
/// ```
#[derive(Clone)]
pub struct Converter {
    type_name: &'static str,
    convert: Arc<ConvertFn>,
}

impl Converter {
    /// Wraps a custom conversion function under a type name.
    ///
    /// The name, uppercased, becomes the option's default metavar.
    pub fn new<F>(type_name: &'static str, convert: F) -> Self
    where
        F: Fn(&str) -> Result<Value, ConvertError> + Send + Sync + 'static,
    {
        Converter {
            type_name,
            convert: Arc::new(convert),
        }
    }

    /// Converter for signed integers.
    pub fn int() -> Self {
        Converter::new("int", |raw| {
            raw.trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| ConvertError::Invalid)
        })
    }

    /// Converter for floating-point numbers.
    pub fn float() -> Self {
        Converter::new("float", |raw| {
            raw.trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| ConvertError::Invalid)
        })
    }

    /// Converter that passes the argument string through unchanged.
    pub fn str() -> Self {
        Converter::new("str", |raw| Ok(Value::Str(raw.to_string())))
    }

    /// The converter's type name (e.g. `"int"`).
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Runs the conversion.
    pub fn convert(&self, raw: &str) -> Result<Value, ConvertError> {
        (*self.convert)(raw)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Converter").field(&self.type_name).finish()
    }
}
