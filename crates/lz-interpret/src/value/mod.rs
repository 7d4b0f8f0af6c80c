//! Runtime values and the narrow value-library contract the interpreter relies on: kinds,
//! equality, casts and function invocation.

mod cast;
mod curried;
mod equality;
mod function;

pub use cast::*;
pub use curried::*;
pub use equality::*;
pub use function::*;

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use lz_core::ast::{Literal, Type};
use lz_core::error::ErrorCode;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{lang_error, Result};

pub type ValueList = Arc<Vec<Value>>;
pub type ValueDict = Arc<BTreeMap<String, Value>>;

/// Immutable runtime value. Containers share their storage, so cloning is cheap.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Boolean(bool),
    Long(i64),
    Double(f64),
    Decimal(BigDecimal),
    String(Arc<str>),
    DateTime(DateTime<FixedOffset>),
    List(ValueList),
    Dict(ValueDict),
    Function(Arc<FunctionValue>),
}

impl Value {
    pub const NIL: Value = Value::Nil;
    pub const TRUE: Value = Value::Boolean(true);
    pub const FALSE: Value = Value::Boolean(false);

    pub fn bool(b: bool) -> Value {
        if b {
            Value::TRUE
        } else {
            Value::FALSE
        }
    }
    pub fn long(i: i64) -> Value {
        Value::Long(i)
    }
    pub fn double(d: f64) -> Value {
        Value::Double(d)
    }
    pub fn decimal(d: BigDecimal) -> Value {
        Value::Decimal(d)
    }
    pub fn string(s: &str) -> Value {
        Value::String(Arc::from(s))
    }
    pub fn list(values: Vec<Value>) -> Value {
        Value::List(Arc::new(values))
    }
    pub fn dict(entries: impl IntoIterator<Item = (String, Value)>) -> Value {
        Value::Dict(Arc::new(entries.into_iter().collect()))
    }
    pub fn function(function: FunctionValue) -> Value {
        Value::Function(Arc::new(function))
    }

    /// Parses a literal from the syntax tree.
    pub fn from_literal(literal: &Literal) -> Result<Value> {
        Ok(match literal {
            Literal::Nil => Value::Nil,
            Literal::Boolean(b) => Value::bool(*b),
            Literal::Long(i) => Value::Long(*i),
            Literal::Double(d) => Value::Double(*d),
            Literal::Decimal(text) => Value::Decimal(BigDecimal::from_str(text).map_err(|_| {
                lang_error(ErrorCode::CastError, format!("Invalid decimal literal {}", text))
            })?),
            Literal::String(s) => Value::string(s),
            Literal::DateTime(text) => {
                Value::DateTime(DateTime::parse_from_rfc3339(text).map_err(|_| {
                    lang_error(ErrorCode::CastError, format!("Invalid datetime literal {}", text))
                })?)
            }
        })
    }

    pub fn value_type(&self) -> Type {
        match self {
            Value::Nil => Type::Void,
            Value::Boolean(_) => Type::Boolean,
            Value::Long(_) => Type::Long,
            Value::Double(_) => Type::Double,
            Value::Decimal(_) => Type::Decimal,
            Value::String(_) => Type::String,
            Value::DateTime(_) => Type::DateTime,
            Value::List(_) => Type::List,
            Value::Dict(_) => Type::Dict,
            Value::Function(_) => Type::Function,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_) | Value::Decimal(_))
    }

    pub fn as_function(&self) -> Option<&Arc<FunctionValue>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ValueList> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&ValueDict> {
        match self {
            Value::Dict(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Nil => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Long(i) => Json::from(*i),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Decimal(d) => Json::String(d.to_string()),
            Value::String(s) => Json::String(s.to_string()),
            Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
            Value::List(list) => Json::Array(list.iter().map(Value::to_json).collect()),
            Value::Dict(dict) => Json::Object(
                dict.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Function(_) => Json::String("function".to_string()),
        }
    }
}

/// `PartialEq` is identity of kind and value, the `===` relation.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        identical(self, other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

/// Formats a double the way the language prints them: always with a fraction or exponent.
pub fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d.is_infinite() {
        if d > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if d.fract() == 0.0 && d.abs() < 1e16 {
        format!("{:.1}", d)
    } else {
        format!("{}", d)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Long(i) => write!(f, "{}", i),
            Value::Double(d) => f.write_str(&format_double(*d)),
            Value::Decimal(d) => write!(f, "{}d", d),
            Value::String(s) => write!(f, "{:?}", s),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339()),
            Value::List(list) => write!(f, "[{}]", list.iter().join(", ")),
            Value::Dict(dict) => write!(
                f,
                "{{{}}}",
                dict.iter()
                    .map(|(key, value)| format!(":{} {}", key, value))
                    .join(", ")
            ),
            Value::Function(function) => write!(f, "function{}", function.signature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn doubles_print_with_a_fraction() {
        assert_eq!(format_double(1.0), "1.0");
        assert_eq!(format_double(0.5), "0.5");
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn containers_print_their_items() {
        let value = Value::dict([
            ("a".to_string(), Value::list(vec![Value::long(1), Value::string("x")])),
            ("b".to_string(), Value::Nil),
        ]);
        assert_eq!(value.to_string(), r#"{:a [1, "x"], :b nil}"#);
    }

    #[test]
    fn literals_parse_into_values() {
        let decimal = Value::from_literal(&Literal::Decimal("1.50".into())).unwrap();
        assert_eq!(decimal.value_type(), Type::Decimal);
        let err = Value::from_literal(&Literal::DateTime("yesterday".into())).unwrap_err();
        assert_eq!(err.code, ErrorCode::CastError);
    }
}
