use super::{format_double, Value};
use crate::error::{lang_error, Result};
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use chrono::{DateTime, Datelike, Timelike};
use lz_core::ast::Type;
use lz_core::error::ErrorCode;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

fn cannot_cast(value: &Value, ty: Type) -> crate::error::LangException {
    lang_error(
        ErrorCode::CastError,
        format!("Cannot cast {} to {}", value.value_type(), ty),
    )
}

/// Converts `value` to `ty`. Nil passes through every cast except to boolean.
pub fn cast(value: Value, ty: Type) -> Result<Value> {
    match ty {
        Type::Any => Ok(value),
        Type::Void => Ok(Value::Nil),
        Type::Boolean => Ok(Value::bool(truthy(&value))),
        _ if value.is_nil() => Ok(Value::Nil),
        _ if value.value_type() == ty => Ok(value),
        Type::Long => to_long(&value).map(Value::Long),
        Type::Double => to_double(&value).map(Value::Double),
        Type::Decimal => to_decimal(&value).map(Value::Decimal),
        Type::String => to_plain_string(&value).map(|s| Value::String(Arc::from(s))),
        Type::DateTime => match &value {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(Value::DateTime)
                .map_err(|_| {
                    lang_error(
                        ErrorCode::CastError,
                        format!("Cannot cast {} to datetime", value),
                    )
                }),
            _ => Err(cannot_cast(&value, ty)),
        },
        Type::List => match &value {
            Value::Dict(dict) => Ok(Value::list(
                dict.iter()
                    .flat_map(|(key, value)| [Value::string(key), value.clone()])
                    .collect(),
            )),
            Value::String(s) => Ok(Value::list(
                s.chars()
                    .map(|c| Value::string(c.encode_utf8(&mut [0; 4])))
                    .collect(),
            )),
            _ => Err(cannot_cast(&value, ty)),
        },
        Type::Dict => match &value {
            Value::List(list) => {
                if list.len() % 2 != 0 {
                    return Err(lang_error(
                        ErrorCode::CastError,
                        "Cannot cast list with odd number of items to dict",
                    ));
                }
                let mut dict = BTreeMap::new();
                for pair in list.chunks(2) {
                    let key = to_plain_string(&pair[0])?;
                    dict.insert(key, pair[1].clone());
                }
                Ok(Value::Dict(Arc::new(dict)))
            }
            Value::DateTime(dt) => Ok(Value::dict([
                ("year".to_string(), Value::long(dt.year() as i64)),
                ("month".to_string(), Value::long(dt.month() as i64)),
                ("day_of_month".to_string(), Value::long(dt.day() as i64)),
                ("hour".to_string(), Value::long(dt.hour() as i64)),
                ("minute".to_string(), Value::long(dt.minute() as i64)),
                ("second".to_string(), Value::long(dt.second() as i64)),
                ("nano_of_second".to_string(), Value::long(dt.nanosecond() as i64)),
                ("day_of_year".to_string(), Value::long(dt.ordinal() as i64)),
                (
                    "day_of_week".to_string(),
                    Value::long(dt.weekday().number_from_monday() as i64),
                ),
                ("week_of_year".to_string(), Value::long(dt.iso_week().week() as i64)),
                (
                    "offset_seconds".to_string(),
                    Value::long(dt.offset().local_minus_utc() as i64),
                ),
                ("zone".to_string(), Value::string(&dt.offset().to_string())),
            ])),
            _ => Err(cannot_cast(&value, ty)),
        },
        Type::Function => Err(cannot_cast(&value, ty)),
    }
}

/// Boolean view of a value: nil, false, zero, NaN and empty containers are false.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Boolean(b) => *b,
        Value::Long(i) => *i != 0,
        Value::Double(d) => !(d.is_nan() || *d == 0.0),
        Value::Decimal(d) => !d.is_zero(),
        Value::String(s) => !s.is_empty(),
        Value::List(list) => !list.is_empty(),
        Value::Dict(dict) => !dict.is_empty(),
        Value::DateTime(_) | Value::Function(_) => true,
    }
}

pub fn to_long(value: &Value) -> Result<i64> {
    match value {
        Value::Long(i) => Ok(*i),
        Value::Boolean(b) => Ok(*b as i64),
        Value::Double(d) => Ok(*d as i64),
        Value::Decimal(d) => d.with_scale(0).to_i64().ok_or_else(|| {
            lang_error(ErrorCode::CastError, format!("Cannot cast {}d to long", d))
        }),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            lang_error(ErrorCode::CastError, format!("Cannot cast {:?} to long", s))
        }),
        other => Err(cannot_cast(other, Type::Long)),
    }
}

pub fn to_double(value: &Value) -> Result<f64> {
    match value {
        Value::Double(d) => Ok(*d),
        Value::Long(i) => Ok(*i as f64),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Decimal(d) => Ok(d.to_f64().unwrap_or(f64::NAN)),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| {
            lang_error(ErrorCode::CastError, format!("Cannot cast {:?} to double", s))
        }),
        other => Err(cannot_cast(other, Type::Double)),
    }
}

pub fn to_decimal(value: &Value) -> Result<BigDecimal> {
    match value {
        Value::Decimal(d) => Ok(d.clone()),
        Value::Long(i) => Ok(BigDecimal::from(*i)),
        Value::Boolean(b) => Ok(BigDecimal::from(*b as i64)),
        Value::Double(d) => Ok(double_to_decimal(*d).unwrap_or_else(BigDecimal::zero)),
        Value::String(s) => BigDecimal::from_str(s.trim()).map_err(|_| {
            lang_error(ErrorCode::CastError, format!("Cannot cast {:?} to decimal", s))
        }),
        other => Err(cannot_cast(other, Type::Decimal)),
    }
}

/// Exact decimal form of a finite double's shortest representation.
pub fn double_to_decimal(d: f64) -> Option<BigDecimal> {
    if !d.is_finite() {
        return None;
    }
    BigDecimal::from_str(&d.to_string()).ok()
}

/// Unquoted string form, as produced by `as string` and `..`.
pub fn to_plain_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        Value::Long(i) => Ok(i.to_string()),
        Value::Double(d) => Ok(format_double(*d)),
        Value::Decimal(d) => Ok(d.to_string()),
        Value::DateTime(dt) => Ok(dt.to_rfc3339()),
        Value::Nil => Ok("nil".to_string()),
        other => Err(cannot_cast(other, Type::String)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nil_passes_through_except_to_boolean() {
        assert_eq!(cast(Value::Nil, Type::Long).unwrap(), Value::Nil);
        assert_eq!(cast(Value::Nil, Type::Boolean).unwrap(), Value::FALSE);
    }

    #[test]
    fn numeric_casts_truncate() {
        assert_eq!(cast(Value::double(2.9), Type::Long).unwrap(), Value::long(2));
        let decimal = Value::decimal(BigDecimal::from_str("-7.5").unwrap());
        assert_eq!(cast(decimal, Type::Long).unwrap(), Value::long(-7));
        assert_eq!(cast(Value::string(" 42 "), Type::Long).unwrap(), Value::long(42));
    }

    #[test]
    fn boolean_cast_follows_emptiness() {
        assert_eq!(cast(Value::list(vec![]), Type::Boolean).unwrap(), Value::FALSE);
        assert_eq!(cast(Value::string("x"), Type::Boolean).unwrap(), Value::TRUE);
        assert_eq!(cast(Value::double(f64::NAN), Type::Boolean).unwrap(), Value::FALSE);
    }

    #[test]
    fn lists_and_dicts_convert_pairwise() {
        let list = Value::list(vec![Value::string("a"), Value::long(1)]);
        let dict = cast(list.clone(), Type::Dict).unwrap();
        assert_eq!(dict, Value::dict([("a".to_string(), Value::long(1))]));
        assert_eq!(cast(dict, Type::List).unwrap(), list);

        let odd = Value::list(vec![Value::string("a")]);
        let err = cast(odd, Type::Dict).unwrap_err();
        assert_eq!(err.code, ErrorCode::CastError);
    }

    #[test]
    fn containers_do_not_cast_to_string() {
        let err = cast(Value::list(vec![]), Type::String).unwrap_err();
        assert_eq!(err.message, "Cannot cast list to string");
    }
}
