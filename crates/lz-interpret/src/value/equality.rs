use super::cast::double_to_decimal;
use super::Value;
use crate::error::{lang_error, Result};
use bigdecimal::{BigDecimal, ToPrimitive};
use lz_core::error::ErrorCode;
use std::cmp::Ordering;
use std::sync::Arc;

/// `===`: same kind and same value. Doubles compare by bits, so `NaN === NaN`.
pub fn identical(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Nil, Value::Nil) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Long(a), Value::Long(b)) => a == b,
        (Value::Double(a), Value::Double(b)) => {
            a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
        }
        (Value::Decimal(a), Value::Decimal(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::DateTime(a), Value::DateTime(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            Arc::ptr_eq(a, b)
                || (a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| identical(a, b)))
        }
        (Value::Dict(a), Value::Dict(b)) => {
            Arc::ptr_eq(a, b)
                || (a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && identical(va, vb)))
        }
        (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// `==`: numbers compare by magnitude across kinds, containers structurally.
pub fn value_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Long(_) | Value::Double(_) | Value::Decimal(_), _) if b.is_numeric() => {
            numeric_cmp(a, b) == Some(Ordering::Equal)
        }
        (Value::List(a), Value::List(b)) => {
            Arc::ptr_eq(a, b)
                || (a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| value_equals(a, b)))
        }
        (Value::Dict(a), Value::Dict(b)) => {
            Arc::ptr_eq(a, b)
                || (a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && value_equals(va, vb)))
        }
        _ => identical(a, b),
    }
}

fn numeric_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Long(a), Value::Long(b)) => Some(a.cmp(b)),
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) => {
            match (exact_decimal(a), exact_decimal(b)) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => approx(a)?.partial_cmp(&approx(b)?),
            }
        }
        _ => approx(a)?.partial_cmp(&approx(b)?),
    }
}

fn exact_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Long(i) => Some(BigDecimal::from(*i)),
        Value::Double(d) => double_to_decimal(*d),
        Value::Decimal(d) => Some(d.clone()),
        _ => None,
    }
}

fn approx(value: &Value) -> Option<f64> {
    match value {
        Value::Long(i) => Some(*i as f64),
        Value::Double(d) => Some(*d),
        Value::Decimal(d) => d.to_f64(),
        _ => None,
    }
}

/// Ordering for `< <= > >=`. `None` means the comparison is false, as with nil or NaN
/// operands.
pub fn compare(a: &Value, b: &Value) -> Result<Option<Ordering>> {
    if a.is_nil() || b.is_nil() {
        return Ok(None);
    }
    if a.is_numeric() && b.is_numeric() {
        return Ok(numeric_cmp(a, b));
    }
    match (a, b) {
        (Value::DateTime(a), Value::DateTime(b)) => Ok(Some(a.cmp(b))),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        _ => Err(lang_error(
            ErrorCode::CastError,
            format!("Cannot compare {} and {}", a.value_type(), b.value_type()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn numbers_are_equal_across_kinds() {
        let decimal = Value::Decimal(BigDecimal::from_str("2.0").unwrap());
        assert!(value_equals(&Value::long(2), &Value::double(2.0)));
        assert!(value_equals(&Value::long(2), &decimal));
        assert!(!identical(&Value::long(2), &Value::double(2.0)));
    }

    #[test]
    fn nan_is_identical_but_not_equal() {
        let nan = Value::double(f64::NAN);
        assert!(identical(&nan, &nan));
        assert!(!value_equals(&nan, &nan));
    }

    #[test]
    fn nil_never_orders() {
        assert_eq!(compare(&Value::Nil, &Value::long(1)).unwrap(), None);
        assert!(compare(&Value::list(vec![]), &Value::long(1)).is_err());
    }
}
