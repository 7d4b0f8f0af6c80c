//! Numeric operators with the language's promotion rules.
//!
//! Nil is absorptive. long⊗long stays long (wrapping), any decimal operand promotes to
//! decimal, anything else with a double operand runs in doubles. `/` never stays long and
//! `**` always yields a double.

use crate::error::{lang_error, LangException, Result};
use crate::value::{double_to_decimal, to_double, to_long, Value};
use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, Signed, ToPrimitive, Zero};
use lz_core::error::ErrorCode;

/// Scale of decimal quotients.
pub const DECIMAL_DIVISION_SCALE: i64 = 20;

enum Operands {
    Nil,
    Longs(i64, i64),
    Doubles(f64, f64),
    Decimals(BigDecimal, BigDecimal),
}

fn type_error(verb: &str, left: &Value, right: &Value) -> LangException {
    lang_error(
        ErrorCode::CastError,
        format!(
            "Cannot {} types: {} and {}",
            verb,
            left.value_type(),
            right.value_type()
        ),
    )
}

fn division_by_zero() -> LangException {
    lang_error(ErrorCode::DivisionByZero, "division by zero")
}

fn decimal_operand(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Long(i) => Some(BigDecimal::from(*i)),
        Value::Double(d) => double_to_decimal(*d),
        Value::Decimal(d) => Some(d.clone()),
        _ => None,
    }
}

fn operands(verb: &str, left: &Value, right: &Value) -> Result<Operands> {
    if left.is_nil() || right.is_nil() {
        if (left.is_nil() || left.is_numeric()) && (right.is_nil() || right.is_numeric()) {
            return Ok(Operands::Nil);
        }
        return Err(type_error(verb, left, right));
    }
    match (left, right) {
        (Value::Long(l), Value::Long(r)) => Ok(Operands::Longs(*l, *r)),
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) if left.is_numeric() && right.is_numeric() => {
            // A non-finite double cannot become a decimal; the double result stands.
            match (decimal_operand(left), decimal_operand(right)) {
                (Some(l), Some(r)) => Ok(Operands::Decimals(l, r)),
                _ => Ok(Operands::Doubles(to_double(left)?, to_double(right)?)),
            }
        }
        _ if left.is_numeric() && right.is_numeric() => {
            Ok(Operands::Doubles(to_double(left)?, to_double(right)?))
        }
        _ => Err(type_error(verb, left, right)),
    }
}

pub fn add(left: &Value, right: &Value) -> Result<Value> {
    Ok(match operands("add", left, right)? {
        Operands::Nil => Value::Nil,
        Operands::Longs(l, r) => Value::Long(l.wrapping_add(r)),
        Operands::Doubles(l, r) => Value::Double(l + r),
        Operands::Decimals(l, r) => Value::Decimal(l + r),
    })
}

pub fn subtract(left: &Value, right: &Value) -> Result<Value> {
    Ok(match operands("subtract", left, right)? {
        Operands::Nil => Value::Nil,
        Operands::Longs(l, r) => Value::Long(l.wrapping_sub(r)),
        Operands::Doubles(l, r) => Value::Double(l - r),
        Operands::Decimals(l, r) => Value::Decimal(l - r),
    })
}

pub fn multiply(left: &Value, right: &Value) -> Result<Value> {
    Ok(match operands("multiply", left, right)? {
        Operands::Nil => Value::Nil,
        Operands::Longs(l, r) => Value::Long(l.wrapping_mul(r)),
        Operands::Doubles(l, r) => Value::Double(l * r),
        Operands::Decimals(l, r) => Value::Decimal(l * r),
    })
}

fn scale_of(d: &BigDecimal) -> i64 {
    d.as_bigint_and_exponent().1
}

/// Exact `dividend / divisor` rounded half-up at `scale`, with no intermediate precision cap.
fn scaled_quotient(dividend: &BigDecimal, divisor: &BigDecimal, scale: i64) -> BigDecimal {
    let (mut numerator, dividend_scale) = dividend.as_bigint_and_exponent();
    let (mut denominator, divisor_scale) = divisor.as_bigint_and_exponent();
    let shift = scale - dividend_scale + divisor_scale;
    let ten = BigInt::from(10);
    if shift >= 0 {
        numerator *= ten.pow(shift as u32);
    } else {
        denominator *= ten.pow(shift.unsigned_abs() as u32);
    }
    let mut quotient = &numerator / &denominator;
    let remainder = &numerator % &denominator;
    if remainder.abs() * 2 >= denominator.abs() {
        if numerator.is_negative() == denominator.is_negative() {
            quotient += 1;
        } else {
            quotient -= 1;
        }
    }
    BigDecimal::new(quotient, scale)
}

/// Quotient at `scale` digits, half-up, trailing zeros trimmed but never below the dividend's
/// scale.
fn decimal_quotient(
    dividend: &BigDecimal,
    divisor: &BigDecimal,
    scale: i64,
    floor: i64,
) -> Result<BigDecimal> {
    if divisor.is_zero() {
        return Err(division_by_zero());
    }
    let result = scaled_quotient(dividend, divisor, scale).normalized();
    if scale_of(&result) < floor {
        Ok(result.with_scale(floor))
    } else {
        Ok(result)
    }
}

pub fn divide(left: &Value, right: &Value) -> Result<Value> {
    let operands = operands("divide", left, right)?;
    Ok(match operands {
        Operands::Nil => Value::Nil,
        Operands::Longs(l, r) => Value::Double(l as f64 / r as f64),
        Operands::Doubles(l, r) => match (left, right) {
            // Non-finite double against a decimal.
            (Value::Double(d), Value::Decimal(divisor)) if d.is_infinite() => {
                if *divisor >= BigDecimal::zero() {
                    Value::Double(*d)
                } else {
                    Value::Double(-d)
                }
            }
            (Value::Decimal(_), Value::Double(d)) if d.is_infinite() => {
                Value::Decimal(BigDecimal::zero())
            }
            _ => Value::Double(l / r),
        },
        Operands::Decimals(l, r) => {
            let (scale, floor) = match (left, right) {
                (Value::Decimal(_), Value::Decimal(_)) => {
                    (DECIMAL_DIVISION_SCALE.max(scale_of(&l)), scale_of(&l))
                }
                (Value::Decimal(_), _) => (DECIMAL_DIVISION_SCALE, scale_of(&l)),
                _ => (DECIMAL_DIVISION_SCALE, 0),
            };
            Value::Decimal(decimal_quotient(&l, &r, scale, floor)?)
        }
    })
}

/// `//`: long and double operands only, both truncated to long first.
pub fn int_divide(left: &Value, right: &Value) -> Result<Value> {
    if left.is_nil() || right.is_nil() {
        operands("integer-divide", left, right)?;
        return Ok(Value::Nil);
    }
    match (left, right) {
        (Value::Long(_) | Value::Double(_), Value::Long(_) | Value::Double(_)) => {
            let l = to_long(left)?;
            let r = to_long(right)?;
            if r == 0 {
                return Err(division_by_zero());
            }
            Ok(Value::Long(l.wrapping_div(r)))
        }
        _ => Err(type_error("integer-divide", left, right)),
    }
}

pub fn modulo(left: &Value, right: &Value) -> Result<Value> {
    Ok(match operands("divide", left, right)? {
        Operands::Nil => Value::Nil,
        Operands::Longs(l, r) => {
            if r == 0 {
                return Err(division_by_zero());
            }
            Value::Long(l.wrapping_rem(r))
        }
        Operands::Doubles(l, r) => match (left, right) {
            (Value::Double(d), Value::Decimal(_)) if !d.is_finite() => Value::Double(f64::NAN),
            (Value::Decimal(_), Value::Double(d)) if d.is_infinite() => left.clone(),
            _ => Value::Double(l % r),
        },
        Operands::Decimals(l, r) => {
            if r.is_zero() {
                return Err(division_by_zero());
            }
            Value::Decimal(l % r)
        }
    })
}

pub fn power(left: &Value, right: &Value) -> Result<Value> {
    Ok(match operands("exponentiate", left, right)? {
        Operands::Nil => Value::Nil,
        Operands::Longs(l, r) => Value::Double((l as f64).powf(r as f64)),
        Operands::Doubles(l, r) => Value::Double(l.powf(r)),
        Operands::Decimals(l, r) => Value::Double(
            l.to_f64()
                .unwrap_or(f64::NAN)
                .powf(r.to_f64().unwrap_or(f64::NAN)),
        ),
    })
}

pub fn negate(value: &Value) -> Result<Value> {
    match value {
        Value::Nil => Ok(Value::Nil),
        Value::Long(i) => Ok(Value::Long(i.wrapping_neg())),
        Value::Double(d) => Ok(Value::Double(-d)),
        Value::Decimal(d) => Ok(Value::Decimal(-d.clone())),
        other => Err(lang_error(
            ErrorCode::CastError,
            format!("Cannot negate type: {}", other.value_type()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(text: &str) -> Value {
        Value::Decimal(BigDecimal::from_str(text).unwrap())
    }

    #[test]
    fn long_division_yields_double() {
        assert_eq!(divide(&Value::long(7), &Value::long(2)).unwrap(), Value::double(3.5));
        assert_eq!(
            divide(&Value::long(1), &Value::long(0)).unwrap(),
            Value::double(f64::INFINITY)
        );
    }

    #[test]
    fn decimal_division_rounds_half_up_at_scale_20() {
        let third = divide(&dec("1"), &dec("3")).unwrap();
        assert_eq!(third.to_string(), "0.33333333333333333333d");
        let two_thirds = divide(&dec("2"), &dec("3")).unwrap();
        assert_eq!(two_thirds.to_string(), "0.66666666666666666667d");
    }

    #[test]
    fn negative_decimal_quotients_round_away_from_zero_on_half() {
        let result = divide(&dec("-2"), &dec("3")).unwrap();
        assert_eq!(result.to_string(), "-0.66666666666666666667d");
        let half = scaled_quotient(
            &BigDecimal::from_str("-1").unwrap(),
            &BigDecimal::from_str("8").unwrap(),
            2,
        );
        assert_eq!(half, BigDecimal::from_str("-0.13").unwrap());
    }

    #[test]
    fn decimal_quotient_keeps_dividend_scale() {
        let result = divide(&dec("10.00"), &Value::long(2)).unwrap();
        let Value::Decimal(d) = result else {
            panic!("expected decimal");
        };
        assert_eq!(scale_of(&d), 2);
        assert_eq!(d, BigDecimal::from_str("5").unwrap());
    }

    #[test]
    fn decimal_division_by_zero_fails() {
        let err = divide(&dec("1"), &dec("0")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DivisionByZero);
    }

    #[test]
    fn integer_division_truncates_doubles() {
        assert_eq!(
            int_divide(&Value::double(7.9), &Value::long(2)).unwrap(),
            Value::long(3)
        );
        let err = int_divide(&Value::long(1), &Value::double(0.5)).unwrap_err();
        assert_eq!(err.code, ErrorCode::DivisionByZero);
        let err = int_divide(&dec("4"), &Value::long(2)).unwrap_err();
        assert_eq!(err.code, ErrorCode::CastError);
    }

    #[test]
    fn modulo_by_zero() {
        let err = modulo(&Value::long(1), &Value::long(0)).unwrap_err();
        assert_eq!(err.code, ErrorCode::DivisionByZero);
        assert!(matches!(
            modulo(&Value::double(1.0), &Value::double(0.0)).unwrap(),
            Value::Double(d) if d.is_nan()
        ));
    }

    #[test]
    fn nil_absorbs_and_strings_fail() {
        assert_eq!(add(&Value::Nil, &Value::long(1)).unwrap(), Value::Nil);
        let err = add(&Value::string("a"), &Value::long(1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::CastError);
        assert_eq!(
            add(&Value::long(i64::MAX), &Value::long(1)).unwrap(),
            Value::long(i64::MIN)
        );
    }

    #[test]
    fn power_is_always_double() {
        assert_eq!(power(&Value::long(2), &Value::long(10)).unwrap(), Value::double(1024.0));
    }
}
