use super::arithmetic;
use super::Op;
use super::OpKind;
use crate::context::EvalContext;
use crate::error::Result;
use crate::memory::Space;
use crate::value::{compare, identical, to_plain_string, truthy, value_equals, Value};
use lz_core::ast::{BinaryOp, Type, UnaryOp};
use lz_core::trace;
use std::cmp::Ordering;
use std::sync::Arc;

/// Operand specialization of an arithmetic node. A specialized node still handles every
/// operand pair; it only tries its fast path first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericMode {
    Generic,
    LongLong,
    DoubleDouble,
}

#[derive(Debug, Clone)]
pub struct BinaryNode {
    pub op: BinaryOp,
    pub left: Box<Op>,
    pub right: Box<Op>,
    pub mode: NumericMode,
}

impl BinaryNode {
    pub fn new(op: BinaryOp, left: Op, right: Op) -> Self {
        Self {
            op,
            left: Box::new(left),
            right: Box::new(right),
            mode: NumericMode::Generic,
        }
    }

    fn is_arithmetic(&self) -> bool {
        matches!(
            self.op,
            BinaryOp::Plus
                | BinaryOp::Minus
                | BinaryOp::Mult
                | BinaryOp::Div
                | BinaryOp::IntDiv
                | BinaryOp::Mod
                | BinaryOp::Pow
        )
    }

    pub fn is_constant(&self) -> bool {
        match self.op {
            BinaryOp::Plus
            | BinaryOp::Minus
            | BinaryOp::Mult
            | BinaryOp::And
            | BinaryOp::Or
            | BinaryOp::Concat
            | BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Identical
            | BinaryOp::NotIdentical => self.left.is_constant() && self.right.is_constant(),
            _ => false,
        }
    }

    pub fn static_type(&self) -> Type {
        match self.op {
            BinaryOp::Plus | BinaryOp::Minus | BinaryOp::Mult | BinaryOp::Mod => {
                Type::numeric_result(self.left.static_type(), self.right.static_type())
            }
            BinaryOp::Div => match (self.left.static_type(), self.right.static_type()) {
                (l, r) if l == Type::Decimal || r == Type::Decimal => {
                    Type::numeric_result(l, r)
                }
                (l, r) if l.is_numeric() && r.is_numeric() => Type::Double,
                _ => Type::Any,
            },
            BinaryOp::IntDiv => Type::Long,
            BinaryOp::Pow => Type::Double,
            BinaryOp::Concat => Type::String,
            _ => Type::Boolean,
        }
    }

    pub fn specialize(self) -> OpKind {
        if !self.is_arithmetic() || self.mode != NumericMode::Generic {
            return OpKind::Binary(self);
        }
        let mode = match (self.left.static_type(), self.right.static_type()) {
            (Type::Long, Type::Long) => NumericMode::LongLong,
            (Type::Double, Type::Double) => NumericMode::DoubleDouble,
            _ => NumericMode::Generic,
        };
        if mode != NumericMode::Generic {
            trace!("specialized {} to {:?}", self.op.symbol(), mode);
        }
        OpKind::Binary(BinaryNode { mode, ..self })
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        match self.op {
            BinaryOp::And => {
                let left = self.left.eval(space, ctx)?;
                if !truthy(&left) {
                    return Ok(Value::FALSE);
                }
                let right = self.right.eval(space, ctx)?;
                Ok(Value::bool(truthy(&right)))
            }
            BinaryOp::Or => {
                let left = self.left.eval(space, ctx)?;
                if truthy(&left) {
                    return Ok(Value::TRUE);
                }
                let right = self.right.eval(space, ctx)?;
                Ok(Value::bool(truthy(&right)))
            }
            _ => {
                let left = self.left.eval(space, ctx)?;
                let right = self.right.eval(space, ctx)?;
                self.apply(&left, &right)
            }
        }
    }

    fn fast_path(&self, left: &Value, right: &Value) -> Option<Value> {
        match (self.mode, left, right) {
            (NumericMode::LongLong, Value::Long(l), Value::Long(r)) => match self.op {
                BinaryOp::Plus => Some(Value::Long(l.wrapping_add(*r))),
                BinaryOp::Minus => Some(Value::Long(l.wrapping_sub(*r))),
                BinaryOp::Mult => Some(Value::Long(l.wrapping_mul(*r))),
                BinaryOp::Div => Some(Value::Double(*l as f64 / *r as f64)),
                _ => None,
            },
            (NumericMode::DoubleDouble, Value::Double(l), Value::Double(r)) => match self.op {
                BinaryOp::Plus => Some(Value::Double(l + r)),
                BinaryOp::Minus => Some(Value::Double(l - r)),
                BinaryOp::Mult => Some(Value::Double(l * r)),
                BinaryOp::Div => Some(Value::Double(l / r)),
                BinaryOp::Mod => Some(Value::Double(l % r)),
                BinaryOp::Pow => Some(Value::Double(l.powf(*r))),
                _ => None,
            },
            _ => None,
        }
    }

    fn apply(&self, left: &Value, right: &Value) -> Result<Value> {
        if let Some(value) = self.fast_path(left, right) {
            return Ok(value);
        }
        let ordered = |accept: fn(Ordering) -> bool| -> Result<Value> {
            Ok(Value::bool(compare(left, right)?.is_some_and(accept)))
        };
        match self.op {
            BinaryOp::Plus => arithmetic::add(left, right),
            BinaryOp::Minus => arithmetic::subtract(left, right),
            BinaryOp::Mult => arithmetic::multiply(left, right),
            BinaryOp::Div => arithmetic::divide(left, right),
            BinaryOp::IntDiv => arithmetic::int_divide(left, right),
            BinaryOp::Mod => arithmetic::modulo(left, right),
            BinaryOp::Pow => arithmetic::power(left, right),
            BinaryOp::Equal => Ok(Value::bool(value_equals(left, right))),
            BinaryOp::NotEqual => Ok(Value::bool(!value_equals(left, right))),
            BinaryOp::Identical => Ok(Value::bool(identical(left, right))),
            BinaryOp::NotIdentical => Ok(Value::bool(!identical(left, right))),
            BinaryOp::LessThan => ordered(Ordering::is_lt),
            BinaryOp::LessThanOrEqual => ordered(Ordering::is_le),
            BinaryOp::GreaterThan => ordered(Ordering::is_gt),
            BinaryOp::GreaterThanOrEqual => ordered(Ordering::is_ge),
            BinaryOp::Concat => {
                if left.is_nil() || right.is_nil() {
                    return Ok(Value::Nil);
                }
                let mut joined = to_plain_string(left)?;
                joined.push_str(&to_plain_string(right)?);
                Ok(Value::string(&joined))
            }
            // Short-circuited in `eval`.
            BinaryOp::And => Ok(Value::bool(truthy(left) && truthy(right))),
            BinaryOp::Or => Ok(Value::bool(truthy(left) || truthy(right))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnaryNode {
    pub op: UnaryOp,
    pub operand: Box<Op>,
}

impl UnaryNode {
    pub fn static_type(&self) -> Type {
        match self.op {
            UnaryOp::Negate => self.operand.static_type(),
            UnaryOp::Not => Type::Boolean,
        }
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let value = self.operand.eval(space, ctx)?;
        match self.op {
            UnaryOp::Negate => arithmetic::negate(&value),
            UnaryOp::Not => Ok(Value::bool(!truthy(&value))),
        }
    }
}
