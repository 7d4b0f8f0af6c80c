use super::{Op, OpKind};
use crate::context::EvalContext;
use crate::error::Result;
use crate::lang_bail;
use crate::memory::Space;
use crate::value::{CallArgument, FunctionValue, Value};
use lz_core::error::ErrorCode;
use lz_core::trace;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum ArgOp {
    Positional(Op),
    Named(String, Op),
    Splat(Op),
}

fn callable(value: Value) -> Result<Arc<FunctionValue>> {
    match value {
        Value::Function(function) => Ok(function),
        other => lang_bail!(
            ErrorCode::CallingNonFunction,
            "Cannot call {}. Not a function.",
            other
        ),
    }
}

#[derive(Debug, Clone)]
pub struct CallOp {
    pub callee: Box<Op>,
    pub args: Vec<ArgOp>,
}

impl CallOp {
    fn all_positional(&self) -> bool {
        self.args.iter().all(|arg| matches!(arg, ArgOp::Positional(_)))
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let function = callable(self.callee.eval(space, ctx)?)?;

        if self.all_positional() {
            let mut values = Vec::with_capacity(self.args.len());
            for arg in &self.args {
                if let ArgOp::Positional(op) = arg {
                    values.push(op.eval(space, ctx)?);
                }
            }
            return function.call(&values, ctx);
        }

        let mut args = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            args.push(match arg {
                ArgOp::Positional(op) => CallArgument::Positional(op.eval(space, ctx)?),
                ArgOp::Named(name, op) => CallArgument::Named(name.clone(), op.eval(space, ctx)?),
                ArgOp::Splat(op) => CallArgument::Splat(op.eval(space, ctx)?),
            });
        }
        function.call_with(args, ctx)
    }

    /// A constant callee with positional arguments is resolved once.
    pub fn specialize(self) -> OpKind {
        let Some(Value::Function(function)) = self.callee.constant_value() else {
            return OpKind::Call(self);
        };
        if !self.all_positional() {
            return OpKind::Call(self);
        }
        let function = function.clone();
        let args = self
            .args
            .into_iter()
            .filter_map(|arg| match arg {
                ArgOp::Positional(op) => Some(op),
                _ => None,
            })
            .collect::<Vec<_>>();
        trace!("fixed call of arity {}", args.len());
        OpKind::FixedCall(FixedCallOp { function, args })
    }
}

/// Call of a function value known at build time, with positional arguments only.
#[derive(Debug, Clone)]
pub struct FixedCallOp {
    pub function: Arc<FunctionValue>,
    pub args: Vec<Op>,
}

impl FixedCallOp {
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let f = &self.function;
        match self.args.as_slice() {
            [] => f.call(&[], ctx),
            [a] => {
                let args = [a.eval(space, ctx)?];
                f.call(&args, ctx)
            }
            [a, b] => {
                let args = [a.eval(space, ctx)?, b.eval(space, ctx)?];
                f.call(&args, ctx)
            }
            [a, b, c] => {
                let args = [a.eval(space, ctx)?, b.eval(space, ctx)?, c.eval(space, ctx)?];
                f.call(&args, ctx)
            }
            many => {
                let mut args = Vec::with_capacity(many.len());
                for op in many {
                    args.push(op.eval(space, ctx)?);
                }
                f.call(&args, ctx)
            }
        }
    }
}
