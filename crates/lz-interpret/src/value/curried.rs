use super::{cast, FunctionKind, FunctionValue, ParamSpec, Signature, Value};
use crate::context::EvalContext;
use crate::error::{lang_error, Result};
use lz_core::error::ErrorCode;
use std::cell::RefCell;
use std::sync::Arc;

/// Argument layout of a curried function. `F` marks a free position supplied by the caller,
/// `X` a position fixed at curry time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    A1F,
    A1X,
    A2FF,
    A2FX,
    A2XF,
    A2XX,
    A3FFF,
    A3FFX,
    A3FXF,
    A3FXX,
    A3XFF,
    A3XFX,
    A3XXF,
    A3XXX,
    Generic,
}

impl Adapter {
    fn select(fixed: &[Option<Value>]) -> Adapter {
        let f: Vec<bool> = fixed.iter().map(Option::is_some).collect();
        match f.as_slice() {
            [false] => Adapter::A1F,
            [true] => Adapter::A1X,
            [false, false] => Adapter::A2FF,
            [false, true] => Adapter::A2FX,
            [true, false] => Adapter::A2XF,
            [true, true] => Adapter::A2XX,
            [false, false, false] => Adapter::A3FFF,
            [false, false, true] => Adapter::A3FFX,
            [false, true, false] => Adapter::A3FXF,
            [false, true, true] => Adapter::A3FXX,
            [true, false, false] => Adapter::A3XFF,
            [true, false, true] => Adapter::A3XFX,
            [true, true, false] => Adapter::A3XXF,
            [true, true, true] => Adapter::A3XXX,
            _ => Adapter::Generic,
        }
    }
}

thread_local! {
    // Generic adapter scratch buffers, one per nested curried call in flight.
    static SCRATCH: RefCell<Vec<Vec<Value>>> = const { RefCell::new(Vec::new()) };
}

pub struct CurriedFunction {
    pub target: Arc<FunctionValue>,
    /// One entry per target parameter; `Some` for fixed positions.
    fixed: Vec<Option<Value>>,
    adapter: Adapter,
}

/// Fixes the named parameters of `target`, returning a function over the remaining ones in
/// their original order.
pub fn curry(target: &Arc<FunctionValue>, args: Vec<(String, Value)>) -> Result<FunctionValue> {
    let params = &target.signature.params;
    let mut fixed: Vec<Option<Value>> = vec![None; params.len()];
    for (name, value) in args {
        let index = target.signature.index_of(&name).ok_or_else(|| {
            lang_error(
                ErrorCode::UnexpectedArgument,
                format!("Cannot curry undeclared parameter {}.", name),
            )
        })?;
        fixed[index] = Some(cast(value, params[index].declared_type)?);
    }

    let free: Vec<ParamSpec> = params
        .iter()
        .zip(&fixed)
        .filter(|(_, fixed)| fixed.is_none())
        .map(|(param, _)| param.clone())
        .collect();
    let adapter = Adapter::select(&fixed);

    Ok(FunctionValue {
        signature: Signature {
            params: free,
            return_type: target.signature.return_type,
        },
        kind: FunctionKind::Curried(CurriedFunction {
            target: target.clone(),
            fixed,
            adapter,
        }),
    })
}

impl CurriedFunction {
    pub fn adapter(&self) -> Adapter {
        self.adapter
    }

    fn x(&self, index: usize) -> Value {
        self.fixed[index].clone().unwrap_or_default()
    }

    /// `args` holds exactly the free positions, in order.
    pub fn call(&self, args: &[Value], ctx: &mut EvalContext) -> Result<Value> {
        let t = &self.target;
        let a = |index: usize| args[index].clone();
        match self.adapter {
            Adapter::A1F | Adapter::A2FF | Adapter::A3FFF => t.call(args, ctx),
            Adapter::A1X => t.call(&[self.x(0)], ctx),
            Adapter::A2FX => t.call(&[a(0), self.x(1)], ctx),
            Adapter::A2XF => t.call(&[self.x(0), a(0)], ctx),
            Adapter::A2XX => t.call(&[self.x(0), self.x(1)], ctx),
            Adapter::A3FFX => t.call(&[a(0), a(1), self.x(2)], ctx),
            Adapter::A3FXF => t.call(&[a(0), self.x(1), a(1)], ctx),
            Adapter::A3FXX => t.call(&[a(0), self.x(1), self.x(2)], ctx),
            Adapter::A3XFF => t.call(&[self.x(0), a(0), a(1)], ctx),
            Adapter::A3XFX => t.call(&[self.x(0), a(0), self.x(2)], ctx),
            Adapter::A3XXF => t.call(&[self.x(0), self.x(1), a(0)], ctx),
            Adapter::A3XXX => t.call(&[self.x(0), self.x(1), self.x(2)], ctx),
            Adapter::Generic => self.call_generic(args, ctx),
        }
    }

    fn call_generic(&self, args: &[Value], ctx: &mut EvalContext) -> Result<Value> {
        let mut buffer = SCRATCH
            .with(|pool| pool.borrow_mut().pop())
            .unwrap_or_default();
        buffer.extend(self.fixed.iter().map(|fixed| fixed.clone().unwrap_or_default()));
        let mut free = args.iter();
        for (slot, fixed) in buffer.iter_mut().zip(&self.fixed) {
            if fixed.is_none() {
                if let Some(arg) = free.next() {
                    *slot = arg.clone();
                }
            }
        }

        let result = self.target.call(&buffer, ctx);

        buffer.clear();
        SCRATCH.with(|pool| pool.borrow_mut().push(buffer));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn adapters_cover_small_arities() {
        let v = || Some(Value::long(1));
        assert_eq!(Adapter::select(&[None]), Adapter::A1F);
        assert_eq!(Adapter::select(&[v(), None]), Adapter::A2XF);
        assert_eq!(Adapter::select(&[None, v(), None]), Adapter::A3FXF);
        assert_eq!(Adapter::select(&[None, None, None, v()]), Adapter::Generic);
    }
}
