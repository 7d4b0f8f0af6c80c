use super::Op;
use crate::context::EvalContext;
use crate::error::Result;
use crate::lang_bail;
use crate::memory::Space;
use crate::value::{curry, Value};
use lz_core::error::ErrorCode;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CurryOp {
    pub callee: Box<Op>,
    pub args: Vec<(String, Op)>,
}

impl CurryOp {
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let function = match self.callee.eval(space, ctx)? {
            Value::Function(function) => function,
            other => lang_bail!(
                ErrorCode::CannotCurry,
                "Cannot curry {}. Not a function.",
                other
            ),
        };
        let mut fixed = Vec::with_capacity(self.args.len());
        for (name, op) in &self.args {
            fixed.push((name.clone(), op.eval(space, ctx)?));
        }
        Ok(Value::function(curry(&function, fixed)?))
    }
}
