use super::Op;
use crate::context::EvalContext;
use crate::error::{LangException, Result};
use crate::lang_bail;
use crate::memory::{ShapeTemplate, Space};
use crate::value::{cast, truthy, Value};
use lz_core::ast::Type;
use lz_core::error::ErrorCode;
use std::sync::Arc;

/// `let` block. Bindings are init operations of the template's slots and evaluate on first
/// reference.
#[derive(Debug)]
pub struct LetOp {
    pub template: Arc<ShapeTemplate>,
    pub body: Box<Op>,
}

impl Clone for LetOp {
    fn clone(&self) -> Self {
        Self {
            template: Arc::new(self.template.refreshed()),
            body: self.body.clone(),
        }
    }
}

impl LetOp {
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let block = space.child(self.template.clone());
        self.body.eval(&block, ctx)
    }
}

#[derive(Debug, Clone)]
pub struct IfOp {
    pub condition: Box<Op>,
    pub then_branch: Box<Op>,
    pub else_branch: Box<Op>,
}

impl IfOp {
    pub fn is_constant(&self) -> bool {
        self.condition.is_constant()
            && self.then_branch.is_constant()
            && self.else_branch.is_constant()
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        if truthy(&self.condition.eval(space, ctx)?) {
            self.then_branch.eval(space, ctx)
        } else {
            self.else_branch.eval(space, ctx)
        }
    }
}

#[derive(Debug, Clone)]
pub enum ForHeadOp {
    /// Binds each item of `source` to `slot`.
    Generator {
        slot: usize,
        declared_type: Type,
        source: Op,
    },
    /// Forces the definition in `slot` before the following heads run.
    Definition { slot: usize },
    Condition(Op),
}

#[derive(Debug)]
pub struct ForOp {
    pub template: Arc<ShapeTemplate>,
    pub heads: Vec<ForHeadOp>,
    pub body: Box<Op>,
}

impl Clone for ForOp {
    fn clone(&self) -> Self {
        Self {
            template: Arc::new(self.template.refreshed()),
            heads: self.heads.clone(),
            body: self.body.clone(),
        }
    }
}

fn generated_items(source: Value) -> Result<Vec<Value>> {
    match source {
        Value::Nil => Ok(Vec::new()),
        Value::List(list) => Ok(list.iter().cloned().collect()),
        Value::Dict(dict) => Ok(dict.values().cloned().collect()),
        other => lang_bail!(
            ErrorCode::CastError,
            "Cannot generate items from {}",
            other.value_type()
        ),
    }
}

impl ForOp {
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let block = space.child(self.template.clone());
        let mut out = Vec::new();
        self.run(0, &block, ctx, &mut out)?;
        Ok(Value::list(out))
    }

    fn run(
        &self,
        head: usize,
        space: &Arc<Space>,
        ctx: &mut EvalContext,
        out: &mut Vec<Value>,
    ) -> Result<()> {
        let Some(current) = self.heads.get(head) else {
            out.push(self.body.eval(space, ctx)?);
            return Ok(());
        };
        match current {
            ForHeadOp::Generator {
                slot,
                declared_type,
                source,
            } => {
                for item in generated_items(source.eval(space, ctx)?)? {
                    let iteration = space.fork();
                    iteration.cell(*slot)?.set(cast(item, *declared_type)?);
                    self.run(head + 1, &iteration, ctx, out)?;
                }
                Ok(())
            }
            ForHeadOp::Definition { slot } => {
                space.cell(*slot)?.evaluate(ctx)?;
                self.run(head + 1, space, ctx, out)
            }
            ForHeadOp::Condition(condition) => {
                if truthy(&condition.eval(space, ctx)?) {
                    self.run(head + 1, space, ctx, out)
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct TryCatchOp {
    pub body: Box<Op>,
    /// Layout of the handler space.
    pub template: Arc<ShapeTemplate>,
    pub error_slot: Option<usize>,
    pub trace_slot: Option<usize>,
    pub handler: Box<Op>,
}

impl Clone for TryCatchOp {
    fn clone(&self) -> Self {
        Self {
            body: self.body.clone(),
            template: Arc::new(self.template.refreshed()),
            error_slot: self.error_slot,
            trace_slot: self.trace_slot,
            handler: self.handler.clone(),
        }
    }
}

impl TryCatchOp {
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let err = match self.body.eval(space, ctx) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let handler = space.child(self.template.clone());
        if let Some(slot) = self.error_slot {
            handler.cell(slot)?.set(err.caught_value());
        }
        if let Some(slot) = self.trace_slot {
            handler.cell(slot)?.set(err.trace_value());
        }
        self.handler.eval(&handler, ctx)
    }
}

#[derive(Debug, Clone)]
pub struct ThrowOp {
    pub value: Box<Op>,
}

impl ThrowOp {
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let value = self.value.eval(space, ctx)?;
        Err(LangException::thrown(value).or_trace(ctx.stack()))
    }
}

#[derive(Debug, Clone)]
pub struct CastOp {
    pub expr: Box<Op>,
    pub target: Type,
}

impl CastOp {
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        cast(self.expr.eval(space, ctx)?, self.target)
    }
}

#[derive(Debug, Clone)]
pub struct IsOp {
    pub expr: Box<Op>,
    pub ty: Type,
}

impl IsOp {
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let value = self.expr.eval(space, ctx)?;
        let is = match (&value, self.ty) {
            (Value::Nil, ty) => matches!(ty, Type::Any | Type::Void),
            (_, Type::Any) => true,
            (value, ty) => value.value_type() == ty,
        };
        Ok(Value::bool(is))
    }
}
