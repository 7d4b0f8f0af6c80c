use super::{Op, ReferenceOp};
use crate::closures::{Capture, ClosureSet};
use crate::context::EvalContext;
use crate::error::{lang_error, Result};
use crate::memory::{ShapeTemplate, Space};
use crate::value::{cast, FunctionKind, FunctionValue, ParamSpec, Signature, UserFunction, Value};
use lz_core::ast::Type;
use lz_core::error::ErrorCode;
use lz_core::span::Span;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ParamOp {
    pub name: String,
    pub declared_type: Type,
    pub default: Option<Op>,
}

/// Where a function literal finds one closed-over symbol when it is created.
#[derive(Debug, Clone)]
pub enum CapturePlan {
    /// Slot of the creating function's own closure set.
    Propagate(usize),
    /// A cell reachable from the creating space.
    Cell(ReferenceOp),
}

#[derive(Debug)]
pub struct FunctionOp {
    pub params: Vec<ParamOp>,
    pub return_type: Type,
    pub body: Arc<Op>,
    /// Call space layout, parameters first.
    pub template: Arc<ShapeTemplate>,
    pub captures: Vec<CapturePlan>,
    pub span: Span,
}

impl Clone for FunctionOp {
    fn clone(&self) -> Self {
        Self {
            params: self.params.clone(),
            return_type: self.return_type,
            body: Arc::new(self.body.refresh()),
            template: self.template.clone(),
            captures: self.captures.clone(),
            span: self.span,
        }
    }
}

impl FunctionOp {
    pub fn is_constant(&self) -> bool {
        self.captures.is_empty()
            && self
                .params
                .iter()
                .all(|param| param.default.as_ref().map_or(true, Op::is_constant))
    }

    fn capture(
        &self,
        plan: &CapturePlan,
        space: &Arc<Space>,
        ctx: &mut EvalContext,
    ) -> Result<Capture> {
        match plan {
            CapturePlan::Propagate(index) => space
                .closures()
                .ok_or_else(|| {
                    lang_error(
                        ErrorCode::InternalError,
                        "Nested function created outside of a closure",
                    )
                })?
                .capture(*index),
            CapturePlan::Cell(reference) => {
                let cell = reference.resolve(space, ctx)?;
                if let Some(value) = cell.value() {
                    return Ok(Capture::Value(value.clone()));
                }
                // A function defined inside the value it refers to; filled once that value
                // is known.
                if cell.is_evaluating() {
                    return Ok(Capture::Pending(cell));
                }
                Ok(Capture::Value(cell.evaluate(ctx)?))
            }
        }
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let mut params = Vec::with_capacity(self.params.len());
        for param in &self.params {
            let default = match &param.default {
                Some(op) => cast(op.eval(space, ctx)?, param.declared_type)?,
                None => Value::Nil,
            };
            params.push(ParamSpec {
                name: param.name.clone(),
                declared_type: param.declared_type,
                default,
            });
        }

        let mut captures = Vec::with_capacity(self.captures.len());
        for plan in &self.captures {
            captures.push(self.capture(plan, space, ctx)?);
        }
        let pending: Vec<_> = captures
            .iter()
            .enumerate()
            .filter_map(|(index, capture)| match capture {
                Capture::Pending(cell) => Some((index, cell.clone())),
                Capture::Value(_) => None,
            })
            .collect();
        let closures = ClosureSet::new(captures);
        for (index, cell) in pending {
            ctx.defer(&cell, closures.clone(), index);
        }

        Ok(Value::function(FunctionValue {
            signature: Signature {
                params,
                return_type: self.return_type,
            },
            kind: FunctionKind::User(UserFunction {
                body: self.body.clone(),
                template: self.template.clone(),
                closures,
                span: self.span,
            }),
        }))
    }
}
