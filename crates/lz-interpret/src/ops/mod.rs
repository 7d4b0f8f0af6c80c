//! Executable operation tree.
//!
//! Every expression compiles once into an [`Op`]. After construction each op may be replaced
//! by a narrower equivalent ([`Op::specialize`]) and, when [`Op::is_constant`] holds, by its
//! precomputed value ([`Op::fold`]). Evaluation is then repeated against live spaces.

pub mod arithmetic;
mod binary;
mod call;
mod collections;
mod control;
mod curry;
mod function;
mod match_op;
mod pattern;
mod reference;

pub use binary::*;
pub use call::*;
pub use collections::*;
pub use control::*;
pub use curry::*;
pub use function::*;
pub use match_op::*;
pub use pattern::*;
pub use reference::*;

use crate::context::EvalContext;
use crate::error::{LangException, Result};
use crate::memory::Space;
use crate::value::Value;
use lz_core::ast::Type;
use lz_core::error::AnalysisError;
use lz_core::span::Span;
use lz_core::trace;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum OpKind {
    Constant(Value),
    /// Placeholder for an expression whose reference failed analysis in recovery mode.
    Fail(AnalysisError),
    Reference(ReferenceOp),
    List(ListOp),
    PatchedList(PatchedListOp),
    Dict(DictOp),
    MergedDict(MergedDictOp),
    Function(FunctionOp),
    Call(CallOp),
    FixedCall(FixedCallOp),
    Curry(CurryOp),
    Let(LetOp),
    If(IfOp),
    Match(MatchOp),
    For(ForOp),
    Binary(BinaryNode),
    Unary(UnaryNode),
    Cast(CastOp),
    Is(IsOp),
    Access(AccessOp),
    ConstantKeyAccess(ConstantKeyAccessOp),
    TryCatch(TryCatchOp),
    Throw(ThrowOp),
}

/// An operation and the source region it was compiled from.
///
/// Cloning yields a fresh instance: reference caches start empty and let/for templates are
/// rebuilt, so nothing memoized during evaluation carries over.
#[derive(Debug, Clone)]
pub struct Op {
    pub span: Span,
    pub kind: OpKind,
}

impl Op {
    pub fn new(kind: OpKind, span: Span) -> Op {
        Op { span, kind }
    }

    pub fn constant(value: Value) -> Op {
        Op::new(OpKind::Constant(value), Span::null())
    }

    /// Reference to a slot of the current space.
    pub fn local(slot: usize) -> Op {
        Op::new(
            OpKind::Reference(ReferenceOp::new(
                format!("#{}", slot),
                Address::Local(slot),
                Type::Any,
            )),
            Span::null(),
        )
    }

    pub fn constant_value(&self) -> Option<&Value> {
        match &self.kind {
            OpKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let result = match &self.kind {
            OpKind::Constant(value) => Ok(value.clone()),
            OpKind::Fail(err) => Err(LangException::from(err.clone())),
            OpKind::Reference(op) => op.eval(space, ctx),
            OpKind::List(op) => op.eval(space, ctx),
            OpKind::PatchedList(op) => op.eval(space, ctx),
            OpKind::Dict(op) => op.eval(space, ctx),
            OpKind::MergedDict(op) => op.eval(space, ctx),
            OpKind::Function(op) => op.eval(space, ctx),
            OpKind::Call(op) => op.eval(space, ctx),
            OpKind::FixedCall(op) => op.eval(space, ctx),
            OpKind::Curry(op) => op.eval(space, ctx),
            OpKind::Let(op) => op.eval(space, ctx),
            OpKind::If(op) => op.eval(space, ctx),
            OpKind::Match(op) => op.eval(space, ctx),
            OpKind::For(op) => op.eval(space, ctx),
            OpKind::Binary(op) => op.eval(space, ctx),
            OpKind::Unary(op) => op.eval(space, ctx),
            OpKind::Cast(op) => op.eval(space, ctx),
            OpKind::Is(op) => op.eval(space, ctx),
            OpKind::Access(op) => op.eval(space, ctx),
            OpKind::ConstantKeyAccess(op) => op.eval(space, ctx),
            OpKind::TryCatch(op) => op.eval(space, ctx),
            OpKind::Throw(op) => op.eval(space, ctx),
        };
        result.map_err(|err| err.or_span(self.span))
    }

    /// True iff evaluation in an empty frame can neither observe external state nor fail on
    /// runtime input.
    pub fn is_constant(&self) -> bool {
        match &self.kind {
            OpKind::Constant(_) => true,
            OpKind::Fail(_) | OpKind::Reference(_) => false,
            OpKind::List(op) => op.is_constant(),
            OpKind::PatchedList(op) => op.is_constant(),
            OpKind::Dict(op) => op.is_constant(),
            OpKind::MergedDict(op) => op.is_constant(),
            OpKind::Function(op) => op.is_constant(),
            OpKind::Call(_) | OpKind::FixedCall(_) | OpKind::Curry(_) => false,
            OpKind::Let(_) | OpKind::Match(_) | OpKind::For(_) => false,
            OpKind::If(op) => op.is_constant(),
            OpKind::Binary(op) => op.is_constant(),
            OpKind::Unary(op) => op.operand.is_constant(),
            OpKind::Cast(op) => op.expr.is_constant(),
            OpKind::Is(op) => op.expr.is_constant(),
            OpKind::Access(_) | OpKind::ConstantKeyAccess(_) => false,
            OpKind::TryCatch(_) | OpKind::Throw(_) => false,
        }
    }

    /// Result type known without evaluating, `any` when unknown.
    pub fn static_type(&self) -> Type {
        match &self.kind {
            OpKind::Constant(value) => value.value_type(),
            OpKind::Reference(op) => op.declared_type,
            OpKind::List(_) | OpKind::PatchedList(_) => Type::List,
            OpKind::Dict(_) | OpKind::MergedDict(_) => Type::Dict,
            OpKind::Function(_) | OpKind::Curry(_) => Type::Function,
            OpKind::FixedCall(op) => op.function.signature.return_type,
            OpKind::Binary(op) => op.static_type(),
            OpKind::Unary(op) => op.static_type(),
            OpKind::Cast(op) => op.target,
            OpKind::Is(_) => Type::Boolean,
            _ => Type::Any,
        }
    }

    /// One-time substitution of a narrower equivalent. Children are expected to be specialized
    /// already; applying it twice changes nothing.
    pub fn specialize(self) -> Op {
        let Op { span, kind } = self;
        let kind = match kind {
            OpKind::Binary(op) => op.specialize(),
            OpKind::Call(op) => op.specialize(),
            OpKind::List(op) => op.specialize(),
            OpKind::Dict(op) => op.specialize(),
            OpKind::Access(op) => op.specialize(),
            other => other,
        };
        Op { span, kind }
    }

    /// Replaces a constant op by its value. Ops that fail when evaluated are left in place so
    /// the error surfaces at run time.
    pub fn fold(self) -> Op {
        if self.constant_value().is_some() || !self.is_constant() {
            return self;
        }
        let space = Space::detached();
        let mut ctx = EvalContext::detached();
        match self.eval(&space, &mut ctx) {
            Ok(value) => {
                trace!("folded constant at {}: {}", self.span, value);
                Op::new(OpKind::Constant(value), self.span)
            }
            Err(err) => {
                trace!("constant at {} left unfolded: {}", self.span, err);
                self
            }
        }
    }

    /// A fresh, un-memoized instance over the same expression.
    pub fn refresh(&self) -> Op {
        self.clone()
    }
}
