use crate::context::EvalContext;
use crate::error::{lang_error, Result};
use crate::memory::{Cell, Space};
use crate::value::Value;
use lz_core::ast::Type;
use lz_core::error::ErrorCode;
use std::sync::{Arc, Mutex, OnceLock, Weak};

/// How a reference reaches its cell from the space it is evaluated in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Slot of the current function's closure set.
    Closure(usize),
    Local(usize),
    Parent(usize),
    /// Slot of the space `depth` enclosing hops up.
    Frame { depth: usize, slot: usize },
    /// Slot path from the units space, for statically allocated symbols.
    Absolute(Vec<usize>),
}

#[derive(Debug)]
pub struct ReferenceOp {
    pub name: String,
    pub address: Address,
    pub declared_type: Type,
    /// Last `(space, cell)` pair a frame lookup resolved.
    cache: Mutex<Option<(Weak<Space>, Arc<Cell>)>>,
    absolute: OnceLock<Arc<Cell>>,
}

impl Clone for ReferenceOp {
    fn clone(&self) -> Self {
        ReferenceOp::new(self.name.clone(), self.address.clone(), self.declared_type)
    }
}

impl ReferenceOp {
    pub fn new(name: String, address: Address, declared_type: Type) -> Self {
        Self {
            name,
            address,
            declared_type,
            cache: Mutex::new(None),
            absolute: OnceLock::new(),
        }
    }

    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        if let Address::Closure(index) = self.address {
            let closures = space.closures().ok_or_else(|| {
                lang_error(
                    ErrorCode::InternalError,
                    format!("{} is captured but no closure is in scope", self.name),
                )
            })?;
            return closures.get(index, ctx);
        }
        let cell = self.resolve(space, ctx)?;
        cell.evaluate(ctx)
    }

    /// The cell this reference denotes when evaluated in `space`.
    pub fn resolve(&self, space: &Arc<Space>, ctx: &EvalContext) -> Result<Arc<Cell>> {
        match &self.address {
            Address::Closure(_) => Err(lang_error(
                ErrorCode::InternalError,
                format!("{} is a captured value, not a cell", self.name),
            )),
            Address::Local(slot) => Ok(space.cell(*slot)?.clone()),
            Address::Parent(slot) => self.cached(space, 1, *slot),
            Address::Frame { depth, slot } => self.cached(space, *depth, *slot),
            Address::Absolute(path) => self.absolute(path, ctx),
        }
    }

    fn cached(&self, space: &Arc<Space>, depth: usize, slot: usize) -> Result<Arc<Cell>> {
        if let Ok(cache) = self.cache.try_lock() {
            if let Some((cached_space, cell)) = cache.as_ref() {
                if std::ptr::eq(cached_space.as_ptr(), Arc::as_ptr(space)) {
                    return Ok(cell.clone());
                }
            }
        }
        let cell = space.ancestor(depth)?.cell(slot)?.clone();
        if let Ok(mut cache) = self.cache.try_lock() {
            *cache = Some((Arc::downgrade(space), cell.clone()));
        }
        Ok(cell)
    }

    fn absolute(&self, path: &[usize], ctx: &EvalContext) -> Result<Arc<Cell>> {
        if let Some(cell) = self.absolute.get() {
            return Ok(cell.clone());
        }
        let mut space = ctx.units()?.clone();
        let mut cell = None;
        for (depth, slot) in path.iter().enumerate() {
            let found = space.cell(*slot)?.clone();
            if depth + 1 < path.len() {
                space = found.members().cloned().ok_or_else(|| {
                    lang_error(
                        ErrorCode::InternalError,
                        format!("{} has no members while resolving {}", found.name(), self.name),
                    )
                })?;
            }
            cell = Some(found);
        }
        let cell = cell.ok_or_else(|| {
            lang_error(ErrorCode::InternalError, format!("Empty path for {}", self.name))
        })?;
        let _ = self.absolute.set(cell.clone());
        Ok(cell)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ShapeTemplate, SlotShape};
    use crate::ops::{LetOp, Op, OpKind};
    use lz_analysis::{ScopeId, SymbolId};
    use lz_core::span::Span;
    use pretty_assertions::assert_eq;

    fn shape(name: &str, init: Option<Op>) -> SlotShape {
        SlotShape {
            symbol: SymbolId(0),
            name: name.to_string(),
            declared_type: Type::Any,
            span: Span::null(),
            init: init.map(Arc::new),
            members: None,
        }
    }

    /// Root space whose only slot holds `value`.
    fn holding(value: i64) -> Arc<Space> {
        let template = Arc::new(ShapeTemplate::new(
            ScopeId(0),
            vec![shape("v", Some(Op::constant(Value::long(value))))],
        ));
        Space::root(template)
    }

    fn reference(op: &Op) -> &ReferenceOp {
        match &op.kind {
            OpKind::Reference(reference) => reference,
            other => panic!("expected a reference, got {:?}", other),
        }
    }

    fn frame_cached(op: &Op) -> bool {
        reference(op)
            .cache
            .lock()
            .map(|cache| cache.is_some())
            .unwrap_or(false)
    }

    #[test]
    fn refresh_drops_the_frame_cache() {
        let op = Op::new(
            OpKind::Reference(ReferenceOp::new("v".into(), Address::Parent(0), Type::Any)),
            Span::null(),
        );
        let first = holding(1);
        let first_block = first.child(ShapeTemplate::empty());
        let mut ctx = EvalContext::detached();
        assert_eq!(op.eval(&first_block, &mut ctx).unwrap(), Value::long(1));
        assert!(frame_cached(&op));

        let refreshed = op.refresh();
        assert!(!frame_cached(&refreshed));

        let second = holding(2);
        let second_block = second.child(ShapeTemplate::empty());
        assert_eq!(refreshed.eval(&second_block, &mut ctx).unwrap(), Value::long(2));
        assert!(frame_cached(&refreshed));
        let cell = reference(&refreshed).resolve(&second_block, &ctx).unwrap();
        assert!(Arc::ptr_eq(&cell, second.cell(0).unwrap()));
    }

    #[test]
    fn refresh_drops_the_absolute_cache() {
        let op = Op::new(
            OpKind::Reference(ReferenceOp::new("v".into(), Address::Absolute(vec![0]), Type::Any)),
            Span::null(),
        );
        let first = holding(1);
        let mut first_ctx = EvalContext::new(first.clone());
        assert_eq!(op.eval(&first, &mut first_ctx).unwrap(), Value::long(1));
        assert!(reference(&op).absolute.get().is_some());

        let second = holding(2);
        let mut second_ctx = EvalContext::new(second.clone());
        // The original stays bound to the first runtime's cell.
        assert_eq!(op.eval(&second, &mut second_ctx).unwrap(), Value::long(1));

        let refreshed = op.refresh();
        assert!(reference(&refreshed).absolute.get().is_none());
        assert_eq!(refreshed.eval(&second, &mut second_ctx).unwrap(), Value::long(2));
    }

    #[test]
    fn refreshed_templates_carry_fresh_init_operations() {
        let init = Op::new(
            OpKind::Reference(ReferenceOp::new("v".into(), Address::Parent(0), Type::Any)),
            Span::null(),
        );
        let let_op = LetOp {
            template: Arc::new(ShapeTemplate::new(ScopeId(1), vec![shape("w", Some(init))])),
            body: Box::new(Op::local(0)),
        };
        let first = holding(1);
        let mut ctx = EvalContext::detached();
        assert_eq!(let_op.eval(&first, &mut ctx).unwrap(), Value::long(1));
        let original_init = let_op.template.slots[0].init.clone().unwrap();
        assert!(frame_cached(&original_init));

        let refreshed = let_op.template.refreshed();
        assert_eq!(refreshed.slot("w"), Some(0));
        let fresh_init = refreshed.slots[0].init.clone().unwrap();
        assert!(!Arc::ptr_eq(&fresh_init, &original_init));
        assert!(!frame_cached(&fresh_init));

        let copy = let_op.clone();
        assert!(!Arc::ptr_eq(&copy.template, &let_op.template));
        let second = holding(2);
        assert_eq!(copy.eval(&second, &mut ctx).unwrap(), Value::long(2));
    }

    #[test]
    fn captured_reference_without_a_closure_is_an_internal_error() {
        let op = ReferenceOp::new("f".into(), Address::Closure(0), Type::Any);
        let mut ctx = EvalContext::detached();
        let err = op.eval(&holding(1), &mut ctx).unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(err.code.as_str(), "INTERNAL_ERROR");
    }
}
