//! Closure sets: the captured environment of a function value.

use crate::context::EvalContext;
use crate::error::{lang_error, Result};
use crate::memory::Cell;
use crate::value::Value;
use lz_core::error::ErrorCode;
use std::sync::{Arc, Mutex, OnceLock};

/// What a function literal captured for one closed-over symbol.
#[derive(Debug, Clone)]
pub enum Capture {
    Value(Value),
    /// The symbol's cell was still evaluating when the function was created.
    Pending(Arc<Cell>),
}

#[derive(Debug, Default)]
pub struct ClosureSlot {
    value: OnceLock<Value>,
    pending: Mutex<Option<Arc<Cell>>>,
}

impl ClosureSlot {
    fn new(capture: Capture) -> Self {
        let slot = Self::default();
        match capture {
            Capture::Value(value) => {
                let _ = slot.value.set(value);
            }
            Capture::Pending(cell) => {
                if let Ok(mut pending) = slot.pending.lock() {
                    *pending = Some(cell);
                }
            }
        }
        slot
    }

    fn pending(&self) -> Option<Arc<Cell>> {
        self.pending.lock().ok().and_then(|pending| pending.clone())
    }
}

#[derive(Debug, Default)]
pub struct ClosureSet {
    slots: Vec<ClosureSlot>,
}

impl ClosureSet {
    pub fn new(captures: Vec<Capture>) -> Arc<Self> {
        Arc::new(Self {
            slots: captures.into_iter().map(ClosureSlot::new).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, index: usize) -> Result<&ClosureSlot> {
        self.slots.get(index).ok_or_else(|| {
            lang_error(
                ErrorCode::InternalError,
                format!("Closure has no slot {}", index),
            )
        })
    }

    /// Value of a captured symbol. A pending capture evaluates its cell, which fails with a
    /// cyclic evaluation error while that cell is still being computed.
    pub fn get(&self, index: usize, ctx: &mut EvalContext) -> Result<Value> {
        let slot = self.slot(index)?;
        if let Some(value) = slot.value.get() {
            return Ok(value.clone());
        }
        match slot.pending() {
            Some(cell) => {
                let value = cell.evaluate(ctx)?;
                self.fill(index, value.clone());
                Ok(value)
            }
            None => Ok(Value::Nil),
        }
    }

    /// The capture as-is, for propagation into a nested function without forcing it.
    pub fn capture(&self, index: usize) -> Result<Capture> {
        let slot = self.slot(index)?;
        if let Some(value) = slot.value.get() {
            return Ok(Capture::Value(value.clone()));
        }
        Ok(match slot.pending() {
            Some(cell) => match cell.value() {
                Some(value) => Capture::Value(value.clone()),
                None => Capture::Pending(cell),
            },
            None => Capture::Value(Value::Nil),
        })
    }

    pub fn is_resolved(&self, index: usize) -> bool {
        self.slots
            .get(index)
            .is_some_and(|slot| slot.value.get().is_some())
    }

    pub(crate) fn fill(&self, index: usize, value: Value) {
        if let Some(slot) = self.slots.get(index) {
            if slot.value.set(value).is_ok() {
                if let Ok(mut pending) = slot.pending.lock() {
                    *pending = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ShapeTemplate, SlotShape, Space};
    use crate::ops::Op;
    use lz_analysis::{ScopeId, SymbolId};
    use lz_core::ast::Type;
    use lz_core::span::Span;
    use pretty_assertions::assert_eq;

    #[test]
    fn pending_capture_is_filled_when_its_cell_completes() {
        let template = Arc::new(ShapeTemplate::new(
            ScopeId(0),
            vec![SlotShape {
                symbol: SymbolId(0),
                name: "f".to_string(),
                declared_type: Type::Any,
                span: Span::null(),
                init: Some(Arc::new(Op::constant(Value::long(3)))),
                members: None,
            }],
        ));
        let space = Space::root(template);
        let cell = space.cell(0).unwrap().clone();
        let mut ctx = EvalContext::detached();

        let set = ClosureSet::new(vec![Capture::Pending(cell.clone())]);
        ctx.defer(&cell, set.clone(), 0);
        assert!(!set.is_resolved(0));
        assert_eq!(ctx.pending_captures(), 1);

        cell.evaluate(&mut ctx).unwrap();
        assert!(set.is_resolved(0));
        assert_eq!(ctx.pending_captures(), 0);
        assert_eq!(set.get(0, &mut ctx).unwrap(), Value::long(3));
    }

    #[test]
    fn missing_slot_is_an_error() {
        let set = ClosureSet::new(vec![Capture::Value(Value::Nil)]);
        let mut ctx = EvalContext::detached();
        assert_eq!(set.len(), 1);
        assert!(set.get(1, &mut ctx).is_err());
    }
}
