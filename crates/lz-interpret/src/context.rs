use crate::closures::ClosureSet;
use crate::error::{lang_error, Result, TraceFrame};
use crate::memory::{Cell, Space};
use crate::value::Value;
use lz_core::error::ErrorCode;
use lz_core::span::Span;
use std::collections::HashMap;
use std::sync::Arc;

/// Per call chain evaluation state: the trace stack and closure captures waiting for a cell
/// that is still being evaluated.
#[derive(Debug, Default)]
pub struct EvalContext {
    units: Option<Arc<Space>>,
    stack: Vec<TraceFrame>,
    deferred: HashMap<usize, Vec<(Arc<ClosureSet>, usize)>>,
}

fn cell_key(cell: &Cell) -> usize {
    cell as *const Cell as usize
}

impl EvalContext {
    pub fn new(units: Arc<Space>) -> Self {
        Self {
            units: Some(units),
            ..Self::default()
        }
    }

    /// Context without a runtime, for constant folding and unit tests.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn units(&self) -> Result<&Arc<Space>> {
        self.units.as_ref().ok_or_else(|| {
            lang_error(
                ErrorCode::InternalError,
                "Absolute reference evaluated outside a runtime",
            )
        })
    }

    pub fn push_frame(&mut self, location: impl Into<String>, span: Span) {
        self.stack.push(TraceFrame {
            location: location.into(),
            span: span.has_position().then_some(span),
        });
    }

    pub fn pop_frame(&mut self) {
        self.stack.pop();
    }

    pub fn stack(&self) -> &[TraceFrame] {
        &self.stack
    }

    /// Registers closure slot `index` of `set` to be filled once `cell` has a value.
    pub fn defer(&mut self, cell: &Arc<Cell>, set: Arc<ClosureSet>, index: usize) {
        self.deferred
            .entry(cell_key(cell))
            .or_default()
            .push((set, index));
    }

    pub(crate) fn resolve_deferred(&mut self, cell: &Cell, value: &Value) {
        if let Some(waiting) = self.deferred.remove(&cell_key(cell)) {
            for (set, index) in waiting {
                set.fill(index, value.clone());
            }
        }
    }

    pub(crate) fn forget_deferred(&mut self, cell: &Cell) {
        self.deferred.remove(&cell_key(cell));
    }

    pub fn pending_captures(&self) -> usize {
        self.deferred.values().map(Vec::len).sum()
    }
}
