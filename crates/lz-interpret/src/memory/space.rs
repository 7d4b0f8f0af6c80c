use super::{Cell, ShapeTemplate};
use crate::closures::ClosureSet;
use crate::error::{lang_error, Result};
use lz_core::error::ErrorCode;
use std::sync::{Arc, Weak};

/// Runtime container of cells shaped like its scope.
///
/// Spaces own their cells. Links upwards, from cells and from child spaces, are weak: a space
/// is kept alive by whoever instantiated it (the runtime for static spaces, the evaluating
/// operation for dynamic ones).
#[derive(Debug)]
pub struct Space {
    template: Arc<ShapeTemplate>,
    cells: Vec<Arc<Cell>>,
    enclosing: Option<Weak<Space>>,
    /// Closure set of the function call this space belongs to, if any.
    closures: Option<Arc<ClosureSet>>,
}

impl Space {
    fn build(
        template: Arc<ShapeTemplate>,
        enclosing: Option<Weak<Space>>,
        closures: Option<Arc<ClosureSet>>,
    ) -> Arc<Space> {
        Arc::new_cyclic(|me| Space {
            cells: template
                .slots
                .iter()
                .map(|shape| Arc::new(Cell::new(shape.clone(), me.clone())))
                .collect(),
            template,
            enclosing,
            closures,
        })
    }

    pub fn root(template: Arc<ShapeTemplate>) -> Arc<Space> {
        Self::build(template, None, None)
    }

    /// Space for a static member table whose lookups continue in `enclosing`.
    pub fn nested(template: Arc<ShapeTemplate>, enclosing: &Arc<Space>) -> Arc<Space> {
        Self::build(template, Some(Arc::downgrade(enclosing)), None)
    }

    /// Space for one function invocation. Everything outside the function is reached through
    /// `closures`.
    pub fn call(template: Arc<ShapeTemplate>, closures: Arc<ClosureSet>) -> Arc<Space> {
        Self::build(template, None, Some(closures))
    }

    /// Space without slots or parents, for constant evaluation.
    pub fn detached() -> Arc<Space> {
        Self::build(ShapeTemplate::empty(), None, None)
    }

    /// Block space nested in `self`, inheriting its closure set.
    pub fn child(self: &Arc<Self>, template: Arc<ShapeTemplate>) -> Arc<Space> {
        Self::build(
            template,
            Some(Arc::downgrade(self)),
            self.closures.clone(),
        )
    }

    /// Copy of this space with every evaluated value carried over. Pending cells start fresh
    /// and evaluate against the copy.
    pub fn fork(self: &Arc<Self>) -> Arc<Space> {
        let forked = Self::build(
            self.template.clone(),
            self.enclosing.clone(),
            self.closures.clone(),
        );
        for (from, to) in self.cells.iter().zip(forked.cells.iter()) {
            if let Some(value) = from.value() {
                to.set(value.clone());
            }
        }
        forked
    }

    pub fn template(&self) -> &Arc<ShapeTemplate> {
        &self.template
    }

    pub fn cells(&self) -> &[Arc<Cell>] {
        &self.cells
    }

    pub fn cell(&self, slot: usize) -> Result<&Arc<Cell>> {
        self.cells.get(slot).ok_or_else(|| {
            lang_error(
                ErrorCode::InternalError,
                format!("Space has no slot {} ({} slots)", slot, self.cells.len()),
            )
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Cell>> {
        self.template.slot(name).and_then(|slot| self.cells.get(slot))
    }

    pub fn closures(&self) -> Option<&Arc<ClosureSet>> {
        self.closures.as_ref()
    }

    pub fn enclosing(&self) -> Option<Arc<Space>> {
        self.enclosing.as_ref().and_then(Weak::upgrade)
    }

    /// The space `depth` enclosing hops up; `0` is `self`.
    pub fn ancestor(self: &Arc<Self>, depth: usize) -> Result<Arc<Space>> {
        let mut current = self.clone();
        for _ in 0..depth {
            current = current.enclosing().ok_or_else(|| {
                lang_error(
                    ErrorCode::InternalError,
                    format!("No enclosing space {} levels up", depth),
                )
            })?;
        }
        Ok(current)
    }
}
