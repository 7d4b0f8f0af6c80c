use crate::ops::Op;
use dashmap::DashMap;
use lz_analysis::{ScopeId, SymbolId};
use lz_core::ast::Type;
use lz_core::span::Span;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only description of one slot: what symbol it holds and how to compute its value.
#[derive(Debug)]
pub struct SlotShape {
    pub symbol: SymbolId,
    pub name: String,
    pub declared_type: Type,
    pub span: Span,
    /// Value operation of a var definition. Slots without one are bound from outside
    /// (parameters, captures, generator variables).
    pub init: Option<Arc<Op>>,
    /// Member scope of a module, library or section slot.
    pub members: Option<ScopeId>,
}

/// Slot layout of a scope, shared by every space instantiated from it.
#[derive(Debug)]
pub struct ShapeTemplate {
    pub scope: ScopeId,
    pub slots: Vec<Arc<SlotShape>>,
    names: HashMap<String, usize>,
}

static EMPTY: Lazy<Arc<ShapeTemplate>> =
    Lazy::new(|| Arc::new(ShapeTemplate::new(ScopeId(u32::MAX), Vec::new())));

impl ShapeTemplate {
    pub fn new(scope: ScopeId, slots: Vec<SlotShape>) -> Self {
        let names = slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (slot.name.clone(), index))
            .collect();
        Self {
            scope,
            slots: slots.into_iter().map(Arc::new).collect(),
            names,
        }
    }

    /// Template of a space with no slots, used for constant evaluation.
    pub fn empty() -> Arc<ShapeTemplate> {
        EMPTY.clone()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Same layout with fresh copies of every init operation.
    pub fn refreshed(&self) -> ShapeTemplate {
        ShapeTemplate {
            scope: self.scope,
            slots: self
                .slots
                .iter()
                .map(|shape| {
                    Arc::new(SlotShape {
                        symbol: shape.symbol,
                        name: shape.name.clone(),
                        declared_type: shape.declared_type,
                        span: shape.span,
                        init: shape.init.as_ref().map(|op| Arc::new(op.refresh())),
                        members: shape.members,
                    })
                })
                .collect(),
            names: self.names.clone(),
        }
    }
}

/// Per-scope template cache. Each template is computed once and shared afterwards.
#[derive(Debug, Default)]
pub struct Templates {
    cache: DashMap<ScopeId, Arc<ShapeTemplate>>,
}

impl Templates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, scope: ScopeId) -> Option<Arc<ShapeTemplate>> {
        self.cache.get(&scope).map(|entry| entry.value().clone())
    }

    /// Returns the cached template, building it on first request. `build` runs without the
    /// cache locked, so it may request other templates.
    pub fn get_or_build(
        &self,
        scope: ScopeId,
        build: impl FnOnce() -> ShapeTemplate,
    ) -> Arc<ShapeTemplate> {
        if let Some(template) = self.get(scope) {
            return template;
        }
        let template = Arc::new(build());
        self.cache.entry(scope).or_insert(template).value().clone()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
