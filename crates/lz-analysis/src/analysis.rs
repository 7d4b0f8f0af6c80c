use crate::builder::ScopeBuilder;
use crate::closures::analyze_closures;
use crate::linker::link_units;
use crate::resolver::resolve_references;
use crate::scope::{ScopeArena, ScopeId, ScopeKind, SymbolId};
use lz_core::ast::{NodeId, UnitSet};
use lz_core::config;
use lz_core::diagnostics::{Diagnostic, DiagnosticManager, DiagnosticReport};
use lz_core::error::AnalysisError;
use lz_core::span::Span;
use lz_core::{debug, Result};
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_DIAGNOSTIC_CONTEXT: &str = "analysis";

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Collect errors and keep going instead of failing on the first one.
    pub recovery: bool,
    pub diagnostics: Option<Arc<DiagnosticManager>>,
    pub diagnostic_context: &'static str,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            recovery: config::recovery_mode(),
            diagnostics: None,
            diagnostic_context: DEFAULT_DIAGNOSTIC_CONTEXT,
        }
    }
}

impl AnalysisOptions {
    pub fn recovering() -> Self {
        Self {
            recovery: true,
            ..Self::default()
        }
    }

    pub fn strict() -> Self {
        Self {
            recovery: false,
            ..Self::default()
        }
    }
}

/// How the operation builder reaches a reference's cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceClass {
    /// Captured by the innermost enclosing function.
    Closure,
    /// Single name declared in the reference's own scope.
    SimpleLocal,
    /// Single name declared in the directly enclosing scope.
    SimpleParent,
    Generic,
}

#[derive(Debug, Clone)]
pub struct ResolvedReference {
    pub node: NodeId,
    /// Scope the reference is evaluated in.
    pub scope: ScopeId,
    /// Symbol named by the last path element, possibly an indirection.
    pub symbol: SymbolId,
    /// Non-indirection symbol holding the value.
    pub target: SymbolId,
    pub class: ReferenceClass,
}

/// Result of scope building, linking, reference resolution and closure analysis over a unit
/// set. Consumed read-only by the interpreter.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub arena: ScopeArena,
    pub global: ScopeId,
    pub units_scope: ScopeId,
    pub units: HashMap<String, SymbolId>,
    pub references: HashMap<NodeId, std::result::Result<ResolvedReference, AnalysisError>>,
    /// Scope created by a node: units, libraries, sections, functions, let, for, match
    /// clauses and catch handlers.
    pub created_scopes: HashMap<NodeId, ScopeId>,
    /// Scope every expression and pattern node is evaluated in.
    pub node_scopes: HashMap<NodeId, ScopeId>,
    /// Symbols introduced by defining nodes.
    pub definitions: HashMap<NodeId, SymbolId>,
    /// Closed-over symbols per function node, in first-use order.
    pub closures: HashMap<NodeId, Vec<SymbolId>>,
    /// Interactive section symbol to the module symbol it is scoped in.
    pub sections: HashMap<SymbolId, SymbolId>,
    pub errors: Vec<AnalysisError>,
    pub(crate) positions: Vec<(NodeId, Span)>,
}

impl Analysis {
    pub(crate) fn new() -> Self {
        let mut arena = ScopeArena::new();
        let global = arena.new_scope(ScopeKind::Global, None, false);
        let units_scope = arena.new_scope(ScopeKind::Units, Some(global), false);
        Self {
            arena,
            global,
            units_scope,
            units: HashMap::new(),
            references: HashMap::new(),
            created_scopes: HashMap::new(),
            node_scopes: HashMap::new(),
            definitions: HashMap::new(),
            closures: HashMap::new(),
            sections: HashMap::new(),
            errors: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn unit(&self, path: &str) -> Option<SymbolId> {
        self.units.get(path).copied()
    }

    pub fn reference(&self, node: NodeId) -> Option<&std::result::Result<ResolvedReference, AnalysisError>> {
        self.references.get(&node)
    }

    pub fn created_scope(&self, node: NodeId) -> Option<ScopeId> {
        self.created_scopes.get(&node).copied()
    }

    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    pub fn definition(&self, node: NodeId) -> Option<SymbolId> {
        self.definitions.get(&node).copied()
    }

    pub fn closed_over(&self, function: NodeId) -> &[SymbolId] {
        self.closures
            .get(&function)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Looks up a member by walking public surfaces, e.g. `["lib", "x"]` in a module. Private
    /// libraries are reachable too, so tooling can address every definition.
    pub fn member(&self, unit: &str, path: &[&str]) -> Option<SymbolId> {
        let mut current = self.unit(unit)?;
        for name in path {
            let target = self.arena.target_of(current)?;
            let symbol = self.arena.symbol(target);
            let found = symbol
                .members
                .and_then(|scope| self.arena.scope(scope).get(name))
                .or_else(|| {
                    self.arena
                        .public_scope(target)
                        .and_then(|scope| self.arena.scope(scope).get(name))
                })?;
            current = found;
        }
        Some(current)
    }
}

/// Runs every analysis phase over `units`.
///
/// Without recovery the first error aborts the pass. With recovery, errors are collected in
/// [`Analysis::errors`] and the partial analysis is returned.
pub fn analyze(units: &UnitSet, options: &AnalysisOptions) -> Result<Analysis> {
    let mut analysis = Analysis::new();

    let pending = ScopeBuilder::new(&mut analysis, options.recovery).build(units)?;
    debug!(
        "scopes built: {} units, {} pending references",
        units.len(),
        pending.len()
    );

    link_units(&mut analysis, options.recovery)?;
    resolve_references(&mut analysis, pending, options.recovery)?;
    analyze_closures(&mut analysis, units);
    debug!(
        "analysis finished with {} closures and {} errors",
        analysis.closures.len(),
        analysis.errors.len()
    );

    if let Some(manager) = &options.diagnostics {
        manager.add_diagnostics(
            analysis
                .errors
                .iter()
                .map(|err| Diagnostic::from(err).with_source_context(options.diagnostic_context))
                .collect(),
        );
    }
    Ok(analysis)
}

/// Recovery-mode analysis packaged as a report: the partial analysis plus one diagnostic per
/// error.
pub fn analyze_report(units: &UnitSet, options: &AnalysisOptions) -> DiagnosticReport<Analysis> {
    let options = AnalysisOptions {
        recovery: true,
        ..options.clone()
    };
    match analyze(units, &options) {
        Ok(analysis) => {
            let diagnostics = analysis
                .errors
                .iter()
                .map(|err| Diagnostic::from(err).with_source_context(options.diagnostic_context))
                .collect();
            DiagnosticReport::success_with_diagnostics(analysis, diagnostics)
        }
        Err(err) => DiagnosticReport::failure(vec![Diagnostic::error(err.to_string())
            .with_source_context(options.diagnostic_context)]),
    }
}
