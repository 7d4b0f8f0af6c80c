//! First analysis phase: walks every unit once, creating scopes and declaring symbols, and
//! queues each reference expression for resolution after linking.

use crate::analysis::Analysis;
use crate::scope::{Indirection, ScopeId, ScopeKind, Symbol, SymbolId, SymbolKind, SymbolTarget};
use lz_core::ast::*;
use lz_core::error::AnalysisError;
use lz_core::{trace, Result};

/// A reference expression waiting for the linker to finish.
#[derive(Debug, Clone)]
pub(crate) struct PendingReference {
    pub meta: NodeMeta,
    pub scope: ScopeId,
    pub reference: Reference,
    /// Symbols declared before the reference was visited. In ordered scopes only these are
    /// visible.
    pub visible: usize,
}

pub(crate) struct ScopeBuilder<'a> {
    analysis: &'a mut Analysis,
    recovery: bool,
    pending: Vec<PendingReference>,
}

impl<'a> ScopeBuilder<'a> {
    pub fn new(analysis: &'a mut Analysis, recovery: bool) -> Self {
        Self {
            analysis,
            recovery,
            pending: Vec::new(),
        }
    }

    pub fn build(mut self, units: &UnitSet) -> Result<Vec<PendingReference>> {
        // Unit symbols first, so imports and sections can name units in any load order.
        let mut declared = Vec::with_capacity(units.len());
        for unit in units.iter() {
            if let Some(symbol) = self.declare_unit(unit)? {
                declared.push((unit, symbol));
            }
        }
        for (unit, symbol) in declared {
            match &unit.kind {
                UnitKind::Module(module) => self.visit_module(module, symbol)?,
                UnitKind::Interactive(interactive) => self.visit_interactive(interactive, symbol)?,
            }
        }
        Ok(self.pending)
    }

    fn report(&mut self, err: AnalysisError) -> Result<()> {
        if self.recovery {
            trace!("recovering from {}", err);
            self.analysis.errors.push(err);
            Ok(())
        } else {
            Err(err.into())
        }
    }

    /// Declares a symbol and records its defining node. A clash is reported and yields `None`.
    fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> Result<Option<SymbolId>> {
        let meta = symbol.meta;
        match self.analysis.arena.declare(scope, symbol) {
            Ok(id) => {
                self.analysis.definitions.insert(meta.id, id);
                self.record_position(meta);
                Ok(Some(id))
            }
            Err(err) => {
                self.report(err)?;
                Ok(None)
            }
        }
    }

    fn record_position(&mut self, meta: NodeMeta) {
        if meta.span.has_position() {
            self.analysis.positions.push((meta.id, meta.span));
        }
    }

    fn member_scope(&mut self, owner: SymbolId, enclosing: ScopeId, node: NodeId) -> ScopeId {
        let scope = self
            .analysis
            .arena
            .new_scope(ScopeKind::Symbol(owner), Some(enclosing), false);
        self.analysis.arena.symbol_mut(owner).members = Some(scope);
        self.analysis.created_scopes.insert(node, scope);
        scope
    }

    fn declare_unit(&mut self, unit: &Unit) -> Result<Option<SymbolId>> {
        let units_scope = self.analysis.units_scope;
        let target = match unit.kind {
            UnitKind::Module(_) => SymbolTarget::Module,
            UnitKind::Interactive(_) => SymbolTarget::Interactive,
        };
        let Some(symbol) = self.declare(
            units_scope,
            Symbol::new(unit.path.as_str(), SymbolKind::Local, target, unit.meta),
        )?
        else {
            return Ok(None);
        };
        self.analysis.units.insert(unit.path.clone(), symbol);
        self.member_scope(symbol, units_scope, unit.meta.id);

        if let UnitKind::Module(module) = &unit.kind {
            let exports = self
                .analysis
                .arena
                .new_scope(ScopeKind::Exports(symbol), Some(units_scope), false);
            self.analysis.arena.symbol_mut(symbol).exports = Some(exports);

            if let Some(name) = &module.global_name {
                let global = self.analysis.global;
                self.declare(
                    global,
                    Symbol::indirect(
                        name.as_str(),
                        SymbolKind::ModuleImport,
                        Indirection::ModuleImport {
                            unit: unit.path.clone(),
                        },
                        NodeMeta {
                            id: NodeId::fresh(),
                            span: unit.meta.span,
                        },
                    ),
                )?;
            }
        }
        Ok(Some(symbol))
    }

    fn visit_module(&mut self, module: &Module, symbol: SymbolId) -> Result<()> {
        let arena = &self.analysis.arena;
        let (Some(scope), Some(exports)) = (arena.symbol(symbol).members, arena.symbol(symbol).exports)
        else {
            return Ok(());
        };

        for import in &module.imports {
            for member in &import.members {
                let (kind, indirection) = match &member.kind {
                    ImportKind::Name(export) => (
                        SymbolKind::NameImport,
                        Indirection::NameImport {
                            unit: import.source.clone(),
                            export: export.clone(),
                        },
                    ),
                    ImportKind::Module => (
                        SymbolKind::ModuleImport,
                        Indirection::ModuleImport {
                            unit: import.source.clone(),
                        },
                    ),
                };
                self.declare(
                    scope,
                    Symbol::indirect(member.local.as_str(), kind, indirection, member.meta),
                )?;
            }
        }

        for alias in &module.aliases {
            self.declare(
                scope,
                Symbol::indirect(
                    alias.name.as_str(),
                    SymbolKind::Alias,
                    Indirection::Path {
                        reference: alias.target.clone(),
                        scope,
                    },
                    alias.meta,
                ),
            )?;
        }

        for library in &module.libraries {
            let mut lib = Symbol::new(
                library.name.as_str(),
                SymbolKind::Local,
                SymbolTarget::Library,
                library.meta,
            );
            lib.is_export = library.exported;
            let Some(lib) = self.declare(scope, lib)? else {
                continue;
            };
            let members = self.member_scope(lib, scope, library.meta.id);
            if library.exported {
                if let Err(err) = self.analysis.arena.publish(exports, &library.name, lib) {
                    self.report(err)?;
                }
            }
            self.visit_vars(&library.vars, members)?;
        }

        for export in &module.exports {
            let mut symbol = Symbol::indirect(
                export.name.as_str(),
                SymbolKind::Export,
                Indirection::Path {
                    reference: export.target.clone(),
                    scope,
                },
                export.meta,
            );
            symbol.is_export = true;
            self.declare(exports, symbol)?;
        }
        Ok(())
    }

    fn visit_interactive(&mut self, interactive: &Interactive, symbol: SymbolId) -> Result<()> {
        let Some(scope) = self.analysis.arena.symbol(symbol).members else {
            return Ok(());
        };
        let units_scope = self.analysis.units_scope;
        for section in &interactive.sections {
            let Some(section_symbol) = self.declare(
                scope,
                Symbol::new(
                    section.module.as_str(),
                    SymbolKind::Local,
                    SymbolTarget::InteractiveSection,
                    section.meta,
                ),
            )?
            else {
                continue;
            };
            // Re-pointed at the module's member scope once the module is linked.
            let members = self.member_scope(section_symbol, units_scope, section.meta.id);
            self.visit_vars(&section.vars, members)?;
        }
        Ok(())
    }

    /// Declares all vars of an unordered member scope, then visits their values.
    fn visit_vars(&mut self, vars: &[VarDef], scope: ScopeId) -> Result<()> {
        for var in vars {
            self.declare(
                scope,
                Symbol::var(var.name.as_str(), var.declared_type, var.meta),
            )?;
        }
        for var in vars {
            self.visit_definition_value(var, scope)?;
        }
        Ok(())
    }

    fn visit_definition_value(&mut self, var: &VarDef, scope: ScopeId) -> Result<()> {
        self.visit_expr(&var.value, scope)
    }

    fn declare_var(&mut self, scope: ScopeId, var: &VarDef) -> Result<()> {
        self.declare(
            scope,
            Symbol::var(var.name.as_str(), var.declared_type, var.meta),
        )?;
        Ok(())
    }

    fn declare_capture(&mut self, scope: ScopeId, capture: &Capture) -> Result<()> {
        self.declare(scope, Symbol::var(capture.name.as_str(), Type::Any, capture.meta))?;
        Ok(())
    }

    fn block_scope(&mut self, node: NodeId, enclosing: ScopeId, ordered: bool) -> ScopeId {
        let scope = self
            .analysis
            .arena
            .new_scope(ScopeKind::Block(node), Some(enclosing), ordered);
        self.analysis.created_scopes.insert(node, scope);
        scope
    }

    fn visit_expr(&mut self, expr: &Expr, scope: ScopeId) -> Result<()> {
        self.analysis.node_scopes.insert(expr.meta.id, scope);
        self.record_position(expr.meta);

        match &expr.kind {
            ExprKind::Constant(_) => {}
            ExprKind::Reference(reference) => {
                self.pending.push(PendingReference {
                    meta: expr.meta,
                    scope,
                    reference: reference.clone(),
                    visible: self.analysis.arena.symbol_count(),
                });
            }
            ExprKind::List(items) => {
                for item in items {
                    match item {
                        ListItem::Value(value) | ListItem::Splat(value) => {
                            self.visit_expr(value, scope)?
                        }
                    }
                }
            }
            ExprKind::Dict(entries) => {
                for entry in entries {
                    match entry {
                        DictEntry::Pair { key, value } => {
                            self.visit_expr(key, scope)?;
                            self.visit_expr(value, scope)?;
                        }
                        DictEntry::Splat(value) => self.visit_expr(value, scope)?,
                    }
                }
            }
            ExprKind::Function(function) => {
                // Defaults are evaluated when the function value is created.
                for param in &function.params {
                    if let Some(default) = &param.default {
                        self.visit_expr(default, scope)?;
                    }
                }
                let function_scope = self.analysis.arena.new_scope(
                    ScopeKind::Function(expr.meta.id),
                    Some(scope),
                    false,
                );
                self.analysis
                    .created_scopes
                    .insert(expr.meta.id, function_scope);
                for param in &function.params {
                    self.declare(
                        function_scope,
                        Symbol::var(param.name.as_str(), param.declared_type, param.meta),
                    )?;
                }
                self.visit_expr(&function.body, function_scope)?;
            }
            ExprKind::Call(call) => {
                self.visit_expr(&call.callee, scope)?;
                for arg in &call.args {
                    self.visit_expr(arg.expr(), scope)?;
                }
            }
            ExprKind::Curry(curry) => {
                self.visit_expr(&curry.callee, scope)?;
                for (_, value) in &curry.args {
                    self.visit_expr(value, scope)?;
                }
            }
            ExprKind::Let(let_expr) => {
                let let_scope = self.block_scope(expr.meta.id, scope, true);
                for binding in &let_expr.bindings {
                    self.declare_var(let_scope, binding)?;
                    self.visit_definition_value(binding, let_scope)?;
                }
                self.visit_expr(&let_expr.body, let_scope)?;
            }
            ExprKind::If(if_expr) => {
                self.visit_expr(&if_expr.condition, scope)?;
                self.visit_expr(&if_expr.then_branch, scope)?;
                self.visit_expr(&if_expr.else_branch, scope)?;
            }
            ExprKind::Match(match_expr) => {
                self.visit_expr(&match_expr.subject, scope)?;
                for line in &match_expr.lines {
                    let line_scope = self.block_scope(line.meta.id, scope, false);
                    self.record_position(line.meta);
                    self.visit_pattern(&line.pattern, scope, line_scope)?;
                    if let Some(guard) = &line.guard {
                        self.visit_expr(guard, line_scope)?;
                    }
                    self.visit_expr(&line.result, line_scope)?;
                }
            }
            ExprKind::For(for_expr) => {
                let for_scope = self.block_scope(expr.meta.id, scope, true);
                for head in &for_expr.heads {
                    match head {
                        ForHead::Generator(generator) => {
                            self.visit_expr(&generator.source, for_scope)?;
                            self.declare(
                                for_scope,
                                Symbol::var(
                                    generator.name.as_str(),
                                    generator.declared_type,
                                    generator.meta,
                                ),
                            )?;
                        }
                        ForHead::Definition(var) => {
                            self.declare_var(for_scope, var)?;
                            self.visit_definition_value(var, for_scope)?;
                        }
                        ForHead::Condition(condition) => self.visit_expr(condition, for_scope)?,
                    }
                }
                self.visit_expr(&for_expr.body, for_scope)?;
            }
            ExprKind::Binary(binary) => {
                self.visit_expr(&binary.left, scope)?;
                self.visit_expr(&binary.right, scope)?;
            }
            ExprKind::Unary(unary) => self.visit_expr(&unary.operand, scope)?,
            ExprKind::Cast(cast) => self.visit_expr(&cast.expr, scope)?,
            ExprKind::Is(is) => self.visit_expr(&is.expr, scope)?,
            ExprKind::Access(access) => {
                self.visit_expr(&access.container, scope)?;
                for key in &access.keys {
                    self.visit_expr(key, scope)?;
                }
            }
            ExprKind::TryCatch(try_catch) => {
                self.visit_expr(&try_catch.body, scope)?;
                let catch = &try_catch.catch;
                let catch_scope = self.block_scope(catch.meta.id, scope, false);
                self.record_position(catch.meta);
                if let Some(error) = &catch.error {
                    self.declare_capture(catch_scope, error)?;
                }
                if let Some(trace) = &catch.trace {
                    self.declare_capture(catch_scope, trace)?;
                }
                self.visit_expr(&catch.handler, catch_scope)?;
            }
            ExprKind::Throw(value) => self.visit_expr(value, scope)?,
        }
        Ok(())
    }

    /// Pattern expressions see the enclosing frame; captures land in the clause scope.
    fn visit_pattern(&mut self, pattern: &Pattern, scope: ScopeId, line_scope: ScopeId) -> Result<()> {
        self.analysis.node_scopes.insert(pattern.meta.id, scope);
        self.record_position(pattern.meta);
        for expr in pattern.expressions() {
            self.visit_expr(expr, scope)?;
        }
        for capture in pattern.captures() {
            self.declare_capture(line_scope, capture)?;
        }
        Ok(())
    }
}
