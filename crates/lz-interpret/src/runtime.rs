use crate::builder::{BuildOptions, OpBuilder};
use crate::context::EvalContext;
use crate::error::{lang_error, LangException, Result};
use crate::memory::{Space, Templates};
use crate::value::Value;
use lz_analysis::{Analysis, ScopeId, SymbolTarget};
use lz_core::ast::{UnitKind, UnitSet};
use lz_core::diagnostics::{Diagnostic, DiagnosticManager};
use lz_core::error::ErrorCode;
use lz_core::span::Span;
use lz_core::{config, debug};
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_DIAGNOSTIC_CONTEXT: &str = "interpreter";

#[derive(Debug, Clone)]
pub struct InterpreterOptions {
    pub specialize: bool,
    pub fold_constants: bool,
    /// Uncaught evaluation errors are also reported here.
    pub diagnostics: Option<Arc<DiagnosticManager>>,
    pub diagnostic_context: &'static str,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            specialize: config::specialization_enabled(),
            fold_constants: config::constant_folding_enabled(),
            diagnostics: None,
            diagnostic_context: DEFAULT_DIAGNOSTIC_CONTEXT,
        }
    }
}

impl InterpreterOptions {
    /// Neither specialization nor constant folding.
    pub fn plain() -> Self {
        Self {
            specialize: false,
            fold_constants: false,
            ..Self::default()
        }
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            specialize: self.specialize,
            fold_constants: self.fold_constants,
        }
    }
}

/// Compiled unit set with its statically allocated memory.
///
/// Creating a runtime compiles every var definition and instantiates the units space, one
/// member space per unit, library and interactive section. Nothing is evaluated until asked.
pub struct Runtime {
    analysis: Arc<Analysis>,
    units: Arc<Space>,
    /// Static member spaces by scope.
    spaces: HashMap<ScopeId, Arc<Space>>,
    templates: Templates,
    options: InterpreterOptions,
}

impl Runtime {
    pub fn new(units: &UnitSet, analysis: Arc<Analysis>, options: InterpreterOptions) -> Result<Self> {
        let templates = Templates::new();
        {
            let builder = OpBuilder::new(&analysis, &templates, options.build_options());
            builder.static_template(analysis.units_scope, &[]);
            for unit in units.iter() {
                let Some(symbol) = analysis.unit(&unit.path) else {
                    continue;
                };
                let Some(members) = analysis.arena.symbol(symbol).members else {
                    continue;
                };
                builder.static_template(members, &[]);
                match &unit.kind {
                    UnitKind::Module(module) => {
                        for library in &module.libraries {
                            if let Some(scope) = analysis.created_scope(library.meta.id) {
                                builder.static_template(scope, &library.vars);
                            }
                        }
                    }
                    UnitKind::Interactive(interactive) => {
                        for section in &interactive.sections {
                            if let Some(scope) = analysis.created_scope(section.meta.id) {
                                builder.static_template(scope, &section.vars);
                            }
                        }
                    }
                }
            }
        }

        let units_template = templates.get(analysis.units_scope).ok_or_else(|| {
            lang_error(ErrorCode::InternalError, "Units scope has no template")
        })?;
        let units_space = Space::root(units_template);
        let mut runtime = Self {
            analysis,
            units: units_space.clone(),
            spaces: HashMap::new(),
            templates,
            options,
        };
        runtime
            .spaces
            .insert(runtime.analysis.units_scope, units_space.clone());

        // Modules first: section spaces nest in their module's member space.
        let mut cells: Vec<_> = units_space.cells().to_vec();
        cells.sort_by_key(|cell| {
            runtime.analysis.arena.symbol(cell.shape().symbol).target == SymbolTarget::Interactive
        });
        for cell in cells {
            if let Some(scope) = cell.shape().members {
                let space = runtime.instantiate(scope, &units_space)?;
                cell.set_members(space);
            }
        }
        debug!(
            "runtime created with {} static spaces and {} templates",
            runtime.spaces.len(),
            runtime.templates.len()
        );
        Ok(runtime)
    }

    fn instantiate(&mut self, scope: ScopeId, parent: &Arc<Space>) -> Result<Arc<Space>> {
        let template = self.templates.get(scope).ok_or_else(|| {
            lang_error(ErrorCode::InternalError, format!("Scope {:?} has no template", scope))
        })?;
        let enclosing = self
            .analysis
            .arena
            .scope(scope)
            .enclosing
            .and_then(|enclosing| self.spaces.get(&enclosing).cloned())
            .unwrap_or_else(|| parent.clone());
        let space = Space::nested(template, &enclosing);
        self.spaces.insert(scope, space.clone());
        for cell in space.cells() {
            if let Some(members) = cell.shape().members {
                let child = self.instantiate(members, &space)?;
                cell.set_members(child);
            }
        }
        Ok(space)
    }

    pub fn analysis(&self) -> &Arc<Analysis> {
        &self.analysis
    }

    pub fn units(&self) -> &Arc<Space> {
        &self.units
    }

    pub fn context(&self) -> EvalContext {
        EvalContext::new(self.units.clone())
    }

    fn report(&self, err: LangException) -> LangException {
        if let Some(manager) = &self.options.diagnostics {
            let mut diagnostic = Diagnostic::error(err.message.clone())
                .with_code(err.code.as_str())
                .with_source_context(self.options.diagnostic_context);
            if let Some(span) = err.span.filter(Span::has_position) {
                diagnostic = diagnostic.with_span(span);
            }
            manager.add_diagnostic(diagnostic);
        }
        err
    }

    /// Forces every var of a static space, depth first.
    fn evaluate_space(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<()> {
        for cell in space.cells() {
            match cell.members() {
                Some(members) => self.evaluate_space(members, ctx)?,
                None => {
                    if cell.shape().init.is_some() {
                        cell.evaluate(ctx)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn unit_space(&self, path: &str) -> Result<Arc<Space>> {
        let symbol = self.analysis.unit(path).ok_or_else(|| {
            lang_error(ErrorCode::UnresolvedReference, format!("Unknown unit {}", path))
        })?;
        let slot = self.analysis.arena.symbol(symbol).slot;
        self.units.cell(slot)?.members().cloned().ok_or_else(|| {
            lang_error(ErrorCode::InternalError, format!("Unit {} has no member space", path))
        })
    }

    /// Evaluates every var of a unit and returns its member space.
    pub fn evaluate_unit(&self, path: &str) -> Result<Arc<Space>> {
        debug!("evaluating unit {}", path);
        let space = self.unit_space(path)?;
        let mut ctx = self.context();
        self.evaluate_space(&space, &mut ctx)
            .map_err(|err| self.report(err))?;
        Ok(space)
    }

    /// Evaluates every var of one section of an interactive unit and returns its space.
    pub fn evaluate_interactive_section(&self, path: &str, module: &str) -> Result<Arc<Space>> {
        debug!("evaluating section {} of {}", module, path);
        let space = self
            .unit_space(path)?
            .get(module)
            .and_then(|cell| cell.members().cloned())
            .ok_or_else(|| {
                lang_error(
                    ErrorCode::UnresolvedReference,
                    format!("{} has no section for module {}", path, module),
                )
            })?;
        let mut ctx = self.context();
        self.evaluate_space(&space, &mut ctx)
            .map_err(|err| self.report(err))?;
        Ok(space)
    }

    /// Value of one var, addressed by unit path and member path, e.g. `["lib", "x"]`.
    pub fn evaluate_var(&self, path: &str, members: &[&str]) -> Result<Value> {
        let unresolved = || {
            lang_error(
                ErrorCode::UnresolvedReference,
                format!("Cannot resolve {}::{}", path, members.join(".")),
            )
        };
        let arena = &self.analysis.arena;
        let symbol = self
            .analysis
            .member(path, members)
            .and_then(|symbol| arena.target_of(symbol))
            .ok_or_else(unresolved)?;
        if arena.symbol(symbol).target != SymbolTarget::Var {
            return Err(lang_error(
                ErrorCode::InvalidReferenceTarget,
                format!("{}::{} is not a value", path, members.join(".")),
            ));
        }
        let slots = arena.absolute_path(symbol).ok_or_else(unresolved)?;

        let mut space = self.units.clone();
        let (last, outer) = slots.split_last().ok_or_else(unresolved)?;
        for slot in outer {
            space = space.cell(*slot)?.members().cloned().ok_or_else(unresolved)?;
        }
        let cell = space.cell(*last)?.clone();
        let mut ctx = self.context();
        cell.evaluate(&mut ctx).map_err(|err| self.report(err))
    }
}

/// Values of every evaluated var in a static space, nested spaces as dicts.
pub fn space_values(space: &Space) -> Value {
    Value::dict(space.cells().iter().filter_map(|cell| {
        let value = match cell.members() {
            Some(members) => space_values(members),
            None if cell.shape().init.is_some() => cell.value()?.clone(),
            None => return None,
        };
        Some((cell.name().to_string(), value))
    }))
}
