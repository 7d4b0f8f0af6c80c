//! Second analysis phase: binds every import, alias and export to the symbol it stands for.
//!
//! Linking is recursive. An indirection met while resolving another one is linked first, and
//! the chain of symbols currently being linked is kept to report cycles.

use crate::analysis::Analysis;
use crate::resolver::{resolve_path, Dereference};
use crate::scope::{Indirection, ScopeArena, ScopeId, SymbolId, SymbolTarget};
use itertools::Itertools;
use lz_core::error::{AnalysisError, ErrorCode};
use lz_core::span::Span;
use lz_core::{debug, trace};
use std::collections::HashMap;

pub struct Linker<'a> {
    arena: &'a mut ScopeArena,
    units: &'a HashMap<String, SymbolId>,
    chain: Vec<SymbolId>,
}

impl<'a> Linker<'a> {
    pub fn new(arena: &'a mut ScopeArena, units: &'a HashMap<String, SymbolId>) -> Self {
        Self {
            arena,
            units,
            chain: Vec::new(),
        }
    }

    /// Links `id` and every indirection it depends on. Local and already linked symbols are
    /// left alone, so linking is idempotent.
    pub fn link(&mut self, id: SymbolId) -> Result<(), AnalysisError> {
        let symbol = self.arena.symbol(id);
        if !symbol.kind.is_indirection() || symbol.resolved.is_some() {
            return Ok(());
        }
        let span = symbol.span();
        if self.chain.contains(&id) {
            let chain = self
                .chain
                .iter()
                .chain(std::iter::once(&id))
                .map(|s| self.arena.symbol(*s).name.as_str())
                .join(" -> ");
            return Err(AnalysisError::new(
                ErrorCode::CyclicReference,
                format!("Cyclic reference: {}", chain),
            )
            .with_span(span));
        }
        let Some(indirection) = symbol.indirection.clone() else {
            return Ok(());
        };

        self.chain.push(id);
        let result = self.link_indirection(&indirection, span);
        self.chain.pop();

        let target = result?;
        let target_kind = self.arena.symbol(target).target;
        let symbol = self.arena.symbol_mut(id);
        symbol.resolved = Some(target);
        symbol.target = target_kind;
        trace!("linked {} to {:?}", symbol.name, target);
        Ok(())
    }

    fn unit(&self, path: &str, span: Span) -> Result<SymbolId, AnalysisError> {
        self.units
            .get(path)
            .copied()
            .filter(|unit| self.arena.symbol(*unit).target == SymbolTarget::Module)
            .ok_or_else(|| {
                AnalysisError::new(
                    ErrorCode::UnresolvedReference,
                    format!("Cannot find module {}", path),
                )
                .with_span(span)
            })
    }

    fn link_indirection(&mut self, indirection: &Indirection, span: Span) -> Result<SymbolId, AnalysisError> {
        match indirection {
            Indirection::ModuleImport { unit } => self.unit(unit, span),
            Indirection::NameImport { unit, export } => {
                let module = self.unit(unit, span)?;
                let exported = self
                    .arena
                    .symbol(module)
                    .exports
                    .and_then(|exports| self.arena.scope(exports).get(export))
                    .ok_or_else(|| {
                        AnalysisError::new(
                            ErrorCode::CannotFindExport,
                            format!("Cannot find export {} in {}", export, unit),
                        )
                        .with_span(span)
                    })?;
                self.dereference(exported, span)
            }
            Indirection::Path { reference, scope } => {
                let (_, last) = resolve_path(self, *scope, reference, span)?;
                self.dereference(last, span)
            }
        }
    }
}

impl Dereference for Linker<'_> {
    fn arena(&self) -> &ScopeArena {
        self.arena
    }

    fn dereference(&mut self, symbol: SymbolId, span: Span) -> Result<SymbolId, AnalysisError> {
        self.link(symbol)?;
        self.arena.target_of(symbol).ok_or_else(|| {
            AnalysisError::new(
                ErrorCode::UnresolvedReference,
                format!("{} could not be linked", self.arena.symbol(symbol).name),
            )
            .with_span(span)
        })
    }
}

fn indirections(arena: &ScopeArena, scope: Option<ScopeId>) -> Vec<SymbolId> {
    scope
        .map(|scope| {
            arena
                .scope(scope)
                .slots()
                .iter()
                .copied()
                .filter(|id| arena.symbol(*id).kind.is_indirection())
                .collect()
        })
        .unwrap_or_default()
}

/// Links global module names, then per module its imports, aliases and exports, and finally
/// scopes every interactive section inside its module.
pub(crate) fn link_units(analysis: &mut Analysis, recovery: bool) -> lz_core::Result<()> {
    let mut order = indirections(&analysis.arena, Some(analysis.global));
    for unit in analysis.arena.scope(analysis.units_scope).slots() {
        let symbol = analysis.arena.symbol(*unit);
        if symbol.target == SymbolTarget::Module {
            order.extend(indirections(&analysis.arena, symbol.members));
            order.extend(indirections(&analysis.arena, symbol.exports));
        }
    }
    debug!("linking {} indirections", order.len());

    let mut errors = Vec::new();
    {
        let mut linker = Linker::new(&mut analysis.arena, &analysis.units);
        for id in order {
            if let Err(err) = linker.link(id) {
                if !recovery {
                    return Err(err.into());
                }
                errors.push(err);
            }
        }
    }

    let units: Vec<SymbolId> = analysis.arena.scope(analysis.units_scope).slots().to_vec();
    for unit in units {
        let symbol = analysis.arena.symbol(unit);
        if symbol.target != SymbolTarget::Interactive {
            continue;
        }
        let sections: Vec<SymbolId> = symbol
            .members
            .map(|scope| analysis.arena.scope(scope).slots().to_vec())
            .unwrap_or_default();
        for section in sections {
            let section_symbol = analysis.arena.symbol(section);
            let module = analysis
                .units
                .get(&section_symbol.name)
                .copied()
                .filter(|module| analysis.arena.symbol(*module).target == SymbolTarget::Module);
            match (module, section_symbol.members) {
                (Some(module), Some(members)) => {
                    let module_scope = analysis.arena.symbol(module).members;
                    analysis.arena.scope_mut(members).enclosing = module_scope;
                    analysis.sections.insert(section, module);
                }
                _ => {
                    let err = AnalysisError::new(
                        ErrorCode::UnresolvedReference,
                        format!("Cannot find module {}", section_symbol.name),
                    )
                    .with_span(section_symbol.span());
                    if !recovery {
                        return Err(err.into());
                    }
                    errors.push(err);
                }
            }
        }
    }

    analysis.errors.extend(errors);
    Ok(())
}
