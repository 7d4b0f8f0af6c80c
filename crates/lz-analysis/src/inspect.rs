use crate::analysis::Analysis;
use crate::scope::{ScopeId, SymbolId};
use lz_core::ast::NodeId;
use lz_core::source_map::source_map;
use lz_core::span::Span;

/// What sits under a source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inspection {
    /// A definition, or the symbol a reference points at.
    Symbol(SymbolId),
    Scope(ScopeId),
    Node(NodeId),
}

impl Analysis {
    /// Finds the innermost analysed node covering `line:column` in the unit at `path`.
    ///
    /// Positions not covered by any node fall back to the unit's own member scope.
    pub fn inspect(&self, path: &str, line: u32, column: u32) -> Option<Inspection> {
        let file = source_map().file_id(path)?;
        let mut best: Option<(NodeId, Span)> = None;
        for (node, span) in &self.positions {
            if span.file != file || !span.contains(line, column) {
                continue;
            }
            match best {
                Some((_, current)) if !span.within(&current) => {}
                _ => best = Some((*node, *span)),
            }
        }

        let Some((node, _)) = best else {
            let unit = self.unit(path)?;
            return self.arena.symbol(unit).members.map(Inspection::Scope);
        };
        if let Some(Ok(reference)) = self.references.get(&node) {
            return Some(Inspection::Symbol(reference.symbol));
        }
        if let Some(symbol) = self.definitions.get(&node) {
            return Some(Inspection::Symbol(*symbol));
        }
        if let Some(scope) = self.created_scopes.get(&node) {
            return Some(Inspection::Scope(*scope));
        }
        Some(Inspection::Node(node))
    }
}
