use lz_core::ast::{NodeId, NodeMeta, Reference, Type};
use lz_core::error::{AnalysisError, ErrorCode};
use lz_core::span::Span;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ScopeId(pub u32);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    Global,
    /// Holds one symbol per compilation unit, keyed by unit path.
    Units,
    /// Member table of a module, library, interactive unit or interactive section.
    Symbol(SymbolId),
    /// Public surface of a module.
    Exports(SymbolId),
    Function(NodeId),
    /// let, for, match clause and catch handler scopes.
    Block(NodeId),
}

impl ScopeKind {
    /// Scopes whose spaces are instantiated per evaluation rather than once per runtime.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, ScopeKind::Function(_) | ScopeKind::Block(_))
    }
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub enclosing: Option<ScopeId>,
    pub ordered: bool,
    symbols: HashMap<String, SymbolId>,
    slots: Vec<SymbolId>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get(name).copied()
    }

    /// Symbols declared here, in slot order. Published symbols of an exports scope are not
    /// included.
    pub fn slots(&self) -> &[SymbolId] {
        &self.slots
    }

    pub fn names(&self) -> impl Iterator<Item = (&String, &SymbolId)> {
        self.symbols.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Local,
    NameImport,
    ModuleImport,
    Alias,
    Export,
}

impl SymbolKind {
    pub fn is_indirection(&self) -> bool {
        !matches!(self, SymbolKind::Local)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolTarget {
    Module,
    Library,
    Var,
    Interactive,
    InteractiveSection,
    Unknown,
}

impl SymbolTarget {
    pub fn is_scoped(&self) -> bool {
        matches!(
            self,
            SymbolTarget::Module
                | SymbolTarget::Library
                | SymbolTarget::Interactive
                | SymbolTarget::InteractiveSection
        )
    }
}

impl fmt::Display for SymbolTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SymbolTarget::Module => "MODULE",
            SymbolTarget::Library => "LIBRARY",
            SymbolTarget::Var => "VAR",
            SymbolTarget::Interactive => "INTERACTIVE",
            SymbolTarget::InteractiveSection => "INTERACTIVE_SECTION",
            SymbolTarget::Unknown => "UNKNOWN",
        })
    }
}

/// What an indirection symbol points at before linking.
#[derive(Debug, Clone, PartialEq)]
pub enum Indirection {
    NameImport { unit: String, export: String },
    ModuleImport { unit: String },
    /// Alias and export targets, resolved in `scope`.
    Path {
        reference: Reference,
        scope: ScopeId,
    },
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub target: SymbolTarget,
    /// Scope the symbol was declared in.
    pub scope: ScopeId,
    /// Slot index inside `scope`.
    pub slot: usize,
    pub members: Option<ScopeId>,
    pub exports: Option<ScopeId>,
    pub meta: NodeMeta,
    pub declared_type: Type,
    pub is_export: bool,
    pub indirection: Option<Indirection>,
    pub resolved: Option<SymbolId>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, target: SymbolTarget, meta: NodeMeta) -> Self {
        Self {
            id: SymbolId(u32::MAX),
            name: name.into(),
            kind,
            target,
            scope: ScopeId(u32::MAX),
            slot: 0,
            members: None,
            exports: None,
            meta,
            declared_type: Type::Any,
            is_export: false,
            indirection: None,
            resolved: None,
        }
    }

    pub fn var(name: impl Into<String>, declared_type: Type, meta: NodeMeta) -> Self {
        Self {
            declared_type,
            ..Symbol::new(name, SymbolKind::Local, SymbolTarget::Var, meta)
        }
    }

    pub fn indirect(name: impl Into<String>, kind: SymbolKind, indirection: Indirection, meta: NodeMeta) -> Self {
        Self {
            indirection: Some(indirection),
            ..Symbol::new(name, kind, SymbolTarget::Unknown, meta)
        }
    }

    pub fn span(&self) -> Span {
        self.meta.span
    }

    pub fn node(&self) -> NodeId {
        self.meta.id
    }
}

/// Owning arena for every scope and symbol of an analysis run.
#[derive(Debug, Clone, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl ScopeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_scope(&mut self, kind: ScopeKind, enclosing: Option<ScopeId>, ordered: bool) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            kind,
            enclosing,
            ordered,
            symbols: HashMap::new(),
            slots: Vec::new(),
        });
        id
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Registers a binding in `scope`, failing on a name clash.
    pub fn declare(&mut self, scope: ScopeId, mut symbol: Symbol) -> Result<SymbolId, AnalysisError> {
        if let Some(existing) = self.scope(scope).get(&symbol.name) {
            let existing = self.symbol(existing);
            return Err(AnalysisError::new(
                ErrorCode::AlreadyDefined,
                format!("{} already defined at {}", symbol.name, existing.span()),
            )
            .with_span(symbol.span()));
        }
        let id = SymbolId(self.symbols.len() as u32);
        symbol.id = id;
        symbol.scope = scope;
        symbol.slot = self.scope(scope).slots.len();
        let name = symbol.name.clone();
        self.symbols.push(symbol);
        let scope = self.scope_mut(scope);
        scope.symbols.insert(name, id);
        scope.slots.push(id);
        Ok(id)
    }

    /// Makes an already declared symbol visible in a second table, such as a module's public
    /// surface, without moving its slot.
    pub fn publish(&mut self, scope: ScopeId, name: &str, symbol: SymbolId) -> Result<(), AnalysisError> {
        if self.scope(scope).get(name).is_some() {
            return Err(AnalysisError::new(
                ErrorCode::AlreadyDefined,
                format!("{} already exported", name),
            )
            .with_span(self.symbol(symbol).span()));
        }
        self.scope_mut(scope).symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    /// The non-indirection symbol a symbol stands for, if linked.
    pub fn target_of(&self, id: SymbolId) -> Option<SymbolId> {
        let symbol = self.symbol(id);
        if symbol.kind.is_indirection() {
            symbol.resolved
        } else {
            Some(id)
        }
    }

    /// Table searched for `a.<name>` once `a` is known to denote `id`.
    pub fn public_scope(&self, id: SymbolId) -> Option<ScopeId> {
        let symbol = self.symbol(id);
        match symbol.target {
            SymbolTarget::Module => symbol.exports,
            SymbolTarget::Library | SymbolTarget::Interactive | SymbolTarget::InteractiveSection => {
                symbol.members
            }
            SymbolTarget::Var | SymbolTarget::Unknown => None,
        }
    }

    /// The module, library or section symbol owning a member scope.
    pub fn owner(&self, scope: ScopeId) -> Option<SymbolId> {
        match self.scope(scope).kind {
            ScopeKind::Symbol(owner) | ScopeKind::Exports(owner) => Some(owner),
            _ => None,
        }
    }

    /// Number of enclosing hops from `from` up to `to`, if `to` is on the chain.
    pub fn depth(&self, from: ScopeId, to: ScopeId) -> Option<usize> {
        let mut current = Some(from);
        let mut depth = 0;
        while let Some(scope) = current {
            if scope == to {
                return Some(depth);
            }
            current = self.scope(scope).enclosing;
            depth += 1;
        }
        None
    }

    /// True when `scope` is `ancestor` or nested inside it.
    pub fn is_within(&self, scope: ScopeId, ancestor: ScopeId) -> bool {
        self.depth(scope, ancestor).is_some()
    }

    /// Slot path from the units space down to a statically allocated symbol. `None` for
    /// symbols living in per-evaluation scopes.
    pub fn absolute_path(&self, id: SymbolId) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut current = id;
        loop {
            let symbol = self.symbol(current);
            path.push(symbol.slot);
            match self.scope(symbol.scope).kind {
                ScopeKind::Units => break,
                ScopeKind::Symbol(owner) => current = owner,
                ScopeKind::Global
                | ScopeKind::Exports(_)
                | ScopeKind::Function(_)
                | ScopeKind::Block(_) => return None,
            }
        }
        path.reverse();
        Some(path)
    }
}
