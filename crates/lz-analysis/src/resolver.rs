//! Path resolution shared by the linker and by reference expressions.

use crate::analysis::{Analysis, ReferenceClass, ResolvedReference};
use crate::builder::PendingReference;
use crate::scope::{ScopeArena, ScopeId, ScopeKind, SymbolId, SymbolTarget};
use lz_core::ast::{Anchor, Reference};
use lz_core::error::{AnalysisError, ErrorCode};
use lz_core::span::Span;
use lz_core::trace;

/// Turns a symbol met in the middle of a path into the symbol whose members are searched next.
pub(crate) trait Dereference {
    fn arena(&self) -> &ScopeArena;
    fn dereference(&mut self, symbol: SymbolId, span: Span) -> Result<SymbolId, AnalysisError>;
}

/// Dereferences through already linked indirections only.
struct Linked<'a> {
    arena: &'a ScopeArena,
}

impl Dereference for Linked<'_> {
    fn arena(&self) -> &ScopeArena {
        self.arena
    }

    fn dereference(&mut self, symbol: SymbolId, span: Span) -> Result<SymbolId, AnalysisError> {
        self.arena.target_of(symbol).ok_or_else(|| {
            AnalysisError::new(
                ErrorCode::UnresolvedReference,
                format!("{} could not be linked", self.arena.symbol(symbol).name),
            )
            .with_span(span)
        })
    }
}

pub(crate) fn unresolved(reference: &Reference, span: Span) -> AnalysisError {
    AnalysisError::new(
        ErrorCode::UnresolvedReference,
        format!("Cannot resolve reference {}", reference),
    )
    .with_span(span)
}

/// Finds the symbol named by the first path element, according to the reference's anchor.
pub(crate) fn first_element(
    arena: &ScopeArena,
    scope: ScopeId,
    reference: &Reference,
    span: Span,
) -> Result<SymbolId, AnalysisError> {
    let name = reference
        .path
        .first()
        .ok_or_else(|| unresolved(reference, span))?;

    let found = match reference.anchor {
        Anchor::Global => {
            let mut current = Some(scope);
            let mut global = None;
            while let Some(id) = current {
                if arena.scope(id).kind == ScopeKind::Global {
                    global = Some(id);
                    break;
                }
                current = arena.scope(id).enclosing;
            }
            global.and_then(|id| arena.scope(id).get(name))
        }
        Anchor::Local => {
            let mut current = Some(scope);
            let mut found = None;
            while let Some(id) = current {
                let scope = arena.scope(id);
                if matches!(scope.kind, ScopeKind::Units | ScopeKind::Global) {
                    break;
                }
                if let Some(symbol) = scope.get(name) {
                    found = Some(symbol);
                    break;
                }
                current = scope.enclosing;
            }
            found
        }
        Anchor::Module | Anchor::Library => {
            let wanted = if reference.anchor == Anchor::Module {
                SymbolTarget::Module
            } else {
                SymbolTarget::Library
            };
            let mut current = Some(scope);
            let mut found = None;
            while let Some(id) = current {
                let scope = arena.scope(id);
                if let ScopeKind::Symbol(owner) = scope.kind {
                    if arena.symbol(owner).target == wanted {
                        found = scope.get(name);
                        break;
                    }
                }
                current = scope.enclosing;
            }
            found
        }
    };
    found.ok_or_else(|| unresolved(reference, span))
}

/// Looks up `name` on the public surface of a module, library or section.
pub(crate) fn member(
    arena: &ScopeArena,
    container: SymbolId,
    name: &str,
    reference: &Reference,
    span: Span,
) -> Result<SymbolId, AnalysisError> {
    let public = arena.public_scope(container).ok_or_else(|| {
        AnalysisError::new(
            ErrorCode::UnresolvedReference,
            format!(
                "Cannot resolve reference {}: {} has no members",
                reference,
                arena.symbol(container).name
            ),
        )
        .with_span(span)
    })?;
    arena
        .scope(public)
        .get(name)
        .ok_or_else(|| unresolved(reference, span))
}

/// Resolves every path element, returning the first and the last symbol met.
pub(crate) fn resolve_path(
    ctx: &mut impl Dereference,
    scope: ScopeId,
    reference: &Reference,
    span: Span,
) -> Result<(SymbolId, SymbolId), AnalysisError> {
    let first = first_element(ctx.arena(), scope, reference, span)?;
    let mut current = first;
    for name in reference.path.iter().skip(1) {
        let container = ctx.dereference(current, span)?;
        current = member(ctx.arena(), container, name, reference, span)?;
    }
    Ok((first, current))
}

fn resolve_pending(arena: &ScopeArena, pending: &PendingReference) -> Result<ResolvedReference, AnalysisError> {
    let span = pending.meta.span;
    let mut linked = Linked { arena };
    let (first, last) = resolve_path(&mut linked, pending.scope, &pending.reference, span)?;

    let first_symbol = arena.symbol(first);
    // Bindings are declared before their own value is visited, so a let-bound function can
    // call itself while later bindings stay invisible.
    if arena.scope(first_symbol.scope).ordered && first.0 as usize >= pending.visible {
        return Err(AnalysisError::new(
            ErrorCode::UnresolvedReference,
            format!(
                "Cannot reference {} before its definition",
                pending.reference
            ),
        )
        .with_span(span));
    }

    let target = linked.dereference(last, span)?;
    let target_kind = arena.symbol(target).target;
    if target_kind != SymbolTarget::Var {
        return Err(AnalysisError::new(
            ErrorCode::InvalidReferenceTarget,
            format!("Cannot reference {}. Not a value.", target_kind),
        )
        .with_span(span));
    }

    let class = if pending.reference.is_simple() && first == target {
        match arena.depth(pending.scope, arena.symbol(target).scope) {
            Some(0) => ReferenceClass::SimpleLocal,
            Some(1) => ReferenceClass::SimpleParent,
            _ => ReferenceClass::Generic,
        }
    } else {
        ReferenceClass::Generic
    };

    Ok(ResolvedReference {
        node: pending.meta.id,
        scope: pending.scope,
        symbol: last,
        target,
        class,
    })
}

/// Resolves reference expressions once every indirection is linked. Failed references stay in
/// the table as errors so evaluation can fail at the point of use.
pub(crate) fn resolve_references(
    analysis: &mut Analysis,
    pending: Vec<PendingReference>,
    recovery: bool,
) -> lz_core::Result<()> {
    for reference in pending {
        let result = resolve_pending(&analysis.arena, &reference);
        if let Err(err) = &result {
            if !recovery {
                return Err(err.clone().into());
            }
            trace!("reference {} failed: {}", reference.reference, err);
            analysis.errors.push(err.clone());
        }
        analysis.references.insert(reference.meta.id, result);
    }
    Ok(())
}
