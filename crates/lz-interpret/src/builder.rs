//! Compiles analysed syntax trees into operation trees.
//!
//! Every reference gets its cheapest address: a closure slot when the innermost function
//! captured it, an absolute slot path for statically allocated symbols, otherwise a frame
//! offset from the scope it is evaluated in. Each node is specialized and folded as soon as its
//! children are finished.

use crate::memory::{ShapeTemplate, SlotShape, Templates};
use crate::ops::*;
use crate::value::Value;
use lz_analysis::{Analysis, ReferenceClass, ScopeId, SymbolId};
use lz_core::ast::*;
use lz_core::config;
use lz_core::error::{AnalysisError, ErrorCode};
use lz_core::span::Span;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    pub specialize: bool,
    pub fold_constants: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            specialize: config::specialization_enabled(),
            fold_constants: config::constant_folding_enabled(),
        }
    }
}

impl BuildOptions {
    /// No specialization and no folding; every node evaluates as written.
    pub fn plain() -> Self {
        Self {
            specialize: false,
            fold_constants: false,
        }
    }
}

pub struct OpBuilder<'a> {
    analysis: &'a Analysis,
    templates: &'a Templates,
    options: BuildOptions,
}

fn fail(code: ErrorCode, message: String, span: Span) -> Op {
    Op::new(
        OpKind::Fail(AnalysisError::new(code, message).with_span(span)),
        span,
    )
}

impl<'a> OpBuilder<'a> {
    pub fn new(analysis: &'a Analysis, templates: &'a Templates, options: BuildOptions) -> Self {
        Self {
            analysis,
            templates,
            options,
        }
    }

    /// Compiles an expression evaluated outside any function.
    pub fn build(&self, expr: &Expr) -> Op {
        self.expr(expr, None)
    }

    /// Template of a statically allocated member scope. `vars` supply the init operations of
    /// its var slots.
    pub fn static_template(&self, scope: ScopeId, vars: &[VarDef]) -> Arc<ShapeTemplate> {
        self.templates.get_or_build(scope, || {
            let inits = vars
                .iter()
                .filter_map(|var| {
                    let symbol = self.analysis.definition(var.meta.id)?;
                    Some((symbol, self.expr(&var.value, None)))
                })
                .collect();
            self.template(scope, inits)
        })
    }

    fn template(&self, scope: ScopeId, mut inits: HashMap<SymbolId, Op>) -> ShapeTemplate {
        let arena = &self.analysis.arena;
        let slots = arena
            .scope(scope)
            .slots()
            .iter()
            .map(|id| {
                let symbol = arena.symbol(*id);
                SlotShape {
                    symbol: *id,
                    name: symbol.name.clone(),
                    declared_type: symbol.declared_type,
                    span: symbol.span(),
                    init: inits.remove(id).map(Arc::new),
                    members: symbol.members,
                }
            })
            .collect();
        ShapeTemplate::new(scope, slots)
    }

    fn block_template(
        &self,
        scope: ScopeId,
        inits: impl FnOnce() -> HashMap<SymbolId, Op>,
    ) -> Arc<ShapeTemplate> {
        self.templates
            .get_or_build(scope, || self.template(scope, inits()))
    }

    fn finish(&self, op: Op) -> Op {
        let op = if self.options.specialize {
            op.specialize()
        } else {
            op
        };
        if self.options.fold_constants {
            op.fold()
        } else {
            op
        }
    }

    fn slot_of(&self, node: NodeId) -> Option<usize> {
        self.analysis
            .definition(node)
            .map(|symbol| self.analysis.arena.symbol(symbol).slot)
    }

    fn expr(&self, expr: &Expr, function: Option<NodeId>) -> Op {
        let span = expr.meta.span;
        let kind = match &expr.kind {
            ExprKind::Constant(literal) => match Value::from_literal(literal) {
                Ok(value) => OpKind::Constant(value),
                Err(err) => return fail(err.code, err.message, span),
            },
            ExprKind::Reference(reference) => return self.reference(expr, reference, function),
            ExprKind::List(items) => OpKind::List(ListOp {
                items: items
                    .iter()
                    .map(|item| match item {
                        ListItem::Value(value) => ItemOp::Value(self.expr(value, function)),
                        ListItem::Splat(value) => ItemOp::Splat(self.expr(value, function)),
                    })
                    .collect(),
            }),
            ExprKind::Dict(entries) => OpKind::Dict(DictOp {
                entries: entries
                    .iter()
                    .map(|entry| match entry {
                        DictEntry::Pair { key, value } => EntryOp::Pair {
                            key: self.expr(key, function),
                            value: self.expr(value, function),
                        },
                        DictEntry::Splat(value) => EntryOp::Splat(self.expr(value, function)),
                    })
                    .collect(),
            }),
            ExprKind::Function(literal) => match self.function(expr, literal, function) {
                Some(op) => OpKind::Function(op),
                None => return self.missing_scope("function", span),
            },
            ExprKind::Call(call) => OpKind::Call(CallOp {
                callee: Box::new(self.expr(&call.callee, function)),
                args: call
                    .args
                    .iter()
                    .map(|arg| match arg {
                        Argument::Positional(value) => ArgOp::Positional(self.expr(value, function)),
                        Argument::Named(name, value) => {
                            ArgOp::Named(name.clone(), self.expr(value, function))
                        }
                        Argument::Splat(value) => ArgOp::Splat(self.expr(value, function)),
                    })
                    .collect(),
            }),
            ExprKind::Curry(curry) => OpKind::Curry(CurryOp {
                callee: Box::new(self.expr(&curry.callee, function)),
                args: curry
                    .args
                    .iter()
                    .map(|(name, value)| (name.clone(), self.expr(value, function)))
                    .collect(),
            }),
            ExprKind::Let(let_expr) => {
                let Some(scope) = self.analysis.created_scope(expr.meta.id) else {
                    return self.missing_scope("let", span);
                };
                let template = self.block_template(scope, || {
                    self.inits(let_expr.bindings.iter(), function)
                });
                OpKind::Let(LetOp {
                    template,
                    body: Box::new(self.expr(&let_expr.body, function)),
                })
            }
            ExprKind::If(if_expr) => OpKind::If(IfOp {
                condition: Box::new(self.expr(&if_expr.condition, function)),
                then_branch: Box::new(self.expr(&if_expr.then_branch, function)),
                else_branch: Box::new(self.expr(&if_expr.else_branch, function)),
            }),
            ExprKind::Match(match_expr) => {
                let mut lines = Vec::with_capacity(match_expr.lines.len());
                for line in &match_expr.lines {
                    let Some(scope) = self.analysis.created_scope(line.meta.id) else {
                        return self.missing_scope("match clause", line.meta.span);
                    };
                    lines.push(MatchLineOp {
                        pattern: self.pattern(&line.pattern, function),
                        template: self.block_template(scope, HashMap::new),
                        guard: line.guard.as_ref().map(|guard| self.expr(guard, function)),
                        result: self.expr(&line.result, function),
                    });
                }
                OpKind::Match(MatchOp {
                    subject: Box::new(self.expr(&match_expr.subject, function)),
                    lines,
                })
            }
            ExprKind::For(for_expr) => {
                let Some(scope) = self.analysis.created_scope(expr.meta.id) else {
                    return self.missing_scope("for", span);
                };
                let template = self.block_template(scope, || {
                    self.inits(
                        for_expr.heads.iter().filter_map(|head| match head {
                            ForHead::Definition(var) => Some(var),
                            _ => None,
                        }),
                        function,
                    )
                });
                let mut heads = Vec::with_capacity(for_expr.heads.len());
                for head in &for_expr.heads {
                    heads.push(match head {
                        ForHead::Generator(generator) => {
                            let Some(slot) = self.slot_of(generator.meta.id) else {
                                return self.missing_scope("generator", generator.meta.span);
                            };
                            ForHeadOp::Generator {
                                slot,
                                declared_type: generator.declared_type,
                                source: self.expr(&generator.source, function),
                            }
                        }
                        ForHead::Definition(var) => {
                            let Some(slot) = self.slot_of(var.meta.id) else {
                                return self.missing_scope("definition", var.meta.span);
                            };
                            ForHeadOp::Definition { slot }
                        }
                        ForHead::Condition(condition) => {
                            ForHeadOp::Condition(self.expr(condition, function))
                        }
                    });
                }
                OpKind::For(ForOp {
                    template,
                    heads,
                    body: Box::new(self.expr(&for_expr.body, function)),
                })
            }
            ExprKind::Binary(binary) => OpKind::Binary(BinaryNode::new(
                binary.op,
                self.expr(&binary.left, function),
                self.expr(&binary.right, function),
            )),
            ExprKind::Unary(unary) => OpKind::Unary(UnaryNode {
                op: unary.op,
                operand: Box::new(self.expr(&unary.operand, function)),
            }),
            ExprKind::Cast(cast) => OpKind::Cast(CastOp {
                expr: Box::new(self.expr(&cast.expr, function)),
                target: cast.target,
            }),
            ExprKind::Is(is) => OpKind::Is(IsOp {
                expr: Box::new(self.expr(&is.expr, function)),
                ty: is.ty,
            }),
            ExprKind::Access(access) => OpKind::Access(AccessOp {
                container: Box::new(self.expr(&access.container, function)),
                keys: access.keys.iter().map(|key| self.expr(key, function)).collect(),
            }),
            ExprKind::TryCatch(try_catch) => {
                let catch = &try_catch.catch;
                let Some(scope) = self.analysis.created_scope(catch.meta.id) else {
                    return self.missing_scope("catch", catch.meta.span);
                };
                OpKind::TryCatch(TryCatchOp {
                    body: Box::new(self.expr(&try_catch.body, function)),
                    template: self.block_template(scope, HashMap::new),
                    error_slot: catch.error.as_ref().and_then(|c| self.slot_of(c.meta.id)),
                    trace_slot: catch.trace.as_ref().and_then(|c| self.slot_of(c.meta.id)),
                    handler: Box::new(self.expr(&catch.handler, function)),
                })
            }
            ExprKind::Throw(value) => OpKind::Throw(ThrowOp {
                value: Box::new(self.expr(value, function)),
            }),
        };
        self.finish(Op::new(kind, span))
    }

    fn missing_scope(&self, what: &str, span: Span) -> Op {
        fail(
            ErrorCode::UnresolvedReference,
            format!("No analysed scope for {}", what),
            span,
        )
    }

    fn inits<'v>(
        &self,
        vars: impl Iterator<Item = &'v VarDef>,
        function: Option<NodeId>,
    ) -> HashMap<SymbolId, Op> {
        vars.filter_map(|var| {
            let symbol = self.analysis.definition(var.meta.id)?;
            Some((symbol, self.expr(&var.value, function)))
        })
        .collect()
    }

    fn address(&self, node: NodeId, function: Option<NodeId>) -> Result<(Address, Type), AnalysisError> {
        let resolved = match self.analysis.reference(node) {
            Some(Ok(resolved)) => resolved,
            Some(Err(err)) => return Err(err.clone()),
            None => {
                return Err(AnalysisError::new(
                    ErrorCode::UnresolvedReference,
                    "Reference was not analysed",
                ))
            }
        };
        let arena = &self.analysis.arena;
        let target = arena.symbol(resolved.target);

        if resolved.class == ReferenceClass::Closure {
            let index = function.and_then(|function| {
                self.analysis
                    .closed_over(function)
                    .iter()
                    .position(|symbol| *symbol == resolved.target)
            });
            if let Some(index) = index {
                return Ok((Address::Closure(index), target.declared_type));
            }
        }
        if let Some(path) = arena.absolute_path(resolved.target) {
            return Ok((Address::Absolute(path), target.declared_type));
        }
        let address = match (resolved.class, arena.depth(resolved.scope, target.scope)) {
            (ReferenceClass::SimpleLocal, _) | (_, Some(0)) => Address::Local(target.slot),
            (ReferenceClass::SimpleParent, _) | (_, Some(1)) => Address::Parent(target.slot),
            (_, Some(depth)) => Address::Frame {
                depth,
                slot: target.slot,
            },
            (_, None) => {
                return Err(AnalysisError::new(
                    ErrorCode::UnresolvedReference,
                    format!("{} is not reachable from its reference", target.name),
                ))
            }
        };
        Ok((address, target.declared_type))
    }

    fn reference(&self, expr: &Expr, reference: &Reference, function: Option<NodeId>) -> Op {
        let span = expr.meta.span;
        match self.address(expr.meta.id, function) {
            Ok((address, declared_type)) => Op::new(
                OpKind::Reference(ReferenceOp::new(
                    reference.to_string(),
                    address,
                    declared_type,
                )),
                span,
            ),
            Err(err) => {
                let err = if err.span.is_some() { err } else { err.with_span(span) };
                Op::new(OpKind::Fail(err), span)
            }
        }
    }

    fn function(
        &self,
        expr: &Expr,
        literal: &FunctionExpr,
        enclosing: Option<NodeId>,
    ) -> Option<FunctionOp> {
        let node = expr.meta.id;
        let scope = self.analysis.created_scope(node)?;
        let creation = self.analysis.scope_of(node)?;

        let params = literal
            .params
            .iter()
            .map(|param| ParamOp {
                name: param.name.clone(),
                declared_type: param.declared_type,
                default: param
                    .default
                    .as_ref()
                    .map(|default| self.expr(default, enclosing)),
            })
            .collect();
        let template = self.block_template(scope, HashMap::new);
        let body = self.expr(&literal.body, Some(node));

        let captures = self
            .analysis
            .closed_over(node)
            .iter()
            .map(|symbol| self.capture_plan(*symbol, creation, enclosing))
            .collect::<Option<Vec<_>>>()?;

        Some(FunctionOp {
            params,
            return_type: literal.return_type,
            body: Arc::new(body),
            template,
            captures,
            span: expr.meta.span,
        })
    }

    fn capture_plan(
        &self,
        symbol: SymbolId,
        creation: ScopeId,
        enclosing: Option<NodeId>,
    ) -> Option<CapturePlan> {
        if let Some(index) = enclosing.and_then(|function| {
            self.analysis
                .closed_over(function)
                .iter()
                .position(|captured| *captured == symbol)
        }) {
            return Some(CapturePlan::Propagate(index));
        }
        let arena = &self.analysis.arena;
        let target = arena.symbol(symbol);
        let address = match arena.absolute_path(symbol) {
            Some(path) => Address::Absolute(path),
            None => match arena.depth(creation, target.scope)? {
                0 => Address::Local(target.slot),
                depth => Address::Frame {
                    depth,
                    slot: target.slot,
                },
            },
        };
        Some(CapturePlan::Cell(ReferenceOp::new(
            target.name.clone(),
            address,
            target.declared_type,
        )))
    }

    fn capture_slot(&self, capture: &Option<Capture>) -> Option<usize> {
        capture.as_ref().and_then(|capture| self.slot_of(capture.meta.id))
    }

    fn patterns(&self, patterns: &[Pattern], function: Option<NodeId>) -> Vec<PatternOp> {
        patterns
            .iter()
            .map(|pattern| self.pattern(pattern, function))
            .collect()
    }

    fn entries(
        &self,
        entries: &[(String, Pattern)],
        function: Option<NodeId>,
    ) -> Vec<(String, PatternOp)> {
        entries
            .iter()
            .map(|(key, pattern)| (key.clone(), self.pattern(pattern, function)))
            .collect()
    }

    fn pattern(&self, pattern: &Pattern, function: Option<NodeId>) -> PatternOp {
        let kind = match &pattern.kind {
            PatternKind::Expression(expr) => PatternKindOp::Expression(self.expr(expr, function)),
            PatternKind::Capture | PatternKind::Default => PatternKindOp::Any,
            PatternKind::DataType(ty) => PatternKindOp::DataType(*ty),
            PatternKind::List(elements) => PatternKindOp::List(self.patterns(elements, function)),
            PatternKind::HeadTail { head, tail } => PatternKindOp::HeadTail {
                head: self.patterns(head, function),
                tail: self.capture_slot(tail),
            },
            PatternKind::InitLast { init, last } => PatternKindOp::InitLast {
                init: self.capture_slot(init),
                last: self.patterns(last, function),
            },
            PatternKind::MidList { head, mid, last } => PatternKindOp::MidList {
                head: self.patterns(head, function),
                mid: self.capture_slot(mid),
                last: self.patterns(last, function),
            },
            PatternKind::Dict(entries) => PatternKindOp::Dict(self.entries(entries, function)),
            PatternKind::OpenDict { entries, rest } => PatternKindOp::OpenDict {
                entries: self.entries(entries, function),
                rest: self.capture_slot(rest),
            },
        };
        PatternOp {
            kind,
            capture: self.capture_slot(&pattern.capture),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lz_analysis::{analyze, AnalysisOptions};
    use pretty_assertions::assert_eq;

    fn compile(vars: Vec<VarDef>, options: BuildOptions) -> Vec<Op> {
        let values: Vec<Expr> = vars.iter().map(|var| var.value.clone()).collect();
        let units = UnitSet::new().with(
            Module::new()
                .library(Library::new("lib", vars))
                .into_unit("builder/main.lz"),
        );
        let analysis = analyze(&units, &AnalysisOptions::strict()).unwrap();
        let templates = Templates::new();
        let builder = OpBuilder::new(&analysis, &templates, options);
        values.iter().map(|value| builder.build(value)).collect()
    }

    #[test]
    fn library_vars_are_addressed_absolutely() {
        let ops = compile(
            vec![
                VarDef::new("x", Expr::reference("y")),
                VarDef::new("y", Expr::long(1)),
            ],
            BuildOptions::plain(),
        );
        match &ops[0].kind {
            OpKind::Reference(reference) => {
                assert!(matches!(reference.address, Address::Absolute(_)))
            }
            other => panic!("expected a reference, got {:?}", other),
        }
    }

    #[test]
    fn let_body_reads_the_block_frame() {
        let ops = compile(
            vec![VarDef::new(
                "x",
                Expr::let_in(vec![VarDef::new("a", Expr::long(1))], Expr::reference("a")),
            )],
            BuildOptions::plain(),
        );
        let OpKind::Let(let_op) = &ops[0].kind else {
            panic!("expected a let");
        };
        match &let_op.body.kind {
            OpKind::Reference(reference) => {
                assert!(matches!(reference.address, Address::Local(0)))
            }
            other => panic!("expected a reference, got {:?}", other),
        }
    }

    #[test]
    fn constant_callee_specializes_to_fixed_call() {
        let call = || {
            Expr::call_positional(
                Expr::function(vec![Parameter::new("a")], Expr::reference("a")),
                vec![Expr::long(1)],
            )
        };
        let specialized = compile(
            vec![VarDef::new("x", call())],
            BuildOptions {
                specialize: true,
                fold_constants: true,
            },
        );
        assert!(matches!(specialized[0].kind, OpKind::FixedCall(_)));

        let plain = compile(vec![VarDef::new("x", call())], BuildOptions::plain());
        assert!(matches!(plain[0].kind, OpKind::Call(_)));
    }

    #[test]
    fn constant_arithmetic_folds() {
        let ops = compile(
            vec![VarDef::new(
                "x",
                Expr::binary(
                    BinaryOp::Plus,
                    Expr::long(1),
                    Expr::binary(BinaryOp::Mult, Expr::long(2), Expr::long(3)),
                ),
            )],
            BuildOptions {
                specialize: true,
                fold_constants: true,
            },
        );
        assert_eq!(ops[0].constant_value(), Some(&Value::long(7)));
    }
}
