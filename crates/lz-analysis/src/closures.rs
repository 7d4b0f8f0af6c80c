//! Closure analysis: which outer symbols each function value must capture when it is created.

use crate::analysis::{Analysis, ReferenceClass};
use crate::scope::{ScopeId, SymbolId};
use lz_core::ast::*;

struct FunctionFrame {
    node: NodeId,
    scope: ScopeId,
}

struct ClosureWalker<'a> {
    analysis: &'a mut Analysis,
    functions: Vec<FunctionFrame>,
}

pub(crate) fn analyze_closures(analysis: &mut Analysis, units: &UnitSet) {
    let mut walker = ClosureWalker {
        analysis,
        functions: Vec::new(),
    };
    for unit in units.iter() {
        match &unit.kind {
            UnitKind::Module(module) => {
                for library in &module.libraries {
                    walker.visit_vars(&library.vars);
                }
            }
            UnitKind::Interactive(interactive) => {
                for section in &interactive.sections {
                    walker.visit_vars(&section.vars);
                }
            }
        }
    }
}

impl ClosureWalker<'_> {
    fn visit_vars(&mut self, vars: &[VarDef]) {
        for var in vars {
            self.visit_expr(&var.value);
        }
    }

    fn capture(&mut self, function: NodeId, target: SymbolId) {
        let closed = self.analysis.closures.entry(function).or_default();
        if !closed.contains(&target) {
            closed.push(target);
        }
    }

    fn visit_reference(&mut self, node: NodeId) {
        let Some(Ok(reference)) = self.analysis.references.get(&node) else {
            return;
        };
        let target = reference.target;
        let declared_in = self.analysis.arena.symbol(target).scope;

        let mut captured_by_innermost = false;
        let mut captures = Vec::new();
        for (depth, frame) in self.functions.iter().rev().enumerate() {
            if self.analysis.arena.is_within(declared_in, frame.scope) {
                break;
            }
            captures.push(frame.node);
            if depth == 0 {
                captured_by_innermost = true;
            }
        }
        for function in captures {
            self.capture(function, target);
        }
        if captured_by_innermost {
            if let Some(Ok(reference)) = self.analysis.references.get_mut(&node) {
                reference.class = ReferenceClass::Closure;
            }
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Constant(_) => {}
            ExprKind::Reference(_) => self.visit_reference(expr.meta.id),
            ExprKind::List(items) => {
                for item in items {
                    match item {
                        ListItem::Value(value) | ListItem::Splat(value) => self.visit_expr(value),
                    }
                }
            }
            ExprKind::Dict(entries) => {
                for entry in entries {
                    match entry {
                        DictEntry::Pair { key, value } => {
                            self.visit_expr(key);
                            self.visit_expr(value);
                        }
                        DictEntry::Splat(value) => self.visit_expr(value),
                    }
                }
            }
            ExprKind::Function(function) => {
                for param in &function.params {
                    if let Some(default) = &param.default {
                        self.visit_expr(default);
                    }
                }
                let Some(scope) = self.analysis.created_scope(expr.meta.id) else {
                    return;
                };
                self.analysis.closures.entry(expr.meta.id).or_default();
                self.functions.push(FunctionFrame {
                    node: expr.meta.id,
                    scope,
                });
                self.visit_expr(&function.body);
                self.functions.pop();
            }
            ExprKind::Call(call) => {
                self.visit_expr(&call.callee);
                for arg in &call.args {
                    self.visit_expr(arg.expr());
                }
            }
            ExprKind::Curry(curry) => {
                self.visit_expr(&curry.callee);
                for (_, value) in &curry.args {
                    self.visit_expr(value);
                }
            }
            ExprKind::Let(let_expr) => {
                for binding in &let_expr.bindings {
                    self.visit_expr(&binding.value);
                }
                self.visit_expr(&let_expr.body);
            }
            ExprKind::If(if_expr) => {
                self.visit_expr(&if_expr.condition);
                self.visit_expr(&if_expr.then_branch);
                self.visit_expr(&if_expr.else_branch);
            }
            ExprKind::Match(match_expr) => {
                self.visit_expr(&match_expr.subject);
                for line in &match_expr.lines {
                    for pattern_expr in line.pattern.expressions() {
                        self.visit_expr(pattern_expr);
                    }
                    if let Some(guard) = &line.guard {
                        self.visit_expr(guard);
                    }
                    self.visit_expr(&line.result);
                }
            }
            ExprKind::For(for_expr) => {
                for head in &for_expr.heads {
                    match head {
                        ForHead::Generator(generator) => self.visit_expr(&generator.source),
                        ForHead::Definition(var) => self.visit_expr(&var.value),
                        ForHead::Condition(condition) => self.visit_expr(condition),
                    }
                }
                self.visit_expr(&for_expr.body);
            }
            ExprKind::Binary(binary) => {
                self.visit_expr(&binary.left);
                self.visit_expr(&binary.right);
            }
            ExprKind::Unary(unary) => self.visit_expr(&unary.operand),
            ExprKind::Cast(cast) => self.visit_expr(&cast.expr),
            ExprKind::Is(is) => self.visit_expr(&is.expr),
            ExprKind::Access(access) => {
                self.visit_expr(&access.container);
                for key in &access.keys {
                    self.visit_expr(key);
                }
            }
            ExprKind::TryCatch(try_catch) => {
                self.visit_expr(&try_catch.body);
                self.visit_expr(&try_catch.catch.handler);
            }
            ExprKind::Throw(value) => self.visit_expr(value),
        }
    }
}
