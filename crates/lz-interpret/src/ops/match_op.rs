use super::{Bindings, Op, PatternOp};
use crate::context::EvalContext;
use crate::error::Result;
use crate::memory::{ShapeTemplate, Space};
use crate::value::{truthy, Value};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MatchLineOp {
    pub pattern: PatternOp,
    /// Layout of the clause space holding the pattern's captures.
    pub template: Arc<ShapeTemplate>,
    pub guard: Option<Op>,
    pub result: Op,
}

#[derive(Debug, Clone)]
pub struct MatchOp {
    pub subject: Box<Op>,
    pub lines: Vec<MatchLineOp>,
}

impl MatchOp {
    /// First clause matching both structurally and by guard wins; nil when none does.
    pub fn eval(&self, space: &Arc<Space>, ctx: &mut EvalContext) -> Result<Value> {
        let subject = self.subject.eval(space, ctx)?;
        let mut bindings = Bindings::new();
        for line in &self.lines {
            bindings.clear();
            if !line.pattern.matches(&subject, space, ctx, &mut bindings)? {
                continue;
            }
            let clause = space.child(line.template.clone());
            for (slot, value) in bindings.drain(..) {
                clause.cell(slot)?.set(value);
            }
            if let Some(guard) = &line.guard {
                if !truthy(&guard.eval(&clause, ctx)?) {
                    continue;
                }
            }
            return line.result.eval(&clause, ctx);
        }
        Ok(Value::Nil)
    }
}
