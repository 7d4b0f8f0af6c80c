use super::Op;
use crate::context::EvalContext;
use crate::error::Result;
use crate::memory::Space;
use crate::value::{truthy, value_equals, Value};
use lz_core::ast::Type;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Captured values, as `(slot in the clause space, value)`.
pub type Bindings = Vec<(usize, Value)>;

#[derive(Debug, Clone)]
pub enum PatternKindOp {
    /// Equality with the expression's value, or a predicate call when it is a function.
    Expression(Op),
    Any,
    DataType(Type),
    List(Vec<PatternOp>),
    HeadTail {
        head: Vec<PatternOp>,
        tail: Option<usize>,
    },
    InitLast {
        init: Option<usize>,
        last: Vec<PatternOp>,
    },
    MidList {
        head: Vec<PatternOp>,
        mid: Option<usize>,
        last: Vec<PatternOp>,
    },
    Dict(Vec<(String, PatternOp)>),
    OpenDict {
        entries: Vec<(String, PatternOp)>,
        rest: Option<usize>,
    },
}

#[derive(Debug, Clone)]
pub struct PatternOp {
    pub kind: PatternKindOp,
    /// Slot receiving the whole subject.
    pub capture: Option<usize>,
}

fn all_match(
    patterns: &[PatternOp],
    values: &[Value],
    space: &Arc<Space>,
    ctx: &mut EvalContext,
    bindings: &mut Bindings,
) -> Result<bool> {
    for (pattern, value) in patterns.iter().zip(values) {
        if !pattern.matches(value, space, ctx, bindings)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn bind(slot: Option<usize>, value: impl FnOnce() -> Value, bindings: &mut Bindings) {
    if let Some(slot) = slot {
        bindings.push((slot, value()));
    }
}

impl PatternOp {
    /// Tests `subject`, collecting captures into `bindings`. Expressions inside the pattern
    /// evaluate in `space`, the frame of the match itself.
    pub fn matches(
        &self,
        subject: &Value,
        space: &Arc<Space>,
        ctx: &mut EvalContext,
        bindings: &mut Bindings,
    ) -> Result<bool> {
        let matched = match &self.kind {
            PatternKindOp::Expression(op) => match op.eval(space, ctx)? {
                Value::Function(predicate) => {
                    truthy(&predicate.call(std::slice::from_ref(subject), ctx)?)
                }
                expected => value_equals(subject, &expected),
            },
            PatternKindOp::Any => true,
            PatternKindOp::DataType(ty) => match (subject, ty) {
                (_, Type::Any) => true,
                (Value::Nil, _) => false,
                (subject, ty) => subject.value_type() == *ty,
            },
            PatternKindOp::List(elements) => match subject {
                Value::List(list) if list.len() == elements.len() => {
                    all_match(elements, list, space, ctx, bindings)?
                }
                _ => false,
            },
            PatternKindOp::HeadTail { head, tail } => match subject {
                Value::List(list) if list.len() >= head.len() => {
                    let matched = all_match(head, &list[..head.len()], space, ctx, bindings)?;
                    bind(*tail, || Value::list(list[head.len()..].to_vec()), bindings);
                    matched
                }
                _ => false,
            },
            PatternKindOp::InitLast { init, last } => match subject {
                Value::List(list) if list.len() >= last.len() => {
                    let split = list.len() - last.len();
                    let matched = all_match(last, &list[split..], space, ctx, bindings)?;
                    bind(*init, || Value::list(list[..split].to_vec()), bindings);
                    matched
                }
                _ => false,
            },
            PatternKindOp::MidList { head, mid, last } => match subject {
                Value::List(list) if list.len() >= head.len() + last.len() => {
                    let split = list.len() - last.len();
                    let matched = all_match(head, &list[..head.len()], space, ctx, bindings)?
                        && all_match(last, &list[split..], space, ctx, bindings)?;
                    bind(*mid, || Value::list(list[head.len()..split].to_vec()), bindings);
                    matched
                }
                _ => false,
            },
            PatternKindOp::Dict(entries) => match subject {
                Value::Dict(dict) if dict.len() == entries.len() => {
                    self.entries_match(entries, dict, space, ctx, bindings)?
                }
                _ => false,
            },
            PatternKindOp::OpenDict { entries, rest } => match subject {
                Value::Dict(dict) => {
                    let matched = self.entries_match(entries, dict, space, ctx, bindings)?;
                    bind(
                        *rest,
                        || {
                            Value::dict(
                                dict.iter()
                                    .filter(|(key, _)| !entries.iter().any(|(name, _)| name == *key))
                                    .map(|(key, value)| (key.clone(), value.clone())),
                            )
                        },
                        bindings,
                    );
                    matched
                }
                _ => false,
            },
        };
        if matched {
            bind(self.capture, || subject.clone(), bindings);
        }
        Ok(matched)
    }

    fn entries_match(
        &self,
        entries: &[(String, PatternOp)],
        dict: &BTreeMap<String, Value>,
        space: &Arc<Space>,
        ctx: &mut EvalContext,
        bindings: &mut Bindings,
    ) -> Result<bool> {
        for (key, pattern) in entries {
            let Some(value) = dict.get(key) else {
                return Ok(false);
            };
            if !pattern.matches(value, space, ctx, bindings)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn any(capture: Option<usize>) -> PatternOp {
        PatternOp {
            kind: PatternKindOp::Any,
            capture,
        }
    }

    fn long_list(values: &[i64]) -> Value {
        Value::list(values.iter().copied().map(Value::long).collect())
    }

    fn run(pattern: &PatternOp, subject: &Value) -> Option<Bindings> {
        let space = Space::detached();
        let mut ctx = EvalContext::detached();
        let mut bindings = Bindings::new();
        pattern
            .matches(subject, &space, &mut ctx, &mut bindings)
            .unwrap()
            .then_some(bindings)
    }

    #[test]
    fn mid_list_captures_the_middle() {
        let pattern = PatternOp {
            kind: PatternKindOp::MidList {
                head: vec![any(Some(0))],
                mid: Some(1),
                last: vec![any(Some(2))],
            },
            capture: None,
        };
        let bindings = run(&pattern, &long_list(&[1, 2, 3, 4])).unwrap();
        assert_eq!(
            bindings,
            vec![
                (0, Value::long(1)),
                (2, Value::long(4)),
                (1, long_list(&[2, 3])),
            ]
        );
        assert!(run(&pattern, &long_list(&[1])).is_none());
    }

    #[test]
    fn closed_dict_requires_exact_keys() {
        let pattern = PatternOp {
            kind: PatternKindOp::Dict(vec![("a".to_string(), any(None))]),
            capture: None,
        };
        let exact = Value::dict([("a".to_string(), Value::long(1))]);
        let wider = Value::dict([
            ("a".to_string(), Value::long(1)),
            ("b".to_string(), Value::long(2)),
        ]);
        assert!(run(&pattern, &exact).is_some());
        assert!(run(&pattern, &wider).is_none());
    }

    #[test]
    fn data_type_rejects_nil_unless_any() {
        let long = PatternOp {
            kind: PatternKindOp::DataType(Type::Long),
            capture: None,
        };
        let anything = PatternOp {
            kind: PatternKindOp::DataType(Type::Any),
            capture: None,
        };
        assert!(run(&long, &Value::Nil).is_none());
        assert!(run(&long, &Value::long(3)).is_some());
        assert!(run(&anything, &Value::Nil).is_some());
    }
}
