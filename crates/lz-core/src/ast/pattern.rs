use crate::ast::{Expr, NodeMeta, Type};
use crate::span::Span;
use serde::{Deserialize, Serialize};

/// A name bound by a pattern, a catch clause or a rest position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub meta: NodeMeta,
    pub name: String,
}

impl Capture {
    pub fn new(name: &str) -> Self {
        Self {
            meta: NodeMeta::fresh(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternKind {
    /// Matches by value equality, or by calling the value as a predicate if it is a function.
    Expression(Expr),
    /// Always matches; binds the subject when the pattern has a capture.
    Capture,
    Default,
    DataType(Type),
    List(Vec<Pattern>),
    HeadTail {
        head: Vec<Pattern>,
        tail: Option<Capture>,
    },
    InitLast {
        init: Option<Capture>,
        last: Vec<Pattern>,
    },
    MidList {
        head: Vec<Pattern>,
        mid: Option<Capture>,
        last: Vec<Pattern>,
    },
    Dict(Vec<(String, Pattern)>),
    OpenDict {
        entries: Vec<(String, Pattern)>,
        rest: Option<Capture>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub meta: NodeMeta,
    pub kind: PatternKind,
    /// Whole-subject capture.
    pub capture: Option<Capture>,
}

impl Pattern {
    pub fn new(kind: PatternKind) -> Self {
        Self {
            meta: NodeMeta::fresh(),
            kind,
            capture: None,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.meta.span = span;
        self
    }

    pub fn capturing(mut self, name: &str) -> Self {
        self.capture = Some(Capture::new(name));
        self
    }

    pub fn expr(expr: Expr) -> Self {
        Pattern::new(PatternKind::Expression(expr))
    }

    /// `@name`
    pub fn capture(name: &str) -> Self {
        Pattern::new(PatternKind::Capture).capturing(name)
    }

    /// `_`
    pub fn wildcard() -> Self {
        Pattern::new(PatternKind::Capture)
    }

    pub fn default_line() -> Self {
        Pattern::new(PatternKind::Default)
    }

    pub fn data_type(ty: Type) -> Self {
        Pattern::new(PatternKind::DataType(ty))
    }

    pub fn list(elements: Vec<Pattern>) -> Self {
        Pattern::new(PatternKind::List(elements))
    }

    pub fn head_tail(head: Vec<Pattern>, tail: Option<&str>) -> Self {
        Pattern::new(PatternKind::HeadTail {
            head,
            tail: tail.map(Capture::new),
        })
    }

    pub fn init_last(init: Option<&str>, last: Vec<Pattern>) -> Self {
        Pattern::new(PatternKind::InitLast {
            init: init.map(Capture::new),
            last,
        })
    }

    pub fn mid_list(head: Vec<Pattern>, mid: Option<&str>, last: Vec<Pattern>) -> Self {
        Pattern::new(PatternKind::MidList {
            head,
            mid: mid.map(Capture::new),
            last,
        })
    }

    pub fn dict(entries: Vec<(&str, Pattern)>) -> Self {
        Pattern::new(PatternKind::Dict(
            entries
                .into_iter()
                .map(|(key, pattern)| (key.to_string(), pattern))
                .collect(),
        ))
    }

    pub fn open_dict(entries: Vec<(&str, Pattern)>, rest: Option<&str>) -> Self {
        Pattern::new(PatternKind::OpenDict {
            entries: entries
                .into_iter()
                .map(|(key, pattern)| (key.to_string(), pattern))
                .collect(),
            rest: rest.map(Capture::new),
        })
    }

    /// All names this pattern binds, in binding order.
    pub fn captures(&self) -> Vec<&Capture> {
        let mut out = Vec::new();
        self.collect_captures(&mut out);
        out
    }

    fn collect_captures<'a>(&'a self, out: &mut Vec<&'a Capture>) {
        match &self.kind {
            PatternKind::Expression(_)
            | PatternKind::Capture
            | PatternKind::Default
            | PatternKind::DataType(_) => {}
            PatternKind::List(elements) => {
                elements.iter().for_each(|p| p.collect_captures(out));
            }
            PatternKind::HeadTail { head, tail } => {
                head.iter().for_each(|p| p.collect_captures(out));
                out.extend(tail.iter());
            }
            PatternKind::InitLast { init, last } => {
                out.extend(init.iter());
                last.iter().for_each(|p| p.collect_captures(out));
            }
            PatternKind::MidList { head, mid, last } => {
                head.iter().for_each(|p| p.collect_captures(out));
                out.extend(mid.iter());
                last.iter().for_each(|p| p.collect_captures(out));
            }
            PatternKind::Dict(entries) => {
                entries.iter().for_each(|(_, p)| p.collect_captures(out));
            }
            PatternKind::OpenDict { entries, rest } => {
                entries.iter().for_each(|(_, p)| p.collect_captures(out));
                out.extend(rest.iter());
            }
        }
        out.extend(self.capture.iter());
    }

    /// Expressions embedded in the pattern, evaluated in the enclosing frame.
    pub fn expressions(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_expressions(&mut out);
        out
    }

    fn collect_expressions<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match &self.kind {
            PatternKind::Expression(expr) => out.push(expr),
            PatternKind::Capture | PatternKind::Default | PatternKind::DataType(_) => {}
            PatternKind::List(elements) | PatternKind::HeadTail { head: elements, .. } => {
                elements.iter().for_each(|p| p.collect_expressions(out));
            }
            PatternKind::InitLast { last, .. } => {
                last.iter().for_each(|p| p.collect_expressions(out));
            }
            PatternKind::MidList { head, last, .. } => {
                head.iter().for_each(|p| p.collect_expressions(out));
                last.iter().for_each(|p| p.collect_expressions(out));
            }
            PatternKind::Dict(entries) | PatternKind::OpenDict { entries, .. } => {
                entries.iter().for_each(|(_, p)| p.collect_expressions(out));
            }
        }
    }
}
