use crate::ast::{Capture, Literal, NodeMeta, Pattern, Type};
use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Where name resolution of a reference starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Anchor {
    /// Lexical lookup walking outwards, never into the global scope.
    #[default]
    Local,
    /// `$name`: the global scope only.
    Global,
    /// `module::name`: the enclosing module's member scope.
    Module,
    /// `library::name`: the enclosing library's member scope.
    Library,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub anchor: Anchor,
    pub path: Vec<String>,
}

impl Reference {
    /// Splits a dotted path such as `lib.x`.
    pub fn local(path: &str) -> Self {
        Self::anchored(Anchor::Local, path)
    }

    pub fn anchored(anchor: Anchor, path: &str) -> Self {
        Self {
            anchor,
            path: path.split('.').map(str::to_string).collect(),
        }
    }

    pub fn is_simple(&self) -> bool {
        self.anchor == Anchor::Local && self.path.len() == 1
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.anchor {
            Anchor::Local => {}
            Anchor::Global => write!(f, "$")?,
            Anchor::Module => write!(f, "module::")?,
            Anchor::Library => write!(f, "library::")?,
        }
        write!(f, "{}", self.path.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Plus,
    Minus,
    Mult,
    Div,
    IntDiv,
    Mod,
    Pow,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Concat,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Mult => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Identical => "===",
            BinaryOp::NotIdentical => "!==",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Concat => "..",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ListItem {
    Value(Expr),
    Splat(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DictEntry {
    Pair { key: Expr, value: Expr },
    Splat(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub meta: NodeMeta,
    pub name: String,
    pub declared_type: Type,
    pub default: Option<Expr>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            meta: NodeMeta::fresh(),
            name: name.into(),
            declared_type: Type::Any,
            default: None,
        }
    }

    pub fn typed(declared_type: Type, name: impl Into<String>) -> Self {
        Self {
            declared_type,
            ..Self::new(name)
        }
    }

    pub fn with_default(mut self, default: Expr) -> Self {
        self.default = Some(default);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionExpr {
    pub params: Vec<Parameter>,
    pub return_type: Type,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Argument {
    Positional(Expr),
    Named(String, Expr),
    Splat(Expr),
}

impl Argument {
    pub fn named(name: impl Into<String>, value: Expr) -> Self {
        Argument::Named(name.into(), value)
    }

    pub fn expr(&self) -> &Expr {
        match self {
            Argument::Positional(expr) | Argument::Named(_, expr) | Argument::Splat(expr) => expr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Expr,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurryExpr {
    pub callee: Expr,
    pub args: Vec<(String, Expr)>,
}

/// A named value binding in a library, let block, for head or interactive section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDef {
    pub meta: NodeMeta,
    pub name: String,
    pub declared_type: Type,
    pub value: Expr,
}

impl VarDef {
    pub fn new(name: impl Into<String>, value: Expr) -> Self {
        Self::typed(Type::Any, name, value)
    }

    pub fn typed(declared_type: Type, name: impl Into<String>, value: Expr) -> Self {
        Self {
            meta: NodeMeta::fresh(),
            name: name.into(),
            declared_type,
            value,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.meta.span = span;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetExpr {
    pub bindings: Vec<VarDef>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfExpr {
    pub condition: Expr,
    pub then_branch: Expr,
    pub else_branch: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLine {
    pub meta: NodeMeta,
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub result: Expr,
}

impl MatchLine {
    pub fn new(pattern: Pattern, result: Expr) -> Self {
        Self {
            meta: NodeMeta::fresh(),
            pattern,
            guard: None,
            result,
        }
    }

    pub fn guarded(pattern: Pattern, guard: Expr, result: Expr) -> Self {
        Self {
            guard: Some(guard),
            ..Self::new(pattern, result)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchExpr {
    pub subject: Expr,
    pub lines: Vec<MatchLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub meta: NodeMeta,
    pub name: String,
    pub declared_type: Type,
    pub source: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForHead {
    Generator(Generator),
    Definition(VarDef),
    Condition(Expr),
}

impl ForHead {
    pub fn generator(name: impl Into<String>, source: Expr) -> Self {
        ForHead::Generator(Generator {
            meta: NodeMeta::fresh(),
            name: name.into(),
            declared_type: Type::Any,
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForExpr {
    pub heads: Vec<ForHead>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Expr,
    pub right: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastExpr {
    pub expr: Expr,
    pub target: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsExpr {
    pub expr: Expr,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessExpr {
    pub container: Expr,
    pub keys: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    pub meta: NodeMeta,
    pub error: Option<Capture>,
    pub trace: Option<Capture>,
    pub handler: Expr,
}

impl CatchClause {
    pub fn new(error: Option<&str>, trace: Option<&str>, handler: Expr) -> Self {
        Self {
            meta: NodeMeta::fresh(),
            error: error.map(Capture::new),
            trace: trace.map(Capture::new),
            handler,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryCatchExpr {
    pub body: Expr,
    pub catch: CatchClause,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::From)]
pub enum ExprKind {
    Constant(Literal),
    Reference(Reference),
    List(Vec<ListItem>),
    Dict(Vec<DictEntry>),
    Function(Box<FunctionExpr>),
    Call(Box<CallExpr>),
    Curry(Box<CurryExpr>),
    Let(Box<LetExpr>),
    If(Box<IfExpr>),
    Match(Box<MatchExpr>),
    For(Box<ForExpr>),
    Binary(Box<BinaryExpr>),
    Unary(Box<UnaryExpr>),
    Cast(Box<CastExpr>),
    Is(Box<IsExpr>),
    Access(Box<AccessExpr>),
    TryCatch(Box<TryCatchExpr>),
    Throw(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub meta: NodeMeta,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(kind: impl Into<ExprKind>) -> Self {
        Self {
            meta: NodeMeta::fresh(),
            kind: kind.into(),
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.meta.span = span;
        self
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn nil() -> Self {
        Expr::new(Literal::Nil)
    }

    pub fn boolean(value: bool) -> Self {
        Expr::new(Literal::Boolean(value))
    }

    pub fn long(value: i64) -> Self {
        Expr::new(Literal::Long(value))
    }

    pub fn double(value: f64) -> Self {
        Expr::new(Literal::Double(value))
    }

    pub fn decimal(text: &str) -> Self {
        Expr::new(Literal::Decimal(text.to_string()))
    }

    pub fn string(value: &str) -> Self {
        Expr::new(Literal::String(value.to_string()))
    }

    pub fn datetime(text: &str) -> Self {
        Expr::new(Literal::DateTime(text.to_string()))
    }

    pub fn reference(path: &str) -> Self {
        Expr::new(Reference::local(path))
    }

    pub fn anchored(anchor: Anchor, path: &str) -> Self {
        Expr::new(Reference::anchored(anchor, path))
    }

    pub fn list(items: Vec<Expr>) -> Self {
        Expr::new(ExprKind::List(items.into_iter().map(ListItem::Value).collect()))
    }

    pub fn list_items(items: Vec<ListItem>) -> Self {
        Expr::new(ExprKind::List(items))
    }

    pub fn dict(entries: Vec<(Expr, Expr)>) -> Self {
        Expr::new(ExprKind::Dict(
            entries
                .into_iter()
                .map(|(key, value)| DictEntry::Pair { key, value })
                .collect(),
        ))
    }

    pub fn dict_entries(entries: Vec<DictEntry>) -> Self {
        Expr::new(ExprKind::Dict(entries))
    }

    pub fn function(params: Vec<Parameter>, body: Expr) -> Self {
        Expr::typed_function(params, Type::Any, body)
    }

    pub fn typed_function(params: Vec<Parameter>, return_type: Type, body: Expr) -> Self {
        Expr::new(Box::new(FunctionExpr {
            params,
            return_type,
            body,
        }))
    }

    pub fn call(callee: Expr, args: Vec<Argument>) -> Self {
        Expr::new(Box::new(CallExpr { callee, args }))
    }

    pub fn call_positional(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::call(callee, args.into_iter().map(Argument::Positional).collect())
    }

    pub fn curry(callee: Expr, args: Vec<(&str, Expr)>) -> Self {
        Expr::new(Box::new(CurryExpr {
            callee,
            args: args
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }))
    }

    pub fn let_in(bindings: Vec<VarDef>, body: Expr) -> Self {
        Expr::new(Box::new(LetExpr { bindings, body }))
    }

    pub fn if_else(condition: Expr, then_branch: Expr, else_branch: Expr) -> Self {
        Expr::new(Box::new(IfExpr {
            condition,
            then_branch,
            else_branch,
        }))
    }

    pub fn match_on(subject: Expr, lines: Vec<MatchLine>) -> Self {
        Expr::new(Box::new(MatchExpr { subject, lines }))
    }

    pub fn for_each(heads: Vec<ForHead>, body: Expr) -> Self {
        Expr::new(Box::new(ForExpr { heads, body }))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::new(Box::new(BinaryExpr { op, left, right }))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::new(Box::new(UnaryExpr { op, operand }))
    }

    pub fn cast(expr: Expr, target: Type) -> Self {
        Expr::new(Box::new(CastExpr { expr, target }))
    }

    pub fn is(expr: Expr, ty: Type) -> Self {
        Expr::new(Box::new(IsExpr { expr, ty }))
    }

    pub fn access(container: Expr, keys: Vec<Expr>) -> Self {
        Expr::new(Box::new(AccessExpr { container, keys }))
    }

    pub fn try_catch(body: Expr, catch: CatchClause) -> Self {
        Expr::new(Box::new(TryCatchExpr { body, catch }))
    }

    pub fn throw(value: Expr) -> Self {
        Expr::new(ExprKind::Throw(Box::new(value)))
    }
}
