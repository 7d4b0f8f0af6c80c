use super::{cast, CurriedFunction, Value};
use crate::closures::ClosureSet;
use crate::context::EvalContext;
use crate::error::{lang_error, Result};
use crate::memory::{ShapeTemplate, Space};
use crate::ops::Op;
use crate::lang_bail;
use itertools::Itertools;
use lz_core::ast::Type;
use lz_core::error::ErrorCode;
use lz_core::span::Span;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub declared_type: Type,
    /// Evaluated once, when the function value was created.
    pub default: Value,
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<ParamSpec>,
    pub return_type: Type,
}

impl Signature {
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|param| param.name == name)
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}) -> {}",
            self.params
                .iter()
                .map(|param| format!("{} {}", param.declared_type, param.name))
                .join(", "),
            self.return_type
        )
    }
}

/// A function literal closed over its environment.
pub struct UserFunction {
    pub body: Arc<Op>,
    /// Shape of the call space; parameters occupy the first slots.
    pub template: Arc<ShapeTemplate>,
    pub closures: Arc<ClosureSet>,
    pub span: Span,
}

pub enum FunctionKind {
    User(UserFunction),
    Curried(CurriedFunction),
}

pub struct FunctionValue {
    pub signature: Signature,
    pub kind: FunctionKind,
}

impl Debug for FunctionValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            FunctionKind::User(_) => "user",
            FunctionKind::Curried(_) => "curried",
        };
        write!(f, "FunctionValue({} {})", kind, self.signature)
    }
}

/// An argument at a call site, after evaluation.
#[derive(Debug, Clone)]
pub enum CallArgument {
    Positional(Value),
    Named(String, Value),
    /// A list spreads positionally, a dict by name.
    Splat(Value),
}

impl FunctionValue {
    pub fn arity(&self) -> usize {
        self.signature.arity()
    }

    /// Calls with arguments already in parameter order. Missing trailing arguments take their
    /// defaults.
    pub fn call(&self, args: &[Value], ctx: &mut EvalContext) -> Result<Value> {
        let arity = self.arity();
        let args: Cow<[Value]> = if args.len() == arity {
            Cow::Borrowed(args)
        } else if args.len() < arity {
            let mut padded = args.to_vec();
            padded.extend(
                self.signature.params[args.len()..]
                    .iter()
                    .map(|param| param.default.clone()),
            );
            Cow::Owned(padded)
        } else {
            lang_bail!(
                ErrorCode::UnexpectedArgument,
                "Too many arguments: function takes {} parameters, got {}",
                arity,
                args.len()
            );
        };

        match &self.kind {
            FunctionKind::User(function) => self.invoke(function, &args, ctx),
            FunctionKind::Curried(curried) => curried.call(&args, ctx),
        }
    }

    fn invoke(&self, function: &UserFunction, args: &[Value], ctx: &mut EvalContext) -> Result<Value> {
        let space = Space::call(function.template.clone(), function.closures.clone());
        for (slot, (param, arg)) in self.signature.params.iter().zip(args).enumerate() {
            let value = cast(arg.clone(), param.declared_type)?;
            space.cell(slot)?.set(value);
        }

        ctx.push_frame("function", function.span);
        let result = function
            .body
            .eval(&space, ctx)
            .and_then(|value| cast(value, self.signature.return_type))
            .map_err(|err| err.or_trace(ctx.stack()));
        ctx.pop_frame();
        result
    }

    /// Binds call-site arguments to parameters.
    pub fn bind(&self, args: Vec<CallArgument>) -> Result<Vec<Value>> {
        let params = &self.signature.params;
        let mut bound: Vec<Option<Value>> = vec![None; params.len()];
        let mut position = 0;
        let mut named_seen = false;

        for arg in args {
            match arg {
                CallArgument::Positional(value) => {
                    self.bind_positional(&mut bound, &mut position, named_seen, value)?
                }
                CallArgument::Named(name, value) => {
                    named_seen = true;
                    self.bind_named(&mut bound, &name, value)?;
                }
                CallArgument::Splat(Value::List(list)) => {
                    for value in list.iter() {
                        self.bind_positional(&mut bound, &mut position, named_seen, value.clone())?;
                    }
                }
                CallArgument::Splat(Value::Dict(dict)) => {
                    named_seen = true;
                    for (name, value) in dict.iter() {
                        self.bind_named(&mut bound, name, value.clone())?;
                    }
                }
                CallArgument::Splat(Value::Nil) => {}
                CallArgument::Splat(other) => lang_bail!(
                    ErrorCode::CastError,
                    "Cannot splat {} into arguments",
                    other.value_type()
                ),
            }
        }

        Ok(bound
            .into_iter()
            .zip(params)
            .map(|(value, param)| value.unwrap_or_else(|| param.default.clone()))
            .collect())
    }

    fn bind_positional(
        &self,
        bound: &mut [Option<Value>],
        position: &mut usize,
        named_seen: bool,
        value: Value,
    ) -> Result<()> {
        if named_seen {
            lang_bail!(
                ErrorCode::UnexpectedArgument,
                "Positional argument cannot follow named arguments."
            );
        }
        let slot = bound.get_mut(*position).ok_or_else(|| {
            lang_error(
                ErrorCode::UnexpectedArgument,
                format!(
                    "Too many arguments: function takes {} parameters",
                    self.arity()
                ),
            )
        })?;
        *slot = Some(value);
        *position += 1;
        Ok(())
    }

    fn bind_named(&self, bound: &mut [Option<Value>], name: &str, value: Value) -> Result<()> {
        let index = self.signature.index_of(name).ok_or_else(|| {
            lang_error(
                ErrorCode::UnexpectedArgument,
                format!("Function does not have parameter named: {}", name),
            )
        })?;
        bound[index] = Some(value);
        Ok(())
    }

    pub fn call_with(&self, args: Vec<CallArgument>, ctx: &mut EvalContext) -> Result<Value> {
        let args = self.bind(args)?;
        self.call(&args, ctx)
    }
}
