use super::{SlotShape, Space};
use crate::context::EvalContext;
use crate::error::{lang_error_at, LangException, Result};
use crate::value::{cast, Value};
use lz_core::error::ErrorCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

/// One variable slot of a space. Its value is computed on first use and set at most once.
#[derive(Debug)]
pub struct Cell {
    shape: Arc<SlotShape>,
    value: OnceLock<Value>,
    /// First failure of `compute`; later reads report it again.
    failure: OnceLock<LangException>,
    evaluating: AtomicBool,
    members: OnceLock<Arc<Space>>,
    enclosing: Weak<Space>,
}

impl Cell {
    pub(crate) fn new(shape: Arc<SlotShape>, enclosing: Weak<Space>) -> Self {
        Self {
            shape,
            value: OnceLock::new(),
            failure: OnceLock::new(),
            evaluating: AtomicBool::new(false),
            members: OnceLock::new(),
            enclosing,
        }
    }

    pub fn shape(&self) -> &Arc<SlotShape> {
        &self.shape
    }

    pub fn name(&self) -> &str {
        &self.shape.name
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.value.get().is_none()
    }

    pub fn is_evaluating(&self) -> bool {
        self.evaluating.load(Ordering::Acquire)
    }

    /// Binds a value computed elsewhere. Returns false if the cell already had one.
    pub fn set(&self, value: Value) -> bool {
        self.value.set(value).is_ok()
    }

    pub fn members(&self) -> Option<&Arc<Space>> {
        self.members.get()
    }

    pub(crate) fn set_members(&self, space: Arc<Space>) {
        let _ = self.members.set(space);
    }

    pub fn failure(&self) -> Option<&LangException> {
        self.failure.get()
    }

    /// Returns the memoized value, computing it on first use. A failed computation is memoized
    /// as well.
    pub fn evaluate(self: &Arc<Self>, ctx: &mut EvalContext) -> Result<Value> {
        if let Some(value) = self.value.get() {
            return Ok(value.clone());
        }
        if let Some(err) = self.failure.get() {
            return Err(err.clone());
        }
        if self.evaluating.swap(true, Ordering::AcqRel) {
            return Err(lang_error_at(
                ErrorCode::CyclicEvaluation,
                format!("Cyclic evaluation of {}", self.shape.name),
                self.shape.span,
            )
            .or_trace(ctx.stack()));
        }

        let result = self.compute(ctx);
        self.evaluating.store(false, Ordering::Release);

        match result {
            Ok(value) => {
                let value = self.value.get_or_init(|| value).clone();
                ctx.resolve_deferred(self, &value);
                Ok(value)
            }
            Err(err) => {
                ctx.forget_deferred(self);
                Err(self.failure.get_or_init(|| err).clone())
            }
        }
    }

    fn compute(&self, ctx: &mut EvalContext) -> Result<Value> {
        let Some(init) = &self.shape.init else {
            return Ok(Value::Nil);
        };
        let space = self.enclosing.upgrade().ok_or_else(|| {
            lang_error_at(
                ErrorCode::InternalError,
                format!("{} outlived its space", self.shape.name),
                self.shape.span,
            )
        })?;

        ctx.push_frame(self.shape.name.as_str(), self.shape.span);
        let result = init
            .eval(&space, ctx)
            .and_then(|value| cast(value, self.shape.declared_type))
            .map_err(|err| err.or_span(self.shape.span).or_trace(ctx.stack()));
        ctx.pop_frame();
        result
    }
}
