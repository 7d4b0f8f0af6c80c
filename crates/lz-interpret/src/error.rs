use crate::value::Value;
use lz_core::error::{AnalysisError, ErrorCode};
use lz_core::span::Span;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// One entry of an evaluation stack snapshot, innermost last.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceFrame {
    pub location: String,
    pub span: Option<Span>,
}

impl std::fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span.filter(Span::has_position) {
            Some(span) => write!(f, "{} at {}", self.location, span),
            None => f.write_str(&self.location),
        }
    }
}

/// Evaluation-time error. Recoverable only through `try`/`catch`.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct LangException {
    pub code: ErrorCode,
    pub message: String,
    pub span: Option<Span>,
    pub trace: Vec<TraceFrame>,
    /// Payload of a user `throw`.
    pub value: Option<Value>,
}

impl LangException {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span: None,
            trace: Vec::new(),
            value: None,
        }
    }

    pub fn thrown(value: Value) -> Self {
        Self {
            value: Some(value.clone()),
            ..Self::new(ErrorCode::CustomError, value.to_string())
        }
    }

    /// Attaches `span` unless a more precise one is already known.
    pub fn or_span(mut self, span: Span) -> Self {
        if self.span.is_none() && span.has_position() {
            self.span = Some(span);
        }
        self
    }

    /// Keeps the first snapshot taken, which is the deepest one.
    pub fn or_trace(mut self, trace: &[TraceFrame]) -> Self {
        if self.trace.is_empty() {
            self.trace = trace.to_vec();
        }
        self
    }

    /// Value bound by a catch clause: the thrown value, or `{code, message}` for system
    /// errors.
    pub fn caught_value(&self) -> Value {
        if let Some(value) = &self.value {
            return value.clone();
        }
        let mut dict = BTreeMap::new();
        dict.insert("code".to_string(), Value::string(self.code.as_str()));
        dict.insert("message".to_string(), Value::string(&self.message));
        Value::Dict(Arc::new(dict))
    }

    pub fn trace_value(&self) -> Value {
        Value::list(
            self.trace
                .iter()
                .map(|frame| Value::string(&frame.to_string()))
                .collect(),
        )
    }
}

impl From<AnalysisError> for LangException {
    fn from(err: AnalysisError) -> Self {
        Self {
            span: err.span,
            ..Self::new(err.code, err.message)
        }
    }
}

impl From<LangException> for lz_core::Error {
    fn from(err: LangException) -> Self {
        match err.span.filter(Span::has_position) {
            Some(span) => lz_core::Error::Generic(format!("{} at {}", err, span)),
            None => lz_core::Error::Generic(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LangException>;

/// Create an evaluation error with a code
pub fn lang_error(code: ErrorCode, message: impl Into<String>) -> LangException {
    LangException::new(code, message)
}

/// Create an evaluation error with a code and a source position
pub fn lang_error_at(code: ErrorCode, message: impl Into<String>, span: Span) -> LangException {
    LangException::new(code, message).or_span(span)
}

/// Macro to return early with an evaluation error
#[macro_export]
macro_rules! lang_bail {
    ($code:expr, $($arg:tt)*) => {
        return Err($crate::error::lang_error($code, format!($($arg)*)))
    };
}
