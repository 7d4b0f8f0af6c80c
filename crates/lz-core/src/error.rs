use crate::span::Span;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::result;
use thiserror::Error;

/// Stable, machine-checkable error codes shared by analysis and evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AlreadyDefined,
    UnresolvedReference,
    InvalidReferenceTarget,
    CyclicReference,
    CannotFindExport,
    DivisionByZero,
    CastError,
    CallingNonFunction,
    UnexpectedArgument,
    CannotCurry,
    CyclicEvaluation,
    NilError,
    CustomError,
    /// Broken runtime invariant, never raised by user code.
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AlreadyDefined => "ALREADY_DEFINED",
            ErrorCode::UnresolvedReference => "UNRESOLVED_REFERENCE",
            ErrorCode::InvalidReferenceTarget => "INVALID_REFERENCE_TARGET",
            ErrorCode::CyclicReference => "CYCLIC_REFERENCE",
            ErrorCode::CannotFindExport => "CANNOT_FIND_EXPORT",
            ErrorCode::DivisionByZero => "DIVISION_BY_ZERO",
            ErrorCode::CastError => "CAST_ERROR",
            ErrorCode::CallingNonFunction => "CALLING_NON_FUNCTION",
            ErrorCode::UnexpectedArgument => "UNEXPECTED_ARGUMENT",
            ErrorCode::CannotCurry => "CANNOT_CURRY",
            ErrorCode::CyclicEvaluation => "CYCLIC_EVALUATION",
            ErrorCode::NilError => "NIL_ERROR",
            ErrorCode::CustomError => "CUSTOM_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Codes raised while building scopes and linking, before any evaluation.
    pub fn is_analysis(&self) -> bool {
        matches!(
            self,
            ErrorCode::AlreadyDefined
                | ErrorCode::UnresolvedReference
                | ErrorCode::InvalidReferenceTarget
                | ErrorCode::CyclicReference
                | ErrorCode::CannotFindExport
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct AnalysisError {
    pub code: ErrorCode,
    pub message: String,
    pub span: Option<Span>,
}

impl AnalysisError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("{0}")]
    #[diagnostic(code(lazuli::analysis))]
    Analysis(AnalysisError),
    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Analysis(err) => Some(err.code),
            Error::Generic(_) => None,
        }
    }

    pub fn analysis(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Error::Analysis(AnalysisError::new(code, message).with_span(span))
    }
}

pub type Result<T> = result::Result<T, Error>;

impl From<AnalysisError> for Error {
    fn from(err: AnalysisError) -> Self {
        Error::Analysis(err)
    }
}

// Convert from eyre::Report to our Error type
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Generic(e.to_string())
    }
}
