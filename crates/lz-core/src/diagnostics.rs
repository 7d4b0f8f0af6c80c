use crate::error::AnalysisError;
use crate::source_map::source_map;
use crate::span::Span;
use once_cell::sync::Lazy;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Built-in templates supported by the diagnostic manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticTemplate {
    Pretty,
    Plain,
}

/// Runtime configuration for emitting diagnostics.
#[derive(Debug, Clone)]
pub struct DiagnosticDisplayOptions {
    pub template: DiagnosticTemplate,
    pub verbose_info: bool,
}

impl DiagnosticDisplayOptions {
    pub fn pretty(verbose_info: bool) -> Self {
        Self {
            template: DiagnosticTemplate::Pretty,
            verbose_info,
        }
    }

    pub fn plain(verbose_info: bool) -> Self {
        Self {
            template: DiagnosticTemplate::Plain,
            verbose_info,
        }
    }
}

impl Default for DiagnosticDisplayOptions {
    fn default() -> Self {
        DiagnosticDisplayOptions::pretty(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Clone)]
pub struct Diagnostic<T = String>
where
    T: Clone + Display,
{
    pub level: DiagnosticLevel,
    pub message: T,
    pub span: Option<Span>,
    pub suggestions: Vec<String>,
    pub source_context: Option<String>,
    pub code: Option<String>,
}

impl<T> Diagnostic<T>
where
    T: Clone + Display,
{
    fn with_level(level: DiagnosticLevel, message: T) -> Self {
        Self {
            level,
            message,
            span: None,
            suggestions: Vec::new(),
            source_context: None,
            code: None,
        }
    }

    pub fn error(message: T) -> Self {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: T) -> Self {
        Self::with_level(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: T) -> Self {
        Self::with_level(DiagnosticLevel::Info, message)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_source_context(mut self, context: impl Into<String>) -> Self {
        self.source_context = Some(context.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn as_string_diagnostic(&self) -> Diagnostic<String> {
        Diagnostic {
            level: self.level,
            message: self.message.to_string(),
            span: self.span,
            suggestions: self.suggestions.clone(),
            source_context: self.source_context.clone(),
            code: self.code.clone(),
        }
    }
}

impl From<&AnalysisError> for Diagnostic {
    fn from(err: &AnalysisError) -> Self {
        let diagnostic = Diagnostic::error(err.message.clone()).with_code(err.code.as_str());
        match err.span {
            Some(span) => diagnostic.with_span(span),
            None => diagnostic,
        }
    }
}

impl<T> std::fmt::Debug for Diagnostic<T>
where
    T: Clone + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostic")
            .field("level", &self.level)
            .field("message", &self.message.to_string())
            .field("span", &self.span)
            .field("suggestions", &self.suggestions)
            .field("source_context", &self.source_context)
            .field("code", &self.code)
            .finish()
    }
}

impl<T> Display for Diagnostic<T>
where
    T: Clone + Display,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }

        if !self.suggestions.is_empty() {
            write!(f, " (hints: {})", self.suggestions.join("; "))?;
        }

        Ok(())
    }
}

/// A value together with the diagnostics produced while computing it. A report without a
/// value is a failed pass.
#[derive(Debug, Clone)]
pub struct DiagnosticReport<T, M = String>
where
    M: Clone + Display,
{
    pub value: Option<T>,
    pub diagnostics: Vec<Diagnostic<M>>,
}

impl<T, M> DiagnosticReport<T, M>
where
    M: Clone + Display,
{
    pub fn success(value: T) -> Self {
        Self {
            value: Some(value),
            diagnostics: Vec::new(),
        }
    }

    pub fn success_with_diagnostics(value: T, diagnostics: Vec<Diagnostic<M>>) -> Self {
        Self {
            value: Some(value),
            diagnostics,
        }
    }

    pub fn failure(diagnostics: Vec<Diagnostic<M>>) -> Self {
        Self {
            value: None,
            diagnostics,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.level == DiagnosticLevel::Error)
    }

    pub fn into_result(self) -> Result<(T, Vec<Diagnostic<M>>), Vec<Diagnostic<M>>> {
        match self.value {
            Some(value) => Ok((value, self.diagnostics)),
            None => Err(self.diagnostics),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosticManager {
    diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&self, diagnostic: Diagnostic) {
        self.add_diagnostic(diagnostic);
    }

    pub fn add_diagnostic(&self, diagnostic: Diagnostic) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.push(diagnostic);
        }
    }

    pub fn add_diagnostics(&self, mut new_diagnostics: Vec<Diagnostic>) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.append(&mut new_diagnostics);
        }
    }

    pub fn get_diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .lock()
            .map(|d| d.iter().any(|diag| diag.level == DiagnosticLevel::Error))
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.clear();
        }
    }

    /// Renders one diagnostic into output lines; info diagnostics are hidden unless verbose.
    pub fn render<M>(
        diagnostic: &Diagnostic<M>,
        fallback_context: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) -> Option<Vec<String>>
    where
        M: Clone + Display,
    {
        if matches!(diagnostic.level, DiagnosticLevel::Info) && !options.verbose_info {
            return None;
        }
        let context = diagnostic
            .source_context
            .as_deref()
            .or(fallback_context)
            .unwrap_or("lazuli");

        let (tag, hint) = match options.template {
            DiagnosticTemplate::Pretty => (
                match diagnostic.level {
                    DiagnosticLevel::Error => "❌",
                    DiagnosticLevel::Warning => "⚠️ ",
                    DiagnosticLevel::Info => "ℹ️ ",
                },
                "💡",
            ),
            DiagnosticTemplate::Plain => (
                match diagnostic.level {
                    DiagnosticLevel::Error => "ERROR:",
                    DiagnosticLevel::Warning => "WARNING:",
                    DiagnosticLevel::Info => "INFO:",
                },
                "suggestion:",
            ),
        };

        let header = match diagnostic.code.as_ref() {
            Some(code) => format!("[{}] {} {} ({})", context, tag, diagnostic.message, code),
            None => format!("[{}] {} {}", context, tag, diagnostic.message),
        };

        let mut lines = vec![header];
        if let Some(span) = &diagnostic.span {
            lines.push(format!("   at {}", describe_span(span)));
        }
        for suggestion in &diagnostic.suggestions {
            lines.push(format!("   {} {}", hint, suggestion));
        }
        Some(lines)
    }

    /// Emit diagnostics to stderr using the provided options. The fallback context is used
    /// when a diagnostic does not specify a source context.
    pub fn emit<M>(
        diagnostics: &[Diagnostic<M>],
        fallback_context: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) where
        M: Clone + Display,
    {
        for diagnostic in diagnostics {
            if let Some(lines) = Self::render(diagnostic, fallback_context, options) {
                for line in lines {
                    eprintln!("{}", line);
                }
            }
        }
    }
}

fn describe_span(span: &Span) -> String {
    match source_map().path(span.file) {
        Some(path) if span.has_position() => {
            format!("{}:{}:{}", path, span.line, span.column)
        }
        Some(path) => format!("{} [{}..{}]", path, span.lo, span.hi),
        None => span.to_string(),
    }
}

static GLOBAL_DIAGNOSTIC_MANAGER: Lazy<Arc<DiagnosticManager>> =
    Lazy::new(|| Arc::new(DiagnosticManager::new()));

pub fn diagnostic_manager() -> Arc<DiagnosticManager> {
    GLOBAL_DIAGNOSTIC_MANAGER.clone()
}

pub fn report_error(message: impl Into<String>) -> crate::error::Error {
    let diagnostic = Diagnostic::error(message.into());
    tracing::error!("{}", diagnostic.message);
    diagnostic_manager().error(diagnostic.clone());
    crate::error::Error::Generic(diagnostic.message)
}

#[macro_export]
macro_rules! diagnostic_error {
    ($context:expr, $($arg:tt)*) => {
        $crate::diagnostics::DiagnosticReport::failure(
            vec![$crate::diagnostics::Diagnostic::error(format!($($arg)*))
                .with_source_context($context)],
        )
    };
}
