//! Lazuli core
//!
//! Syntax tree, spans, error codes, diagnostics, configuration flags and logging setup shared by
//! the analysis and interpreter crates.

#[macro_use]
pub mod macros;

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod source_map;
pub mod span;

// Re-export commonly used items for convenience
pub use tracing;

// Alias for error types
pub type Error = crate::error::Error;
pub type Result<T> = crate::error::Result<T>;
