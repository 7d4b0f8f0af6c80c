//! Lazuli interpreter.
//!
//! Compiles an analysed [`UnitSet`](lz_core::ast::UnitSet) into operation trees and evaluates
//! them lazily over memoized cells. Entry point is [`Runtime`].

pub mod builder;
pub mod closures;
pub mod context;
pub mod error;
pub mod memory;
pub mod ops;
pub mod runtime;
pub mod value;

pub use builder::{BuildOptions, OpBuilder};
pub use context::EvalContext;
pub use error::{LangException, Result};
pub use runtime::{space_values, InterpreterOptions, Runtime};
pub use value::Value;
