//! Static analysis for Lazuli programs.
//!
//! Runs in phases over a [`UnitSet`](lz_core::ast::UnitSet): scope building, linking of
//! imports, aliases and exports, reference resolution, and closure analysis. The resulting
//! [`Analysis`] is the only input the interpreter needs besides the syntax tree.

mod analysis;
mod builder;
mod closures;
mod inspect;
mod linker;
mod resolver;
pub mod scope;

pub use analysis::*;
pub use inspect::Inspection;
pub use linker::Linker;
pub use scope::*;
