//! Cells, spaces and shape templates.

mod cell;
mod space;
mod template;

pub use cell::*;
pub use space::*;
pub use template::*;
