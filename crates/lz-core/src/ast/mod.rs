//! Syntax tree handed over by the parser layer.
//!
//! Nodes are plain data. Every node that can be the target of a tooling query or the owner of
//! a scope carries a process-unique [`NodeId`] and a [`Span`].

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

mod expr;
mod literal;
mod pattern;
mod ty;
mod unit;

pub use expr::*;
pub use literal::*;
pub use pattern::*;
pub use ty::*;
pub use unit::*;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("#{_0}")]
pub struct NodeId(pub u32);

static NEXT_NODE_ID: AtomicU32 = AtomicU32::new(1);

impl NodeId {
    /// Allocates the next process-unique id.
    pub fn fresh() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity and location shared by every addressable node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMeta {
    pub id: NodeId,
    pub span: Span,
}

impl NodeMeta {
    pub fn fresh() -> Self {
        Self {
            id: NodeId::fresh(),
            span: Span::null(),
        }
    }
}

impl Default for NodeMeta {
    fn default() -> Self {
        Self::fresh()
    }
}

pub fn dump_json(unit: &Unit) -> crate::Result<String> {
    Ok(serde_json::to_string_pretty(unit)?)
}
