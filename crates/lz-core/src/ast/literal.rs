use crate::ast::Type;
use serde::{Deserialize, Serialize};

/// Literal constant as produced by the parser. Decimal and datetime literals keep their source
/// text; the value library parses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Nil,
    Boolean(bool),
    Long(i64),
    Double(f64),
    Decimal(String),
    String(String),
    DateTime(String),
}

impl Literal {
    pub fn value_type(&self) -> Type {
        match self {
            Literal::Nil => Type::Void,
            Literal::Boolean(_) => Type::Boolean,
            Literal::Long(_) => Type::Long,
            Literal::Double(_) => Type::Double,
            Literal::Decimal(_) => Type::Decimal,
            Literal::String(_) => Type::String,
            Literal::DateTime(_) => Type::DateTime,
        }
    }
}
