use serde::{Deserialize, Serialize};

/// Declared or inferred type of a binding or expression.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, derive_more::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    #[default]
    #[display("any")]
    Any,
    #[display("void")]
    Void,
    #[display("boolean")]
    Boolean,
    #[display("string")]
    String,
    #[display("long")]
    Long,
    #[display("double")]
    Double,
    #[display("decimal")]
    Decimal,
    #[display("datetime")]
    DateTime,
    #[display("list")]
    List,
    #[display("dict")]
    Dict,
    #[display("function")]
    Function,
}

impl Type {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Long | Type::Double | Type::Decimal)
    }

    /// Static result type of an arithmetic operator given its operand types, if known.
    pub fn numeric_result(left: Type, right: Type) -> Type {
        match (left, right) {
            (Type::Long, Type::Long) => Type::Long,
            (Type::Decimal, r) if r.is_numeric() => Type::Decimal,
            (l, Type::Decimal) if l.is_numeric() => Type::Decimal,
            (Type::Double, r) if r.is_numeric() => Type::Double,
            (l, Type::Double) if l.is_numeric() => Type::Double,
            _ => Type::Any,
        }
    }
}
