//! Little Types
//!
//! Declared types of the Little language.

use std::fmt;

use serde::Deserialize;

/// Declared type of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    Float,
    String,
}

impl Type {
    /// Opcode suffix used by typed _IR_ instructions (`STOREI`, `ADDF`, ...).
    #[inline]
    #[must_use]
    pub const fn suffix(self) -> char {
        match self {
            Type::Int => 'I',
            Type::Float => 'F',
            Type::String => 'S',
        }
    }

    /// Infers the type of a numeric literal from its text.
    #[inline]
    #[must_use]
    pub fn of_literal(literal: &str) -> Self {
        if literal.contains('.') {
            Type::Float
        } else {
            Type::Int
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "INT"),
            Type::Float => write!(f, "FLOAT"),
            Type::String => write!(f, "STRING"),
        }
    }
}

/// Type keyword accepted in variable and parameter declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VarType {
    Int,
    Float,
}

impl From<VarType> for Type {
    fn from(ty: VarType) -> Self {
        match ty {
            VarType::Int => Type::Int,
            VarType::Float => Type::Float,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_types() {
        assert_eq!(Type::of_literal("42"), Type::Int);
        assert_eq!(Type::of_literal("-7"), Type::Int);
        assert_eq!(Type::of_literal("3.14"), Type::Float);
    }

    #[test]
    fn suffixes_and_keywords() {
        assert_eq!(Type::Int.suffix(), 'I');
        assert_eq!(Type::Float.suffix(), 'F');
        assert_eq!(Type::String.suffix(), 'S');
        assert_eq!(Type::from(VarType::Float).to_string(), "FLOAT");
    }
}
