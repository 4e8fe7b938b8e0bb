//! Multi-stage pipeline for compiling a Little parse tree into tiny target
//! code.

pub mod asm;
pub mod driver;
pub mod emit;
pub mod ir;
pub mod symbols;
pub mod syntax;
pub mod tree;
pub mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub type Result<T> = std::result::Result<T, crate::error::Error>;
