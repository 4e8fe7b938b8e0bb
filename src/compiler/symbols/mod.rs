//! Symbol Tables
//!
//! Lexical scope tracking and the scoped symbol table built from declaration
//! events.

pub mod scope;
pub mod table;

pub use scope::{ScopeId, ScopeStack};
pub use table::{ScopeTable, ScopeTableBuilder, Symbol, build_scope_table};
