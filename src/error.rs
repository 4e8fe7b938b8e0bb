//! Compiler errors and macros for reporting them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::compiler::symbols::ScopeId;

/// Errors that halt the compilation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// A symbol was declared twice (same name and type) in one scope.
    #[error("DECLARATION ERROR {ident}")]
    DuplicateDeclaration { scope: ScopeId, ident: String },
    /// An identifier was referenced with no visible declaration.
    #[error("use of undeclared identifier '{ident}'")]
    UndeclaredVariable { ident: String },
    /// `READ` into a variable of type `STRING`.
    #[error("cannot read into STRING variable '{ident}'")]
    UnsupportedRead { ident: String },
    /// Arithmetic whose result would be typed `STRING`.
    #[error("arithmetic on STRING operand '{operand}'")]
    StringArithmetic { operand: String },
    #[error("failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed parse tree: {0}")]
    ParseTree(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` for the declaration error, which ends the run with a
    /// clean exit status.
    #[inline]
    #[must_use]
    pub const fn is_declaration_error(&self) -> bool {
        matches!(self, Error::DuplicateDeclaration { .. })
    }
}

/// Report a generic error message, printing to `stderr`.
#[macro_export]
macro_rules! report_err {
    ($program:expr, $($arg:tt)+) => {{
        eprintln!("\x1b[1;1m{}\x1b[0m: \x1b[1;31merror:\x1b[0m {}", $program, format!($($arg)+));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_error_message_names_symbol() {
        let err = Error::DuplicateDeclaration {
            scope: ScopeId::Global,
            ident: "x".into(),
        };

        assert!(err.is_declaration_error());
        assert_eq!(err.to_string(), "DECLARATION ERROR x");
    }

    #[test]
    fn other_errors_are_not_declaration_errors() {
        let err = Error::UndeclaredVariable { ident: "y".into() };

        assert!(!err.is_declaration_error());
        assert_eq!(err.to_string(), "use of undeclared identifier 'y'");
    }
}
