use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use log::{debug, trace, warn};

use crate::compiler::Result;
use crate::compiler::symbols::{ScopeId, ScopeStack};
use crate::compiler::syntax::{self, Listener, Param, Program};
use crate::compiler::types::{Type, VarType};
use crate::error::Error;

/// Declared symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub ident: String,
    pub ty: Type,
    /// Source text of the string constant (`STRING` declarations only).
    pub literal: Option<String>,
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name {} type {}", self.ident, self.ty)?;

        if let Some(literal) = &self.literal {
            write!(f, " value {literal}")?;
        }

        Ok(())
    }
}

/// Scopes in the order they were opened, each with its symbols in
/// declaration order.
#[derive(Debug, Default)]
pub struct ScopeTable {
    scopes: IndexMap<ScopeId, Vec<Symbol>>,
}

impl ScopeTable {
    #[inline]
    pub fn scopes(&self) -> impl Iterator<Item = (&ScopeId, &[Symbol])> {
        self.scopes.iter().map(|(id, syms)| (id, syms.as_slice()))
    }

    #[inline]
    #[must_use]
    pub fn symbols(&self, id: &ScopeId) -> Option<&[Symbol]> {
        self.scopes.get(id).map(Vec::as_slice)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Resolves `ident` through the given scopes, innermost first. Within one
    /// scope the latest declaration wins.
    pub fn lookup<'a>(
        &self,
        mut scopes: impl Iterator<Item = &'a ScopeId>,
        ident: &str,
    ) -> Option<&Symbol> {
        scopes.find_map(|id| {
            self.symbols(id)
                .and_then(|syms| syms.iter().rev().find(|sym| sym.ident == ident))
        })
    }

    /// Every declared name once, in the order first seen. Target code has a
    /// single flat storage namespace.
    #[must_use]
    pub fn storage(&self) -> Vec<&Symbol> {
        let mut seen = HashSet::new();
        let mut storage = vec![];

        for sym in self.scopes.values().flatten() {
            if seen.insert(sym.ident.as_str()) {
                storage.push(sym);
            }
        }

        storage
    }
}

impl fmt::Display for ScopeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, syms) in &self.scopes {
            if syms.is_empty() {
                writeln!(f, "Symbol Table {id}\n")?;
                continue;
            }

            writeln!(f, "Symbol table {id}")?;
            for sym in syms {
                writeln!(f, "{sym}")?;
                // String entries are followed by a blank line.
                if sym.literal.is_some() {
                    writeln!(f)?;
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

/// Builds a [`ScopeTable`] from traversal events.
#[derive(Debug, Default)]
pub struct ScopeTableBuilder {
    table: ScopeTable,
    scopes: ScopeStack,
}

impl ScopeTableBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the finished table, leaving the builder empty.
    #[must_use]
    pub fn finish(&mut self) -> ScopeTable {
        debug_assert_eq!(self.scopes.depth(), 0, "unbalanced scope stack");

        self.scopes = ScopeStack::new();
        std::mem::take(&mut self.table)
    }

    fn open(&mut self, id: ScopeId) {
        trace!("open scope {id}");

        if self.table.scopes.insert(id.clone(), vec![]).is_some() {
            warn!("scope '{id}' opened twice, discarding its earlier symbols");
        }
    }

    /// Inserts `symbol` into the current scope. A symbol with the same name
    /// and type already in that scope is a fatal duplicate.
    fn declare(&mut self, symbol: Symbol) -> Result<()> {
        let scope = self
            .scopes
            .current()
            .expect("declarations should only occur inside an open scope");

        let symbols = self.table.scopes.entry(scope.clone()).or_default();

        if symbols
            .iter()
            .any(|sym| sym.ident == symbol.ident && sym.ty == symbol.ty)
        {
            return Err(Error::DuplicateDeclaration {
                scope: scope.clone(),
                ident: symbol.ident,
            });
        }

        trace!("declare '{}' {} in {scope}", symbol.ident, symbol.ty);
        symbols.push(symbol);

        Ok(())
    }

    fn declare_vars<'a>(&mut self, ty: Type, idents: impl Iterator<Item = &'a str>) -> Result<()> {
        for ident in idents {
            self.declare(Symbol {
                ident: ident.to_owned(),
                ty,
                literal: None,
            })?;
        }

        Ok(())
    }
}

impl Listener for ScopeTableBuilder {
    fn enter_program(&mut self, _ident: &str) -> Result<()> {
        let id = self.scopes.enter_program();
        self.open(id);
        Ok(())
    }

    fn exit_program(&mut self) -> Result<()> {
        self.scopes.exit_scope();
        Ok(())
    }

    fn enter_var_decl(&mut self, ty: VarType, idents: &[String]) -> Result<()> {
        self.declare_vars(ty.into(), idents.iter().map(String::as_str))
    }

    fn enter_param_decl_list(&mut self, params: &[Param]) -> Result<()> {
        for param in params {
            self.declare_vars(param.ty.into(), std::iter::once(param.ident.as_str()))?;
        }

        Ok(())
    }

    fn enter_string_decl(&mut self, ident: &str, literal: &str) -> Result<()> {
        self.declare(Symbol {
            ident: ident.to_owned(),
            ty: Type::String,
            literal: Some(literal.to_owned()),
        })
    }

    fn enter_func_decl(&mut self, ident: &str) -> Result<()> {
        let id = self.scopes.enter_procedure(ident);
        self.open(id);
        Ok(())
    }

    fn exit_func_decl(&mut self, _ident: &str) -> Result<()> {
        self.scopes.exit_scope();
        Ok(())
    }

    fn enter_if(&mut self, _has_else: bool) -> Result<()> {
        let id = self.scopes.enter_if();
        self.open(id);
        Ok(())
    }

    fn exit_if(&mut self) -> Result<()> {
        self.scopes.exit_if();
        Ok(())
    }

    fn enter_else(&mut self) -> Result<()> {
        let id = self.scopes.enter_else();
        self.open(id);
        Ok(())
    }

    fn enter_while(&mut self) -> Result<()> {
        let id = self.scopes.enter_block();
        self.open(id);
        Ok(())
    }

    fn exit_while(&mut self) -> Result<()> {
        self.scopes.exit_scope();
        Ok(())
    }
}

/// Builds the scoped symbol table of `program`.
///
/// # Errors
///
/// Returns [`Error::DuplicateDeclaration`] on the first symbol declared twice
/// with the same type in one scope; nothing after it is processed.
pub fn build_scope_table(program: &Program) -> Result<ScopeTable> {
    let mut builder = ScopeTableBuilder::new();
    syntax::walk(&mut builder, program)?;

    let table = builder.finish();
    debug!("built {} scope(s)", table.len());

    Ok(table)
}
