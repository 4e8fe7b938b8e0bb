use std::fmt;

/// Identifier of a lexical scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeId {
    /// Program scope.
    Global,
    /// Body of an `IF`, `ELSE` or `WHILE`, numbered by a shared counter.
    Block(usize),
    /// Procedure scope, named after the procedure.
    Procedure(String),
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Global => write!(f, "GLOBAL"),
            ScopeId::Block(n) => write!(f, "BLOCK {n}"),
            ScopeId::Procedure(ident) => write!(f, "{ident}"),
        }
    }
}

/// Helper to track scopes during a parse tree walk.
#[derive(Debug)]
pub struct ScopeStack {
    /// Currently open scopes, innermost last.
    active: Vec<ScopeId>,
    /// Monotonic counter shared by every block kind.
    next_block: usize,
    /// Open `IF` statements, innermost last.
    ifs: Vec<OpenIf>,
}

/// Bookkeeping for an `IF` whose scopes are still open.
#[derive(Debug, Clone, Copy)]
struct OpenIf {
    /// Stack depth on entry; the `IF` body scope sits at this index.
    depth: usize,
    /// Set once the `ELSE` branch opens, hiding the `IF` body scope.
    in_else: bool,
}

impl ScopeStack {
    /// Number given to the first block scope.
    pub const FIRST_BLOCK: usize = 1;

    #[inline]
    #[must_use]
    pub fn new() -> Self {
        ScopeStack {
            active: vec![],
            next_block: Self::FIRST_BLOCK,
            ifs: vec![],
        }
    }

    /// Innermost open scope, if any.
    #[inline]
    #[must_use]
    pub fn current(&self) -> Option<&ScopeId> {
        self.active.last()
    }

    /// Scopes visible to lookups, from innermost to outermost. The body of
    /// an `IF` is not visible from its own `ELSE` branch.
    #[inline]
    pub fn innermost_first(&self) -> impl Iterator<Item = &ScopeId> {
        self.active
            .iter()
            .enumerate()
            .rev()
            .filter(move |(i, _)| !self.ifs.iter().any(|open| open.in_else && open.depth == *i))
            .map(|(_, id)| id)
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.active.len()
    }

    #[inline]
    pub fn enter_program(&mut self) -> ScopeId {
        self.push(ScopeId::Global)
    }

    #[inline]
    pub fn enter_procedure(&mut self, ident: &str) -> ScopeId {
        self.push(ScopeId::Procedure(ident.to_owned()))
    }

    /// Opens the next `BLOCK <n>` scope (`WHILE` bodies).
    #[inline]
    pub fn enter_block(&mut self) -> ScopeId {
        let id = ScopeId::Block(self.next_block);
        self.next_block += 1;

        self.push(id)
    }

    /// Opens the block scope of an `IF` body. A following `ELSE` block opens
    /// on top of it; [`ScopeStack::exit_if`] closes both.
    #[inline]
    pub fn enter_if(&mut self) -> ScopeId {
        self.ifs.push(OpenIf {
            depth: self.active.len(),
            in_else: false,
        });
        self.enter_block()
    }

    /// Opens the block scope of the innermost `IF`'s `ELSE` branch.
    ///
    /// # Panics
    ///
    /// Panics if no `IF` is open.
    #[inline]
    pub fn enter_else(&mut self) -> ScopeId {
        self.ifs
            .last_mut()
            .expect("enter_else should follow a matching enter_if")
            .in_else = true;

        self.enter_block()
    }

    /// Closes the scopes opened since the matching [`ScopeStack::enter_if`],
    /// the `ELSE` block first.
    ///
    /// # Panics
    ///
    /// Panics if no `IF` is open.
    #[inline]
    pub fn exit_if(&mut self) {
        let OpenIf { depth, .. } = self
            .ifs
            .pop()
            .expect("exit_if should follow a matching enter_if");

        debug_assert!(depth < self.active.len(), "IF scope already closed");
        self.active.truncate(depth);
    }

    #[inline]
    pub fn exit_scope(&mut self) -> Option<ScopeId> {
        self.active.pop()
    }

    #[inline]
    fn push(&mut self, id: ScopeId) -> ScopeId {
        self.active.push(id.clone());
        id
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
