//! Statement Trees
//!
//! Compiler pass that folds traversal events into one tree per statement.
//!
//! Additive and multiplicative operators arrive as distinct events, so
//! precedence is resolved with an operator stack while the events stream in:
//! an operator first reduces every pending operator of equal or higher
//! precedence, which also makes both tiers left-associative. Parenthesized
//! groups fence the operator stack until they close.

use std::fmt;
use std::sync::LazyLock;

use log::{debug, trace};
use regex::Regex;

use crate::compiler::Result;
use crate::compiler::symbols::{ScopeStack, ScopeTable};
use crate::compiler::syntax::{self, AddOp, Listener, MulOp, Primary, Program};
use crate::compiler::types::Type;
use crate::error::Error;

/// Operand text that denotes a numeric constant.
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("number pattern should compile"));

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    /// Returns `true` for the additive tier (`+`, `-`).
    #[inline]
    #[must_use]
    pub const fn is_additive(self) -> bool {
        matches!(self, BinaryOperator::Add | BinaryOperator::Sub)
    }

    #[inline]
    const fn precedence(self) -> u8 {
        if self.is_additive() { 1 } else { 2 }
    }
}

impl From<AddOp> for BinaryOperator {
    fn from(op: AddOp) -> Self {
        match op {
            AddOp::Add => BinaryOperator::Add,
            AddOp::Sub => BinaryOperator::Sub,
        }
    }
}

impl From<MulOp> for BinaryOperator {
    fn from(op: MulOp) -> Self {
        match op {
            MulOp::Mul => BinaryOperator::Mul,
            MulOp::Div => BinaryOperator::Div,
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Sub => write!(f, "-"),
            BinaryOperator::Mul => write!(f, "*"),
            BinaryOperator::Div => write!(f, "/"),
        }
    }
}

/// Reference to a declared variable, annotated with its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRef {
    pub ident: String,
    pub ty: Type,
}

impl fmt::Display for VarRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VARREF {} {}", self.ident, self.ty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    BinaryOp {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Numeric constant, as source text.
    Literal(String),
    VarRef(VarRef),
}

impl Expr {
    /// Iterates the expression in post-order (left, right, node), without
    /// recursion.
    #[inline]
    #[must_use]
    pub fn post_order(&self) -> PostOrder<'_> {
        PostOrder {
            stack: vec![(self, false)],
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::BinaryOp { op, .. } if op.is_additive() => write!(f, "ADDOP {op}"),
            Expr::BinaryOp { op, .. } => write!(f, "MULOP {op}"),
            Expr::Literal(literal) => write!(f, "CONSTANT {literal}"),
            Expr::VarRef(var) => write!(f, "{var}"),
        }
    }
}

/// Detaches subtrees onto a worklist, so dropping a deep operator chain does
/// not recurse once per level.
impl Drop for Expr {
    fn drop(&mut self) {
        let Expr::BinaryOp { lhs, rhs, .. } = self else {
            return;
        };

        let mut pending = vec![detach(lhs), detach(rhs)];

        while let Some(mut node) = pending.pop() {
            if let Expr::BinaryOp { lhs, rhs, .. } = &mut node {
                pending.push(detach(lhs));
                pending.push(detach(rhs));
            }
            // `node` now only owns leaves.
        }
    }
}

/// Takes the subtree out of `child`, leaving an empty leaf behind.
#[inline]
fn detach(child: &mut Expr) -> Expr {
    std::mem::replace(child, Expr::Literal(String::new()))
}

/// Post-order iterator over an [`Expr`].
#[derive(Debug)]
pub struct PostOrder<'a> {
    /// Pending nodes, `true` once their children have been scheduled.
    stack: Vec<(&'a Expr, bool)>,
}

impl<'a> Iterator for PostOrder<'a> {
    type Item = &'a Expr;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, expanded)) = self.stack.pop() {
            match node {
                Expr::BinaryOp { lhs, rhs, .. } if !expanded => {
                    self.stack.push((node, true));
                    self.stack.push((&**rhs, false));
                    self.stack.push((&**lhs, false));
                }
                _ => return Some(node),
            }
        }

        None
    }
}

/// Top-level statement tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Assign { target: VarRef, value: Expr },
    StringDecl { ident: String, literal: String },
    Read(Vec<VarRef>),
    Write(Vec<VarRef>),
}

/// Prints the statement's post-order node list, e.g.
/// `[VARREF x INT, CONSTANT 3, CONSTANT 4, ADDOP +, :=]`.
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign { target, value } => {
                write!(f, "[{target}")?;
                for node in value.post_order() {
                    write!(f, ", {node}")?;
                }
                write!(f, ", :=]")
            }
            Statement::StringDecl { ident, literal } => write!(f, "[STRING {ident} {literal}]"),
            Statement::Read(vars) => write!(f, "[READ {}]", join_idents(vars)),
            Statement::Write(vars) => write!(f, "[WRITE {}]", join_idents(vars)),
        }
    }
}

fn join_idents(vars: &[VarRef]) -> String {
    vars.iter()
        .map(|var| var.ident.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Entry on the operator stack of an assignment in progress.
#[derive(Debug, Clone, Copy)]
enum Pending {
    Operator(BinaryOperator),
    /// Open parenthesized group.
    Group,
}

/// Assignment whose value expression is still streaming in.
#[derive(Debug)]
struct OpenAssign {
    target: VarRef,
    operands: Vec<Expr>,
    operators: Vec<Pending>,
}

impl OpenAssign {
    fn push_operator(&mut self, op: BinaryOperator) {
        while let Some(Pending::Operator(top)) = self.operators.last()
            && top.precedence() >= op.precedence()
        {
            self.reduce();
        }

        self.operators.push(Pending::Operator(op));
    }

    fn close_group(&mut self) {
        while let Some(Pending::Operator(_)) = self.operators.last() {
            self.reduce();
        }

        let group = self.operators.pop();
        debug_assert!(matches!(group, Some(Pending::Group)), "unbalanced group");
    }

    /// Combines the top two operands with the top operator.
    fn reduce(&mut self) {
        let Some(Pending::Operator(op)) = self.operators.pop() else {
            unreachable!("reduce should only be called with an operator on top");
        };

        let rhs = self.operands.pop().expect("operator should have a right operand");
        let lhs = self.operands.pop().expect("operator should have a left operand");

        self.operands.push(Expr::BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        });
    }

    fn finish(mut self) -> Statement {
        while let Some(Pending::Operator(_)) = self.operators.last() {
            self.reduce();
        }

        debug_assert!(self.operators.is_empty(), "unclosed group");
        debug_assert_eq!(self.operands.len(), 1, "dangling operands");

        let value = self
            .operands
            .pop()
            .expect("assignment should have a value expression");

        Statement::Assign {
            target: self.target,
            value,
        }
    }
}

/// Builds statement trees from traversal events, resolving variable types
/// through the scope table.
#[derive(Debug)]
pub struct TreeBuilder<'a> {
    table: &'a ScopeTable,
    scopes: ScopeStack,
    statements: Vec<Statement>,
    assign: Option<OpenAssign>,
}

impl<'a> TreeBuilder<'a> {
    #[inline]
    #[must_use]
    pub fn new(table: &'a ScopeTable) -> Self {
        TreeBuilder {
            table,
            scopes: ScopeStack::new(),
            statements: vec![],
            assign: None,
        }
    }

    /// Returns the statements built so far, in the order they were entered.
    #[must_use]
    pub fn finish(self) -> Vec<Statement> {
        debug_assert!(self.assign.is_none(), "assignment left open");
        self.statements
    }

    fn resolve(&self, ident: &str) -> Result<VarRef> {
        let sym = self
            .table
            .lookup(self.scopes.innermost_first(), ident)
            .ok_or_else(|| Error::UndeclaredVariable {
                ident: ident.to_owned(),
            })?;

        Ok(VarRef {
            ident: sym.ident.clone(),
            ty: sym.ty,
        })
    }

    fn resolve_all(&self, idents: &[String]) -> Result<Vec<VarRef>> {
        idents.iter().map(|ident| self.resolve(ident)).collect()
    }

    fn push(&mut self, stmt: Statement) {
        trace!("statement {stmt}");
        self.statements.push(stmt);
    }
}

impl Listener for TreeBuilder<'_> {
    fn enter_program(&mut self, _ident: &str) -> Result<()> {
        self.scopes.enter_program();
        Ok(())
    }

    fn exit_program(&mut self) -> Result<()> {
        self.scopes.exit_scope();
        Ok(())
    }

    fn enter_string_decl(&mut self, ident: &str, literal: &str) -> Result<()> {
        self.push(Statement::StringDecl {
            ident: ident.to_owned(),
            literal: literal.to_owned(),
        });
        Ok(())
    }

    fn enter_func_decl(&mut self, ident: &str) -> Result<()> {
        self.scopes.enter_procedure(ident);
        Ok(())
    }

    fn exit_func_decl(&mut self, _ident: &str) -> Result<()> {
        self.scopes.exit_scope();
        Ok(())
    }

    fn enter_if(&mut self, _has_else: bool) -> Result<()> {
        self.scopes.enter_if();
        Ok(())
    }

    fn exit_if(&mut self) -> Result<()> {
        self.scopes.exit_if();
        Ok(())
    }

    fn enter_else(&mut self) -> Result<()> {
        self.scopes.enter_else();
        Ok(())
    }

    fn enter_while(&mut self) -> Result<()> {
        self.scopes.enter_block();
        Ok(())
    }

    fn exit_while(&mut self) -> Result<()> {
        self.scopes.exit_scope();
        Ok(())
    }

    fn enter_assign(&mut self, target: &str) -> Result<()> {
        debug_assert!(self.assign.is_none(), "nested assignment");

        self.assign = Some(OpenAssign {
            target: self.resolve(target)?,
            operands: vec![],
            operators: vec![],
        });
        Ok(())
    }

    fn exit_assign(&mut self, _target: &str) -> Result<()> {
        if let Some(assign) = self.assign.take() {
            self.push(assign.finish());
        }
        Ok(())
    }

    fn enter_read(&mut self, idents: &[String]) -> Result<()> {
        let vars = self.resolve_all(idents)?;
        self.push(Statement::Read(vars));
        Ok(())
    }

    fn enter_write(&mut self, idents: &[String]) -> Result<()> {
        let vars = self.resolve_all(idents)?;
        self.push(Statement::Write(vars));
        Ok(())
    }

    fn enter_add_op(&mut self, op: AddOp) -> Result<()> {
        if let Some(assign) = &mut self.assign {
            assign.push_operator(op.into());
        }
        Ok(())
    }

    fn enter_mul_op(&mut self, op: MulOp) -> Result<()> {
        if let Some(assign) = &mut self.assign {
            assign.push_operator(op.into());
        }
        Ok(())
    }

    fn enter_primary(&mut self, primary: &Primary) -> Result<()> {
        // Conditions and return values are not lowered.
        if self.assign.is_none() {
            return Ok(());
        }

        let entry = match primary {
            Primary::Group(_) => None,
            Primary::Atom(text) if NUMBER.is_match(text) => Some(Expr::Literal(text.clone())),
            Primary::Atom(ident) => Some(Expr::VarRef(self.resolve(ident)?)),
        };

        if let Some(assign) = &mut self.assign {
            match entry {
                Some(operand) => assign.operands.push(operand),
                None => assign.operators.push(Pending::Group),
            }
        }
        Ok(())
    }

    fn exit_primary(&mut self, primary: &Primary) -> Result<()> {
        if let (Some(assign), Primary::Group(_)) = (&mut self.assign, primary) {
            assign.close_group();
        }
        Ok(())
    }
}

/// Builds one tree per top-level statement of `program`, in the order the
/// statements appear.
///
/// # Errors
///
/// Returns [`Error::UndeclaredVariable`] if a statement references an
/// identifier with no visible declaration.
pub fn build_statements(program: &Program, table: &ScopeTable) -> Result<Vec<Statement>> {
    let mut builder = TreeBuilder::new(table);
    syntax::walk(&mut builder, program)?;

    let statements = builder.finish();
    debug!("built {} statement tree(s)", statements.len());

    Ok(statements)
}
