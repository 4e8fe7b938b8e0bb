//! Intermediate Representation
//!
//! Compiler pass that lowers statement trees into a linear, typed
//! intermediate representation (_IR_).
//!
//! Expressions are evaluated as a stack machine over their post-order node
//! sequence. A value on the stack is either a bare reference to a variable or
//! constant (no code of its own) or a computed result: the code that produces
//! it plus the temporary holding it.

use std::fmt;

use log::{debug, trace};

use crate::compiler::Result;
use crate::compiler::tree::{BinaryOperator, Expr, Statement};
use crate::compiler::types::Type;
use crate::error::Error;

/// Label of the program entry point.
const ENTRY_LABEL: &str = "main";

/// Intermediate representation (_IR_).
#[derive(Debug)]
pub struct IR {
    pub instructions: Vec<Instruction>,
    /// Number of temporaries allocated.
    pub temps: usize,
}

impl fmt::Display for IR {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ";IR code")?;
        for inst in &self.instructions {
            writeln!(f, "{inst}")?;
        }

        Ok(())
    }
}

/// Virtual temporary, numbered from 1 and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Temp(pub usize);

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$T{}", self.0)
    }
}

/// _IR_ operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Temp(Temp),
    /// Declared variable.
    Var(String),
    /// Numeric constant, as source text.
    Literal(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Temp(tmp) => write!(f, "{tmp}"),
            Operand::Var(ident) | Operand::Literal(ident) => write!(f, "{ident}"),
        }
    }
}

/// _IR_ instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Label(String),
    /// Opens the activation of the current label.
    Link,
    Ret,
    /// Copies `src` into `dst`.
    Store { ty: Type, src: Operand, dst: Operand },
    /// `dst = lhs op rhs`. `ty` is never [`Type::String`].
    Binary {
        op: BinaryOperator,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
        dst: Temp,
    },
    /// `ty` is never [`Type::String`].
    Read { ty: Type, ident: String },
    Write { ty: Type, ident: String },
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Label(label) => write!(f, ";LABEL {label}"),
            Instruction::Link => write!(f, ";LINK"),
            Instruction::Ret => write!(f, ";RET"),
            Instruction::Store { ty, src, dst } => write!(f, ";STORE{} {src} {dst}", ty.suffix()),
            Instruction::Binary {
                op,
                ty,
                lhs,
                rhs,
                dst,
            } => {
                let opcode = match op {
                    BinaryOperator::Add => "ADD",
                    BinaryOperator::Sub => "SUB",
                    BinaryOperator::Mul => "MULT",
                    BinaryOperator::Div => "DIV",
                };

                write!(f, ";{opcode}{} {lhs} {rhs} {dst}", ty.suffix())
            }
            Instruction::Read { ty, ident } => write!(f, ";READ{} {ident}", ty.suffix()),
            Instruction::Write { ty, ident } => write!(f, ";WRITE{} {ident}", ty.suffix()),
        }
    }
}

/// How a stack value is typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Typed(Type),
    /// Numeric constant not yet materialized into a temporary.
    Constant,
}

/// Stack machine value.
#[derive(Debug)]
struct Value {
    /// Instructions producing the value (empty for bare references).
    code: Vec<Instruction>,
    location: Operand,
    kind: Kind,
}

impl Value {
    #[inline]
    fn bare(location: Operand, kind: Kind) -> Self {
        Value {
            code: vec![],
            location,
            kind,
        }
    }

    /// Declared type, or the type a constant's literal denotes.
    fn ty(&self) -> Type {
        match (self.kind, &self.location) {
            (Kind::Typed(ty), _) => ty,
            (Kind::Constant, location) => Type::of_literal(&location.to_string()),
        }
    }
}

/// Helper for lowering statement trees into _IR_ instructions.
#[derive(Debug, Default)]
struct IRBuilder {
    instructions: Vec<Instruction>,
    // For temporaries.
    tmp_count: usize,
}

impl IRBuilder {
    /// Returns a new temporary.
    fn new_tmp(&mut self) -> Temp {
        self.tmp_count += 1;
        Temp(self.tmp_count)
    }

    fn lower_statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::Assign { target, value } => {
                let Value {
                    code,
                    location,
                    kind,
                } = self.lower_expr(value)?;

                let dst = Operand::Var(target.ident.clone());

                if !code.is_empty() {
                    self.instructions.extend(code);
                    let ty = match kind {
                        Kind::Typed(ty) => ty,
                        Kind::Constant => unreachable!("computed values are always typed"),
                    };
                    self.instructions
                        .push(Instruction::Store { ty, src: location, dst });

                    return Ok(());
                }

                match kind {
                    // Constants are staged through a temporary typed by the
                    // target.
                    Kind::Constant => self.store_via_tmp(target.ty, location, dst),
                    Kind::Typed(Type::Float) => self.store_via_tmp(Type::Float, location, dst),
                    Kind::Typed(ty) => self
                        .instructions
                        .push(Instruction::Store { ty, src: location, dst }),
                }
            }
            Statement::Read(vars) => {
                for var in vars {
                    if var.ty == Type::String {
                        return Err(Error::UnsupportedRead {
                            ident: var.ident.clone(),
                        });
                    }

                    self.instructions.push(Instruction::Read {
                        ty: var.ty,
                        ident: var.ident.clone(),
                    });
                }
            }
            Statement::Write(vars) => {
                self.instructions
                    .extend(vars.iter().map(|var| Instruction::Write {
                        ty: var.ty,
                        ident: var.ident.clone(),
                    }));
            }
            // String values only reach the target declaration header.
            Statement::StringDecl { .. } => {}
        }

        Ok(())
    }

    fn store_via_tmp(&mut self, ty: Type, src: Operand, dst: Operand) {
        let tmp = Operand::Temp(self.new_tmp());

        self.instructions.extend([
            Instruction::Store {
                ty,
                src,
                dst: tmp.clone(),
            },
            Instruction::Store { ty, src: tmp, dst },
        ]);
    }

    /// Evaluates `expr` over its post-order node sequence.
    fn lower_expr(&mut self, expr: &Expr) -> Result<Value> {
        let mut stack = vec![];

        for node in expr.post_order() {
            let value = match node {
                Expr::VarRef(var) => {
                    Value::bare(Operand::Var(var.ident.clone()), Kind::Typed(var.ty))
                }
                Expr::Literal(literal) => {
                    Value::bare(Operand::Literal(literal.clone()), Kind::Constant)
                }
                Expr::BinaryOp { op, .. } => {
                    // The right operand was pushed last.
                    let rhs = stack.pop().expect("operator should have a right operand");
                    let lhs = stack.pop().expect("operator should have a left operand");

                    self.lower_binary(*op, lhs, rhs)?
                }
            };

            stack.push(value);
        }

        debug_assert_eq!(stack.len(), 1, "expression should leave one value");

        Ok(stack.pop().expect("expression should leave one value"))
    }

    fn lower_binary(&mut self, op: BinaryOperator, mut lhs: Value, mut rhs: Value) -> Result<Value> {
        // Additive results take the right operand's type, multiplicative
        // results the left operand's.
        let typed_by = if op.is_additive() { &rhs } else { &lhs };
        let ty = typed_by.ty();

        if ty == Type::String {
            return Err(Error::StringArithmetic {
                operand: typed_by.location.to_string(),
            });
        }

        let mut code = std::mem::take(&mut lhs.code);
        code.append(&mut rhs.code);

        let mut dst = self.new_tmp();

        // Constants are materialized into the pending temporary, which then
        // becomes their location; the result moves on to a fresh one.
        for operand in [&mut lhs, &mut rhs] {
            if operand.kind == Kind::Constant {
                let src = std::mem::replace(&mut operand.location, Operand::Temp(dst));

                code.push(Instruction::Store {
                    ty,
                    src,
                    dst: Operand::Temp(dst),
                });

                dst = self.new_tmp();
            }
        }

        code.push(Instruction::Binary {
            op,
            ty,
            lhs: lhs.location,
            rhs: rhs.location,
            dst,
        });

        Ok(Value {
            code,
            location: Operand::Temp(dst),
            kind: Kind::Typed(ty),
        })
    }
}

/// Generate intermediate representation (_IR_) for the statement trees, in
/// order, between the entry prologue and the return epilogue.
///
/// # Errors
///
/// Returns an error for a `READ` into a `STRING` variable or arithmetic
/// typed as `STRING`.
pub fn generate_ir(statements: &[Statement]) -> Result<IR> {
    let mut builder = IRBuilder::default();

    builder.instructions.extend([
        Instruction::Label(ENTRY_LABEL.to_owned()),
        Instruction::Link,
    ]);

    for stmt in statements {
        trace!("lowering {stmt}");
        builder.lower_statement(stmt)?;
    }

    builder.instructions.push(Instruction::Ret);

    debug!(
        "generated {} IR instruction(s), {} temporary(ies)",
        builder.instructions.len(),
        builder.tmp_count
    );

    Ok(IR {
        instructions: builder.instructions,
        temps: builder.tmp_count,
    })
}
